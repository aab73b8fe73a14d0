//! Atom model: the record every stage reads and writes.
//!
//! An atom is a named scalar signal. `magnitude` is a probability/intensity
//! in [0, 1] for every channel except the signed valence axis (-1 to 1);
//! `confidence` is always in [0, 1]. The optional trace is an audit record
//! and never feeds back into computation.

use crate::math::{clamp01, sanitize_f64};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Provenance tag deciding which layer of the bag an atom lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AtomOrigin {
    /// Static ground truth from the scene
    World,
    /// Live sensing
    Obs,
    /// Scripted or test-injected values
    Override,
    /// Computed by a pipeline stage
    #[default]
    Derived,
}

impl AtomOrigin {
    /// Declaration order; also the layer index order.
    pub const ALL: [AtomOrigin; 4] = [
        AtomOrigin::World,
        AtomOrigin::Obs,
        AtomOrigin::Override,
        AtomOrigin::Derived,
    ];

    /// Resolution order: the first layer holding an id wins.
    pub const PRIORITY: [AtomOrigin; 4] = [
        AtomOrigin::Override,
        AtomOrigin::Obs,
        AtomOrigin::World,
        AtomOrigin::Derived,
    ];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            AtomOrigin::World => 0,
            AtomOrigin::Obs => 1,
            AtomOrigin::Override => 2,
            AtomOrigin::Derived => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AtomOrigin::World => "world",
            AtomOrigin::Obs => "obs",
            AtomOrigin::Override => "override",
            AtomOrigin::Derived => "derived",
        }
    }
}

impl std::fmt::Display for AtomOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named input of a formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TracePart {
    pub name: String,
    #[serde(deserialize_with = "deserialize_safe_f64")]
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl TracePart {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            weight: None,
        }
    }

    pub fn weighted(name: impl Into<String>, value: f64, weight: f64) -> Self {
        Self {
            name: name.into(),
            value,
            weight: Some(weight),
        }
    }
}

/// Audit record: which atoms and weights produced a value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trace {
    #[serde(default)]
    pub used_atom_ids: Vec<String>,

    /// Canonical ordered list. The legacy object form is converted on the way in.
    #[serde(default, deserialize_with = "deserialize_parts")]
    pub parts: Vec<TracePart>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Trace {
    pub fn formula(formula_id: impl Into<String>) -> Self {
        Self {
            formula_id: Some(formula_id.into()),
            ..Default::default()
        }
    }

    pub fn used<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.used_atom_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn parts(mut self, parts: impl IntoIterator<Item = TracePart>) -> Self {
        self.parts.extend(parts);
        self
    }

    pub fn part(mut self, part: TracePart) -> Self {
        self.parts.push(part);
        self
    }

    pub fn note(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// A named scalar signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    pub id: String,

    #[serde(deserialize_with = "deserialize_safe_f64")]
    pub magnitude: f64,

    #[serde(default = "default_confidence", deserialize_with = "deserialize_confidence")]
    pub confidence: f64,

    #[serde(default)]
    pub origin: AtomOrigin,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<Trace>,
}

impl Atom {
    /// Build an atom. Non-finite values are replaced (magnitude → 0,
    /// confidence → 0.5) and confidence is clamped to [0, 1]. Magnitude is
    /// not clamped here: the signed valence axis is a legal atom too.
    pub fn new(id: impl Into<String>, magnitude: f64, confidence: f64, origin: AtomOrigin) -> Self {
        Self {
            id: id.into(),
            magnitude: sanitize_f64(magnitude, 0.0),
            confidence: clamp01(sanitize_f64(confidence, 0.5)),
            origin,
            trace: None,
        }
    }

    pub fn world(id: impl Into<String>, magnitude: f64) -> Self {
        Self::new(id, magnitude, 1.0, AtomOrigin::World)
    }

    pub fn obs(id: impl Into<String>, magnitude: f64, confidence: f64) -> Self {
        Self::new(id, magnitude, confidence, AtomOrigin::Obs)
    }

    pub fn scripted(id: impl Into<String>, magnitude: f64) -> Self {
        Self::new(id, magnitude, 1.0, AtomOrigin::Override)
    }

    pub fn derived(id: impl Into<String>, magnitude: f64, confidence: f64) -> Self {
        Self::new(id, magnitude, confidence, AtomOrigin::Derived)
    }

    pub fn with_trace(mut self, trace: Trace) -> Self {
        self.trace = Some(trace);
        self
    }

    pub fn with_origin(mut self, origin: AtomOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Namespace segment of the id (`ctx` for `ctx:danger:a`).
    pub fn namespace(&self) -> &str {
        self.id.split(':').next().unwrap_or("")
    }
}

fn default_confidence() -> f64 {
    1.0
}

/// Deserialize an f64 that may be null or non-finite; both become 0.
pub fn deserialize_safe_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<f64>::deserialize(deserializer)?;
    Ok(v.map(|x| sanitize_f64(x, 0.0)).unwrap_or(0.0))
}

fn deserialize_confidence<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<f64>::deserialize(deserializer)?;
    Ok(clamp01(v.map(|x| sanitize_f64(x, 0.5)).unwrap_or(1.0)))
}

// =============================================================================
// Legacy trace parts
// =============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum PartsRepr {
    List(Vec<TracePart>),
    Legacy(BTreeMap<String, LegacyPart>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LegacyPart {
    Value(f64),
    Weighted {
        value: f64,
        #[serde(default)]
        weight: Option<f64>,
    },
}

/// Convert the legacy `{name: value}` / `{name: {value, weight}}` form into
/// the canonical list. Keys come out in lexicographic order.
fn legacy_parts_to_list(map: BTreeMap<String, LegacyPart>) -> Vec<TracePart> {
    map.into_iter()
        .map(|(name, part)| match part {
            LegacyPart::Value(value) => TracePart::new(name, sanitize_f64(value, 0.0)),
            LegacyPart::Weighted { value, weight } => TracePart {
                name,
                value: sanitize_f64(value, 0.0),
                weight,
            },
        })
        .collect()
}

fn deserialize_parts<'de, D>(deserializer: D) -> Result<Vec<TracePart>, D::Error>
where
    D: Deserializer<'de>,
{
    let repr = Option::<PartsRepr>::deserialize(deserializer)?;
    Ok(match repr {
        None => Vec::new(),
        Some(PartsRepr::List(parts)) => parts,
        Some(PartsRepr::Legacy(map)) => legacy_parts_to_list(map),
    })
}
