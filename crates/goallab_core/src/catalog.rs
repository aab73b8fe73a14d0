//! Provenance catalog: what an atom id means, on what scale, and which stage
//! produces and consumes it.
//!
//! Debug tooling only. The pipeline never consults it. Lookup is by string
//! id against an ordered pattern list; the first match wins and unmatched
//! ids degrade to "no specification".

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Value range an atom is declared on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    /// 0..1
    Unit,
    /// -1..1
    Signed,
}

impl Scale {
    pub fn bounds(self) -> (f64, f64) {
        match self {
            Scale::Unit => (0.0, 1.0),
            Scale::Signed => (-1.0, 1.0),
        }
    }

    pub fn contains(self, v: f64) -> bool {
        let (lo, hi) = self.bounds();
        v >= lo && v <= hi
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AtomSpec {
    pub title: &'static str,
    pub meaning: &'static str,
    pub scale: Scale,
    pub formula: &'static str,
    pub produced_by: &'static str,
    pub consumed_by: &'static str,
}

impl AtomSpec {
    pub const UNKNOWN: AtomSpec = AtomSpec {
        title: "no specification",
        meaning: "No catalog entry matches this id.",
        scale: Scale::Unit,
        formula: "",
        produced_by: "",
        consumed_by: "",
    };
}

const fn unit(
    title: &'static str,
    meaning: &'static str,
    formula: &'static str,
    produced_by: &'static str,
    consumed_by: &'static str,
) -> AtomSpec {
    AtomSpec {
        title,
        meaning,
        scale: Scale::Unit,
        formula,
        produced_by,
        consumed_by,
    }
}

const S0: &str = "stage0";
const S1: &str = "stage1.context";
const S2: &str = "stage2.appraisal";
const S3: &str = "stage3.threat";
const UI: &str = "frame.panels";

/// Ordered `(pattern, spec)` table. More specific patterns come first.
const BUILTIN: &[(&str, AtomSpec)] = &[
    // --- Stage0: world ---
    (r"^world:loc:privacy:[^:]+$", unit("Location privacy", "How private the agent's current location is.", "clamp01(location.privacy)", S0, S1)),
    (r"^world:loc:control:[^:]+$", unit("Location control", "How strongly the location is controlled by an authority.", "clamp01(location.control)", S0, "stage1.context, stage3.threat")),
    (r"^world:loc:crowd:[^:]+$", unit("Location crowd", "Crowd density at the location.", "clamp01(location.crowd)", S0, S1)),
    (r"^world:loc:safeHint:[^:]+$", unit("Safe-zone hint", "Prior that the location is a safe zone; multiplicatively damps danger.", "clamp01(location.safeZone)", S0, S1)),
    (r"^world:loc:normPressure:[^:]+$", unit("Norm pressure", "Social-norm pressure the location imposes.", "clamp01(location.normPressure)", S0, "stage3.threat, stage2.appraisal")),
    (r"^world:loc:intimacy:[^:]+$", unit("Location intimacy", "How intimate the setting is.", "clamp01(location.intimacy)", S0, S2)),
    (r"^world:map:cover:[^:]+$", unit("Map cover", "Available cover around the agent.", "clamp01(mapMetrics.cover)", S0, "stage1.context, stage2.appraisal")),
    (r"^world:map:danger:[^:]+$", unit("Map danger", "Static danger of the map cell.", "clamp01(mapMetrics.danger)", S0, "stage1.context, stage3.threat")),
    (r"^world:map:escape:[^:]+$", unit("Map escape", "Ease of escape from the current position.", "clamp01(mapMetrics.escape)", S0, "stage1.context, stage2.appraisal")),
    (r"^world:env:hazard:[^:]+$", unit("Environmental hazard", "Hazard present in the environment (fire, storm...).", "clamp01(location.hazard)", S0, "stage1.context, stage3.threat")),
    (r"^world:body:(fatigue|pain|stress):[^:]+$", unit("Body state", "Scene-supplied physiological level.", "clamp01(agent.body.*)", S0, S3)),
    (r"^world:scene:urgency:[^:]+$", unit("Scene urgency", "Time pressure of the current scenario.", "clamp01(scene.urgency)", S0, S3)),
    // --- Stage0: observation ---
    (r"^obs:nearby:[^:]+:[^:]+$", unit("Nearby", "Proximity of another agent.", "clamp01(1 - dist/r0)", S0, "stage3.threat")),
    (r"^obs:los:[^:]+:[^:]+$", unit("Line of sight", "How well the other agent can be seen.", "clamp01(0.65*visibility + 0.35*clamp01(1 - dist/Rs) - 0.30*crowd)", S0, "stage0.infoAdequacy, stage3.threat")),
    (r"^obs:audio:[^:]+:[^:]+$", unit("Audio", "How well the other agent can be heard.", "clamp01(0.75*(1 - dist/Rh) + 0.25*(1 - noise))", S0, "stage0.infoAdequacy, stage3.threat")),
    (r"^obs:infoAdequacy:[^:]+$", unit("Information adequacy", "Quality of available information about the surroundings.", "0.7*envQ + 0.3*socQ", S0, S1)),
    // --- External collaborators ---
    (r"^body:(fatigue|pain|stress):[^:]+$", unit("Physiology", "Physiological level from the body integrator.", "external", "physiology", S3)),
    (r"^tom:dyad:[^:]+:[^:]+:threat$", unit("ToM dyadic threat", "Belief that the other agent is hostile toward self.", "external", "theory-of-mind", S3)),
    (r"^tom:dyad:[^:]+:[^:]+:support$", unit("ToM dyadic support", "Belief that the other agent supports self.", "external", "theory-of-mind", S3)),
    (r"^tom:trustEff:[^:]+:[^:]+$", unit("Effective trust", "Effective trust toward the other agent.", "external (default 0.45)", "theory-of-mind", S3)),
    // --- Stage1 ---
    (r"^ctx:final:[^:]+:[^:]+$", unit("Subjective context axis", "Subjective variant of a context axis; preferred over the objective one.", "external", "override / subjective layer", "stage2.appraisal, stage3.threat")),
    (r"^ctx:privacy:[^:]+$", unit("Privacy", "Context privacy axis.", "privacy", S1, S2)),
    (r"^ctx:publicness:[^:]+$", unit("Publicness", "Inverse of privacy.", "1 - privacy", S1, "stage1.context, stage2.appraisal")),
    (r"^ctx:uncertainty:[^:]+$", unit("Uncertainty", "Lack of adequate information.", "1 - infoAdequacy", S1, "stage2.appraisal, stage3.threat")),
    (r"^ctx:surveillance:[^:]+$", unit("Surveillance", "Feeling of being watched or controlled.", "0.75*control + 0.25*publicness", S1, "stage3.threat")),
    (r"^ctx:crowd:[^:]+$", unit("Crowd", "Crowd density axis.", "crowd", S1, "stage3.threat")),
    (r"^ctx:danger:[^:]+$", unit("Danger", "Perceived physical danger, damped by the safe-zone prior.", "(0.65*max(mapDanger, hazard) + 0.20*(1-escape) + 0.15*(1-cover)) * (1 - 0.85*safeHint)", S1, "stage3.threat")),
    (r"^ctx:(normPressure|urgency|intimacy|control|cover|escape):[^:]+$", unit("Context input", "Externally supplied context axis.", "external", "override / collaborator", "stage2.appraisal, stage3.threat")),
    (r"^ctx:(loss|goalBlock):[^:]+$", unit("Goal signal", "Loss or goal blockage reported by the goal subsystem.", "external (default 0)", "goal subsystem", S2)),
    // --- Stage3 ---
    (r"^threat:env:[^:]+$", unit("Threat: environment", "Physical/environmental threat channel.", "max(mapDanger, hazard, ctxDanger)", S3, UI)),
    (r"^threat:soc:[^:]+$", unit("Threat: social", "Threat from other agents, compounded by noisy-OR.", "noisyOr(close * base*(1 - shield*S) * percept)", S3, UI)),
    (r"^threat:auth:[^:]+$", unit("Threat: authority", "Threat from control and norms.", "0.60*control + 0.40*normPressure", S3, UI)),
    (r"^threat:unc:[^:]+$", unit("Threat: uncertainty", "Threat from not knowing.", "ctx uncertainty", S3, UI)),
    (r"^threat:body:[^:]+$", unit("Threat: body", "Threat from the agent's own body state.", "max(fatigue, pain, stress)", S3, UI)),
    (r"^threat:sc:[^:]+$", unit("Threat: scenario", "Threat from scenario pressure.", "0.55*crowd + 0.45*urgency", S3, UI)),
    (r"^threat:final:[^:]+$", unit("Threat (final)", "Blended threat across all channels.", "sum(weight * channel)", S3, "stage2.appraisal, frame.panels")),
    (r"^mind:threat:[^:]+$", unit("Mind: threat", "Scoreboard mirror of final threat.", "threat:final", S3, UI)),
    (r"^mind:pressure:[^:]+$", unit("Mind: pressure", "Social pressure felt.", "0.5*surveillance + 0.2*normPressure", S3, UI)),
    (r"^mind:support:[^:]+$", unit("Mind: support", "Support available from nearby trusted agents.", "noisyOr(nearby * trust)", S3, UI)),
    (r"^mind:crowd:[^:]+$", unit("Mind: crowd", "Scoreboard mirror of crowd.", "ctx crowd", S3, UI)),
    // --- Stage2 ---
    (r"^app:(threat|uncertainty|loss|goalBlock):[^:]+$", unit("Appraisal input", "Pass-through appraisal of an upstream signal.", "upstream value", S2, S2)),
    (r"^app:control:[^:]+$", unit("Appraisal: control", "Sense of being able to cope.", "0.45*cover + 0.35*escape + 0.20*(1-uncertainty)", S2, S2)),
    (r"^app:pressure:[^:]+$", unit("Appraisal: pressure", "Normative pressure appraisal.", "0.65*normPressure + 0.35*publicness", S2, S2)),
    (r"^app:attachment:[^:]+$", unit("Appraisal: attachment", "Closeness of the social setting.", "0.75*intimacy + 0.25*(1-publicness)", S2, S2)),
    (r"^emo:fear:[^:]+$", unit("Fear", "Fear emotion.", "threat*(1-control)*(0.5+0.5*uncertainty)", S2, "decision")),
    (r"^emo:anger:[^:]+$", unit("Anger", "Anger emotion.", "threat*control*(1-uncertainty)*(1-pressure)", S2, "decision")),
    (r"^emo:shame:[^:]+$", unit("Shame", "Shame emotion.", "pressure*(0.6+0.4*threat)*(1-attachment)", S2, "decision")),
    (r"^emo:relief:[^:]+$", unit("Relief", "Relief emotion.", "(1-threat)*control*(1-goalBlock)", S2, "decision")),
    (r"^emo:resolve:[^:]+$", unit("Resolve", "Determination to act.", "0.55*control + 0.30*anger + 0.15*(1-uncertainty)", S2, "decision")),
    (r"^emo:care:[^:]+$", unit("Care", "Caring affect.", "attachment*(0.65+0.35*(1-threat))", S2, "decision")),
    (r"^emo:arousal:[^:]+$", unit("Arousal", "Activation level.", "0.60*threat + 0.20*uncertainty + 0.20*pressure", S2, "decision")),
    (
        r"^emo:valence:[^:]+$",
        AtomSpec {
            title: "Valence",
            meaning: "Overall pleasantness, signed. Consumers on a 0..1 scale convert with (v+1)/2.",
            scale: Scale::Signed,
            formula: "clamp(-1,1)((0.55*relief + 0.35*care) - (0.60*fear + 0.35*shame + 0.25*anger + 0.55*loss))",
            produced_by: S2,
            consumed_by: "decision",
        },
    ),
];

/// Immutable, ordered id-pattern → spec list.
pub struct AtomSpecRegistry {
    entries: Vec<(Regex, AtomSpec)>,
}

impl AtomSpecRegistry {
    /// Build from `(pattern, spec)` pairs, preserving order.
    pub fn from_entries<'a, I>(entries: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = (&'a str, AtomSpec)>,
    {
        let entries = entries
            .into_iter()
            .map(|(pattern, spec)| Regex::new(pattern).map(|re| (re, spec)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    /// The catalog covering every id family the pipeline and its
    /// collaborators produce.
    pub fn builtin() -> Self {
        Self::from_entries(BUILTIN.iter().copied()).expect("builtin atom spec patterns are valid")
    }

    /// First matching spec, if any.
    pub fn describe(&self, id: &str) -> Option<&AtomSpec> {
        self.entries
            .iter()
            .find(|(re, _)| re.is_match(id))
            .map(|(_, spec)| spec)
    }

    pub fn describe_or_unknown(&self, id: &str) -> AtomSpec {
        self.describe(id).copied().unwrap_or(AtomSpec::UNKNOWN)
    }

    /// Declared scale; ids without a spec are treated as 0..1.
    pub fn scale_of(&self, id: &str) -> Scale {
        self.describe(id).map(|s| s.scale).unwrap_or(Scale::Unit)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

static REGISTRY: LazyLock<AtomSpecRegistry> = LazyLock::new(AtomSpecRegistry::builtin);

/// Process-wide builtin catalog, constructed on first use.
pub fn registry() -> &'static AtomSpecRegistry {
    &REGISTRY
}
