//! Structured atom ids.
//!
//! Ids are built from typed keys at construction time and rendered to the
//! `<namespace>:<axis...>:<subject>[:<target>][:<facet>]` string form. The
//! string form is what the bag and frames index by. [`AtomKey::parse`] goes the
//! other way for `goallab describe`.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AtomIdError {
    #[error("atom id is empty")]
    Empty,
    #[error("atom id '{0}' has no namespace separator")]
    MissingNamespace(String),
    #[error("atom id '{id}' has an empty segment at position {index}")]
    EmptySegment { id: String, index: usize },
}

/// Typed form of an atom id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AtomKey {
    pub namespace: String,
    pub axis: Vec<String>,
    /// The agent the atom is about (the observer for dyadic atoms).
    pub subject: String,
    /// The other agent of a dyadic atom.
    pub target: Option<String>,
    /// Trailing qualifier after the dyad (`threat` in `tom:dyad:a:b:threat`).
    pub facet: Option<String>,
}

impl AtomKey {
    /// `<ns>:<axis...>:<agent>`
    pub fn agent(namespace: &str, axis: &[&str], agent: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            axis: axis.iter().map(|s| s.to_string()).collect(),
            subject: agent.to_string(),
            target: None,
            facet: None,
        }
    }

    /// `<ns>:<axis...>:<self>:<other>`
    pub fn dyad(namespace: &str, axis: &[&str], subject: &str, target: &str) -> Self {
        Self {
            target: Some(target.to_string()),
            ..Self::agent(namespace, axis, subject)
        }
    }

    pub fn with_facet(mut self, facet: &str) -> Self {
        self.facet = Some(facet.to_string());
        self
    }

    pub fn id(&self) -> String {
        self.to_string()
    }

    /// Recover a key from a string id.
    ///
    /// Dyadic layouts are recognised for `obs:<axis>:<a>:<b>`,
    /// `tom:dyad:<a>:<b>:<facet>` and `tom:<axis>:<a>:<b>`; every other id
    /// takes its last segment as the subject.
    pub fn parse(id: &str) -> Result<Self, AtomIdError> {
        if id.is_empty() {
            return Err(AtomIdError::Empty);
        }
        let segments: Vec<&str> = id.split(':').collect();
        if segments.len() < 2 {
            return Err(AtomIdError::MissingNamespace(id.to_string()));
        }
        if let Some(index) = segments.iter().position(|s| s.is_empty()) {
            return Err(AtomIdError::EmptySegment {
                id: id.to_string(),
                index,
            });
        }

        let ns = segments[0];
        let rest = &segments[1..];
        let key = match (ns, rest) {
            ("tom", ["dyad", a, b, facet]) => Self::dyad(ns, &["dyad"], a, b).with_facet(facet),
            ("tom", [axis, a, b]) | ("obs", [axis, a, b]) => Self::dyad(ns, &[*axis], a, b),
            _ => match rest.split_last() {
                Some((subject, axis)) => Self::agent(ns, axis, subject),
                None => return Err(AtomIdError::MissingNamespace(id.to_string())),
            },
        };
        Ok(key)
    }
}

impl fmt::Display for AtomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.namespace)?;
        for segment in &self.axis {
            write!(f, ":{}", segment)?;
        }
        write!(f, ":{}", self.subject)?;
        if let Some(target) = &self.target {
            write!(f, ":{}", target)?;
        }
        if let Some(facet) = &self.facet {
            write!(f, ":{}", facet)?;
        }
        Ok(())
    }
}

// =============================================================================
// Id families used by the pipeline
// =============================================================================

pub fn world_loc(axis: &str, agent: &str) -> String {
    AtomKey::agent("world", &["loc", axis], agent).id()
}

pub fn world_map(axis: &str, agent: &str) -> String {
    AtomKey::agent("world", &["map", axis], agent).id()
}

pub fn world_env(axis: &str, agent: &str) -> String {
    AtomKey::agent("world", &["env", axis], agent).id()
}

pub fn world_body(axis: &str, agent: &str) -> String {
    AtomKey::agent("world", &["body", axis], agent).id()
}

pub fn world_scene(axis: &str, agent: &str) -> String {
    AtomKey::agent("world", &["scene", axis], agent).id()
}

/// Physiology collaborator output.
pub fn body(axis: &str, agent: &str) -> String {
    AtomKey::agent("body", &[axis], agent).id()
}

pub fn obs_agent(axis: &str, agent: &str) -> String {
    AtomKey::agent("obs", &[axis], agent).id()
}

pub fn obs_dyad(axis: &str, agent: &str, other: &str) -> String {
    AtomKey::dyad("obs", &[axis], agent, other).id()
}

pub fn ctx(axis: &str, agent: &str) -> String {
    AtomKey::agent("ctx", &[axis], agent).id()
}

/// Subjective override of a context axis.
pub fn ctx_final(axis: &str, agent: &str) -> String {
    AtomKey::agent("ctx", &["final", axis], agent).id()
}

pub fn threat(channel: &str, agent: &str) -> String {
    AtomKey::agent("threat", &[channel], agent).id()
}

pub fn mind(axis: &str, agent: &str) -> String {
    AtomKey::agent("mind", &[axis], agent).id()
}

pub fn app(axis: &str, agent: &str) -> String {
    AtomKey::agent("app", &[axis], agent).id()
}

pub fn emo(axis: &str, agent: &str) -> String {
    AtomKey::agent("emo", &[axis], agent).id()
}

/// `tom:dyad:<self>:<other>:<facet>`
pub fn tom_dyad(agent: &str, other: &str, facet: &str) -> String {
    AtomKey::dyad("tom", &["dyad"], agent, other).with_facet(facet).id()
}

/// `tom:trustEff:<self>:<other>`
pub fn tom_trust_eff(agent: &str, other: &str) -> String {
    AtomKey::dyad("tom", &["trustEff"], agent, other).id()
}
