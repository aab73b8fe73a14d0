//! Scene input: the raw per-tick data Stage0 atomizes.
//!
//! Every field except the agent id is optional. Missing values are not
//! errors; they become documented defaults further down the pipeline.

use crate::atom::Atom;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("failed to read scene file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid scene json: {0}")]
    Parse(#[from] serde_json::Error),
}

/// 2D position. Accepts `[x, y]` or `{"x": .., "y": ..}` on input.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "PositionRepr")]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PositionRepr {
    Pair([f64; 2]),
    Named { x: f64, y: f64 },
}

impl From<PositionRepr> for Position {
    fn from(repr: PositionRepr) -> Self {
        match repr {
            PositionRepr::Pair([x, y]) => Position { x, y },
            PositionRepr::Named { x, y } => Position { x, y },
        }
    }
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Physiological snapshot of the scene's agent (0..1 each).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyState {
    pub fatigue: Option<f64>,
    pub pain: Option<f64>,
    pub stress: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentRef {
    pub id: String,
    #[serde(default)]
    pub pos: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<BodyState>,
}

impl AgentRef {
    pub fn new(id: impl Into<String>, pos: Position) -> Self {
        Self {
            id: id.into(),
            pos,
            body: None,
        }
    }
}

/// Location record. Doubles as the environment descriptor for sensing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    pub privacy: Option<f64>,
    pub control: Option<f64>,
    pub crowd: Option<f64>,
    pub visibility: Option<f64>,
    pub noise: Option<f64>,
    pub hazard: Option<f64>,
    pub safe_zone: Option<f64>,
    pub norm_pressure: Option<f64>,
    pub intimacy: Option<f64>,
}

impl LocationRecord {
    /// Environment descriptor used by the observation model.
    /// Defaults: visibility 1, crowd 0, noise 0.
    pub fn env(&self) -> EnvDescriptor {
        EnvDescriptor {
            visibility: self.visibility.unwrap_or(1.0),
            crowd: self.crowd.unwrap_or(0.0),
            noise: self.noise.unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvDescriptor {
    pub visibility: f64,
    pub crowd: f64,
    pub noise: f64,
}

impl Default for EnvDescriptor {
    fn default() -> Self {
        Self {
            visibility: 1.0,
            crowd: 0.0,
            noise: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapMetrics {
    pub cover: Option<f64>,
    pub danger: Option<f64>,
    pub escape: Option<f64>,
}

/// One tick of raw input for one agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub agent: AgentRef,
    #[serde(default)]
    pub location: LocationRecord,
    #[serde(default)]
    pub other_agents: Vec<AgentRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_metrics: Option<MapMetrics>,
    /// Scripted atoms; always land in the override layer.
    #[serde(default)]
    pub overrides: Vec<Atom>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tick: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<f64>,
}

impl Scene {
    pub fn from_json(json: &str) -> Result<Self, SceneError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SceneError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SceneError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Distinct ids of the other agents, in first-seen order. The scene's own
    /// agent is left out.
    pub fn other_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.other_agents
            .iter()
            .filter(|a| a.id != self.agent.id && seen.insert(a.id.as_str()))
            .map(|a| a.id.clone())
            .collect()
    }
}
