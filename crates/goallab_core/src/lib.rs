//! # GoalLab Core
//!
//! Shared vocabulary for the per-tick signal pipeline:
//!
//! - **Atoms**: named scalar signals `{magnitude, confidence, origin, trace}`
//! - **AtomBag**: one layer per origin, merged by fixed priority on `resolve()`
//! - **Scene**: the raw input a tick is computed from
//! - **Config**: tunable observation radii, threat weights and social params
//! - **Catalog**: human-readable specs for atom ids (debug tooling only)
//!
//! Everything here is synchronous and allocation-light; stages live in
//! `goallab_stages`.

pub mod atom;
pub mod bag;
pub mod catalog;
pub mod config;
pub mod ids;
pub mod math;
pub mod scene;

pub use atom::{Atom, AtomOrigin, Trace, TracePart};
pub use bag::{get_c, get_m, AtomBag, Resolved};
pub use catalog::{registry, AtomSpec, AtomSpecRegistry, Scale};
pub use config::{ObservationParams, PipelineConfig, SocialParams, ThreatParams, ThreatWeights};
pub use ids::{AtomIdError, AtomKey};
pub use math::{clamp01, noisy_or, WeightedMix};
pub use scene::{AgentRef, BodyState, EnvDescriptor, LocationRecord, MapMetrics, Position, Scene, SceneError};
