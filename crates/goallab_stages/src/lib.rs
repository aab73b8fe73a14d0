//! # GoalLab Stages
//!
//! The per-tick derivation pipeline over an [`AtomBag`](goallab_core::AtomBag):
//!
//! - **Stage0** ([`sensing`]): raw scene → `world:*`, `obs:*`
//! - **Stage1** ([`context`]): → `ctx:*` axes
//! - **Stage3** ([`threat`]): ctx + obs + ToM → `threat:*`, `mind:*`
//! - **Stage2** ([`appraisal`]): threat + ctx → `app:*`, `emo:*`
//! - **Frame** ([`frame`]): runs the above in order and packages the result
//!
//! ## Ordering
//!
//! Each stage reads the resolved view produced by the stages before it.
//! Calling a stage early does not fail; it computes against defaults. The
//! frame assembler is the only place that enforces the order.
//!
//! Stage functions never return errors. Missing inputs fall back to
//! documented defaults and every output is saturated to its scale.

pub mod appraisal;
pub mod context;
pub mod frame;
mod reads;
pub mod sensing;
pub mod threat;

pub use appraisal::{derive_appraisal, valence_from_unit, valence_to_unit, Appraisal, Emotions};
pub use context::{danger_with_safe_zone, derive_context_axes};
pub use frame::{assemble_frame, Frame, FramePhase, Panels, RangeViolation};
pub use reads::{pick_ctx_id, pick_ctx_or, pick_first};
pub use sensing::{
    atomize_info_adequacy, atomize_observation, atomize_scene, atomize_self_state,
    atomize_world_location, Observation,
};
pub use threat::{derive_threat_stack, DyadThreat, ThreatChannels};
