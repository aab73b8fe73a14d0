//! Stage1: context axes.
//!
//! Reads the Stage0-resolved view and emits `ctx:*` atoms. Precondition:
//! Stage0 atoms are already in the bag; otherwise every axis is computed from
//! defaults.

use goallab_core::ids;
use goallab_core::{clamp01, Atom, Resolved, TracePart, WeightedMix};

use crate::reads::Reads;

/// Attenuation applied to danger at a fully safe location.
pub const SAFE_ZONE_DAMPING: f64 = 0.85;

/// Danger before and after safe-zone attenuation.
pub fn danger_with_safe_zone(raw: f64, safe_hint: f64) -> f64 {
    clamp01(raw * (1.0 - SAFE_ZONE_DAMPING * safe_hint))
}

/// Derive `ctx:{privacy,publicness,uncertainty,surveillance,crowd,danger}:{a}`.
pub fn derive_context_axes(resolved: &Resolved, agent_id: &str) -> Vec<Atom> {
    let a = agent_id;
    let privacy_id = ids::world_loc("privacy", a);

    let mut atoms = Vec::with_capacity(6);

    let mut r = Reads::new(resolved);
    let privacy = r.m(&privacy_id, 0.0);
    atoms.push(r.emit(
        ids::ctx("privacy", a),
        clamp01(privacy),
        "ctx:privacy",
        [TracePart::new("privacy", privacy)],
    ));

    let mut r = Reads::new(resolved);
    let publicness = 1.0 - r.m(&privacy_id, 0.0);
    atoms.push(r.emit(
        ids::ctx("publicness", a),
        clamp01(publicness),
        "ctx:publicness",
        [TracePart::weighted("privacy", 1.0 - publicness, -1.0)],
    ));

    let mut r = Reads::new(resolved);
    let info = r.m(&ids::obs_agent("infoAdequacy", a), 0.5);
    atoms.push(r.emit(
        ids::ctx("uncertainty", a),
        clamp01(1.0 - info),
        "ctx:uncertainty",
        [TracePart::weighted("infoAdequacy", info, -1.0)],
    ));

    let mut r = Reads::new(resolved);
    let control = r.m(&ids::world_loc("control", a), 0.0);
    let publicness = 1.0 - r.m(&privacy_id, 0.0);
    let mix = WeightedMix::new()
        .part("control", control, 0.75)
        .part("publicness", publicness, 0.25);
    atoms.push(r.emit(
        ids::ctx("surveillance", a),
        mix.value(),
        "ctx:surveillance",
        mix.into_parts(),
    ));

    let mut r = Reads::new(resolved);
    let crowd = r.m(&ids::world_loc("crowd", a), 0.0);
    atoms.push(r.emit(
        ids::ctx("crowd", a),
        clamp01(crowd),
        "ctx:crowd",
        [TracePart::new("crowd", crowd)],
    ));

    let mut r = Reads::new(resolved);
    let map_danger = r.m(&ids::world_map("danger", a), 0.0);
    let hazard = r.m(&ids::world_env("hazard", a), 0.0);
    let escape = r.m(&ids::world_map("escape", a), 0.5);
    let cover = r.m(&ids::world_map("cover", a), 0.0);
    let safe_hint = r.m(&ids::world_loc("safeHint", a), 0.0);
    let mix = WeightedMix::new()
        .part("hazard", map_danger.max(hazard), 0.65)
        .part("noEscape", 1.0 - escape, 0.20)
        .part("noCover", 1.0 - cover, 0.15);
    let danger = danger_with_safe_zone(mix.raw(), clamp01(safe_hint));
    let mut parts = mix.into_parts();
    parts.push(TracePart::weighted("safeHint", safe_hint, -SAFE_ZONE_DAMPING));
    atoms.push(r.emit(ids::ctx("danger", a), danger, "ctx:danger", parts));

    tracing::debug!(agent = %agent_id, atoms = atoms.len(), "stage1 context derived");
    atoms
}
