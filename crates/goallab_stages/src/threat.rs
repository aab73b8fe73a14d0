//! Stage3: threat stack.
//!
//! Six channels (`env`, `soc`, `auth`, `unc`, `body`, `sc`) blended into
//! `threat:final`, plus the `mind:*` mirrors. Reads ctx axes (Stage1), obs
//! atoms (Stage0) and, when present, ToM and physiology atoms supplied from
//! outside the pipeline.

use std::collections::HashSet;

use goallab_core::ids;
use goallab_core::{
    clamp01, noisy_or, Atom, Resolved, SocialParams, ThreatParams, ThreatWeights, Trace, TracePart,
    WeightedMix,
};

use crate::reads::{pick_ctx_id, pick_ctx_or, pick_first, Reads};

/// Per-channel threat, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ThreatChannels {
    pub env: f64,
    pub soc: f64,
    pub auth: f64,
    pub unc: f64,
    pub body: f64,
    pub sc: f64,
}

impl ThreatChannels {
    pub const NAMES: [&'static str; 6] = ["env", "soc", "auth", "unc", "body", "sc"];

    /// Weighted blend. Weights are used as given, never renormalized.
    pub fn blend(&self, weights: &ThreatWeights) -> WeightedMix {
        WeightedMix::new()
            .part("env", self.env, weights.env)
            .part("soc", self.soc, weights.soc)
            .part("auth", self.auth, weights.auth)
            .part("unc", self.unc, weights.unc)
            .part("body", self.body, weights.body)
            .part("sc", self.sc, weights.sc)
    }
}

/// Social threat one other agent contributes.
#[derive(Debug, Clone, PartialEq)]
pub struct DyadThreat {
    pub other_id: String,
    pub percept: f64,
    pub base: f64,
    pub shield: f64,
    pub value: f64,
}

/// `t = clamp01(close · base · (1 − shieldStrength · shield) · percept)`.
/// ToM dyad atoms win over the trust fallback for both base and shield.
fn dyad_threat(r: &mut Reads<'_>, agent_id: &str, other_id: &str, social: &SocialParams) -> DyadThreat {
    let close = r.m(&ids::obs_dyad("nearby", agent_id, other_id), 0.0);
    let los = r.m(&ids::obs_dyad("los", agent_id, other_id), 0.0);
    let aud = r.m(&ids::obs_dyad("audio", agent_id, other_id), 0.0);
    let percept = clamp01(social.w_los * los + social.w_aud * aud);

    let threat_id = ids::tom_dyad(agent_id, other_id, "threat");
    let support_id = ids::tom_dyad(agent_id, other_id, "support");
    let trust_id = ids::tom_trust_eff(agent_id, other_id);

    let base = if r.has(&threat_id) {
        r.m(&threat_id, 0.0)
    } else {
        let trust = r.m(&trust_id, social.trust_default);
        social.baseline_hostility + (1.0 - trust) * 0.75
    };
    let shield = if r.has(&support_id) {
        r.m(&support_id, 0.0)
    } else {
        r.m(&trust_id, social.trust_default)
    };

    let effective = base * (1.0 - social.shield_strength * shield);
    DyadThreat {
        other_id: other_id.to_string(),
        percept,
        base,
        shield,
        value: clamp01(close * effective * percept),
    }
}

/// Derive every `threat:*` and `mind:*` atom for `agent_id`.
///
/// `others` are the other agents' ids; the agent itself is skipped if listed
/// and repeated ids count once, at their first position.
pub fn derive_threat_stack(
    resolved: &Resolved,
    agent_id: &str,
    others: &[String],
    params: &ThreatParams,
) -> Vec<Atom> {
    let a = agent_id;
    let mut seen = HashSet::new();
    let others: Vec<&str> = others
        .iter()
        .map(String::as_str)
        .filter(|o| *o != a && seen.insert(*o))
        .collect();
    let mut atoms = Vec::with_capacity(11);
    let mut channels = ThreatChannels::default();

    // env
    let mut r = Reads::new(resolved);
    let map_danger = r.m(&ids::world_map("danger", a), 0.0);
    let hazard = r.m(&ids::world_env("hazard", a), 0.0);
    let ctx_danger = r.m(&pick_ctx_id(resolved, "danger", a), 0.0);
    channels.env = clamp01(map_danger.max(hazard).max(ctx_danger));
    atoms.push(r.emit(
        ids::threat("env", a),
        channels.env,
        "threat:env",
        [
            TracePart::new("mapDanger", map_danger),
            TracePart::new("hazard", hazard),
            TracePart::new("ctxDanger", ctx_danger),
        ],
    ));

    // soc
    let mut r = Reads::new(resolved);
    let dyads: Vec<DyadThreat> = others
        .iter()
        .map(|b| dyad_threat(&mut r, a, b, &params.social))
        .collect();
    channels.soc = noisy_or(dyads.iter().map(|d| d.value));
    for d in &dyads {
        tracing::trace!(other = %d.other_id, base = d.base, shield = d.shield, t = d.value, "dyad threat");
    }
    atoms.push(r.emit(
        ids::threat("soc", a),
        channels.soc,
        "threat:soc",
        dyads.iter().map(|d| TracePart::new(d.other_id.clone(), d.value)),
    ));

    // auth
    let mut r = Reads::new(resolved);
    let control = r.m(&pick_ctx_or(resolved, "control", a, ids::world_loc("control", a)), 0.0);
    let norm = r.m(
        &pick_ctx_or(resolved, "normPressure", a, ids::world_loc("normPressure", a)),
        0.0,
    );
    let mix = WeightedMix::new().part("control", control, 0.60).part("normPressure", norm, 0.40);
    channels.auth = mix.value();
    atoms.push(r.emit(ids::threat("auth", a), channels.auth, "threat:auth", mix.into_parts()));

    // unc
    let mut r = Reads::new(resolved);
    let unc = r.m(&pick_ctx_id(resolved, "uncertainty", a), 0.0);
    channels.unc = clamp01(unc);
    atoms.push(r.emit(
        ids::threat("unc", a),
        channels.unc,
        "threat:unc",
        [TracePart::new("uncertainty", unc)],
    ));

    // body
    let mut r = Reads::new(resolved);
    let body_parts: Vec<TracePart> = ["fatigue", "pain", "stress"]
        .iter()
        .map(|x| {
            let id = pick_first(resolved, &[ids::body(x, a), ids::world_body(x, a)]);
            TracePart::new(*x, r.m(&id, 0.0))
        })
        .collect();
    channels.body = clamp01(body_parts.iter().map(|p| p.value).fold(0.0, f64::max));
    atoms.push(r.emit(ids::threat("body", a), channels.body, "threat:body", body_parts));

    // sc
    let mut r = Reads::new(resolved);
    let crowd = r.m(&pick_ctx_or(resolved, "crowd", a, ids::world_loc("crowd", a)), 0.0);
    let urgency = r.m(
        &pick_ctx_or(resolved, "urgency", a, ids::world_scene("urgency", a)),
        0.0,
    );
    let mix = WeightedMix::new().part("crowd", crowd, 0.55).part("urgency", urgency, 0.45);
    channels.sc = mix.value();
    atoms.push(r.emit(ids::threat("sc", a), channels.sc, "threat:sc", mix.into_parts()));

    // final
    let channel_conf = atoms.iter().map(|x| x.confidence).sum::<f64>() / atoms.len() as f64;
    let mix = channels.blend(&params.weights);
    let final_threat = mix.value();
    let final_atom = Atom::derived(ids::threat("final", a), final_threat, channel_conf).with_trace(
        Trace::formula("threat:final")
            .used(ThreatChannels::NAMES.iter().map(|c| ids::threat(c, a)))
            .parts(mix.into_parts()),
    );
    atoms.push(final_atom);

    atoms.extend(derive_mind(resolved, a, &others, final_threat, channel_conf, &params.social));

    tracing::debug!(
        agent = %agent_id,
        others = others.len(),
        threat = final_threat,
        soc = channels.soc,
        "stage3 threat derived"
    );
    atoms
}

fn derive_mind(
    resolved: &Resolved,
    a: &str,
    others: &[&str],
    final_threat: f64,
    final_conf: f64,
    social: &SocialParams,
) -> Vec<Atom> {
    let mut atoms = Vec::with_capacity(4);

    atoms.push(
        Atom::derived(ids::mind("threat", a), final_threat, final_conf).with_trace(
            Trace::formula("mind:threat")
                .used([ids::threat("final", a)])
                .part(TracePart::new("final", final_threat)),
        ),
    );

    let mut r = Reads::new(resolved);
    let surveillance = r.m(&pick_ctx_id(resolved, "surveillance", a), 0.0);
    let norm = r.m(
        &pick_ctx_or(resolved, "normPressure", a, ids::world_loc("normPressure", a)),
        0.0,
    );
    let mix = WeightedMix::new()
        .part("surveillance", surveillance, 0.5)
        .part("normPressure", norm, 0.2);
    atoms.push(r.emit(ids::mind("pressure", a), mix.value(), "mind:pressure", mix.into_parts()));

    let mut r = Reads::new(resolved);
    let support_terms: Vec<TracePart> = others
        .iter()
        .map(|b| {
            let nearby = r.m(&ids::obs_dyad("nearby", a, b), 0.0);
            let trust = r.m(&ids::tom_trust_eff(a, b), social.trust_default);
            TracePart::new(*b, nearby * trust)
        })
        .collect();
    let support = noisy_or(support_terms.iter().map(|p| p.value));
    atoms.push(r.emit(ids::mind("support", a), support, "mind:support", support_terms));

    let mut r = Reads::new(resolved);
    let crowd = r.m(&pick_ctx_id(resolved, "crowd", a), 0.0);
    atoms.push(r.emit(
        ids::mind("crowd", a),
        clamp01(crowd),
        "mind:crowd",
        [TracePart::new("crowd", crowd)],
    ));

    atoms
}
