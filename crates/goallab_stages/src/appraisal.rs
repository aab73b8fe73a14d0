//! Stage2: appraisal and emotion.
//!
//! Runs after Stage3: the threat appraisal reads `threat:final`. Every
//! emotion is in [0, 1] except valence, which is stored on −1..1.

use goallab_core::ids;
use goallab_core::{clamp01, Atom, Resolved, Trace, TracePart, WeightedMix};

use crate::reads::{pick_ctx_id, pick_ctx_or, Reads};

/// Map canonical valence (−1..1) onto 0..1.
pub fn valence_to_unit(v: f64) -> f64 {
    clamp01((v + 1.0) / 2.0)
}

/// Map a 0..1 valence onto the canonical −1..1 range.
pub fn valence_from_unit(u: f64) -> f64 {
    (2.0 * clamp01(u) - 1.0).clamp(-1.0, 1.0)
}

/// The appraisal vector emotions are computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Appraisal {
    pub threat: f64,
    pub uncertainty: f64,
    pub control: f64,
    pub pressure: f64,
    pub attachment: f64,
    pub loss: f64,
    pub goal_block: f64,
}

impl Appraisal {
    fn fields(&self) -> [(&'static str, f64); 7] {
        [
            ("threat", self.threat),
            ("uncertainty", self.uncertainty),
            ("control", self.control),
            ("pressure", self.pressure),
            ("attachment", self.attachment),
            ("loss", self.loss),
            ("goalBlock", self.goal_block),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Emotions {
    pub fear: f64,
    pub anger: f64,
    pub shame: f64,
    pub relief: f64,
    pub resolve: f64,
    pub care: f64,
    pub arousal: f64,
    /// −1..1
    pub valence: f64,
}

impl Emotions {
    pub fn from_appraisal(app: &Appraisal) -> Self {
        let Appraisal {
            threat,
            uncertainty,
            control,
            pressure,
            attachment,
            loss,
            goal_block,
        } = *app;

        let fear = clamp01(threat * (1.0 - control) * (0.5 + 0.5 * uncertainty));
        let anger = clamp01(threat * control * (1.0 - uncertainty) * (1.0 - pressure));
        let shame = clamp01(pressure * (0.6 + 0.4 * threat) * (1.0 - attachment));
        let relief = clamp01((1.0 - threat) * control * (1.0 - goal_block));
        let resolve = clamp01(0.55 * control + 0.30 * anger + 0.15 * (1.0 - uncertainty));
        let care = clamp01(attachment * (0.65 + 0.35 * (1.0 - threat)));
        let arousal = clamp01(0.60 * threat + 0.20 * uncertainty + 0.20 * pressure);

        let positive = 0.55 * relief + 0.35 * care;
        let negative = 0.60 * fear + 0.35 * shame + 0.25 * anger + 0.55 * loss;
        let valence = (positive - negative).clamp(-1.0, 1.0);

        Self {
            fear,
            anger,
            shame,
            relief,
            resolve,
            care,
            arousal,
            valence,
        }
    }

    pub fn fields(&self) -> [(&'static str, f64); 8] {
        [
            ("fear", self.fear),
            ("anger", self.anger),
            ("shame", self.shame),
            ("relief", self.relief),
            ("resolve", self.resolve),
            ("care", self.care),
            ("arousal", self.arousal),
            ("valence", self.valence),
        ]
    }
}

/// Derive `app:*` and `emo:*` atoms for `agent_id`.
///
/// Precondition: Stage3 has run. Without `threat:final` the threat appraisal
/// reads 0.
pub fn derive_appraisal(resolved: &Resolved, agent_id: &str) -> Vec<Atom> {
    let a = agent_id;
    let mut atoms = Vec::with_capacity(15);
    let mut app = Appraisal::default();

    let mut r = Reads::new(resolved);
    app.threat = clamp01(r.m(&ids::threat("final", a), 0.0));
    atoms.push(r.emit(ids::app("threat", a), app.threat, "app:threat", [TracePart::new("threat", app.threat)]));

    let mut r = Reads::new(resolved);
    app.uncertainty = clamp01(r.m(&pick_ctx_id(resolved, "uncertainty", a), 0.5));
    atoms.push(r.emit(
        ids::app("uncertainty", a),
        app.uncertainty,
        "app:uncertainty",
        [TracePart::new("uncertainty", app.uncertainty)],
    ));

    let mut r = Reads::new(resolved);
    let cover = r.m(&pick_ctx_or(resolved, "cover", a, ids::world_map("cover", a)), 0.0);
    let escape = r.m(&pick_ctx_or(resolved, "escape", a, ids::world_map("escape", a)), 0.5);
    let mix = WeightedMix::new()
        .part("cover", cover, 0.45)
        .part("escape", escape, 0.35)
        .part("certainty", 1.0 - app.uncertainty, 0.20);
    app.control = mix.value();
    atoms.push(r.emit(ids::app("control", a), app.control, "app:control", mix.into_parts()));

    let mut r = Reads::new(resolved);
    let norm = r.m(
        &pick_ctx_or(resolved, "normPressure", a, ids::world_loc("normPressure", a)),
        0.0,
    );
    let publicness = r.m(&pick_ctx_id(resolved, "publicness", a), 0.0);
    let mix = WeightedMix::new()
        .part("normPressure", norm, 0.65)
        .part("publicness", publicness, 0.35);
    app.pressure = mix.value();
    atoms.push(r.emit(ids::app("pressure", a), app.pressure, "app:pressure", mix.into_parts()));

    let mut r = Reads::new(resolved);
    let intimacy = r.m(
        &pick_ctx_or(resolved, "intimacy", a, ids::world_loc("intimacy", a)),
        0.0,
    );
    let publicness = r.m(&pick_ctx_id(resolved, "publicness", a), 0.0);
    let mix = WeightedMix::new()
        .part("intimacy", intimacy, 0.75)
        .part("privateness", 1.0 - publicness, 0.25);
    app.attachment = mix.value();
    atoms.push(r.emit(ids::app("attachment", a), app.attachment, "app:attachment", mix.into_parts()));

    let mut r = Reads::new(resolved);
    app.loss = clamp01(r.m(&pick_ctx_id(resolved, "loss", a), 0.0));
    atoms.push(r.emit(ids::app("loss", a), app.loss, "app:loss", [TracePart::new("loss", app.loss)]));

    let mut r = Reads::new(resolved);
    app.goal_block = clamp01(r.m(&pick_ctx_id(resolved, "goalBlock", a), 0.0));
    atoms.push(r.emit(
        ids::app("goalBlock", a),
        app.goal_block,
        "app:goalBlock",
        [TracePart::new("goalBlock", app.goal_block)],
    ));

    let app_conf = atoms.iter().map(|x| x.confidence).sum::<f64>() / atoms.len() as f64;
    let app_ids: Vec<String> = atoms.iter().map(|x| x.id.clone()).collect();
    let app_parts: Vec<TracePart> = app
        .fields()
        .iter()
        .map(|(name, v)| TracePart::new(*name, *v))
        .collect();

    let emotions = Emotions::from_appraisal(&app);
    for (name, value) in emotions.fields() {
        let trace = Trace::formula(format!("emo:{}", name))
            .used(app_ids.iter().cloned())
            .parts(app_parts.iter().cloned());
        atoms.push(Atom::derived(ids::emo(name, a), value, app_conf).with_trace(trace));
    }

    tracing::debug!(
        agent = %agent_id,
        fear = emotions.fear,
        valence = emotions.valence,
        "stage2 appraisal derived"
    );
    atoms
}
