//! Frame assembly: run the stages in order for one scene and package the
//! resolved atoms with summary panels.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use goallab_core::ids;
use goallab_core::{get_m, registry, Atom, AtomBag, AtomOrigin, PipelineConfig, Resolved, Scale, Scene};

use crate::appraisal::derive_appraisal;
use crate::context::derive_context_axes;
use crate::sensing::atomize_scene;
use crate::threat::derive_threat_stack;

/// Steps of one tick, in order. No branching, no retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FramePhase {
    Sensing,
    Context,
    Threat,
    Appraisal,
    Resolved,
}

impl FramePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            FramePhase::Sensing => "sensing",
            FramePhase::Context => "context",
            FramePhase::Threat => "threat",
            FramePhase::Appraisal => "appraisal",
            FramePhase::Resolved => "resolved",
        }
    }
}

impl fmt::Display for FramePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Panels
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CtxPanel {
    pub privacy: f64,
    pub publicness: f64,
    pub surveillance: f64,
    pub crowd: f64,
    pub uncertainty: f64,
    pub danger: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MindPanel {
    pub threat: f64,
    pub pressure: f64,
    pub support: f64,
    pub crowd: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ThreatPanel {
    pub env: f64,
    pub soc: f64,
    pub auth: f64,
    pub unc: f64,
    pub body: f64,
    pub sc: f64,
    #[serde(rename = "final")]
    pub final_: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EmoPanel {
    pub fear: f64,
    pub anger: f64,
    pub shame: f64,
    pub relief: f64,
    pub resolve: f64,
    pub care: f64,
    pub arousal: f64,
    pub valence: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Panels {
    pub ctx: CtxPanel,
    pub mind: MindPanel,
    pub threat: ThreatPanel,
    pub emo: EmoPanel,
}

impl Panels {
    /// Every field reads one specific resolved id, 0 if absent.
    pub fn from_resolved(resolved: &Resolved, a: &str) -> Self {
        let ctx = |axis| get_m(resolved, &ids::ctx(axis, a), 0.0);
        let mind = |axis| get_m(resolved, &ids::mind(axis, a), 0.0);
        let threat = |ch| get_m(resolved, &ids::threat(ch, a), 0.0);
        let emo = |axis| get_m(resolved, &ids::emo(axis, a), 0.0);

        Self {
            ctx: CtxPanel {
                privacy: ctx("privacy"),
                publicness: ctx("publicness"),
                surveillance: ctx("surveillance"),
                crowd: ctx("crowd"),
                uncertainty: ctx("uncertainty"),
                danger: ctx("danger"),
            },
            mind: MindPanel {
                threat: mind("threat"),
                pressure: mind("pressure"),
                support: mind("support"),
                crowd: mind("crowd"),
            },
            threat: ThreatPanel {
                env: threat("env"),
                soc: threat("soc"),
                auth: threat("auth"),
                unc: threat("unc"),
                body: threat("body"),
                sc: threat("sc"),
                final_: threat("final"),
            },
            emo: EmoPanel {
                fear: emo("fear"),
                anger: emo("anger"),
                shame: emo("shame"),
                relief: emo("relief"),
                resolve: emo("resolve"),
                care: emo("care"),
                arousal: emo("arousal"),
                valence: emo("valence"),
            },
        }
    }
}

// ============================================================================
// Frame
// ============================================================================

/// Snapshot of one agent at one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    /// Resolved atoms sorted by id
    pub atoms: Vec<Atom>,
    pub index: BTreeMap<String, Atom>,
    pub tick: u64,
    pub agent_id: String,
    pub panels: Panels,
}

/// Id and magnitude of an atom outside its catalog scale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeViolation {
    pub id: String,
    pub magnitude: f64,
    pub scale: Scale,
}

impl Frame {
    pub fn get(&self, id: &str) -> Option<&Atom> {
        self.index.get(id)
    }

    /// Magnitude of `id`, or `fallback` if the frame has no such atom.
    pub fn magnitude(&self, id: &str, fallback: f64) -> f64 {
        self.get(id).map_or(fallback, |a| a.magnitude)
    }

    /// Atoms whose magnitude falls outside the scale the catalog declares.
    pub fn range_violations(&self) -> Vec<RangeViolation> {
        let catalog = registry();
        self.atoms
            .iter()
            .filter_map(|atom| {
                let scale = catalog.scale_of(&atom.id);
                (!scale.contains(atom.magnitude)).then(|| RangeViolation {
                    id: atom.id.clone(),
                    magnitude: atom.magnitude,
                    scale,
                })
            })
            .collect()
    }

    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }

    fn package(resolved: Resolved, tick: u64, agent_id: &str) -> Self {
        let panels = Panels::from_resolved(&resolved, agent_id);
        let index: BTreeMap<String, Atom> = resolved.into_iter().collect();
        let atoms = index.values().cloned().collect();
        Self {
            atoms,
            index,
            tick,
            agent_id: agent_id.to_string(),
            panels,
        }
    }
}

fn run_phase<F>(phase: FramePhase, bag: &mut AtomBag, agent_id: &str, stage: F)
where
    F: FnOnce(&Resolved) -> Vec<Atom>,
{
    let span = tracing::debug_span!("stage", phase = %phase, agent = %agent_id);
    let _enter = span.enter();
    let atoms = stage(&bag.resolve());
    tracing::debug!(added = atoms.len(), "phase complete");
    bag.add_many(atoms);
}

/// A scene override in the override layer, its magnitude held to the
/// catalog scale of its id.
fn override_atom(atom: &Atom) -> Atom {
    let (lo, hi) = registry().scale_of(&atom.id).bounds();
    let mut atom = atom.clone().with_origin(AtomOrigin::Override);
    atom.magnitude = atom.magnitude.clamp(lo, hi);
    atom
}

/// Run every stage for `scene` and package the result.
///
/// Order: Stage0 sensing (plus scene overrides) → Stage1 context → external
/// atoms merged → Stage3 threat → Stage2 appraisal (if enabled) → resolve.
/// `external_atoms` carry ToM (`tom:*`) and physiology (`body:*`) signals and
/// keep their own origin.
pub fn assemble_frame(scene: &Scene, external_atoms: &[Atom], config: &PipelineConfig) -> Frame {
    let agent_id = scene.agent.id.as_str();
    let mut bag = AtomBag::new();

    {
        let span = tracing::debug_span!("stage", phase = %FramePhase::Sensing, agent = %agent_id);
        let _enter = span.enter();
        bag.add_many(atomize_scene(scene, &config.observation));
        bag.add_many(scene.overrides.iter().map(override_atom));
    }

    run_phase(FramePhase::Context, &mut bag, agent_id, |resolved| {
        derive_context_axes(resolved, agent_id)
    });

    bag.add_many(external_atoms.iter().cloned());

    let others = scene.other_ids();
    run_phase(FramePhase::Threat, &mut bag, agent_id, |resolved| {
        derive_threat_stack(resolved, agent_id, &others, &config.threat)
    });

    if config.appraisal {
        run_phase(FramePhase::Appraisal, &mut bag, agent_id, |resolved| {
            derive_appraisal(resolved, agent_id)
        });
    }

    let frame = Frame::package(bag.resolve(), scene.tick.unwrap_or(0), agent_id);
    tracing::debug!(
        phase = %FramePhase::Resolved,
        agent = %agent_id,
        atoms = frame.atoms.len(),
        world = bag.layer_len(AtomOrigin::World),
        obs = bag.layer_len(AtomOrigin::Obs),
        overrides = bag.layer_len(AtomOrigin::Override),
        derived = bag.layer_len(AtomOrigin::Derived),
        "frame assembled"
    );
    frame
}
