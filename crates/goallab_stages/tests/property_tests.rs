//! Property-based tests for the goallab stages.
//!
//! Random scenes go through the full frame assembler; every derived atom
//! must stay on its declared scale and identical input must give identical
//! output.

use goallab_core::{
    Atom, AgentRef, AtomOrigin, BodyState, LocationRecord, MapMetrics, PipelineConfig, Position, Scale,
    Scene, ThreatWeights,
};
use goallab_stages::{assemble_frame, danger_with_safe_zone, Appraisal, Emotions, ThreatChannels};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn unit() -> impl Strategy<Value = f64> {
    0.0f64..=1.0
}

fn opt_unit() -> impl Strategy<Value = Option<f64>> {
    prop::option::of(unit())
}

/// Includes out-of-range values; stages saturate them.
fn wild() -> impl Strategy<Value = Option<f64>> {
    prop::option::of(-2.0f64..=3.0)
}

fn arb_pos() -> impl Strategy<Value = Position> {
    (-20.0f64..20.0, -20.0f64..20.0).prop_map(|(x, y)| Position::new(x, y))
}

fn arb_location() -> impl Strategy<Value = LocationRecord> {
    (
        (wild(), wild(), wild(), opt_unit(), opt_unit()),
        (wild(), opt_unit(), wild(), opt_unit()),
    )
        .prop_map(
            |((privacy, control, crowd, visibility, noise), (hazard, safe_zone, norm_pressure, intimacy))| {
                LocationRecord {
                    privacy,
                    control,
                    crowd,
                    visibility,
                    noise,
                    hazard,
                    safe_zone,
                    norm_pressure,
                    intimacy,
                }
            },
        )
}

fn arb_scene() -> impl Strategy<Value = Scene> {
    (
        arb_pos(),
        arb_location(),
        prop::collection::vec(arb_pos(), 0..5),
        prop::option::of((wild(), wild(), wild())),
        prop::option::of((opt_unit(), opt_unit(), opt_unit())),
        wild(),
    )
        .prop_map(|(pos, location, others, metrics, body, urgency)| Scene {
            agent: AgentRef {
                id: "a".to_string(),
                pos,
                body: body.map(|(fatigue, pain, stress)| BodyState {
                    fatigue,
                    pain,
                    stress,
                }),
            },
            location,
            other_agents: others
                .into_iter()
                .enumerate()
                .map(|(i, p)| AgentRef::new(format!("o{}", i), p))
                .collect(),
            map_metrics: metrics.map(|(cover, danger, escape)| MapMetrics { cover, danger, escape }),
            overrides: Vec::new(),
            tick: Some(1),
            urgency,
        })
}

fn arb_tom() -> impl Strategy<Value = Vec<Atom>> {
    prop::collection::vec((0usize..5, 0usize..3, unit()), 0..8).prop_map(|entries| {
        entries
            .into_iter()
            .map(|(i, kind, v)| {
                let id = match kind {
                    0 => format!("tom:dyad:a:o{}:threat", i),
                    1 => format!("tom:dyad:a:o{}:support", i),
                    _ => format!("tom:trustEff:a:o{}", i),
                };
                Atom::derived(id, v, 1.0)
            })
            .collect()
    })
}

fn arb_appraisal() -> impl Strategy<Value = Appraisal> {
    (unit(), unit(), unit(), unit(), unit(), unit(), unit()).prop_map(
        |(threat, uncertainty, control, pressure, attachment, loss, goal_block)| Appraisal {
            threat,
            uncertainty,
            control,
            pressure,
            attachment,
            loss,
            goal_block,
        },
    )
}

// ============================================================================
// Pipeline Properties
// ============================================================================

proptest! {
    /// **Clamp property**: every stage output is in [0, 1], valence in [−1, 1].
    #[test]
    fn frame_outputs_stay_on_scale(scene in arb_scene(), tom in arb_tom()) {
        let frame = assemble_frame(&scene, &tom, &PipelineConfig::default());
        for atom in &frame.atoms {
            if atom.origin != AtomOrigin::Derived && atom.origin != AtomOrigin::Obs {
                continue;
            }
            let scale = if atom.id.starts_with("emo:valence:") { Scale::Signed } else { Scale::Unit };
            prop_assert!(
                scale.contains(atom.magnitude),
                "{} = {} outside {:?}", atom.id, atom.magnitude, scale
            );
            prop_assert!((0.0..=1.0).contains(&atom.confidence), "{} confidence {}", atom.id, atom.confidence);
        }
        prop_assert!(frame.range_violations().is_empty(), "{:?}", frame.range_violations());
    }

    /// **Determinism**: identical inputs serialize to identical frames.
    #[test]
    fn frame_is_deterministic(scene in arb_scene(), tom in arb_tom()) {
        let config = PipelineConfig::default();
        let a = assemble_frame(&scene, &tom, &config).to_json(false).unwrap();
        let b = assemble_frame(&scene, &tom, &config).to_json(false).unwrap();
        prop_assert_eq!(a, b);
    }

    /// Every derived atom explains itself.
    #[test]
    fn derived_atoms_carry_traces(scene in arb_scene()) {
        let frame = assemble_frame(&scene, &[], &PipelineConfig::default());
        for atom in frame.atoms.iter().filter(|a| a.origin == AtomOrigin::Derived) {
            let trace = atom.trace.as_ref();
            prop_assert!(trace.is_some(), "{} has no trace", atom.id);
            prop_assert!(trace.and_then(|t| t.formula_id.as_ref()).is_some(), "{} has no formula id", atom.id);
        }
    }

    /// Raising a dyad's ToM threat never lowers social threat.
    #[test]
    fn soc_threat_monotone_in_dyad_threat(scene in arb_scene(), lo in unit(), hi in unit()) {
        prop_assume!(!scene.other_agents.is_empty());
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        let config = PipelineConfig::default();
        let at = |v: f64| {
            let tom = [Atom::derived("tom:dyad:a:o0:threat", v, 1.0)];
            assemble_frame(&scene, &tom, &config).panels.threat.soc
        };
        prop_assert!(at(hi) >= at(lo) - 1e-12);
    }
}

// ============================================================================
// Formula Properties
// ============================================================================

proptest! {
    #[test]
    fn emotions_on_scale(app in arb_appraisal()) {
        let e = Emotions::from_appraisal(&app);
        for (name, v) in e.fields() {
            let scale = if name == "valence" { Scale::Signed } else { Scale::Unit };
            prop_assert!(scale.contains(v), "{} = {}", name, v);
        }
    }

    /// Safe zone only ever attenuates danger.
    #[test]
    fn safe_zone_never_raises_danger(raw in unit(), safe in unit()) {
        prop_assert!(danger_with_safe_zone(raw, safe) <= raw + 1e-12);
    }

    /// With default weights the final threat is bounded by the worst channel.
    #[test]
    fn final_threat_bounded_by_max_channel(
        env in unit(), soc in unit(), auth in unit(), unc in unit(), body in unit(), sc in unit(),
    ) {
        let ch = ThreatChannels { env, soc, auth, unc, body, sc };
        let max = [env, soc, auth, unc, body, sc].into_iter().fold(0.0, f64::max);
        let v = ch.blend(&ThreatWeights::default()).value();
        prop_assert!(v <= max + 1e-9, "final {} > max channel {}", v, max);
    }
}

// ============================================================================
// Worked examples
// ============================================================================

#[test]
fn end_to_end_observation_literals() {
    let scene = Scene::from_json(
        r#"{
            "agent": {"id": "a", "pos": [0, 0]},
            "location": {"visibility": 0.7, "crowd": 0.3, "noise": 0.2},
            "otherAgents": [{"id": "b", "pos": {"x": 3, "y": 0}}]
        }"#,
    )
    .unwrap();
    let frame = assemble_frame(&scene, &[], &PipelineConfig::default());
    assert!((frame.magnitude("obs:nearby:a:b", -1.0) - 0.4).abs() < 1e-9);
    assert!((frame.magnitude("obs:los:a:b", -1.0) - 0.58375).abs() < 1e-9);
    assert!((frame.magnitude("obs:audio:a:b", -1.0) - 0.725).abs() < 1e-9);
    assert_eq!(frame.tick, 0);
}

#[test]
fn safe_zone_attenuation_literals() {
    assert!((danger_with_safe_zone(0.8, 0.0) - 0.8).abs() < 1e-9);
    assert!((danger_with_safe_zone(0.8, 1.0) - 0.12).abs() < 1e-9);
}
