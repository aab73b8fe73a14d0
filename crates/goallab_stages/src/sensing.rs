//! Stage0: sensing atomizers.
//!
//! Pure functions from raw scene data to `world:*` and `obs:*` atoms. Nothing
//! here reads the bag; nothing is resolved yet when Stage0 runs.

use std::collections::HashSet;

use goallab_core::ids;
use goallab_core::{
    clamp01, AgentRef, Atom, BodyState, EnvDescriptor, LocationRecord, MapMetrics,
    ObservationParams, Scene, Trace, TracePart, WeightedMix,
};

/// Location and map metrics as `world:loc:*`, `world:map:*` (always emitted,
/// default 0) plus the optional `world:env:hazard`, `world:loc:safeHint`,
/// `world:loc:normPressure` and `world:loc:intimacy`.
pub fn atomize_world_location(
    agent_id: &str,
    location: &LocationRecord,
    map_metrics: Option<&MapMetrics>,
) -> Vec<Atom> {
    let field = |v: Option<f64>| clamp01(v.unwrap_or(0.0));
    let map = map_metrics.cloned().unwrap_or_default();

    let mut atoms = vec![
        Atom::world(ids::world_loc("privacy", agent_id), field(location.privacy)),
        Atom::world(ids::world_loc("control", agent_id), field(location.control)),
        Atom::world(ids::world_loc("crowd", agent_id), field(location.crowd)),
        Atom::world(ids::world_map("cover", agent_id), field(map.cover)),
        Atom::world(ids::world_map("danger", agent_id), field(map.danger)),
        Atom::world(ids::world_map("escape", agent_id), field(map.escape)),
    ];

    let optional = [
        (ids::world_env("hazard", agent_id), location.hazard),
        (ids::world_loc("safeHint", agent_id), location.safe_zone),
        (ids::world_loc("normPressure", agent_id), location.norm_pressure),
        (ids::world_loc("intimacy", agent_id), location.intimacy),
    ];
    atoms.extend(
        optional
            .into_iter()
            .filter_map(|(id, v)| v.map(|v| Atom::world(id, clamp01(v)))),
    );
    atoms
}

/// What one agent perceives of another.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub other_id: String,
    pub distance: f64,
    /// Proximity, `clamp01(1 − dist/r0)`
    pub close: f64,
    /// Line of sight
    pub los: f64,
    /// Audibility
    pub aud: f64,
    /// Confidence shared by all three obs atoms
    pub confidence: f64,
}

impl Observation {
    pub fn measure(a: &AgentRef, b: &AgentRef, env: &EnvDescriptor, params: &ObservationParams) -> Self {
        let dist = a.pos.distance(&b.pos);

        let close = clamp01(1.0 - dist / params.r0);
        let los = clamp01(
            0.65 * env.visibility + 0.35 * clamp01(1.0 - dist / params.rs) - 0.30 * env.crowd,
        );
        let aud = clamp01(0.75 * (1.0 - dist / params.rh) + 0.25 * (1.0 - env.noise));
        let confidence = clamp01(los.max(aud) * (0.75 + 0.25 * close));

        Self {
            other_id: b.id.clone(),
            distance: dist,
            close,
            los,
            aud,
            confidence,
        }
    }

    /// Social information quality of this observation.
    pub fn quality(&self) -> f64 {
        0.6 * self.los + 0.4 * self.aud
    }

    pub fn to_atoms(&self, agent_id: &str, env: &EnvDescriptor) -> Vec<Atom> {
        let b = self.other_id.as_str();
        let dist = TracePart::new("distance", self.distance);
        vec![
            Atom::obs(ids::obs_dyad("nearby", agent_id, b), self.close, self.confidence).with_trace(
                Trace::formula("obs:nearby").part(dist.clone()),
            ),
            Atom::obs(ids::obs_dyad("los", agent_id, b), self.los, self.confidence).with_trace(
                Trace::formula("obs:los").parts([
                    dist.clone(),
                    TracePart::weighted("visibility", env.visibility, 0.65),
                    TracePart::weighted("crowd", env.crowd, -0.30),
                ]),
            ),
            Atom::obs(ids::obs_dyad("audio", agent_id, b), self.aud, self.confidence).with_trace(
                Trace::formula("obs:audio").parts([
                    dist,
                    TracePart::weighted("quiet", 1.0 - env.noise, 0.25),
                ]),
            ),
        ]
    }
}

/// `obs:nearby|los|audio:{a}:{b}` for one pair of agents.
pub fn atomize_observation(
    a: &AgentRef,
    b: &AgentRef,
    env: &EnvDescriptor,
    params: &ObservationParams,
) -> Vec<Atom> {
    Observation::measure(a, b, env, params).to_atoms(&a.id, env)
}

/// `obs:infoAdequacy:{a}`: blend of environment and social information quality.
///
/// With nobody observed the social term equals the environment term, so an
/// empty room is neither penalised nor rewarded.
pub fn atomize_info_adequacy(agent_id: &str, env: &EnvDescriptor, observations: &[Observation]) -> Atom {
    let env_q = 0.55 * env.visibility + 0.25 * (1.0 - env.noise) + 0.20 * (1.0 - env.crowd);
    let soc_q = if observations.is_empty() {
        env_q
    } else {
        observations.iter().map(Observation::quality).sum::<f64>() / observations.len() as f64
    };

    let mix = WeightedMix::new().part("envQ", env_q, 0.7).part("socQ", soc_q, 0.3);
    let id = ids::obs_agent("infoAdequacy", agent_id);
    let trace = Trace::formula("obs:infoAdequacy")
        .used(observations.iter().flat_map(|o| {
            [
                ids::obs_dyad("los", agent_id, &o.other_id),
                ids::obs_dyad("audio", agent_id, &o.other_id),
            ]
        }))
        .parts(mix.parts().iter().cloned());
    Atom::obs(id, mix.value(), 1.0).with_trace(trace)
}

/// `world:body:*` from the agent's body record and `world:scene:urgency`.
/// Absent fields emit nothing.
pub fn atomize_self_state(agent_id: &str, body: Option<&BodyState>, urgency: Option<f64>) -> Vec<Atom> {
    let body = body.cloned().unwrap_or_default();
    [
        (ids::world_body("fatigue", agent_id), body.fatigue),
        (ids::world_body("pain", agent_id), body.pain),
        (ids::world_body("stress", agent_id), body.stress),
        (ids::world_scene("urgency", agent_id), urgency),
    ]
    .into_iter()
    .filter_map(|(id, v)| v.map(|v| Atom::world(id, clamp01(v))))
    .collect()
}

/// Every Stage0 atom for the scene's agent: world, then observations in
/// `otherAgents` order, then info adequacy. A repeated agent id is observed
/// once, at its first entry.
pub fn atomize_scene(scene: &Scene, params: &ObservationParams) -> Vec<Atom> {
    let agent = &scene.agent;
    let env = scene.location.env();

    let mut atoms = atomize_world_location(&agent.id, &scene.location, scene.map_metrics.as_ref());
    atoms.extend(atomize_self_state(&agent.id, agent.body.as_ref(), scene.urgency));

    let mut seen = HashSet::new();
    let observations: Vec<Observation> = scene
        .other_agents
        .iter()
        .filter(|other| other.id != agent.id && seen.insert(other.id.as_str()))
        .map(|other| Observation::measure(agent, other, &env, params))
        .collect();
    for obs in &observations {
        atoms.extend(obs.to_atoms(&agent.id, &env));
    }
    atoms.push(atomize_info_adequacy(&agent.id, &env, &observations));

    tracing::debug!(
        agent = %agent.id,
        others = observations.len(),
        atoms = atoms.len(),
        "stage0 sensing atomized"
    );
    atoms
}

#[cfg(test)]
mod tests {
    use super::*;
    use goallab_core::{AtomOrigin, Position};

    fn env(visibility: f64, crowd: f64, noise: f64) -> EnvDescriptor {
        EnvDescriptor {
            visibility,
            crowd,
            noise,
        }
    }

    fn find<'a>(atoms: &'a [Atom], id: &str) -> &'a Atom {
        atoms
            .iter()
            .find(|a| a.id == id)
            .unwrap_or_else(|| panic!("missing atom {}", id))
    }

    #[test]
    fn test_observation_worked_example() {
        let a = AgentRef::new("a", Position::new(0.0, 0.0));
        let b = AgentRef::new("b", Position::new(3.0, 0.0));
        let atoms = atomize_observation(&a, &b, &env(0.7, 0.3, 0.2), &ObservationParams::default());

        let close = find(&atoms, "obs:nearby:a:b").magnitude;
        let los = find(&atoms, "obs:los:a:b").magnitude;
        let aud = find(&atoms, "obs:audio:a:b").magnitude;
        assert!((close - 0.4).abs() < 1e-9, "close = {}", close);
        assert!((los - 0.58375).abs() < 1e-9, "los = {}", los);
        assert!((aud - 0.725).abs() < 1e-9, "aud = {}", aud);

        // conf = max(los, aud) * (0.75 + 0.25 * close) = 0.725 * 0.85
        let conf = 0.725 * 0.85;
        for atom in &atoms {
            assert!((atom.confidence - conf).abs() < 1e-9);
            assert_eq!(atom.origin, AtomOrigin::Obs);
            assert!(atom.trace.is_some());
        }
    }

    #[test]
    fn test_observation_far_away_saturates() {
        let a = AgentRef::new("a", Position::new(0.0, 0.0));
        let b = AgentRef::new("b", Position::new(100.0, 0.0));
        let obs = Observation::measure(&a, &b, &env(0.0, 1.0, 1.0), &ObservationParams::default());
        assert_eq!(obs.close, 0.0);
        assert_eq!(obs.los, 0.0);
        assert_eq!(obs.aud, 0.0);
        assert_eq!(obs.confidence, 0.0);
    }

    #[test]
    fn test_world_location_defaults() {
        let atoms = atomize_world_location("a", &LocationRecord::default(), None);
        assert_eq!(atoms.len(), 6);
        for atom in &atoms {
            assert_eq!(atom.magnitude, 0.0);
            assert_eq!(atom.origin, AtomOrigin::World);
        }
        assert!(atoms.iter().all(|a| !a.id.contains("safeHint")));
    }

    #[test]
    fn test_world_location_clamps_and_extras() {
        let location = LocationRecord {
            privacy: Some(1.7),
            control: Some(-0.2),
            hazard: Some(0.4),
            safe_zone: Some(1.0),
            ..Default::default()
        };
        let metrics = MapMetrics {
            cover: Some(0.3),
            danger: None,
            escape: Some(0.9),
        };
        let atoms = atomize_world_location("a", &location, Some(&metrics));
        assert_eq!(find(&atoms, "world:loc:privacy:a").magnitude, 1.0);
        assert_eq!(find(&atoms, "world:loc:control:a").magnitude, 0.0);
        assert_eq!(find(&atoms, "world:map:cover:a").magnitude, 0.3);
        assert_eq!(find(&atoms, "world:map:danger:a").magnitude, 0.0);
        assert_eq!(find(&atoms, "world:env:hazard:a").magnitude, 0.4);
        assert_eq!(find(&atoms, "world:loc:safeHint:a").magnitude, 1.0);
        assert_eq!(atoms.len(), 8);
    }

    #[test]
    fn test_info_adequacy_without_others() {
        let e = env(0.8, 0.5, 0.4);
        let atom = atomize_info_adequacy("a", &e, &[]);
        // envQ = 0.44 + 0.15 + 0.10 = 0.69; socQ = envQ
        assert!((atom.magnitude - 0.69).abs() < 1e-9, "infoAdeq = {}", atom.magnitude);
        let trace = atom.trace.unwrap();
        assert_eq!(trace.parts.len(), 2);
        assert_eq!(trace.parts[0].weight, Some(0.7));
        assert_eq!(trace.parts[1].weight, Some(0.3));
        assert!(trace.used_atom_ids.is_empty());
    }

    #[test]
    fn test_info_adequacy_with_observation() {
        let e = env(0.7, 0.3, 0.2);
        let a = AgentRef::new("a", Position::new(0.0, 0.0));
        let b = AgentRef::new("b", Position::new(3.0, 0.0));
        let obs = Observation::measure(&a, &b, &e, &ObservationParams::default());
        let atom = atomize_info_adequacy("a", &e, &[obs]);

        let env_q = 0.55 * 0.7 + 0.25 * 0.8 + 0.20 * 0.7;
        let soc_q = 0.6 * 0.58375 + 0.4 * 0.725;
        let expected = 0.7 * env_q + 0.3 * soc_q;
        assert!((atom.magnitude - expected).abs() < 1e-9);
        assert_eq!(
            atom.trace.unwrap().used_atom_ids,
            vec!["obs:los:a:b".to_string(), "obs:audio:a:b".to_string()]
        );
    }

    #[test]
    fn test_self_state_only_present_fields() {
        let body = BodyState {
            fatigue: Some(0.6),
            pain: None,
            stress: Some(2.0),
        };
        let atoms = atomize_self_state("a", Some(&body), None);
        assert_eq!(atoms.len(), 2);
        assert_eq!(find(&atoms, "world:body:fatigue:a").magnitude, 0.6);
        assert_eq!(find(&atoms, "world:body:stress:a").magnitude, 1.0);
        assert!(atomize_self_state("a", None, None).is_empty());
        assert_eq!(atomize_self_state("a", None, Some(0.3))[0].id, "world:scene:urgency:a");
    }

    #[test]
    fn test_atomize_scene_order_and_self_skip() {
        let scene = Scene {
            agent: AgentRef::new("a", Position::new(0.0, 0.0)),
            other_agents: vec![
                AgentRef::new("b", Position::new(1.0, 0.0)),
                AgentRef::new("a", Position::new(0.0, 0.0)),
                AgentRef::new("c", Position::new(2.0, 0.0)),
            ],
            ..Default::default()
        };
        let atoms = atomize_scene(&scene, &ObservationParams::default());
        // 6 world + 2 * 3 obs + info adequacy
        assert_eq!(atoms.len(), 13);
        assert_eq!(atoms[6].id, "obs:nearby:a:b");
        assert_eq!(atoms[9].id, "obs:nearby:a:c");
        assert_eq!(atoms.last().unwrap().id, "obs:infoAdequacy:a");
        assert!(atoms.iter().all(|a| a.id != "obs:nearby:a:a"));
    }

    #[test]
    fn test_atomize_scene_repeated_agent_observed_once() {
        let scene = Scene {
            agent: AgentRef::new("a", Position::new(0.0, 0.0)),
            other_agents: vec![
                AgentRef::new("b", Position::new(1.0, 0.0)),
                AgentRef::new("b", Position::new(9.0, 0.0)),
            ],
            ..Default::default()
        };
        let atoms = atomize_scene(&scene, &ObservationParams::default());
        let nearby: Vec<&Atom> = atoms.iter().filter(|x| x.id == "obs:nearby:a:b").collect();
        assert_eq!(nearby.len(), 1);
        assert!((nearby[0].magnitude - 0.8).abs() < 1e-9, "first entry wins, got {}", nearby[0].magnitude);
        let info = find(&atoms, "obs:infoAdequacy:a");
        assert_eq!(info.trace.as_ref().unwrap().used_atom_ids.len(), 2);
    }
}
