//! goallab_bench: multi-tick scenario tests for the atom pipeline.
//!
//! Each scenario scripts a short trajectory of scenes and checks the shape
//! of the resulting panel series:
//! - Stranger approach (social threat rises as distance closes)
//! - Friend vs stranger (ToM support shields social threat)
//! - Retreat to a safe zone (danger and fear fall)

use goallab_core::{AgentRef, Atom, LocationRecord, MapMetrics, PipelineConfig, Position, Scene};
use goallab_stages::{assemble_frame, Frame};

/// One frame per scene, tick numbers taken from position in the sequence.
pub fn run_trajectory(scenes: &[Scene], external: &[Atom], config: &PipelineConfig) -> Vec<Frame> {
    scenes
        .iter()
        .enumerate()
        .map(|(tick, scene)| {
            let mut scene = scene.clone();
            scene.tick = Some(tick as u64);
            assemble_frame(&scene, external, config)
        })
        .collect()
}

/// Agent `a` at the origin, `b` walking in from `start` to `end` along the
/// x axis over `ticks` steps.
pub fn approach(location: &LocationRecord, start: f64, end: f64, ticks: usize) -> Vec<Scene> {
    let steps = ticks.max(2) - 1;
    (0..=steps)
        .map(|i| {
            let x = start + (end - start) * i as f64 / steps as f64;
            Scene {
                agent: AgentRef::new("a", Position::new(0.0, 0.0)),
                location: location.clone(),
                other_agents: vec![AgentRef::new("b", Position::new(x, 0.0))],
                ..Default::default()
            }
        })
        .collect()
}
