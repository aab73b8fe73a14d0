//! Tracked reads against a resolved view.
//!
//! Every derived atom records the ids it read in `trace.usedAtomIds`. A
//! [`Reads`] scope collects them as values are pulled, so the trace lists
//! exactly the branch that was taken.

use goallab_core::ids;
use goallab_core::{get_c, get_m, Atom, Resolved, Trace, TracePart};

pub(crate) struct Reads<'a> {
    resolved: &'a Resolved,
    used: Vec<String>,
    confidences: Vec<f64>,
}

impl<'a> Reads<'a> {
    pub fn new(resolved: &'a Resolved) -> Self {
        Self {
            resolved,
            used: Vec::new(),
            confidences: Vec::new(),
        }
    }

    /// Presence check. Not recorded as a read.
    pub fn has(&self, id: &str) -> bool {
        self.resolved.contains_key(id)
    }

    /// Magnitude of `id` (or `fallback`), recorded as read.
    pub fn m(&mut self, id: &str, fallback: f64) -> f64 {
        if !self.used.iter().any(|u| u == id) {
            self.used.push(id.to_string());
            self.confidences.push(get_c(self.resolved, id, 1.0));
        }
        get_m(self.resolved, id, fallback)
    }

    /// Mean confidence of everything read; an absent id counts as 1.
    pub fn confidence(&self) -> f64 {
        if self.confidences.is_empty() {
            1.0
        } else {
            self.confidences.iter().sum::<f64>() / self.confidences.len() as f64
        }
    }

    #[cfg(test)]
    pub fn used(&self) -> &[String] {
        &self.used
    }

    /// Trace skeleton carrying the formula id and every id read so far.
    pub fn trace(&self, formula_id: &str) -> Trace {
        Trace::formula(formula_id).used(self.used.iter().cloned())
    }

    /// Derived atom carrying this scope's confidence and trace.
    pub fn emit(
        &self,
        id: String,
        value: f64,
        formula_id: &str,
        parts: impl IntoIterator<Item = TracePart>,
    ) -> Atom {
        tracing::trace!(id = %id, value, "derived");
        Atom::derived(id, value, self.confidence()).with_trace(self.trace(formula_id).parts(parts))
    }
}

/// First candidate present in `resolved`; the last candidate if none is.
pub fn pick_first(resolved: &Resolved, candidates: &[String]) -> String {
    candidates
        .iter()
        .find(|id| resolved.contains_key(id.as_str()))
        .or_else(|| candidates.last())
        .cloned()
        .unwrap_or_default()
}

/// Most specific id present for a context axis: `ctx:final:<axis>` over
/// `ctx:<axis>`. Returns the plain `ctx:<axis>` id when neither exists.
pub fn pick_ctx_id(resolved: &Resolved, axis: &str, agent_id: &str) -> String {
    pick_first(resolved, &[ids::ctx_final(axis, agent_id), ids::ctx(axis, agent_id)])
}

/// Like [`pick_ctx_id`] but falls through to a Stage0 base id.
pub fn pick_ctx_or(resolved: &Resolved, axis: &str, agent_id: &str, base_id: String) -> String {
    pick_first(
        resolved,
        &[ids::ctx_final(axis, agent_id), ids::ctx(axis, agent_id), base_id],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use goallab_core::Atom;

    fn resolved_of(atoms: Vec<Atom>) -> Resolved {
        atoms.into_iter().map(|a| (a.id.clone(), a)).collect()
    }

    #[test]
    fn test_pick_ctx_prefers_final() {
        let resolved = resolved_of(vec![
            Atom::derived("ctx:danger:a", 0.2, 1.0),
            Atom::scripted("ctx:final:danger:a", 0.9),
        ]);
        assert_eq!(pick_ctx_id(&resolved, "danger", "a"), "ctx:final:danger:a");
    }

    #[test]
    fn test_pick_ctx_falls_back() {
        let resolved = resolved_of(vec![Atom::derived("ctx:danger:a", 0.2, 1.0)]);
        assert_eq!(pick_ctx_id(&resolved, "danger", "a"), "ctx:danger:a");
        assert_eq!(pick_ctx_id(&Resolved::new(), "danger", "a"), "ctx:danger:a");
    }

    #[test]
    fn test_pick_ctx_or_base() {
        let resolved = resolved_of(vec![Atom::world("world:loc:normPressure:a", 0.4)]);
        let id = pick_ctx_or(&resolved, "normPressure", "a", ids::world_loc("normPressure", "a"));
        assert_eq!(id, "world:loc:normPressure:a");

        let id = pick_ctx_or(&Resolved::new(), "normPressure", "a", ids::world_loc("normPressure", "a"));
        assert_eq!(id, "world:loc:normPressure:a");
    }

    #[test]
    fn test_reads_track_ids_and_confidence() {
        let resolved = resolved_of(vec![Atom::obs("obs:los:a:b", 0.5, 0.4)]);
        let mut r = Reads::new(&resolved);
        assert_eq!(r.m("obs:los:a:b", 0.0), 0.5);
        assert_eq!(r.m("obs:audio:a:b", 0.25), 0.25);
        // Re-reading does not duplicate
        r.m("obs:los:a:b", 0.0);
        assert_eq!(r.used(), &["obs:los:a:b".to_string(), "obs:audio:a:b".to_string()]);
        assert!((r.confidence() - 0.7).abs() < 1e-12);
        assert!(!r.has("nope"));
    }

    #[test]
    fn test_reads_empty_confidence() {
        let resolved = Resolved::new();
        assert_eq!(Reads::new(&resolved).confidence(), 1.0);
    }
}
