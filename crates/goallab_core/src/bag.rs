//! Layered atom store.
//!
//! One map per origin. Writers never touch another layer; readers see a
//! merged view where the highest-priority layer holding an id wins:
//!
//! `override > obs > world > derived`
//!
//! A `derived` atom is only visible for ids no other layer supplies.

use crate::atom::{Atom, AtomOrigin};
use std::collections::HashMap;

/// Merged `id → atom` snapshot produced by [`AtomBag::resolve`].
pub type Resolved = HashMap<String, Atom>;

/// Per-tick atom store. Created fresh for every tick; atoms are only ever added.
#[derive(Debug, Clone, Default)]
pub struct AtomBag {
    layers: [HashMap<String, Atom>; 4],
}

impl AtomBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert into the atom's own layer. Last write wins within a layer.
    pub fn add(&mut self, atom: Atom) {
        self.layers[atom.origin.index()].insert(atom.id.clone(), atom);
    }

    pub fn add_many<I>(&mut self, atoms: I)
    where
        I: IntoIterator<Item = Atom>,
    {
        for atom in atoms {
            self.add(atom);
        }
    }

    /// Merge all layers by priority. Recomputed on every call; callers that
    /// need a stable view resolve once per stage.
    pub fn resolve(&self) -> Resolved {
        let mut out = Resolved::with_capacity(self.len());
        for origin in AtomOrigin::PRIORITY {
            for (id, atom) in &self.layers[origin.index()] {
                if !out.contains_key(id) {
                    out.insert(id.clone(), atom.clone());
                }
            }
        }
        out
    }

    /// Same answer as `resolve().get(id)` without building the whole view.
    pub fn get_resolved(&self, id: &str) -> Option<&Atom> {
        AtomOrigin::PRIORITY
            .iter()
            .find_map(|origin| self.layers[origin.index()].get(id))
    }

    /// Raw atoms of one layer, sorted by id.
    pub fn by_origin(&self, origin: AtomOrigin) -> Vec<&Atom> {
        let mut atoms: Vec<&Atom> = self.layers[origin.index()].values().collect();
        atoms.sort_by(|a, b| a.id.cmp(&b.id));
        atoms
    }

    pub fn layer_len(&self, origin: AtomOrigin) -> usize {
        self.layers[origin.index()].len()
    }

    /// Raw atom count across all layers (shadowed duplicates included).
    pub fn len(&self) -> usize {
        self.layers.iter().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.iter().all(HashMap::is_empty)
    }
}

/// Magnitude of `id`, or `fallback` when absent.
#[inline]
pub fn get_m(resolved: &Resolved, id: &str, fallback: f64) -> f64 {
    resolved.get(id).map(|a| a.magnitude).unwrap_or(fallback)
}

/// Confidence of `id`, or `fallback` when absent.
#[inline]
pub fn get_c(resolved: &Resolved, id: &str, fallback: f64) -> f64 {
    resolved.get(id).map(|a| a.confidence).unwrap_or(fallback)
}
