use std::collections::HashMap;

use super::state::State;
use crate::NodeId;

/// Sparse action-value table over `(state, action)` pairs.
///
/// Reads never insert: an unseen pair reads as `0.0` through [`QTable::value`]
/// and as `None` through [`QTable::get`]. Only writes materialize entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QTable {
    entries: HashMap<State, HashMap<NodeId, f64>>,
}

impl QTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tabled value, `0.0` when the pair was never written.
    pub fn value(&self, state: State, action: NodeId) -> f64 {
        self.get(state, action).unwrap_or(0.0)
    }

    pub fn get(&self, state: State, action: NodeId) -> Option<f64> {
        self.entries.get(&state)?.get(&action).copied()
    }

    pub fn set(&mut self, state: State, action: NodeId, value: f64) {
        self.entries.entry(state).or_default().insert(action, value);
    }

    /// Moves `Q(state, action)` toward `target` by step size `alpha`.
    pub fn nudge(&mut self, state: State, action: NodeId, target: f64, alpha: f64) {
        let slot = self.entries.entry(state).or_default().entry(action).or_insert(0.0);
        *slot += alpha * (target - *slot);
    }

    /// Adds `delta` to `Q(state, action)`.
    pub fn add(&mut self, state: State, action: NodeId, delta: f64) {
        *self.entries.entry(state).or_default().entry(action).or_insert(0.0) += delta;
    }

    /// Largest tabled value over `actions`, `0.0` when `actions` is empty.
    pub fn max_value(&self, state: State, actions: &[NodeId]) -> f64 {
        actions
            .iter()
            .map(|&a| self.value(state, a))
            .fold(None, |best: Option<f64>, q| Some(best.map_or(q, |b| b.max(q))))
            .unwrap_or(0.0)
    }

    pub fn actions(&self, state: State) -> Option<&HashMap<NodeId, f64>> {
        self.entries.get(&state)
    }

    pub fn contains_state(&self, state: State) -> bool {
        self.entries.contains_key(&state)
    }

    /// Number of materialized states.
    pub fn state_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of materialized `(state, action)` entries.
    pub fn entry_count(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&State, &HashMap<NodeId, f64>)> {
        self.entries.iter()
    }
}
