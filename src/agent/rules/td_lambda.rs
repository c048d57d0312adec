use std::collections::HashMap;

use super::UpdateRule;
use crate::agent::config::AgentKind;
use crate::agent::core::{AgentCore, START_NODE};
use crate::agent::reward::Objective;
use crate::agent::state::State;
use crate::agent::table::QTable;
use crate::NodeId;

/// Traces below this weight are dropped.
pub const TRACE_FLOOR: f64 = 0.001;

/// Per-episode accumulating eligibility traces.
#[derive(Debug, Clone, Default)]
struct TraceTable {
    entries: HashMap<State, HashMap<NodeId, f64>>,
}

impl TraceTable {
    fn bump(&mut self, state: State, action: NodeId) {
        *self.entries.entry(state).or_default().entry(action).or_insert(0.0) += 1.0;
    }

    /// Applies `step · trace` to every traced pair, decays all traces by
    /// `decay` and prunes the ones that fall under [`TRACE_FLOOR`].
    fn broadcast(&mut self, q: &mut QTable, step: f64, decay: f64) {
        for (state, actions) in self.entries.iter_mut() {
            for (action, trace) in actions.iter_mut() {
                q.add(*state, *action, step * *trace);
                *trace *= decay;
            }
            actions.retain(|_, trace| *trace >= TRACE_FLOOR);
        }
        self.entries.retain(|_, actions| !actions.is_empty());
    }

    fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

/// SARSA(λ): every step's TD error is broadcast backward through the
/// eligibility traces of the pairs visited earlier in the episode.
#[derive(Debug, Clone)]
pub struct SarsaLambda {
    lambda: f64,
    traces: TraceTable,
}

impl SarsaLambda {
    pub fn new(lambda: f64) -> Self {
        Self {
            lambda,
            traces: TraceTable::default(),
        }
    }
}

impl UpdateRule for SarsaLambda {
    fn kind(&self) -> AgentKind {
        AgentKind::TdLambda
    }

    fn train_episode(&mut self, core: &mut AgentCore, objective: Objective) {
        self.traces.clear();
        let alpha = core.learning().alpha;
        let gamma = core.learning().gamma;

        let mut state = State::start(START_NODE);
        let valid = core.valid_actions(state.mask);
        let Some(mut action) = core.choose_action(state, &valid) else {
            return;
        };

        loop {
            let reward = core.reward(state.node, action, objective);
            let next = state.visit(action);
            let next_valid = core.valid_actions(next.mask);
            let next_action = core.choose_action(next, &next_valid);

            let current = core.q_table().value(state, action);
            let target = reward + next_action.map_or(0.0, |a| gamma * core.q_table().value(next, a));
            let delta = target - current;

            self.traces.bump(state, action);
            self.traces
                .broadcast(core.q_table_mut(), alpha * delta, gamma * self.lambda);

            match next_action {
                Some(a) => {
                    state = next;
                    action = a;
                }
                None => break,
            }
        }
    }

    fn reset(&mut self) {
        self.traces.clear();
    }

    fn memory_len(&self) -> usize {
        self.traces.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::rules::test_support::ring_core;

    #[test]
    fn broadcast_updates_decays_and_prunes() {
        let mut traces = TraceTable::default();
        let mut q = QTable::new();
        let s = State::start(0);
        traces.bump(s, 1);
        traces.broadcast(&mut q, 2.0, 0.5);
        assert_eq!(q.value(s, 1), 2.0);
        assert_eq!(traces.len(), 1);

        // 0.5 → 0.0005 falls under the floor.
        traces.broadcast(&mut q, 2.0, 0.001);
        assert_eq!(q.value(s, 1), 3.0);
        assert_eq!(traces.len(), 0);
    }

    #[test]
    fn traces_accumulate_rather_than_replace() {
        let mut traces = TraceTable::default();
        let s = State::start(0);
        traces.bump(s, 2);
        traces.bump(s, 2);
        let mut q = QTable::new();
        traces.broadcast(&mut q, 1.0, 1.0);
        assert_eq!(q.value(s, 2), 2.0);
    }

    #[test]
    fn lambda_zero_matches_one_step_sarsa_footprint() {
        let mut core = ring_core(9);
        let mut rule = SarsaLambda::new(0.0);
        rule.train_episode(&mut core, Objective::Time);
        // With λ = 0 every trace dies right after its own update.
        assert_eq!(rule.memory_len(), 0);
        assert_eq!(core.q_table().entry_count(), 4);
    }

    #[test]
    fn each_episode_starts_without_traces() {
        let mut core = ring_core(16);
        let mut rule = SarsaLambda::new(0.9);
        rule.train_episode(&mut core, Objective::Time);
        assert!(rule.memory_len() > 0);

        // A pair the ring tour from node 0 never visits.
        let leftover = State::start(4);
        rule.traces.bump(leftover, 0);
        rule.train_episode(&mut core, Objective::Time);
        assert!(!rule.traces.entries.contains_key(&leftover));
        assert!(!core.q_table().contains_state(leftover));
    }

    #[test]
    fn earlier_pairs_receive_credit_later() {
        let mut core = ring_core(10);
        let mut rule = SarsaLambda::new(0.7);
        rule.train_episode(&mut core, Objective::Time);
        // The first pair's value differs from a plain one-step update of its
        // own reward because later TD errors flowed back through its trace.
        let start = State::start(START_NODE);
        let (&first, &q) = core.q_table().actions(start).unwrap().iter().next().unwrap();
        let one_step = 0.1 * -core.matrix().get(0, first);
        assert!((q - one_step).abs() > 1e-9);
    }
}
