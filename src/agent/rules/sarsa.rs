use super::UpdateRule;
use crate::agent::config::AgentKind;
use crate::agent::core::{AgentCore, START_NODE};
use crate::agent::reward::Objective;
use crate::agent::state::State;

/// On-policy one-step update: the next action is chosen before the update
/// and then carried forward as the action actually taken.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sarsa;

impl UpdateRule for Sarsa {
    fn kind(&self) -> AgentKind {
        AgentKind::Sarsa
    }

    fn train_episode(&mut self, core: &mut AgentCore, objective: Objective) {
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

            let next_value = next_action.map_or(0.0, |a| core.q_table().value(next, a));
            core.bootstrap(state, action, reward, next_value);

            match next_action {
                Some(a) => {
                    state = next;
                    action = a;
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::rules::test_support::ring_core;

    #[test]
    fn episode_covers_every_node_once() {
        let mut core = ring_core(4);
        Sarsa.train_episode(&mut core, Objective::Time);
        let mut masks: Vec<u64> = core.q_table().iter().map(|(s, _)| s.mask).collect();
        masks.sort_unstable();
        // One state per depth, masks of popcount 1..=4.
        let popcounts: Vec<u32> = masks.iter().map(|m| m.count_ones()).collect();
        assert_eq!(popcounts, vec![1, 2, 3, 4]);
    }

    #[test]
    fn single_node_map_is_a_no_op() {
        use crate::agent::{AgentCore, LearningConfig};
        use crate::network::DistanceMatrix;
        use rand::{rngs::StdRng, SeedableRng};
        use std::sync::Arc;

        let mut core = AgentCore::new(
            LearningConfig::default(),
            Arc::new(DistanceMatrix::zeros(1)),
            StdRng::seed_from_u64(0),
        );
        Sarsa.train_episode(&mut core, Objective::Time);
        assert!(core.q_table().is_empty());
    }
}
