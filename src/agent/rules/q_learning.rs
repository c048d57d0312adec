use super::UpdateRule;
use crate::agent::config::AgentKind;
use crate::agent::core::{AgentCore, START_NODE};
use crate::agent::reward::Objective;
use crate::agent::state::State;

/// Off-policy one-step update toward the best next value.
///
/// On the last hop the bootstrap reads `Q(next, start)`, the value of closing
/// the tour.
#[derive(Debug, Clone, Copy, Default)]
pub struct QLearning;

impl UpdateRule for QLearning {
    fn kind(&self) -> AgentKind {
        AgentKind::QLearning
    }

    fn train_episode(&mut self, core: &mut AgentCore, objective: Objective) {
        let mut state = State::start(START_NODE);
        loop {
            let valid = core.valid_actions(state.mask);
            let Some(action) = core.choose_action(state, &valid) else {
                break;
            };
            let reward = core.reward(state.node, action, objective);
            let next = state.visit(action);

            let next_valid = core.valid_actions(next.mask);
            let max_next = if next_valid.is_empty() {
                core.q_table().value(next, START_NODE)
            } else {
                core.q_table().max_value(next, &next_valid)
            };

            core.bootstrap(state, action, reward, max_next);
            state = next;
        }
    }
}
