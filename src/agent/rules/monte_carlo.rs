use super::UpdateRule;
use crate::agent::config::AgentKind;
use crate::agent::core::{AgentCore, START_NODE};
use crate::agent::reward::Objective;
use crate::agent::state::State;
use crate::network::EdgeCost;
use crate::NodeId;

/// Full-episode return update.
///
/// Walks the whole tour first, including the closing hop back to the start,
/// then sweeps the buffered trajectory backward accumulating the discounted
/// return.
#[derive(Debug, Clone, Default)]
pub struct MonteCarlo {
    trajectory: Vec<(State, NodeId, f64)>,
}

impl UpdateRule for MonteCarlo {
    fn kind(&self) -> AgentKind {
        AgentKind::MonteCarlo
    }

    fn train_episode(&mut self, core: &mut AgentCore, objective: Objective) {
        self.trajectory.clear();
        let mut state = State::start(START_NODE);
        loop {
            let valid = core.valid_actions(state.mask);
            match core.choose_action(state, &valid) {
                Some(action) => {
                    let reward = core.reward(state.node, action, objective);
                    self.trajectory.push((state, action, reward));
                    state = state.visit(action);
                }
                None => {
                    let reward = core.reward(state.node, START_NODE, objective);
                    self.trajectory.push((state, START_NODE, reward));
                    break;
                }
            }
        }

        let (alpha, gamma) = (core.learning().alpha, core.learning().gamma);
        let mut ret = 0.0;
        for &(state, action, reward) in self.trajectory.iter().rev() {
            ret = gamma * ret + reward;
            core.q_table_mut().nudge(state, action, ret, alpha);
        }
        tracing::trace!(
            steps = self.trajectory.len(),
            tour = core.route_distance(&self.tour()),
            "monte carlo episode"
        );
    }

    fn reset(&mut self) {
        self.trajectory.clear();
    }

    fn memory_len(&self) -> usize {
        self.trajectory.len()
    }
}

impl MonteCarlo {
    /// The most recent tour as a node sequence.
    fn tour(&self) -> Vec<NodeId> {
        let mut tour: Vec<NodeId> = self.trajectory.iter().map(|(s, _, _)| s.node).collect();
        if let Some(&(_, last, _)) = self.trajectory.last() {
            tour.push(last);
        }
        tour
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::rules::test_support::ring_core;

    #[test]
    fn records_the_closing_hop() {
        let mut core = ring_core(5);
        let mut mc = MonteCarlo::default();
        mc.train_episode(&mut core, Objective::Time);
        assert_eq!(mc.memory_len(), 5);
        let tour = mc.tour();
        assert_eq!(tour.first(), Some(&0));
        assert_eq!(tour.last(), Some(&0));
        let full = State::new(tour[4], 0b11111);
        assert!(core.q_table().get(full, START_NODE).is_some());
    }

    #[test]
    fn last_step_value_is_alpha_times_final_reward() {
        let mut core = ring_core(6);
        let mut mc = MonteCarlo::default();
        mc.train_episode(&mut core, Objective::Time);
        let &(state, action, reward) = mc.trajectory.last().unwrap();
        let q = core.q_table().value(state, action);
        assert!((q - 0.1 * reward).abs() < 1e-9);
    }

    #[test]
    fn start_value_reflects_discounted_return() {
        let mut core = ring_core(8);
        let mut mc = MonteCarlo::default();
        mc.train_episode(&mut core, Objective::Time);
        let rewards: Vec<f64> = mc.trajectory.iter().map(|t| t.2).collect();
        let ret = rewards.iter().rev().fold(0.0, |g, r| 0.99 * g + r);
        let &(state, action, _) = mc.trajectory.first().unwrap();
        assert!((core.q_table().value(state, action) - 0.1 * ret).abs() < 1e-9);
    }
}
