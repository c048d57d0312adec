//! Tabular route-learning agents.
//!
//! Every agent shares the same state model ([`State`]: current node plus a
//! visited bitmask), the same action space (unvisited nodes) and the same
//! reward ([`calculate_reward`]). What differs is the [`UpdateRule`] that
//! turns a simulated tour into value-table updates.

mod config;
mod core;
mod reward;
pub mod rules;
mod state;
mod table;

pub use self::config::{AgentKind, AgentProfile, LearningConfig};
pub use self::core::{AgentCore, RoadStatus, BLOCKED_COST, START_NODE};
pub use self::reward::{calculate_reward, Objective, PROFIT_SCALE};
pub use self::rules::UpdateRule;
pub use self::state::{valid_actions, State};
pub use self::table::QTable;

use std::sync::Arc;

use rand::rngs::StdRng;

use crate::error::SimError;
use crate::network::{DistanceMatrix, EdgeCost};
use crate::NodeId;

/// One learner in the roster: its profile, its core and its update rule.
#[derive(Debug)]
pub struct Agent {
    profile: AgentProfile,
    core: AgentCore,
    rule: Box<dyn UpdateRule>,
}

impl Agent {
    /// Builds an agent; `defaults` applies unless the profile overrides it.
    pub fn new(
        profile: AgentProfile,
        defaults: &LearningConfig,
        matrix: Arc<DistanceMatrix>,
        rng: StdRng,
    ) -> Self {
        let learning = profile.effective_learning(defaults).clone();
        let rule = rules::build(profile.kind, &learning);
        let core = AgentCore::new(learning, matrix, rng);
        Self { profile, core, rule }
    }

    pub fn name(&self) -> &str {
        &self.profile.name
    }

    pub fn color(&self) -> &str {
        &self.profile.color
    }

    pub fn kind(&self) -> AgentKind {
        self.profile.kind
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    pub(crate) fn profile_mut(&mut self) -> &mut AgentProfile {
        &mut self.profile
    }

    pub fn core(&self) -> &AgentCore {
        &self.core
    }

    pub(crate) fn core_mut(&mut self) -> &mut AgentCore {
        &mut self.core
    }

    pub fn epsilon(&self) -> f64 {
        self.core.epsilon()
    }

    pub fn q_table(&self) -> &QTable {
        self.core.q_table()
    }

    /// Entries held by the rule's auxiliary memory (traces, world model).
    pub fn memory_len(&self) -> usize {
        self.rule.memory_len()
    }

    /// Runs one training tour and decays ε.
    ///
    /// The core is checked before anything is touched, so a failure leaves
    /// the agent exactly as it was.
    pub fn train_episode(&mut self, objective: Objective) -> Result<(), SimError> {
        self.core.check_ready().map_err(|message| SimError::Internal {
            agent: self.profile.name.clone(),
            message,
        })?;
        self.rule.train_episode(&mut self.core, objective);
        self.core.decay_epsilon();
        Ok(())
    }

    /// Current greedy tour, starting and ending at the start node.
    pub fn get_route(&self) -> Vec<NodeId> {
        self.core.greedy_route()
    }

    /// Length of [`Agent::get_route`] under this agent's view of the costs.
    pub fn get_best_route_distance(&self) -> (f64, Vec<NodeId>) {
        let route = self.get_route();
        (self.core.route_distance(&route), route)
    }

    pub fn set_road_status(&mut self, u: NodeId, v: NodeId, status: RoadStatus) -> Result<(), SimError> {
        self.core.set_road_status(u, v, status)
    }

    pub fn set_matrix(&mut self, matrix: Arc<DistanceMatrix>) {
        self.core.set_matrix(matrix);
    }

    /// Clears the table, the rule's memory and any road overrides; ε returns
    /// to its initial value.
    pub fn reset(&mut self) {
        self.core.reset();
        self.rule.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::ring_matrix;
    use proptest::prelude::*;
    use rand::SeedableRng;

    fn agent(kind: AgentKind, seed: u64) -> Agent {
        let profile = AgentProfile::new(kind.to_string(), "gray", kind);
        Agent::new(
            profile,
            &LearningConfig::default(),
            Arc::new(ring_matrix()),
            StdRng::seed_from_u64(seed),
        )
    }

    fn is_closed_permutation(route: &[NodeId], n: usize) -> bool {
        if route.len() != n + 1 || route[0] != START_NODE || route[n] != START_NODE {
            return false;
        }
        let mut inner: Vec<NodeId> = route[..n].to_vec();
        inner.sort_unstable();
        inner == (0..n).collect::<Vec<_>>()
    }

    #[test]
    fn every_kind_trains_and_yields_a_tour() {
        for kind in AgentKind::ALL {
            let mut agent = agent(kind, 21);
            for _ in 0..30 {
                agent.train_episode(Objective::Time).unwrap();
            }
            let (distance, route) = agent.get_best_route_distance();
            assert!(is_closed_permutation(&route, 5), "{}: {:?}", kind, route);
            // 85 is the optimal tour on the ring.
            assert!(distance >= 85.0 - 1e-9, "{} found {}", kind, distance);
        }
    }

    #[test]
    fn training_decays_epsilon() {
        let mut agent = agent(AgentKind::QLearning, 1);
        agent.train_episode(Objective::Profit).unwrap();
        assert!(agent.epsilon() < 1.0);
    }

    #[test]
    fn shape_mismatch_is_reported_without_side_effects() {
        let mut agent = agent(AgentKind::DynaQ, 2);
        agent.set_matrix(Arc::new(DistanceMatrix::zeros(3)));
        let err = agent.train_episode(Objective::Time).unwrap_err();
        assert!(matches!(err, SimError::Internal { ref agent, .. } if agent == "dyna_q"));
        assert!(agent.q_table().is_empty());
        assert_eq!(agent.epsilon(), 1.0);
    }

    #[test]
    fn reset_clears_rule_memory() {
        let mut agent = agent(AgentKind::DynaQ, 3);
        agent.train_episode(Objective::Time).unwrap();
        assert!(agent.memory_len() > 0);
        agent.reset();
        assert_eq!(agent.memory_len(), 0);
        assert!(agent.q_table().is_empty());
        assert_eq!(agent.epsilon(), 1.0);
    }

    #[test]
    fn blocked_first_hop_is_avoided_after_training() {
        let mut agent = agent(AgentKind::QLearning, 4);
        agent.set_road_status(0, 1, RoadStatus::Blocked).unwrap();
        for _ in 0..3000 {
            agent.train_episode(Objective::Time).unwrap();
        }
        let route = agent.get_route();
        assert_ne!(route[1], 1, "{:?}", route);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn greedy_route_is_always_a_closed_tour(seed in any::<u64>(), episodes in 0usize..40, kind_idx in 0usize..5) {
            let mut agent = agent(AgentKind::ALL[kind_idx], seed);
            for _ in 0..episodes {
                agent.train_episode(Objective::Time).unwrap();
            }
            prop_assert!(is_closed_permutation(&agent.get_route(), 5));
        }
    }
}
