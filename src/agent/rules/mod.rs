//! One update rule per learning algorithm, all driving the same [`AgentCore`].

mod dyna_q;
mod monte_carlo;
mod q_learning;
mod sarsa;
mod td_lambda;

pub use dyna_q::DynaQ;
pub use monte_carlo::MonteCarlo;
pub use q_learning::QLearning;
pub use sarsa::Sarsa;
pub use td_lambda::{SarsaLambda, TRACE_FLOOR};

use std::fmt;

use super::config::{AgentKind, LearningConfig};
use super::core::AgentCore;
use super::reward::Objective;

/// How an agent turns one simulated tour into value-table updates.
///
/// A rule owns only its auxiliary memory (traces, episode buffer, world
/// model); the value table, ε and RNG belong to the [`AgentCore`] it is
/// handed.
pub trait UpdateRule: Send + fmt::Debug {
    fn kind(&self) -> AgentKind;

    /// Runs one complete tour from the start node, updating `core`'s table.
    fn train_episode(&mut self, core: &mut AgentCore, objective: Objective);

    /// Drops any auxiliary memory.
    fn reset(&mut self) {}

    /// Entries held in auxiliary memory.
    fn memory_len(&self) -> usize {
        0
    }
}

/// Builds the rule for `kind`.
pub fn build(kind: AgentKind, learning: &LearningConfig) -> Box<dyn UpdateRule> {
    match kind {
        AgentKind::QLearning => Box::new(QLearning),
        AgentKind::Sarsa => Box::new(Sarsa),
        AgentKind::MonteCarlo => Box::new(MonteCarlo::default()),
        AgentKind::TdLambda => Box::new(SarsaLambda::new(learning.lambda)),
        AgentKind::DynaQ => Box::new(DynaQ::new(learning.planning_steps)),
    }
}
