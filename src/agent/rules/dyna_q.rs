use std::collections::HashMap;

use rand::seq::SliceRandom;

use super::UpdateRule;
use crate::agent::config::AgentKind;
use crate::agent::core::{AgentCore, START_NODE};
use crate::agent::reward::Objective;
use crate::agent::state::State;
use crate::NodeId;

/// Q-learning plus planning over a remembered world model.
///
/// After each real step, `planning_steps` transitions are sampled uniformly
/// from everything observed so far and replayed through the same update. The
/// model only grows; it is not invalidated when disasters change the costs,
/// so replayed rewards may be stale.
#[derive(Debug, Clone)]
pub struct DynaQ {
    planning_steps: usize,
    model: HashMap<(State, NodeId), (f64, State)>,
    keys: Vec<(State, NodeId)>,
}

impl DynaQ {
    pub fn new(planning_steps: usize) -> Self {
        Self {
            planning_steps,
            model: HashMap::new(),
            keys: Vec::new(),
        }
    }

    fn remember(&mut self, state: State, action: NodeId, reward: f64, next: State) {
        if self.model.insert((state, action), (reward, next)).is_none() {
            self.keys.push((state, action));
        }
    }

    fn plan(&self, core: &mut AgentCore) {
        for _ in 0..self.planning_steps {
            let Some(&(state, action)) = self.keys.choose(core.rng()) else {
                return;
            };
            let Some(&(reward, next)) = self.model.get(&(state, action)) else {
                continue;
            };
            let max_next = core.max_next_value(next);
            core.bootstrap(state, action, reward, max_next);
        }
    }
}

impl UpdateRule for DynaQ {
    fn kind(&self) -> AgentKind {
        AgentKind::DynaQ
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

            let max_next = core.max_next_value(next);
            core.bootstrap(state, action, reward, max_next);

            self.remember(state, action, reward, next);
            self.plan(core);
            state = next;
        }
    }

    fn reset(&mut self) {
        self.model.clear();
        self.keys.clear();
    }

    fn memory_len(&self) -> usize {
        self.keys.len()
    }
}
