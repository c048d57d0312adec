//! Local-search route refinement and guided teaching.
//!
//! [`two_opt`] irons crossings out of a route by reversing segments, and
//! [`reinforce_route`] replays the result into an agent's value table as if
//! the agent had driven it itself.

use serde::Serialize;
use tracing::debug;

use crate::agent::{AgentCore, Objective, State};
use crate::error::SimError;
use crate::network::EdgeCost;
use crate::NodeId;

/// Improvement passes before the search gives up.
pub const MAX_PASSES: usize = 50;

/// Longest route accepted for teaching.
pub const MAX_TEACH_LEN: usize = 50;

/// Improves `route` by segment reversal until no single reversal helps or
/// [`MAX_PASSES`] passes have run.
///
/// The first and last entries never move. Only strict improvements are
/// accepted, so the result is never longer than the input.
pub fn two_opt<C: EdgeCost + ?Sized>(route: &[NodeId], costs: &C) -> Vec<NodeId> {
    let mut best = route.to_vec();
    let mut best_distance = costs.route_distance(&best);
    let len = best.len();

    let mut improved = true;
    let mut passes = 0;
    while improved && passes < MAX_PASSES {
        improved = false;
        passes += 1;
        for i in 1..len.saturating_sub(2) {
            for j in i + 2..len {
                let mut candidate = best.clone();
                candidate[i..j].reverse();
                let distance = costs.route_distance(&candidate);
                if distance < best_distance {
                    best = candidate;
                    best_distance = distance;
                    improved = true;
                }
            }
        }
    }
    debug!(passes, distance = best_distance, "2-opt finished");
    best
}

/// Length bounds for a teaching route, checked before anything else.
pub fn check_route_len(len: usize) -> Result<(), SimError> {
    if len < 2 {
        return Err(SimError::validation("Route must contain at least 2 cities"));
    }
    if len > MAX_TEACH_LEN {
        return Err(SimError::validation(format!(
            "Route too long (max {} cities)",
            MAX_TEACH_LEN
        )));
    }
    Ok(())
}

/// Checks a route supplied for teaching against a map of `num_nodes` nodes.
///
/// A closed route may repeat its first node at the end; any other repeat is
/// rejected.
pub fn validate_route(route: &[NodeId], num_nodes: usize) -> Result<(), SimError> {
    check_route_len(route.len())?;
    if let Some(bad) = route.iter().find(|&&n| n >= num_nodes) {
        return Err(SimError::validation(format!("City {} not found", bad)));
    }

    let body = if route.first() == route.last() {
        &route[..route.len() - 1]
    } else {
        route
    };
    let mut seen = 0u64;
    for &node in body {
        if seen & (1u64 << node) != 0 {
            return Err(SimError::validation(format!(
                "Route visits city {} more than once",
                node
            )));
        }
        seen |= 1u64 << node;
    }
    Ok(())
}

/// Replays `route` through one-step bootstrapped updates.
///
/// Rewards come from the agent's own view of the costs. The final hop
/// bootstraps from zero. ε and every counter are left alone.
pub fn reinforce_route(core: &mut AgentCore, route: &[NodeId], objective: Objective) {
    let Some(&first) = route.first() else {
        return;
    };
    let mut state = State::start(first);
    let last_hop = route.len().saturating_sub(2);

    for (i, hop) in route.windows(2).enumerate() {
        let next_node = hop[1];
        let reward = core.reward(hop[0], next_node, objective);
        let next = State::new(next_node, state.mask | (1u64 << next_node));
        let max_next = if i < last_hop {
            core.max_next_value(next)
        } else {
            0.0
        };
        core.bootstrap(State::new(hop[0], state.mask), next_node, reward, max_next);
        state = next;
    }
}

/// What a teaching call did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeachOutcome {
    pub original: Vec<NodeId>,
    pub improved: Vec<NodeId>,
    pub original_distance: f64,
    pub improved_distance: f64,
}

/// Validates, refines and injects `route` into `core`.
pub fn teach(core: &mut AgentCore, route: &[NodeId], objective: Objective) -> Result<TeachOutcome, SimError> {
    validate_route(route, core.num_nodes())?;
    let improved = two_opt(route, core);
    let outcome = TeachOutcome {
        original_distance: core.route_distance(route),
        improved_distance: core.route_distance(&improved),
        original: route.to_vec(),
        improved,
    };
    reinforce_route(core, &outcome.improved, objective);
    Ok(outcome)
}
