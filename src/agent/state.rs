//! The learning state: current node plus the set of nodes already visited.

use std::fmt;

use crate::NodeId;

/// `(current node, visited bitmask)`, the unit every value table is keyed by.
///
/// Bit `i` of `mask` is set once node `i` has been visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct State {
    pub node: NodeId,
    pub mask: u64,
}

impl State {
    pub fn new(node: NodeId, mask: u64) -> Self {
        Self { node, mask }
    }

    /// State at the start of a tour: standing on `start`, only `start` visited.
    pub fn start(start: NodeId) -> Self {
        Self {
            node: start,
            mask: bit(start),
        }
    }

    /// State after moving to `next`.
    pub fn visit(self, next: NodeId) -> Self {
        Self {
            node: next,
            mask: self.mask | bit(next),
        }
    }

    pub fn has_visited(&self, node: NodeId) -> bool {
        self.mask & bit(node) != 0
    }

    /// Stable string key, `"node|mask"`, used by table snapshots.
    pub fn encode(&self) -> String {
        format!("{}|{}", self.node, self.mask)
    }

    /// Parses a key produced by [`State::encode`].
    pub fn decode(key: &str) -> Option<Self> {
        let (node, mask) = key.split_once('|')?;
        Some(Self {
            node: node.trim().parse().ok()?,
            mask: mask.trim().parse().ok()?,
        })
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.node, self.mask)
    }
}

fn bit(node: NodeId) -> u64 {
    1u64 << node
}

/// Nodes of `0..num_nodes` not yet marked in `mask`, in ascending order.
pub fn valid_actions(mask: u64, num_nodes: usize) -> Vec<NodeId> {
    (0..num_nodes).filter(|&n| mask & bit(n) == 0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_state_marks_only_start() {
        let s = State::start(0);
        assert_eq!(s.mask, 1);
        assert!(s.has_visited(0));
        assert!(!s.has_visited(1));
    }

    #[test]
    fn visit_accumulates_mask() {
        let s = State::start(0).visit(3).visit(1);
        assert_eq!(s.node, 1);
        assert_eq!(s.mask, 0b1011);
    }

    #[test]
    fn valid_actions_exclude_visited() {
        assert_eq!(valid_actions(0b0101, 5), vec![1, 3, 4]);
        assert!(valid_actions(0b11111, 5).is_empty());
    }

    #[test]
    fn full_tour_has_num_nodes_minus_one_moves() {
        let mut s = State::start(0);
        let mut moves = 0;
        while let Some(&next) = valid_actions(s.mask, 6).first() {
            s = s.visit(next);
            moves += 1;
        }
        assert_eq!(moves, 5);
    }

    #[test]
    fn key_encoding_is_reversible_and_distinct() {
        let s = State::new(12, (1 << 63) | 1);
        assert_eq!(State::decode(&s.encode()), Some(s));
        assert_ne!(State::new(1, 23).encode(), State::new(12, 3).encode());
    }

    #[test]
    fn decode_rejects_malformed_keys() {
        assert_eq!(State::decode("3"), None);
        assert_eq!(State::decode("a|1"), None);
        assert_eq!(State::decode("1|-4"), None);
        assert_eq!(State::decode(""), None);
    }

    #[test]
    fn widest_mask_fits() {
        let s = State::start(0).visit(63);
        assert!(s.has_visited(63));
        assert_eq!(valid_actions(s.mask, 64).len(), 62);
    }
}
