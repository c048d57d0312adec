//! The logistics network: nodes, the travel-cost matrix, and where it comes from.
//!
//! Nodes are identified by their position `0..N` in a [`NodeMap`]. The cost
//! matrix is built once per map by a [`DistanceProvider`], either from an
//! external routing oracle or from great-circle distances, and never fails.

mod matrix;
#[cfg(feature = "oracle")]
mod oracle;
mod presets;
mod provider;

pub use matrix::{calculate_total_distance, DistanceMatrix, EdgeCost};
#[cfg(test)]
pub(crate) use matrix::ring_matrix;
#[cfg(feature = "oracle")]
pub use oracle::{OracleError, OsrmOracle};
pub use presets::java_supply_chain;
pub(crate) use presets::java_nodes;
pub use provider::{haversine_matrix, DistanceProvider, OracleConfig};

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::geo::GeoPoint;
use crate::NodeId;

/// Widest network a visited-set bitmask can describe.
pub const MAX_NODES: usize = 64;
/// Longest display name kept for a node; longer names are truncated.
pub const MAX_NAME_LEN: usize = 50;

/// A point in the logistics network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl Node {
    pub fn new(name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            name: name.into(),
            lat,
            lon,
        }
    }

    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

/// Immutable, validated set of nodes indexed by [`NodeId`].
#[derive(Debug, Clone, PartialEq)]
pub struct NodeMap {
    nodes: Vec<Node>,
}

impl NodeMap {
    /// Validates and sanitizes a node list.
    ///
    /// Names are truncated to [`MAX_NAME_LEN`] characters and coordinates
    /// clamped to the valid latitude/longitude ranges. Empty lists, lists
    /// wider than [`MAX_NODES`], and non-finite coordinates are rejected.
    pub fn new(nodes: Vec<Node>) -> Result<Self, SimError> {
        if nodes.is_empty() {
            return Err(SimError::validation("No nodes provided"));
        }
        if nodes.len() > MAX_NODES {
            return Err(SimError::validation(format!(
                "Too many nodes ({}, max {})",
                nodes.len(),
                MAX_NODES
            )));
        }

        let mut cleaned = Vec::with_capacity(nodes.len());
        for node in nodes {
            if !node.lat.is_finite() || !node.lon.is_finite() {
                return Err(SimError::validation(format!(
                    "Node '{}' has non-finite coordinates",
                    node.name
                )));
            }
            cleaned.push(Node {
                name: node.name.chars().take(MAX_NAME_LEN).collect(),
                lat: node.lat.clamp(-90.0, 90.0),
                lon: node.lon.clamp(-180.0, 180.0),
            });
        }

        Ok(Self { nodes: cleaned })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Display name of `id`, or an empty string for an unknown id.
    pub fn name(&self, id: NodeId) -> &str {
        self.nodes.get(id).map(|n| n.name.as_str()).unwrap_or("")
    }

    /// Finds a node by its exact display name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}
