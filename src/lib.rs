//! routelearn - multi-agent route learning under disruption
//!
//! Five tabular reinforcement-learning agents learn closed delivery tours over
//! a distance matrix while disaster zones perturb the travel costs.
//! [`Simulation`] is the entry point; the modules below are usable on their
//! own for custom coordinators.

pub mod agent;
pub mod disaster;
pub mod error;
pub mod fleet;
pub mod geo;
pub mod logging;
pub mod network;
pub mod refine;
pub mod sim;

pub use agent::{Agent, AgentKind, AgentProfile, LearningConfig, Objective, RoadStatus};
pub use disaster::{DisasterCategory, DisasterZone, Severity, ZoneRequest};
pub use error::SimError;
pub use fleet::{CargoKind, FleetAssignment, VehicleKind};
pub use network::{calculate_total_distance, DistanceMatrix, Node, NodeMap};
pub use sim::{EpisodeReport, SimConfig, Simulation, Snapshot};

/// Index of a node in the active map, `0..N`.
pub type NodeId = usize;
