//! Simulation configuration, loadable from YAML.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::agent::{AgentProfile, LearningConfig};
use crate::disaster::{EngineSettings, DISASTER_LIMIT, MIN_ZONE_RADIUS_KM};
use crate::error::SimError;
use crate::geo::Region;
use crate::network::{java_nodes, Node, NodeMap, OracleConfig, MAX_NODES};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<ConfigError> for SimError {
    fn from(err: ConfigError) -> Self {
        SimError::Validation(err.to_string())
    }
}

/// Everything needed to build a [`Simulation`](super::Simulation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seeds agent RNGs (agent `i` gets `seed + i`); entropy when absent.
    pub seed: Option<u64>,
    /// Bounds disaster zones must be created in and drift within.
    pub region: Region,
    pub disaster_limit: usize,
    pub min_zone_radius_km: f64,
    pub oracle: OracleConfig,
    /// Hyperparameters for agents without their own override.
    pub learning: LearningConfig,
    /// Custom map; the Java supply-chain network when absent.
    pub nodes: Option<Vec<Node>>,
    pub agents: Vec<AgentProfile>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: None,
            region: Region::JAVA,
            disaster_limit: DISASTER_LIMIT,
            min_zone_radius_km: MIN_ZONE_RADIUS_KM,
            oracle: OracleConfig::default(),
            learning: LearningConfig::default(),
            nodes: None,
            agents: AgentProfile::default_roster(),
        }
    }
}

impl SimConfig {
    /// Reads, parses and validates a YAML config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: SimConfig = serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Offline variant of the defaults: no oracle, fixed seed.
    pub fn offline(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            oracle: OracleConfig {
                enabled: false,
                ..OracleConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.region.is_well_formed() {
            return Err(ConfigError::Invalid(format!("region bounds are inverted: {}", self.region)));
        }
        if self.disaster_limit == 0 {
            return Err(ConfigError::Invalid("disaster_limit must be at least 1".into()));
        }
        if !self.min_zone_radius_km.is_finite() || self.min_zone_radius_km < 0.0 {
            return Err(ConfigError::Invalid("min_zone_radius_km must be non-negative".into()));
        }
        self.learning
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if let Some(nodes) = &self.nodes {
            if nodes.is_empty() || nodes.len() > MAX_NODES {
                return Err(ConfigError::Invalid(format!(
                    "node count {} outside 1..={}",
                    nodes.len(),
                    MAX_NODES
                )));
            }
        }

        if self.agents.is_empty() {
            return Err(ConfigError::Invalid("at least one agent is required".into()));
        }
        let mut names = HashSet::new();
        for profile in &self.agents {
            profile
                .validate()
                .map_err(|e| ConfigError::Invalid(format!("agent '{}': {}", profile.name, e)))?;
            if !names.insert(profile.name.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate agent name '{}'", profile.name)));
            }
        }
        Ok(())
    }

    /// The configured map, validated.
    pub fn node_map(&self) -> Result<NodeMap, SimError> {
        match &self.nodes {
            Some(nodes) => NodeMap::new(nodes.clone()),
            None => NodeMap::new(java_nodes()),
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            region: self.region,
            limit: self.disaster_limit,
            min_radius_km: self.min_zone_radius_km,
        }
    }
}
