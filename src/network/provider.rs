use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{DistanceMatrix, NodeMap};
#[cfg(feature = "oracle")]
use super::OsrmOracle;

/// Settings for the external distance oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Whether to query the oracle at all; disabled means great-circle only.
    pub enabled: bool,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "http://router.project-osrm.org".to_string(),
            timeout_secs: 15,
        }
    }
}

/// Great-circle distance matrix in kilometers.
///
/// Deterministic and symmetric; the diagonal is zero.
pub fn haversine_matrix(nodes: &NodeMap) -> DistanceMatrix {
    let n = nodes.len();
    let mut matrix = DistanceMatrix::zeros(n);
    for (i, a) in nodes.iter() {
        for (j, b) in nodes.iter() {
            if i != j {
                matrix.set(i, j, a.location().distance_km(&b.location()));
            }
        }
    }
    matrix
}

/// Builds the cost matrix for a node map.
///
/// Tries the oracle when one is configured and silently degrades to
/// [`haversine_matrix`] on any failure, so building never errors.
#[derive(Debug, Clone, Default)]
pub struct DistanceProvider {
    #[cfg(feature = "oracle")]
    oracle: Option<OsrmOracle>,
}

impl DistanceProvider {
    /// A provider that never leaves the process.
    pub fn haversine_only() -> Self {
        Self::default()
    }

    pub fn from_config(config: &OracleConfig) -> Self {
        if !config.enabled {
            return Self::haversine_only();
        }
        Self::with_oracle(config)
    }

    #[cfg(feature = "oracle")]
    fn with_oracle(config: &OracleConfig) -> Self {
        let timeout = std::time::Duration::from_secs(config.timeout_secs);
        match OsrmOracle::new(config.base_url.clone(), timeout) {
            Ok(oracle) => Self {
                oracle: Some(oracle),
            },
            Err(err) => {
                warn!(error = %err, "could not build oracle client, using haversine distances");
                Self::haversine_only()
            }
        }
    }

    #[cfg(not(feature = "oracle"))]
    fn with_oracle(_config: &OracleConfig) -> Self {
        warn!("built without the `oracle` feature, using haversine distances");
        Self::haversine_only()
    }

    pub fn uses_oracle(&self) -> bool {
        #[cfg(feature = "oracle")]
        {
            self.oracle.is_some()
        }
        #[cfg(not(feature = "oracle"))]
        {
            false
        }
    }

    pub fn build(&self, nodes: &NodeMap) -> DistanceMatrix {
        #[cfg(feature = "oracle")]
        if let Some(oracle) = &self.oracle {
            info!(nodes = nodes.len(), "fetching oracle distance matrix");
            match oracle.fetch(nodes) {
                Ok(matrix) => {
                    info!("oracle road distances loaded");
                    return matrix;
                }
                Err(err) => {
                    warn!(error = %err, "oracle unavailable, falling back to haversine");
                }
            }
        }

        info!(nodes = nodes.len(), "using haversine distance matrix");
        haversine_matrix(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{java_supply_chain, Node};

    #[test]
    fn haversine_matrix_shape_and_symmetry() {
        let nodes = java_supply_chain();
        let m = haversine_matrix(&nodes);
        assert_eq!(m.len(), nodes.len());
        assert!(m.is_symmetric(1e-9));
        assert!((0..m.len()).all(|i| m.get(i, i) == 0.0));
        assert!((0..m.len()).all(|i| m.row(i).iter().all(|v| *v >= 0.0)));
    }

    #[test]
    fn haversine_matrix_is_deterministic() {
        let nodes = java_supply_chain();
        assert_eq!(haversine_matrix(&nodes), haversine_matrix(&nodes));
    }

    #[test]
    fn disabled_oracle_uses_fallback() {
        let config = OracleConfig {
            enabled: false,
            ..OracleConfig::default()
        };
        let provider = DistanceProvider::from_config(&config);
        assert!(!provider.uses_oracle());
        let nodes = NodeMap::new(vec![Node::new("a", 0.0, 0.0), Node::new("b", 0.0, 1.0)]).unwrap();
        let m = provider.build(&nodes);
        assert!((m.get(0, 1) - 111.19).abs() < 0.01);
    }
}
