//! Client for an OSRM-compatible distance-table service.

use std::time::Duration;

use qtty::{Kilometer, Meter, Quantity};
use reqwest::blocking::Client;
use serde::Deserialize;
use thiserror::Error;

use super::{DistanceMatrix, NodeMap};

/// Ways the routing oracle can fail to produce a usable matrix.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("oracle returned HTTP {0}")]
    Status(u16),

    #[error("oracle answered with code {0}")]
    Code(String),

    #[error("oracle matrix has {got} rows, expected {expected}")]
    Shape { expected: usize, got: usize },

    #[error("oracle matrix entry ({row}, {col}) is missing or invalid")]
    Malformed { row: usize, col: usize },
}

#[derive(Debug, Deserialize)]
struct TableResponse {
    code: String,
    #[serde(default)]
    distances: Option<Vec<Vec<Option<f64>>>>,
}

/// Distance-table client with a bounded request timeout.
#[derive(Debug, Clone)]
pub struct OsrmOracle {
    base_url: String,
    http: Client,
}

impl OsrmOracle {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into(),
            http,
        })
    }

    /// Table request for every node in one call, coordinates as `lon,lat`.
    pub fn table_url(&self, nodes: &NodeMap) -> String {
        let coords: Vec<String> = nodes
            .iter()
            .map(|(_, node)| format!("{},{}", node.lon, node.lat))
            .collect();
        format!(
            "{}/table/v1/driving/{}?annotations=distance",
            self.base_url.trim_end_matches('/'),
            coords.join(";")
        )
    }

    /// Fetches road distances in kilometers for all ordered node pairs.
    pub fn fetch(&self, nodes: &NodeMap) -> Result<DistanceMatrix, OracleError> {
        let response = self.http.get(self.table_url(nodes)).send()?;
        if !response.status().is_success() {
            return Err(OracleError::Status(response.status().as_u16()));
        }
        let body: TableResponse = response.json()?;
        parse_table(body, nodes.len())
    }
}

fn meters_to_km(meters: f64) -> f64 {
    Quantity::<Meter>::new(meters).to::<Kilometer>().value()
}

fn parse_table(body: TableResponse, n: usize) -> Result<DistanceMatrix, OracleError> {
    if body.code != "Ok" {
        return Err(OracleError::Code(body.code));
    }
    let rows = body.distances.unwrap_or_default();
    if rows.len() != n {
        return Err(OracleError::Shape {
            expected: n,
            got: rows.len(),
        });
    }

    let mut matrix = DistanceMatrix::zeros(n);
    for (i, row) in rows.iter().enumerate() {
        if row.len() != n {
            return Err(OracleError::Shape {
                expected: n,
                got: row.len(),
            });
        }
        for (j, entry) in row.iter().enumerate() {
            if i == j {
                continue;
            }
            match entry {
                Some(meters) if meters.is_finite() && *meters >= 0.0 => {
                    matrix.set(i, j, meters_to_km(*meters));
                }
                _ => return Err(OracleError::Malformed { row: i, col: j }),
            }
        }
    }
    Ok(matrix)
}
