//! Versioned, JSON-friendly export of every agent's value table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::agent::{Agent, QTable, State};
use crate::error::SimError;
use crate::NodeId;

/// Format version written by [`Snapshot::capture`].
pub const SNAPSHOT_VERSION: &str = "1";

/// Largest table, in states, accepted per agent on import.
pub const MAX_IMPORT_STATES: usize = 100_000;

/// A stored action value. Anything that is not a number is kept as-is so a
/// bad entry can be skipped instead of failing the whole snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionValue {
    Number(f64),
    Other(serde_json::Value),
}

impl ActionValue {
    fn finite(&self) -> Option<f64> {
        match self {
            ActionValue::Number(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AgentSnapshot {
    /// `"node|mask"` → action id (as a string) → value.
    #[serde(default)]
    pub q_table: BTreeMap<String, BTreeMap<String, ActionValue>>,
    #[serde(default)]
    pub epsilon: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub version: String,
    pub num_cities: usize,
    #[serde(default)]
    pub episodes: u64,
    #[serde(default)]
    pub agents: BTreeMap<String, AgentSnapshot>,
}

impl Snapshot {
    pub fn capture(agents: &[Agent], num_cities: usize, episodes: u64) -> Self {
        let agents = agents
            .iter()
            .map(|agent| {
                let q_table = agent
                    .q_table()
                    .iter()
                    .map(|(state, actions)| {
                        let actions = actions
                            .iter()
                            .map(|(a, q)| (a.to_string(), ActionValue::Number(*q)))
                            .collect();
                        (state.encode(), actions)
                    })
                    .collect();
                let snapshot = AgentSnapshot {
                    q_table,
                    epsilon: Some(agent.epsilon()),
                };
                (agent.name().to_string(), snapshot)
            })
            .collect();

        Self {
            version: SNAPSHOT_VERSION.to_string(),
            num_cities,
            episodes,
            agents,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> Result<Self, SimError> {
        serde_json::from_str(text)
            .map_err(|e| SimError::validation(format!("Invalid snapshot format: {}", e)))
    }

    /// Whole-snapshot checks that must pass before any table is replaced.
    pub(crate) fn check_compatible(&self, num_cities: usize) -> Result<(), SimError> {
        if self.num_cities != num_cities {
            return Err(SimError::validation(format!(
                "Snapshot incompatible! Saved for {} cities, current map has {} cities.",
                self.num_cities, num_cities
            )));
        }
        if self.version != SNAPSHOT_VERSION {
            warn!(version = %self.version, expected = SNAPSHOT_VERSION, "importing snapshot from another version");
        }
        for (name, agent) in &self.agents {
            if agent.q_table.len() > MAX_IMPORT_STATES {
                return Err(SimError::validation(format!(
                    "{} Q-table too large ({} states, max {})",
                    name,
                    agent.q_table.len(),
                    MAX_IMPORT_STATES
                )));
            }
        }
        Ok(())
    }
}

impl AgentSnapshot {
    /// Rebuilds a value table, skipping entries that do not fit a map of
    /// `num_cities` nodes. Returns the table and the number of skipped entries.
    pub(crate) fn restore(&self, num_cities: usize) -> (QTable, usize) {
        let mut table = QTable::new();
        let mut skipped = 0;
        let mask_limit = if num_cities >= 64 { u64::MAX } else { (1u64 << num_cities) - 1 };

        for (key, actions) in &self.q_table {
            let state = match State::decode(key) {
                Some(s) if s.node < num_cities && s.mask & !mask_limit == 0 => s,
                _ => {
                    warn!(key = %key, "skipping corrupt state");
                    skipped += actions.len().max(1);
                    continue;
                }
            };
            for (action, value) in actions {
                let parsed = action.trim().parse::<NodeId>().ok().filter(|&a| a < num_cities);
                match (parsed, value.finite()) {
                    (Some(a), Some(q)) => table.set(state, a, q),
                    _ => {
                        warn!(key = %key, action = %action, "skipping corrupt action value");
                        skipped += 1;
                    }
                }
            }
        }
        (table, skipped)
    }

    /// Stored ε clamped to `[0.01, 1.0]`; missing or non-finite reads as 1.0.
    pub(crate) fn epsilon_clamped(&self) -> f64 {
        match self.epsilon {
            Some(e) if e.is_finite() => e.clamp(0.01, 1.0),
            _ => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent_snapshot(json: &str) -> AgentSnapshot {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn restore_skips_bad_entries() {
        let snap = agent_snapshot(
            r#"{
                "q_table": {
                    "0|1": {"1": -10.5, "2": "oops", "9": 1.0},
                    "7|1": {"1": 2.0},
                    "garbage": {"1": 2.0},
                    "1|3": {"x": 1.0, "2": 4.0},
                    "2|64": {"1": 1.0}
                },
                "epsilon": 0.5
            }"#,
        );
        let (table, skipped) = snap.restore(5);
        assert_eq!(table.entry_count(), 2);
        assert_eq!(table.get(State::new(0, 1), 1), Some(-10.5));
        assert_eq!(table.get(State::new(1, 3), 2), Some(4.0));
        assert_eq!(skipped, 6);
    }

    #[test]
    fn values_survive_json_text_exactly() {
        let values = [0.24205614757483707, 1.0512411377832593, -17.300000000000004, 5e-324];
        let actions: BTreeMap<String, ActionValue> = values
            .iter()
            .enumerate()
            .map(|(a, q)| ((a + 1).to_string(), ActionValue::Number(*q)))
            .collect();
        let mut snap = Snapshot::from_json(r#"{"version":"1","num_cities":5}"#).unwrap();
        snap.agents.insert(
            "QL-Bot".into(),
            AgentSnapshot {
                q_table: BTreeMap::from([("0|1".to_string(), actions)]),
                epsilon: Some(0.9950124791926823),
            },
        );

        let back = Snapshot::from_json(&snap.to_json().unwrap()).unwrap();
        assert_eq!(back, snap);
        let saved = &back.agents["QL-Bot"];
        let (table, skipped) = saved.restore(5);
        assert_eq!(skipped, 0);
        for (a, q) in values.iter().enumerate() {
            assert_eq!(table.get(State::new(0, 1), a + 1), Some(*q));
        }
        assert_eq!(saved.epsilon_clamped(), 0.9950124791926823);
    }

    #[test]
    fn epsilon_is_clamped() {
        assert_eq!(agent_snapshot(r#"{"epsilon": 7.0}"#).epsilon_clamped(), 1.0);
        assert_eq!(agent_snapshot(r#"{"epsilon": 0.0}"#).epsilon_clamped(), 0.01);
        assert_eq!(agent_snapshot(r#"{"epsilon": null}"#).epsilon_clamped(), 1.0);
        assert_eq!(agent_snapshot(r#"{}"#).epsilon_clamped(), 1.0);
    }

    #[test]
    fn count_mismatch_is_rejected() {
        let snap = Snapshot::from_json(r#"{"version":"1","num_cities":3,"agents":{}}"#).unwrap();
        let err = snap.check_compatible(5).unwrap_err();
        assert!(err.to_string().contains("Saved for 3 cities"));
        assert!(snap.check_compatible(3).is_ok());
    }

    #[test]
    fn oversized_table_is_rejected() {
        let mut snap = Snapshot::from_json(r#"{"num_cities":5}"#).unwrap();
        let big: BTreeMap<_, _> = (0..=MAX_IMPORT_STATES as u64)
            .map(|m| (format!("0|{}", m), BTreeMap::new()))
            .collect();
        snap.agents.insert(
            "QL-Bot".into(),
            AgentSnapshot {
                q_table: big,
                epsilon: None,
            },
        );
        assert!(snap.check_compatible(5).unwrap_err().to_string().contains("too large"));
    }

    #[test]
    fn malformed_text_is_a_validation_error() {
        assert!(matches!(Snapshot::from_json("{not json"), Err(SimError::Validation(_))));
        assert!(matches!(Snapshot::from_json(r#"{"agents":{}}"#), Err(SimError::Validation(_))));
    }
}
