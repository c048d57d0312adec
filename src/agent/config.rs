//! Per-agent configuration: learning hyperparameters, update rule, identity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::fleet::{CargoKind, FleetAssignment, VehicleKind};

/// Hyperparameters shared by every update rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Learning rate α.
    pub alpha: f64,
    /// Discount factor γ.
    pub gamma: f64,
    /// Initial exploration rate ε.
    pub epsilon: f64,
    /// Multiplicative ε decay applied after every training episode.
    pub epsilon_decay: f64,
    /// Floor ε never decays below.
    pub epsilon_min: f64,
    /// Trace decay λ for the eligibility-trace rule.
    pub lambda: f64,
    /// Simulated updates per real step for the planning rule.
    pub planning_steps: usize,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            gamma: 0.99,
            epsilon: 1.0,
            epsilon_decay: 0.9995,
            epsilon_min: 0.01,
            lambda: 0.7,
            planning_steps: 5,
        }
    }
}

impl LearningConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        fn within(name: &str, v: f64, lo: f64, hi: f64, open_lo: bool) -> Result<(), SimError> {
            let ok = v.is_finite() && v <= hi && if open_lo { v > lo } else { v >= lo };
            if ok {
                Ok(())
            } else {
                Err(SimError::validation(format!("{} out of range: {}", name, v)))
            }
        }
        within("alpha", self.alpha, 0.0, 1.0, true)?;
        within("gamma", self.gamma, 0.0, 1.0, false)?;
        within("epsilon", self.epsilon, 0.0, 1.0, false)?;
        within("epsilon_decay", self.epsilon_decay, 0.0, 1.0, true)?;
        within("epsilon_min", self.epsilon_min, 0.0, 1.0, true)?;
        within("lambda", self.lambda, 0.0, 1.0, false)?;
        Ok(())
    }
}

/// Which update rule an agent learns with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    QLearning,
    Sarsa,
    MonteCarlo,
    TdLambda,
    DynaQ,
}

impl AgentKind {
    pub const ALL: [AgentKind; 5] = [
        AgentKind::QLearning,
        AgentKind::Sarsa,
        AgentKind::MonteCarlo,
        AgentKind::TdLambda,
        AgentKind::DynaQ,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::QLearning => "q_learning",
            AgentKind::Sarsa => "sarsa",
            AgentKind::MonteCarlo => "monte_carlo",
            AgentKind::TdLambda => "td_lambda",
            AgentKind::DynaQ => "dyna_q",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| SimError::validation(format!("Unknown agent kind: {}", s)))
    }
}

/// Identity and setup of one agent in the roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub name: String,
    pub color: String,
    pub kind: AgentKind,
    #[serde(default)]
    pub fleet: FleetAssignment,
    /// Overrides the roster-wide hyperparameters for this agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning: Option<LearningConfig>,
}

impl AgentProfile {
    pub fn new(name: impl Into<String>, color: impl Into<String>, kind: AgentKind) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
            kind,
            fleet: FleetAssignment::default(),
            learning: None,
        }
    }

    pub fn with_fleet(mut self, vehicle: VehicleKind, cargo: CargoKind) -> Self {
        self.fleet = FleetAssignment { vehicle, cargo };
        self
    }

    pub fn with_learning(mut self, learning: LearningConfig) -> Self {
        self.learning = Some(learning);
        self
    }

    /// Hyperparameters in effect: the override, else `defaults`.
    pub fn effective_learning<'a>(&'a self, defaults: &'a LearningConfig) -> &'a LearningConfig {
        self.learning.as_ref().unwrap_or(defaults)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.name.trim().is_empty() {
            return Err(SimError::validation("Agent name must not be empty"));
        }
        match &self.learning {
            Some(learning) => learning.validate(),
            None => Ok(()),
        }
    }

    /// The five-bot roster the simulation starts with.
    pub fn default_roster() -> Vec<AgentProfile> {
        vec![
            AgentProfile::new("QL-Bot", "blue", AgentKind::QLearning)
                .with_fleet(VehicleKind::Diesel, CargoKind::General),
            AgentProfile::new("Sarsa-Bot", "green", AgentKind::Sarsa)
                .with_fleet(VehicleKind::Lng, CargoKind::General),
            AgentProfile::new("MC-Bot", "red", AgentKind::MonteCarlo)
                .with_fleet(VehicleKind::Diesel, CargoKind::Danger),
            AgentProfile::new("TD-Bot", "orange", AgentKind::TdLambda)
                .with_fleet(VehicleKind::Ev, CargoKind::Express),
            AgentProfile::new("Dyna-Bot", "purple", AgentKind::DynaQ)
                .with_fleet(VehicleKind::Hybrid, CargoKind::Cold),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_learning_is_valid() {
        let cfg = LearningConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.alpha, 0.1);
        assert_eq!(cfg.planning_steps, 5);
    }

    #[test]
    fn rejects_out_of_range_hyperparameters() {
        let bad_alpha = LearningConfig {
            alpha: 0.0,
            ..Default::default()
        };
        assert!(bad_alpha.validate().is_err());
        let bad_gamma = LearningConfig {
            gamma: 1.5,
            ..Default::default()
        };
        assert!(bad_gamma.validate().is_err());
        let nan_lambda = LearningConfig {
            lambda: f64::NAN,
            ..Default::default()
        };
        assert!(nan_lambda.validate().is_err());
    }

    #[test]
    fn kind_parses_from_display() {
        for kind in AgentKind::ALL {
            assert_eq!(kind.to_string().parse::<AgentKind>().unwrap(), kind);
        }
        assert!("ppo".parse::<AgentKind>().is_err());
    }

    #[test]
    fn override_wins_over_defaults() {
        let defaults = LearningConfig::default();
        let plain = AgentProfile::new("a", "gray", AgentKind::Sarsa);
        assert_eq!(plain.effective_learning(&defaults), &defaults);
        let tuned = plain.with_learning(LearningConfig {
            alpha: 0.5,
            ..LearningConfig::default()
        });
        assert_eq!(tuned.effective_learning(&defaults).alpha, 0.5);
    }

    #[test]
    fn profile_deserializes_with_defaults() {
        let p: AgentProfile =
            serde_json::from_str(r#"{"name":"X","color":"teal","kind":"dyna_q"}"#).unwrap();
        assert_eq!(p.kind, AgentKind::DynaQ);
        assert!(p.learning.is_none());
        assert_eq!(p.fleet, FleetAssignment::default());
    }

    #[test]
    fn default_roster_has_one_of_each_kind() {
        let roster = AgentProfile::default_roster();
        let kinds: Vec<AgentKind> = roster.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, AgentKind::ALL.to_vec());
        assert_eq!(roster[4].name, "Dyna-Bot");
        assert_eq!(roster[3].fleet.vehicle, VehicleKind::Ev);
    }
}
