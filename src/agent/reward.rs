//! Per-hop reward under the two optimization objectives.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Reward granted for a zero-cost hop under [`Objective::Profit`].
pub const PROFIT_SCALE: f64 = 1000.0;

/// What an agent's reward signal optimizes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Objective {
    /// Minimize distance: reward is the negated hop cost.
    Time,
    /// Profit proxy: reward is `1000 / cost`, so short hops pay super-linearly.
    #[default]
    Profit,
}

impl Objective {
    pub fn as_str(&self) -> &'static str {
        match self {
            Objective::Time => "time",
            Objective::Profit => "profit",
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Objective {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "time" => Ok(Objective::Time),
            "profit" => Ok(Objective::Profit),
            other => Err(SimError::validation(format!("Unknown objective: {}", other))),
        }
    }
}

/// Reward for traversing an edge of cost `edge_cost`.
pub fn calculate_reward(edge_cost: f64, objective: Objective) -> f64 {
    match objective {
        Objective::Time => -edge_cost,
        Objective::Profit if edge_cost > 0.0 => PROFIT_SCALE / edge_cost,
        Objective::Profit => PROFIT_SCALE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_reward_is_negated_cost() {
        assert_eq!(calculate_reward(42.5, Objective::Time), -42.5);
        assert_eq!(calculate_reward(0.0, Objective::Time), 0.0);
    }

    #[test]
    fn profit_reward_is_inverse_cost() {
        assert_eq!(calculate_reward(10.0, Objective::Profit), 100.0);
        assert_eq!(calculate_reward(0.0, Objective::Profit), 1000.0);
    }

    #[test]
    fn shorter_hops_pay_more_under_profit() {
        assert!(calculate_reward(5.0, Objective::Profit) > calculate_reward(50.0, Objective::Profit));
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("TIME".parse::<Objective>().unwrap(), Objective::Time);
        assert_eq!(" profit ".parse::<Objective>().unwrap(), Objective::Profit);
        assert!("speed".parse::<Objective>().is_err());
    }
}
