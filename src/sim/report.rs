//! Serializable results returned by [`Simulation`](super::Simulation) operations.

use serde::Serialize;

use crate::agent::{AgentKind, Objective};
use crate::fleet::CargoKind;
use crate::NodeId;

/// Entries kept in the hall of fame.
pub const HALL_OF_FAME_SIZE: usize = 5;

/// Rounds to two decimals, the precision distances are reported at.
pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub(crate) fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// One agent's outcome for a training step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentStep {
    pub agent: String,
    pub kind: AgentKind,
    pub color: String,
    pub objective: Objective,
    pub cargo: CargoKind,
    pub distance: f64,
    pub route: Vec<NodeId>,
    pub path: Vec<String>,
    pub epsilon: f64,
    pub cost: f64,
    pub profit: f64,
    pub co2_kg: f64,
}

/// A training step that failed; the rest of the batch still ran.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentFailure {
    pub agent: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeReport {
    /// Episode counter after this step.
    pub episode: u64,
    pub routes: Vec<AgentStep>,
    pub failures: Vec<AgentFailure>,
    pub best_routes: Vec<HallOfFameEntry>,
    pub disasters_expired: usize,
    pub reputation: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HallOfFameEntry {
    pub rank: usize,
    pub agent: String,
    pub distance: f64,
}

/// Shortest distinct tour lengths seen so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HallOfFame {
    entries: Vec<HallOfFameEntry>,
}

impl HallOfFame {
    /// Offers a distance; keeps it if it is new (not within 0.01 of a kept
    /// one), positive, and makes the top [`HALL_OF_FAME_SIZE`].
    pub fn offer(&mut self, agent: &str, distance: f64) -> bool {
        let distance = round2(distance);
        let duplicate = self.entries.iter().any(|e| (e.distance - distance).abs() < 0.01);
        if distance.is_nan() || distance <= 0.0 || duplicate {
            return false;
        }
        let qualifies = self.entries.len() < HALL_OF_FAME_SIZE
            || self.entries.last().map_or(true, |worst| distance < worst.distance);
        if !qualifies {
            return false;
        }

        self.entries.push(HallOfFameEntry {
            rank: 0,
            agent: agent.to_string(),
            distance,
        });
        self.entries.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        self.entries.truncate(HALL_OF_FAME_SIZE);
        for (i, entry) in self.entries.iter_mut().enumerate() {
            entry.rank = i + 1;
        }
        true
    }

    pub fn entries(&self) -> &[HallOfFameEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplanationStatus {
    Exploring,
    Trained,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionInsight {
    pub node: NodeId,
    pub name: String,
    pub q_value: f64,
    /// Share of the total |Q| over all first moves, in percent.
    pub percentage: f64,
}

/// A coarse reason behind a choice, weighted in percent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionFactor {
    pub factor: &'static str,
    pub weight: u8,
}

impl DecisionFactor {
    /// Reads factors off the magnitude of the best first-move value.
    pub fn from_best_value(best_q: f64) -> Vec<DecisionFactor> {
        let f = |factor, weight| DecisionFactor { factor, weight };
        if best_q > 500.0 {
            vec![f("Short distance", 60), f("Low cost", 40)]
        } else if best_q > 200.0 {
            vec![
                f("Moderate distance", 50),
                f("Disaster avoidance", 30),
                f("Cost efficiency", 20),
            ]
        } else {
            vec![f("Exploration", 70), f("Unknown route", 30)]
        }
    }
}

/// Why an agent prefers its first move.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub agent: String,
    pub status: ExplanationStatus,
    pub epsilon: f64,
    pub top_actions: Vec<ActionInsight>,
    /// Empty while the agent is still exploring.
    pub decision_factors: Vec<DecisionFactor>,
    pub states_explored: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AffectedNode {
    pub node: NodeId,
    pub name: String,
    pub distance_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteImpact {
    pub agent: String,
    pub route_distance: f64,
    pub cost_increase: f64,
    pub cost_increase_pct: f64,
    pub affected_nodes: Vec<String>,
}

/// Non-mutating what-if for a zone that has not been created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactPreview {
    pub severity: u8,
    pub multiplier: f64,
    pub radius_km: f64,
    pub affected: Vec<AffectedNode>,
    pub impacts: Vec<RouteImpact>,
    pub routes_affected: usize,
    pub alternate_nodes: usize,
}

/// Side-by-side metrics for one agent's current best route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentComparison {
    pub agent: String,
    pub kind: AgentKind,
    pub distance: f64,
    pub cost: f64,
    pub profit: f64,
    pub co2_kg: f64,
    pub states_explored: usize,
    /// `(1 − ε) · 100`.
    pub convergence_pct: f64,
    pub epsilon: f64,
    pub ranking: Ranking,
}

/// 1-based positions; ties keep roster order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Ranking {
    /// Highest profit first.
    pub profit: usize,
    /// Lowest CO2 first.
    pub green: usize,
    /// Lowest cost first.
    pub cost: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Winners {
    pub most_profitable: String,
    pub most_green: String,
    pub lowest_cost: String,
}

/// The whole roster side by side, ranked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub agents: Vec<AgentComparison>,
    /// `None` only for an empty roster.
    pub winners: Option<Winners>,
    pub episode: u64,
}

impl Comparison {
    /// Fills in every row's [`Ranking`] and picks the winners.
    pub fn ranked(mut agents: Vec<AgentComparison>, episode: u64) -> Self {
        let order = |agents: &[AgentComparison], key: fn(&AgentComparison) -> f64| {
            let mut idx: Vec<usize> = (0..agents.len()).collect();
            idx.sort_by(|&a, &b| key(&agents[a]).total_cmp(&key(&agents[b])));
            idx
        };
        let by_profit = order(&agents, |a| -a.profit);
        let by_co2 = order(&agents, |a| a.co2_kg);
        let by_cost = order(&agents, |a| a.cost);

        for (rank, &i) in by_profit.iter().enumerate() {
            agents[i].ranking.profit = rank + 1;
        }
        for (rank, &i) in by_co2.iter().enumerate() {
            agents[i].ranking.green = rank + 1;
        }
        for (rank, &i) in by_cost.iter().enumerate() {
            agents[i].ranking.cost = rank + 1;
        }

        let winners = match (by_profit.first(), by_co2.first(), by_cost.first()) {
            (Some(&p), Some(&g), Some(&c)) => Some(Winners {
                most_profitable: agents[p].agent.clone(),
                most_green: agents[g].agent.clone(),
                lowest_cost: agents[c].agent.clone(),
            }),
            _ => None,
        };
        Self {
            agents,
            winners,
            episode,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportSummary {
    pub episodes: u64,
    pub agents_restored: Vec<String>,
    pub entries_restored: usize,
    pub entries_skipped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(agent: &str, profit: f64, co2_kg: f64, cost: f64) -> AgentComparison {
        AgentComparison {
            agent: agent.to_string(),
            kind: AgentKind::QLearning,
            distance: 100.0,
            cost,
            profit,
            co2_kg,
            states_explored: 1,
            convergence_pct: 0.0,
            epsilon: 1.0,
            ranking: Ranking::default(),
        }
    }

    #[test]
    fn comparison_ranks_each_metric() {
        let cmp = Comparison::ranked(
            vec![
                row("a", 10.0, 300.0, 50.0),
                row("b", 30.0, 100.0, 70.0),
                row("c", 20.0, 200.0, 20.0),
            ],
            9,
        );
        let ranks: Vec<Ranking> = cmp.agents.iter().map(|a| a.ranking).collect();
        assert_eq!(
            ranks,
            vec![
                Ranking { profit: 3, green: 3, cost: 2 },
                Ranking { profit: 1, green: 1, cost: 3 },
                Ranking { profit: 2, green: 2, cost: 1 },
            ]
        );
        let winners = cmp.winners.unwrap();
        assert_eq!(winners.most_profitable, "b");
        assert_eq!(winners.most_green, "b");
        assert_eq!(winners.lowest_cost, "c");
        assert_eq!(cmp.episode, 9);
    }

    #[test]
    fn comparison_ties_keep_roster_order() {
        let cmp = Comparison::ranked(vec![row("x", 5.0, 1.0, 1.0), row("y", 5.0, 1.0, 1.0)], 0);
        assert_eq!(cmp.agents[0].ranking, Ranking { profit: 1, green: 1, cost: 1 });
        assert_eq!(cmp.agents[1].ranking, Ranking { profit: 2, green: 2, cost: 2 });
        assert!(Comparison::ranked(Vec::new(), 0).winners.is_none());
    }

    #[test]
    fn decision_factors_by_value_band() {
        let names = |q: f64| -> Vec<&'static str> {
            DecisionFactor::from_best_value(q).iter().map(|f| f.factor).collect()
        };
        assert_eq!(names(800.0), vec!["Short distance", "Low cost"]);
        assert_eq!(names(300.0).len(), 3);
        assert_eq!(names(200.0), vec!["Exploration", "Unknown route"]);
        for q in [800.0, 300.0, -5.0] {
            let total: u32 = DecisionFactor::from_best_value(q).iter().map(|f| f.weight as u32).sum();
            assert_eq!(total, 100);
        }
    }

    #[test]
    fn keeps_five_shortest_distinct() {
        let mut hof = HallOfFame::default();
        for (i, d) in [500.0, 400.0, 450.0, 300.0, 350.0, 320.0].iter().enumerate() {
            hof.offer(&format!("bot{}", i), *d);
        }
        let distances: Vec<f64> = hof.entries().iter().map(|e| e.distance).collect();
        assert_eq!(distances, vec![300.0, 320.0, 350.0, 400.0, 450.0]);
        let ranks: Vec<usize> = hof.entries().iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn ignores_near_duplicates_and_zero() {
        let mut hof = HallOfFame::default();
        assert!(hof.offer("a", 123.456));
        assert!(!hof.offer("b", 123.4550001));
        assert!(!hof.offer("c", 0.0));
        assert!(!hof.offer("d", f64::NAN));
        assert_eq!(hof.entries().len(), 1);
        assert_eq!(hof.entries()[0].distance, 123.46);
    }

    #[test]
    fn full_table_rejects_worse_entries() {
        let mut hof = HallOfFame::default();
        for d in [1.0, 2.0, 3.0, 4.0, 5.0] {
            hof.offer("a", d);
        }
        assert!(!hof.offer("b", 6.0));
        assert!(hof.offer("b", 0.5));
        assert_eq!(hof.entries().last().map(|e| e.distance), Some(4.0));
    }
}
