//! The simulation coordinator.
//!
//! [`Simulation`] owns the node map, the [`DisasterEngine`] (sole writer of the
//! live matrix) and the agent roster. Every operation that changes physics
//! recomputes the live matrix and republishes it to all agents before
//! returning, so a training step always sees one consistent matrix.

mod config;
mod report;
mod snapshot;

pub use config::{ConfigError, SimConfig};
pub use report::{
    ActionInsight, AffectedNode, AgentComparison, AgentFailure, AgentStep, Comparison,
    DecisionFactor, EpisodeReport, Explanation, ExplanationStatus, HallOfFame, HallOfFameEntry,
    ImpactPreview, ImportSummary, Ranking, RouteImpact, Winners, HALL_OF_FAME_SIZE,
};
pub use snapshot::{ActionValue, AgentSnapshot, Snapshot, MAX_IMPORT_STATES, SNAPSHOT_VERSION};

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, error, info, warn};

use crate::agent::{
    valid_actions, Agent, AgentProfile, LearningConfig, Objective, RoadStatus, State, START_NODE,
};
use crate::disaster::{DisasterEngine, DisasterZone, Severity, ZoneRequest};
use crate::error::SimError;
use crate::fleet::{FleetAssignment, REPUTATION_CAP};
use crate::geo::GeoPoint;
use crate::network::{DistanceMatrix, DistanceProvider, Node, NodeMap};
use crate::refine::{self, TeachOutcome};
use crate::NodeId;

use report::{round1, round2};

/// Number of first moves listed by [`Simulation::explain`].
const TOP_ACTIONS: usize = 3;

/// The whole learning world behind one handle.
#[derive(Debug)]
pub struct Simulation {
    config: SimConfig,
    provider: DistanceProvider,
    nodes: NodeMap,
    engine: DisasterEngine,
    agents: Vec<Agent>,
    episodes: u64,
    reputation: u32,
    hall_of_fame: HallOfFame,
}

fn spawn_agents(
    profiles: &[AgentProfile],
    defaults: &LearningConfig,
    seed: Option<u64>,
    matrix: &Arc<DistanceMatrix>,
) -> Vec<Agent> {
    profiles
        .iter()
        .enumerate()
        .map(|(i, profile)| {
            let rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(i as u64)),
                None => StdRng::from_entropy(),
            };
            Agent::new(profile.clone(), defaults, Arc::clone(matrix), rng)
        })
        .collect()
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "training step panicked".to_string()
    }
}

/// Objective an agent trains under this step.
///
/// Emergency cargo always routes for time; otherwise a per-call override
/// wins over the fleet default.
fn resolve_objective(fleet: FleetAssignment, requested: Option<Objective>) -> Objective {
    if fleet.cargo.profile().emergency {
        return Objective::Time;
    }
    requested.unwrap_or_else(|| fleet.objective())
}

impl Simulation {
    /// Builds the map and matrix described by `config` and spawns the roster.
    ///
    /// The matrix comes from the configured oracle when reachable and from
    /// great-circle distances otherwise.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        let nodes = config.node_map()?;
        let provider = DistanceProvider::from_config(&config.oracle);
        let base = provider.build(&nodes);
        Ok(Self::assemble(config, provider, nodes, base))
    }

    /// Like [`Simulation::new`] with a caller-supplied map and matrix.
    pub fn with_matrix(config: SimConfig, nodes: NodeMap, matrix: DistanceMatrix) -> Result<Self, SimError> {
        config.validate()?;
        if matrix.len() != nodes.len() {
            return Err(SimError::validation(format!(
                "Matrix has {} rows but the map has {} nodes",
                matrix.len(),
                nodes.len()
            )));
        }
        Ok(Self::assemble(config, DistanceProvider::haversine_only(), nodes, matrix))
    }

    fn assemble(config: SimConfig, provider: DistanceProvider, nodes: NodeMap, base: DistanceMatrix) -> Self {
        let base = Arc::new(base);
        let engine = DisasterEngine::new(&nodes, Arc::clone(&base), config.engine_settings());
        let agents = spawn_agents(&config.agents, &config.learning, config.seed, &base);
        info!(
            nodes = nodes.len(),
            agents = agents.len(),
            oracle = provider.uses_oracle(),
            "simulation ready"
        );
        Self {
            config,
            provider,
            nodes,
            engine,
            agents,
            episodes: 0,
            reputation: 0,
            hall_of_fame: HallOfFame::default(),
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn nodes(&self) -> &NodeMap {
        &self.nodes
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn episodes(&self) -> u64 {
        self.episodes
    }

    pub fn reputation(&self) -> u32 {
        self.reputation
    }

    pub fn hall_of_fame(&self) -> &[HallOfFameEntry] {
        self.hall_of_fame.entries()
    }

    /// Matrix before any disaster effects.
    pub fn base_matrix(&self) -> &Arc<DistanceMatrix> {
        self.engine.base()
    }

    /// Matrix every agent currently trains against.
    pub fn live_matrix(&self) -> &Arc<DistanceMatrix> {
        self.engine.live()
    }

    pub fn agent(&self, name: &str) -> Result<&Agent, SimError> {
        self.agents
            .iter()
            .find(|a| a.name() == name)
            .ok_or_else(|| SimError::UnknownAgent(name.to_string()))
    }

    fn agent_index(&self, name: &str) -> Result<usize, SimError> {
        self.agents
            .iter()
            .position(|a| a.name() == name)
            .ok_or_else(|| SimError::UnknownAgent(name.to_string()))
    }

    fn node_id(&self, name: &str) -> Result<NodeId, SimError> {
        self.nodes
            .find(name)
            .ok_or_else(|| SimError::validation(format!("City {} not found", name)))
    }

    fn publish(&mut self) {
        let live = self.engine.live();
        for agent in &mut self.agents {
            agent.set_matrix(Arc::clone(live));
        }
    }

    /// Trains every agent for one episode, then ages the disaster zones.
    ///
    /// `objectives` overrides the fleet objective per agent name. A failing
    /// agent is reported in [`EpisodeReport::failures`] and the rest of the
    /// roster still trains.
    pub fn advance_episode(&mut self, objectives: &HashMap<String, Objective>) -> EpisodeReport {
        let episode = self.episodes + 1;
        let mut routes = Vec::with_capacity(self.agents.len());
        let mut failures = Vec::new();

        for agent in &mut self.agents {
            let name = agent.name().to_string();
            let fleet = agent.profile().fleet;
            let objective = resolve_objective(fleet, objectives.get(&name).copied());

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| agent.train_episode(objective)))
                .unwrap_or_else(|payload| {
                    Err(SimError::Internal {
                        agent: name.clone(),
                        message: panic_message(payload),
                    })
                });

            if let Err(err) = outcome {
                error!(agent = %name, episode, error = %err, "training step failed");
                failures.push(AgentFailure {
                    agent: name,
                    error: err.to_string(),
                });
                continue;
            }

            let (distance, route) = agent.get_best_route_distance();
            let trip = fleet.economics(distance);
            let reputation = fleet.cargo.profile().reputation;
            if reputation > 0 {
                self.reputation = (self.reputation + reputation).min(REPUTATION_CAP);
            }
            self.hall_of_fame.offer(&name, distance);

            let path = route.iter().map(|&id| self.nodes.name(id).to_string()).collect();
            routes.push(AgentStep {
                agent: name,
                kind: agent.kind(),
                color: agent.color().to_string(),
                objective,
                cargo: fleet.cargo,
                distance: round2(distance),
                route,
                path,
                epsilon: agent.epsilon(),
                cost: round2(trip.cost),
                profit: round2(trip.profit),
                co2_kg: round2(trip.co2_kg),
            });
        }

        self.episodes = episode;
        let expired = self.engine.advance();
        if expired > 0 {
            info!(episode, expired, "disaster zones expired");
        }
        self.publish();
        debug!(episode, trained = routes.len(), failed = failures.len(), "episode complete");

        EpisodeReport {
            episode,
            routes,
            failures,
            best_routes: self.hall_of_fame.entries().to_vec(),
            disasters_expired: expired,
            reputation: self.reputation,
        }
    }

    /// Runs `episodes` steps with fleet objectives; returns the last report.
    pub fn train(&mut self, episodes: usize) -> Option<EpisodeReport> {
        let objectives = HashMap::new();
        let mut last = None;
        for _ in 0..episodes {
            last = Some(self.advance_episode(&objectives));
        }
        last
    }

    /// Forgets everything learned and restores baseline physics.
    pub fn reset_all(&mut self) {
        for agent in &mut self.agents {
            agent.reset();
        }
        let cleared = self.engine.clear();
        self.publish();
        self.episodes = 0;
        self.reputation = 0;
        self.hall_of_fame.clear();
        info!(zones_cleared = cleared, "simulation reset");
    }

    pub fn create_disaster(&mut self, request: &ZoneRequest) -> Result<DisasterZone, SimError> {
        let zone = self.engine.create(request, self.episodes)?;
        self.publish();
        Ok(zone)
    }

    /// Removes every zone; returns how many were active.
    pub fn clear_disasters(&mut self) -> usize {
        let cleared = self.engine.clear();
        self.publish();
        info!(cleared, "disasters cleared");
        cleared
    }

    pub fn list_disasters(&self) -> &[DisasterZone] {
        self.engine.zones()
    }

    /// Blocks or reopens `u ↔ v` for one agent only.
    pub fn set_road_status(&mut self, agent: &str, u: NodeId, v: NodeId, status: RoadStatus) -> Result<(), SimError> {
        let idx = self.agent_index(agent)?;
        self.agents[idx].set_road_status(u, v, status)?;
        info!(agent, from = u, to = v, %status, "road status changed");
        Ok(())
    }

    pub fn set_road_status_by_name(
        &mut self,
        agent: &str,
        from: &str,
        to: &str,
        status: RoadStatus,
    ) -> Result<(), SimError> {
        self.agent_index(agent)?;
        let u = self.node_id(from)?;
        let v = self.node_id(to)?;
        self.set_road_status(agent, u, v, status)
    }

    /// Changes an agent's vehicle and cargo; learned values are kept.
    pub fn set_fleet(&mut self, agent: &str, fleet: FleetAssignment) -> Result<(), SimError> {
        let idx = self.agent_index(agent)?;
        self.agents[idx].profile_mut().fleet = fleet;
        info!(agent, vehicle = %fleet.vehicle, cargo = %fleet.cargo, "fleet updated");
        Ok(())
    }

    /// Refines `route` with 2-opt and injects it into the agent's table.
    pub fn teach_route(&mut self, agent: &str, route: &[NodeId]) -> Result<TeachOutcome, SimError> {
        let idx = self.agent_index(agent)?;
        let objective = self.agents[idx].profile().fleet.objective();
        let outcome = refine::teach(self.agents[idx].core_mut(), route, objective)?;
        info!(
            agent,
            original = round2(outcome.original_distance),
            improved = round2(outcome.improved_distance),
            "route taught"
        );
        Ok(outcome)
    }

    pub fn teach_route_by_name<S: AsRef<str>>(&mut self, agent: &str, names: &[S]) -> Result<TeachOutcome, SimError> {
        self.agent_index(agent)?;
        refine::check_route_len(names.len())?;
        let route = names
            .iter()
            .map(|name| self.node_id(name.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        self.teach_route(agent, &route)
    }

    pub fn export_tables(&self) -> Snapshot {
        Snapshot::capture(&self.agents, self.nodes.len(), self.episodes)
    }

    /// Replaces the tables of every agent named in `snapshot`.
    ///
    /// Nothing changes unless the whole snapshot is compatible with the
    /// current map. Malformed entries are skipped, not fatal.
    pub fn import_tables(&mut self, snapshot: &Snapshot) -> Result<ImportSummary, SimError> {
        let n = self.nodes.len();
        snapshot.check_compatible(n)?;

        for name in snapshot.agents.keys() {
            if !self.agents.iter().any(|a| a.name() == name) {
                warn!(agent = %name, "snapshot agent not in roster, ignored");
            }
        }

        let mut restored = Vec::new();
        for (idx, agent) in self.agents.iter().enumerate() {
            if let Some(saved) = snapshot.agents.get(agent.name()) {
                let (table, skipped) = saved.restore(n);
                restored.push((idx, table, saved.epsilon_clamped(), skipped));
            }
        }

        let mut summary = ImportSummary {
            episodes: snapshot.episodes,
            agents_restored: Vec::with_capacity(restored.len()),
            entries_restored: 0,
            entries_skipped: 0,
        };
        for (idx, table, epsilon, skipped) in restored {
            let agent = &mut self.agents[idx];
            summary.entries_restored += table.entry_count();
            summary.entries_skipped += skipped;
            summary.agents_restored.push(agent.name().to_string());
            let core = agent.core_mut();
            *core.q_table_mut() = table;
            core.set_epsilon(epsilon);
        }
        self.episodes = snapshot.episodes;

        if summary.entries_skipped > 0 {
            warn!(skipped = summary.entries_skipped, "skipped malformed snapshot entries");
        }
        info!(
            agents = summary.agents_restored.len(),
            entries = summary.entries_restored,
            episodes = summary.episodes,
            "tables imported"
        );
        Ok(summary)
    }

    /// Swaps in a new map; every agent starts over on the rebuilt matrix.
    pub fn replace_nodes(&mut self, nodes: Vec<Node>) -> Result<(), SimError> {
        let nodes = NodeMap::new(nodes)?;
        let base = Arc::new(self.provider.build(&nodes));
        let profiles: Vec<AgentProfile> = self.agents.iter().map(|a| a.profile().clone()).collect();

        self.agents = spawn_agents(&profiles, &self.config.learning, self.config.seed, &base);
        self.engine = DisasterEngine::new(&nodes, base, self.config.engine_settings());
        self.config.nodes = Some(nodes.nodes().to_vec());
        self.config.agents = profiles;
        self.nodes = nodes;
        self.episodes = 0;
        self.reputation = 0;
        self.hall_of_fame.clear();
        info!(nodes = self.nodes.len(), "node map replaced");
        Ok(())
    }

    /// The agent's view of its first move from the start node.
    pub fn explain(&self, agent: &str) -> Result<Explanation, SimError> {
        let agent = self.agent(agent)?;
        let table = agent.q_table();
        let start = State::start(START_NODE);

        let mut explanation = Explanation {
            agent: agent.name().to_string(),
            status: ExplanationStatus::Exploring,
            epsilon: agent.epsilon(),
            top_actions: Vec::new(),
            decision_factors: Vec::new(),
            states_explored: table.state_count(),
        };
        if !table.contains_state(start) {
            return Ok(explanation);
        }

        let mut values: Vec<(NodeId, f64)> = valid_actions(start.mask, self.nodes.len())
            .into_iter()
            .map(|node| (node, table.value(start, node)))
            .collect();
        let total: f64 = values.iter().map(|(_, q)| q.abs()).sum();
        values.sort_by(|a, b| b.1.total_cmp(&a.1));

        explanation.status = ExplanationStatus::Trained;
        if let Some(&(_, best_q)) = values.first() {
            explanation.decision_factors = DecisionFactor::from_best_value(best_q);
        }
        explanation.top_actions = values
            .into_iter()
            .take(TOP_ACTIONS)
            .map(|(node, q)| ActionInsight {
                node,
                name: self.nodes.name(node).to_string(),
                q_value: round2(q),
                percentage: if total > 0.0 {
                    round1(q.abs() / total * 100.0)
                } else {
                    round1(100.0 / TOP_ACTIONS as f64)
                },
            })
            .collect();
        Ok(explanation)
    }

    /// What a zone would do if created now. Changes nothing.
    pub fn preview_disaster(&self, request: &ZoneRequest) -> Result<ImpactPreview, SimError> {
        let severity = Severity::try_from(request.severity)?;
        if !request.lat.is_finite() || !request.lon.is_finite() {
            return Err(SimError::validation("Disaster coordinates must be finite"));
        }
        if !request.radius_km.is_finite() || request.radius_km < 0.0 {
            return Err(SimError::validation("Radius must be a non-negative number"));
        }

        let center = GeoPoint::new(request.lat, request.lon);
        let affected: Vec<AffectedNode> = self
            .engine
            .nodes_within(center, request.radius_km)
            .into_iter()
            .filter_map(|id| self.nodes.get(id).map(|node| (id, node)))
            .map(|(id, node)| AffectedNode {
                node: id,
                name: node.name.clone(),
                distance_km: round1(center.distance_km(&node.location())),
            })
            .collect();

        let multiplier = severity.multiplier();
        let impacts: Vec<RouteImpact> = self
            .agents
            .iter()
            .filter_map(|agent| {
                let (distance, route) = agent.get_best_route_distance();
                let hit: Vec<String> = affected
                    .iter()
                    .filter(|a| route.contains(&a.node))
                    .map(|a| a.name.clone())
                    .collect();
                if hit.is_empty() {
                    return None;
                }
                let cost = agent.profile().fleet.economics(distance).cost;
                Some(RouteImpact {
                    agent: agent.name().to_string(),
                    route_distance: round2(distance),
                    cost_increase: round2(cost * (multiplier - 1.0)),
                    cost_increase_pct: round1((multiplier - 1.0) * 100.0),
                    affected_nodes: hit,
                })
            })
            .collect();

        Ok(ImpactPreview {
            severity: severity.level(),
            multiplier,
            radius_km: request.radius_km,
            routes_affected: impacts.len(),
            alternate_nodes: self.nodes.len() - affected.len(),
            affected,
            impacts,
        })
    }

    /// Current best route metrics for every agent, roster order, ranked by
    /// profit, CO2 and cost.
    pub fn compare_agents(&self) -> Comparison {
        let rows = self
            .agents
            .iter()
            .map(|agent| {
                let (distance, _) = agent.get_best_route_distance();
                let trip = agent.profile().fleet.economics(distance);
                let epsilon = agent.epsilon();
                AgentComparison {
                    agent: agent.name().to_string(),
                    kind: agent.kind(),
                    distance: round2(distance),
                    cost: round2(trip.cost),
                    profit: round2(trip.profit),
                    co2_kg: round2(trip.co2_kg),
                    states_explored: agent.q_table().state_count(),
                    convergence_pct: round1((1.0 - epsilon) * 100.0),
                    epsilon,
                    ranking: Ranking::default(),
                }
            })
            .collect();
        Comparison::ranked(rows, self.episodes)
    }
}
