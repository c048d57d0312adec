//! routelearn CLI
//!
//! Trains the agent roster offline or against a routing oracle, optionally
//! under disaster zones, and moves learned tables in and out as JSON.

use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use routelearn::logging::init_logging;
use routelearn::{DisasterCategory, SimConfig, Simulation, Snapshot, ZoneRequest};
use tracing::{info, Level};

type CliResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

#[derive(Parser, Debug)]
#[command(name = "routelearn")]
#[command(about = "Multi-agent route learning under disruption", long_about = None)]
struct Args {
    /// Log level (RUST_LOG overrides)
    #[arg(long, global = true, default_value = "info")]
    log_level: Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train every agent for a number of episodes
    Train {
        /// YAML config; built-in defaults when absent
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(short, long, default_value = "500")]
        episodes: usize,

        /// Overrides the config seed
        #[arg(short, long)]
        seed: Option<u64>,

        /// Skip the routing oracle and use great-circle distances
        #[arg(long)]
        offline: bool,

        /// Zone to create before training: lat,lon,category[,severity[,radius_km]]
        #[arg(short, long = "disaster", value_parser = parse_zone, allow_hyphen_values = true)]
        disasters: Vec<ZoneRequest>,

        /// Snapshot to restore before training
        #[arg(long)]
        import: Option<PathBuf>,

        /// Where to write the snapshot after training
        #[arg(long)]
        export: Option<PathBuf>,

        /// Print the final comparison as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the effective configuration
    Info {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn parse_zone(text: &str) -> Result<ZoneRequest, String> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    if !(3..=5).contains(&parts.len()) {
        return Err("expected lat,lon,category[,severity[,radius_km]]".to_string());
    }
    let number = |s: &str| s.parse::<f64>().map_err(|e| format!("'{}': {}", s, e));
    let category: DisasterCategory = parts[2].parse().map_err(|e: routelearn::SimError| e.to_string())?;
    let mut request = ZoneRequest::new(number(parts[0])?, number(parts[1])?, category, 2, 50.0);
    if let Some(level) = parts.get(3) {
        request.severity = level.parse::<u8>().map_err(|e| format!("'{}': {}", level, e))?;
    }
    if let Some(radius) = parts.get(4) {
        request.radius_km = number(*radius)?;
    }
    Ok(request)
}

fn load_config(path: Option<&PathBuf>) -> CliResult<SimConfig> {
    match path {
        Some(path) => Ok(SimConfig::from_file(path)?),
        None => Ok(SimConfig::default()),
    }
}

fn info(config: Option<PathBuf>) -> CliResult<()> {
    let config = load_config(config.as_ref())?;
    let nodes = config.node_map()?;
    println!("nodes:          {}", nodes.len());
    println!("region:         {}", config.region);
    println!("disaster limit: {}", config.disaster_limit);
    println!("oracle:         {}", if config.oracle.enabled { config.oracle.base_url.as_str() } else { "disabled" });
    println!("seed:           {}", config.seed.map_or("entropy".to_string(), |s| s.to_string()));
    for profile in &config.agents {
        println!(
            "agent {:<10} {:<12} {:<7} vehicle={} cargo={}",
            profile.name,
            profile.kind.as_str(),
            profile.color,
            profile.fleet.vehicle,
            profile.fleet.cargo
        );
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn train(
    config: Option<PathBuf>,
    episodes: usize,
    seed: Option<u64>,
    offline: bool,
    disasters: Vec<ZoneRequest>,
    import: Option<PathBuf>,
    export: Option<PathBuf>,
    json: bool,
) -> CliResult<()> {
    let mut config = load_config(config.as_ref())?;
    if seed.is_some() {
        config.seed = seed;
    }
    if offline {
        config.oracle.enabled = false;
    }

    let mut sim = Simulation::new(config)?;
    if let Some(path) = import {
        let snapshot = Snapshot::from_json(&fs::read_to_string(&path)?)?;
        let summary = sim.import_tables(&snapshot)?;
        info!(path = %path.display(), agents = summary.agents_restored.len(), "snapshot restored");
    }
    for request in &disasters {
        sim.create_disaster(request)?;
    }

    info!(episodes, "training started");
    let objectives = HashMap::new();
    let mut failures = 0;
    for _ in 0..episodes {
        failures += sim.advance_episode(&objectives).failures.len();
    }
    info!(episodes = sim.episodes(), failures, "training finished");

    if let Some(path) = export {
        fs::write(&path, sim.export_tables().to_json()?)?;
        info!(path = %path.display(), "snapshot written");
    }

    let comparison = sim.compare_agents();
    if json {
        println!("{}", serde_json::to_string_pretty(&comparison)?);
        return Ok(());
    }
    println!(
        "{:<10} {:<12} {:>12} {:>10} {:>8} {:>8} {:>14}",
        "agent", "algorithm", "distance_km", "profit", "epsilon", "states", "rank p/g/c"
    );
    for row in &comparison.agents {
        println!(
            "{:<10} {:<12} {:>12.2} {:>10.2} {:>8.4} {:>8} {:>14}",
            row.agent,
            row.kind.as_str(),
            row.distance,
            row.profit,
            row.epsilon,
            row.states_explored,
            format!("{}/{}/{}", row.ranking.profit, row.ranking.green, row.ranking.cost)
        );
    }
    if let Some(winners) = &comparison.winners {
        println!(
            "most profitable: {}  greenest: {}  lowest cost: {}",
            winners.most_profitable, winners.most_green, winners.lowest_cost
        );
    }
    for entry in sim.hall_of_fame() {
        println!("#{} {} {:.2} km", entry.rank, entry.agent, entry.distance);
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(err) = init_logging(args.log_level) {
        eprintln!("logging disabled: {}", err);
    }

    let result = match args.command {
        Command::Train {
            config,
            episodes,
            seed,
            offline,
            disasters,
            import,
            export,
            json,
        } => train(config, episodes, seed, offline, disasters, import, export, json),
        Command::Info { config } => info(config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_zone_arguments() {
        let zone = parse_zone("-6.9, 107.6, storm, 3, 25").unwrap();
        assert_eq!(zone.category, DisasterCategory::Storm);
        assert_eq!(zone.severity, 3);
        assert_eq!(zone.radius_km, 25.0);

        let zone = parse_zone("-6.9,107.6,flood").unwrap();
        assert_eq!(zone.severity, 2);
        assert_eq!(zone.radius_km, 50.0);

        assert!(parse_zone("-6.9,107.6").is_err());
        assert!(parse_zone("-6.9,107.6,tsunami").is_err());
        assert!(parse_zone("x,107.6,flood").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
