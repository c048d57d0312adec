//! Console logging for the `routelearn` binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the embedding program. `RUST_LOG` takes precedence over the level
//! passed here.

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Installs a compact fmt subscriber filtered at `level`.
///
/// Fails if a global subscriber is already set.
pub fn init_logging(level: Level) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.to_string()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    Registry::default()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr).compact())
        .try_init()?;
    Ok(())
}
