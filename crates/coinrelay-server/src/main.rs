//! Coin Relay server binary.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `COINRELAY_CONFIG` or `coinrelay-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Create the game registry and shared state
//! 4. Spawn the completed-game sweeper
//! 5. Serve HTTP + `WebSocket` until `Ctrl-C`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use coinrelay_core::config::{LoggingConfig, RelayConfig};
use coinrelay_server::state::AppState;
use coinrelay_server::{start_server, sweeper};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Default config file name, resolved against the working directory.
const DEFAULT_CONFIG_PATH: &str = "coinrelay-config.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config, source) = load_config()?;
    init_tracing(&config.logging);

    info!(
        config = source.as_deref().unwrap_or("defaults"),
        host = %config.server.host,
        port = config.server.port,
        "coinrelay-server starting"
    );

    let state = Arc::new(AppState::new());
    let sweeper = sweeper::spawn_sweeper(&config.games, Arc::clone(&state));

    let result = start_server(&config.server, state).await;

    if let Some(handle) = sweeper {
        handle.abort();
    }
    result.context("server failed")
}

/// Load the config file if there is one, otherwise fall back to defaults.
///
/// An explicit `COINRELAY_CONFIG` path must exist.
fn load_config() -> anyhow::Result<(RelayConfig, Option<String>)> {
    if let Ok(path) = std::env::var("COINRELAY_CONFIG") {
        let config = RelayConfig::from_file(&PathBuf::from(&path))
            .with_context(|| format!("loading config from {path}"))?;
        return Ok((config, Some(path)));
    }

    let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
    if default_path.exists() {
        let config = RelayConfig::from_file(&default_path)
            .with_context(|| format!("loading config from {DEFAULT_CONFIG_PATH}"))?;
        return Ok((config, Some(DEFAULT_CONFIG_PATH.to_owned())));
    }

    Ok((RelayConfig::parse("")?, None))
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}
