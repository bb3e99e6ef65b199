//! Background eviction of finished games.

use std::sync::Arc;
use std::time::Duration;

use coinrelay_core::config::GamesConfig;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::state::AppState;

/// Spawn a task that periodically drops completed games older than the
/// configured retention window.
///
/// Returns `None` when `sweep_interval_secs` is zero.
pub fn spawn_sweeper(config: &GamesConfig, state: Arc<AppState>) -> Option<JoinHandle<()>> {
    if config.sweep_interval_secs == 0 {
        info!("Completed-game sweeper disabled");
        return None;
    }

    let period = Duration::from_secs(config.sweep_interval_secs);
    let retention_ms = config.completed_retention_ms();
    info!(
        interval_secs = config.sweep_interval_secs,
        retention_secs = config.completed_retention_secs,
        "Completed-game sweeper started"
    );

    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            let evicted = state.evict_completed(retention_ms);
            debug!(evicted, remaining = state.registry.len(), "Sweep finished");
        }
    }))
}
