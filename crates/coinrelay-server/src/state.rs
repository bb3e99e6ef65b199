//! Shared application state for the Coin Relay server.
//!
//! [`AppState`] owns the [`GameRegistry`] and the broadcast channel that
//! fans game updates out to every connected `WebSocket` client. Mutating
//! calls go through [`AppState`] rather than the registry directly so
//! that every successful mutation is followed by a broadcast of the new
//! game state, whether it came in over REST or over a socket.

use coinrelay_core::{GameRegistry, RelayError};
use coinrelay_types::{Game, GameId, ParticipantId, RelayEffect, UnitId};
use tokio::sync::broadcast;
use tracing::warn;

/// Capacity of the broadcast channel for game updates.
///
/// A subscriber that falls further behind than this receives
/// [`broadcast::error::RecvError::Lagged`] and skips to the newest message.
const BROADCAST_CAPACITY: usize = 256;

/// JSON message pushed to `WebSocket` subscribers.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameBroadcast {
    /// The game changed (join, unit completion, relay cascade).
    GameUpdate {
        /// The game that changed.
        game_id: GameId,
        /// Full snapshot after the change.
        data: Game,
    },
    /// The game was started.
    GameStarted {
        /// The game that started.
        game_id: GameId,
        /// Full snapshot after seeding round 1.
        data: Game,
    },
    /// Animation hint: a participant is flipping a unit.
    UnitFlipped {
        /// The game the unit belongs to.
        game_id: GameId,
        /// The unit being flipped.
        unit_id: UnitId,
    },
    /// The game was removed from the registry.
    GameRemoved {
        /// The removed game.
        game_id: GameId,
    },
}

impl GameBroadcast {
    /// The game this message concerns.
    pub const fn game_id(&self) -> GameId {
        match self {
            Self::GameUpdate { game_id, .. }
            | Self::GameStarted { game_id, .. }
            | Self::UnitFlipped { game_id, .. }
            | Self::GameRemoved { game_id } => *game_id,
        }
    }
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`](std::sync::Arc) and injected via Axum's `State`
/// extractor.
#[derive(Debug)]
pub struct AppState {
    /// Every live game.
    pub registry: GameRegistry,
    /// Broadcast sender for game updates.
    pub tx: broadcast::Sender<GameBroadcast>,
}

impl AppState {
    /// Create a new application state with an empty registry.
    pub fn new() -> Self {
        Self::with_registry(GameRegistry::new())
    }

    /// Create application state around an existing registry.
    pub fn with_registry(registry: GameRegistry) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { registry, tx }
    }

    /// Subscribe to game updates.
    pub fn subscribe(&self) -> broadcast::Receiver<GameBroadcast> {
        self.tx.subscribe()
    }

    /// Publish a message to all connected clients.
    ///
    /// Returns the number of receivers. Zero receivers is not an error.
    pub fn broadcast(&self, message: GameBroadcast) -> usize {
        self.tx.send(message).unwrap_or(0)
    }

    /// Add a participant and broadcast the updated game.
    ///
    /// # Errors
    ///
    /// Propagates [`GameRegistry::add_participant`] failures.
    pub fn add_participant(&self, game_id: GameId, name: &str) -> Result<ParticipantId, RelayError> {
        let participant_id = self.registry.add_participant(game_id, name)?;
        self.publish_state(game_id, false);
        Ok(participant_id)
    }

    /// Start a game and broadcast it as started.
    ///
    /// # Errors
    ///
    /// Propagates [`GameRegistry::start_game`] failures.
    pub fn start_game(&self, game_id: GameId) -> Result<Vec<RelayEffect>, RelayError> {
        let effects = self.registry.start_game(game_id)?;
        self.publish_state(game_id, true);
        Ok(effects)
    }

    /// Complete a unit and broadcast the updated game.
    ///
    /// # Errors
    ///
    /// Propagates [`GameRegistry::complete_unit`] failures.
    pub fn complete_unit(
        &self,
        game_id: GameId,
        participant_id: ParticipantId,
        unit_id: UnitId,
    ) -> Result<Vec<RelayEffect>, RelayError> {
        let effects = self
            .registry
            .complete_unit(game_id, participant_id, unit_id)?;
        self.publish_state(game_id, false);
        Ok(effects)
    }

    /// Broadcast a flip animation hint for a unit of an existing game.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::GameNotFound`] or [`RelayError::UnitNotFound`].
    pub fn flip_unit(&self, game_id: GameId, unit_id: UnitId) -> Result<(), RelayError> {
        let game = self.registry.get_state(game_id)?;
        if game.unit(unit_id).is_none() {
            return Err(RelayError::UnitNotFound(unit_id));
        }
        self.broadcast(GameBroadcast::UnitFlipped { game_id, unit_id });
        Ok(())
    }

    /// Remove a game and tell its subscribers.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::GameNotFound`] for an unknown game.
    pub fn remove_game(&self, game_id: GameId) -> Result<(), RelayError> {
        self.registry.remove_game(game_id)?;
        self.broadcast(GameBroadcast::GameRemoved { game_id });
        Ok(())
    }

    /// Evict completed games past their retention window and tell their
    /// subscribers.
    pub fn evict_completed(&self, retention_ms: i64) -> usize {
        let evicted = self.registry.evict_completed(retention_ms);
        for game_id in &evicted {
            self.broadcast(GameBroadcast::GameRemoved { game_id: *game_id });
        }
        evicted.len()
    }

    fn publish_state(&self, game_id: GameId, started: bool) {
        match self.registry.get_state(game_id) {
            Ok(data) if started => {
                self.broadcast(GameBroadcast::GameStarted { game_id, data });
            }
            Ok(data) => {
                self.broadcast(GameBroadcast::GameUpdate { game_id, data });
            }
            Err(err) => warn!(%game_id, error = %err, "Game vanished before broadcast"),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
