//! In-memory registry of games.
//!
//! Each game sits behind its own mutex, so operations on different games
//! never contend and operations on the same game are serialized. Mutating
//! calls run the lifecycle function on a scratch copy of the game and
//! swap it in only on success, so a failed call leaves the stored game
//! untouched and readers never see a half-applied cascade.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use coinrelay_types::{Game, GameId, GameStatus, GameSummary, ParticipantId, RelayEffect, UnitId};
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::error::RelayError;
use crate::game;

type GameSlot = Arc<Mutex<Game>>;

/// Thread-safe store of every live game, keyed by id.
#[derive(Debug)]
pub struct GameRegistry {
    games: RwLock<BTreeMap<GameId, GameSlot>>,
    clock: Arc<dyn Clock>,
}

impl Default for GameRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GameRegistry {
    /// Create an empty registry on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty registry driven by `clock`.
    pub const fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            games: RwLock::new(BTreeMap::new()),
            clock,
        }
    }

    /// Register a new empty game and return its id.
    pub fn create_game(&self) -> GameId {
        let game = game::create_game(self.clock.now_ms());
        let game_id = game.id;
        self.write_games().insert(game_id, Arc::new(Mutex::new(game)));
        game_id
    }

    /// Add a named participant to a waiting game.
    ///
    /// # Errors
    ///
    /// [`RelayError::GameNotFound`] for an unknown game, otherwise whatever
    /// [`game::add_participant`] rejects.
    pub fn add_participant(&self, game_id: GameId, name: &str) -> Result<ParticipantId, RelayError> {
        self.mutate(game_id, |game| game::add_participant(game, name))
    }

    /// Start a waiting game.
    ///
    /// # Errors
    ///
    /// [`RelayError::GameNotFound`] for an unknown game, otherwise whatever
    /// [`game::start_game`] rejects.
    pub fn start_game(&self, game_id: GameId) -> Result<Vec<RelayEffect>, RelayError> {
        let now_ms = self.clock.now_ms();
        self.mutate(game_id, |game| {
            game::start_game(game, now_ms, &mut rand::rng())
        })
    }

    /// Complete a unit on behalf of a participant.
    ///
    /// # Errors
    ///
    /// [`RelayError::GameNotFound`] for an unknown game, otherwise whatever
    /// [`game::complete_unit`] rejects.
    pub fn complete_unit(
        &self,
        game_id: GameId,
        participant_id: ParticipantId,
        unit_id: UnitId,
    ) -> Result<Vec<RelayEffect>, RelayError> {
        let now_ms = self.clock.now_ms();
        self.mutate(game_id, |game| {
            game::complete_unit(game, participant_id, unit_id, now_ms, &mut rand::rng())
        })
    }

    /// A consistent snapshot of the game.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::GameNotFound`] for an unknown game.
    pub fn get_state(&self, game_id: GameId) -> Result<Game, RelayError> {
        let slot = self.slot(game_id)?;
        let snapshot = lock_game(&slot).clone();
        Ok(snapshot)
    }

    /// Whether a game with this id is registered.
    pub fn game_exists(&self, game_id: GameId) -> bool {
        self.read_games().contains_key(&game_id)
    }

    /// Summaries of every registered game, ordered by id.
    pub fn list_games(&self) -> Vec<GameSummary> {
        self.slots()
            .iter()
            .map(|(_, slot)| lock_game(slot).summary())
            .collect()
    }

    /// Drop a game from the registry.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::GameNotFound`] for an unknown game.
    pub fn remove_game(&self, game_id: GameId) -> Result<(), RelayError> {
        if self.write_games().remove(&game_id).is_none() {
            return Err(RelayError::GameNotFound(game_id));
        }
        info!(%game_id, "Game removed");
        Ok(())
    }

    /// Remove completed games that finished at least `retention_ms` ago.
    ///
    /// Returns the ids that were removed.
    pub fn evict_completed(&self, retention_ms: i64) -> Vec<GameId> {
        let cutoff = self.clock.now_ms().saturating_sub(retention_ms);
        let expired: Vec<GameId> = self
            .slots()
            .iter()
            .filter(|(_, slot)| {
                let game = lock_game(slot);
                game.status == GameStatus::Completed
                    && game.finished_at_ms.is_some_and(|at| at <= cutoff)
            })
            .map(|(game_id, _)| *game_id)
            .collect();

        if !expired.is_empty() {
            let mut games = self.write_games();
            for game_id in &expired {
                games.remove(game_id);
            }
            info!(evicted = expired.len(), "Evicted completed games");
        }
        expired
    }

    /// Number of registered games.
    pub fn len(&self) -> usize {
        self.read_games().len()
    }

    /// Whether no games are registered.
    pub fn is_empty(&self) -> bool {
        self.read_games().is_empty()
    }

    /// Run `op` on a scratch copy of the game and commit it on success.
    fn mutate<T>(
        &self,
        game_id: GameId,
        op: impl FnOnce(&mut Game) -> Result<T, RelayError>,
    ) -> Result<T, RelayError> {
        let slot = self.slot(game_id)?;
        let mut stored = lock_game(&slot);
        let mut draft = stored.clone();
        match op(&mut draft) {
            Ok(value) => {
                *stored = draft;
                Ok(value)
            }
            Err(err) => {
                debug!(%game_id, error = %err, "Operation rejected");
                Err(err)
            }
        }
    }

    fn slot(&self, game_id: GameId) -> Result<GameSlot, RelayError> {
        self.read_games()
            .get(&game_id)
            .cloned()
            .ok_or(RelayError::GameNotFound(game_id))
    }

    /// Clone the slot handles so per-game locks are taken after the map
    /// lock is released.
    fn slots(&self) -> Vec<(GameId, GameSlot)> {
        self.read_games()
            .iter()
            .map(|(game_id, slot)| (*game_id, Arc::clone(slot)))
            .collect()
    }

    fn read_games(&self) -> RwLockReadGuard<'_, BTreeMap<GameId, GameSlot>> {
        self.games.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_games(&self) -> RwLockWriteGuard<'_, BTreeMap<GameId, GameSlot>> {
        self.games.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn lock_game(slot: &Mutex<Game>) -> MutexGuard<'_, Game> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}
