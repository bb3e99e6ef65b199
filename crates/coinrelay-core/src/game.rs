//! Game lifecycle: create, join, start, and play.
//!
//! These are the entry points callers use on a single game. Each one
//! checks the game-level status first and then hands over to the relay
//! engine. They mutate the game in place, so callers that need
//! all-or-nothing semantics run them on a scratch copy (see
//! [`GameRegistry`](crate::GameRegistry)).

use coinrelay_types::{
    Game, MIN_PARTICIPANTS, Participant, ParticipantId, ParticipantStatus, RelayEffect, UnitId,
};
use rand::Rng;
use tracing::info;

use crate::error::RelayError;
use crate::relay;
use crate::round;
use crate::transition::{GameEvent, game_transition};

/// Create an empty game in the waiting status.
pub fn create_game(now_ms: i64) -> Game {
    let game = Game::new(now_ms);
    info!(game_id = %game.id, "Game created");
    game
}

/// Append a participant to the pipeline.
///
/// Pipeline position follows join order. Names are trimmed.
///
/// # Errors
///
/// Returns [`RelayError::InvalidState`] if the game has already started or
/// the trimmed name is empty.
pub fn add_participant(game: &mut Game, name: &str) -> Result<ParticipantId, RelayError> {
    game_transition(game.status, GameEvent::ParticipantJoined)?;

    let name = name.trim();
    if name.is_empty() {
        return Err(RelayError::invalid_state("participant name must not be empty"));
    }
    let order = u32::try_from(game.participants.len())
        .map_err(|e| RelayError::invalid_state(format!("too many participants: {e}")))?;

    let participant = Participant::new(name.to_owned(), order);
    let participant_id = participant.id;
    game.participants.push(participant);

    info!(game_id = %game.id, participant = %participant_id, name, order, "Participant joined");
    Ok(participant_id)
}

/// Start the game and seed round 1 to the first participant.
///
/// # Errors
///
/// Returns [`RelayError::InvalidState`] if the game is not waiting or has
/// fewer than [`MIN_PARTICIPANTS`] participants.
pub fn start_game(
    game: &mut Game,
    now_ms: i64,
    rng: &mut impl Rng,
) -> Result<Vec<RelayEffect>, RelayError> {
    let status = game_transition(game.status, GameEvent::Started)?;
    let participant_count = game.participants.len();
    if participant_count < MIN_PARTICIPANTS {
        return Err(RelayError::invalid_state(format!(
            "at least {MIN_PARTICIPANTS} participants are required, found {participant_count}"
        )));
    }

    game.status = status;
    game.current_round = 1;
    for participant in &mut game.participants {
        participant.status = ParticipantStatus::Waiting;
        participant.current_round = 1;
    }

    info!(game_id = %game.id, participant_count, "Game started");
    let mut effects = vec![RelayEffect::GameStarted {
        game_id: game.id,
        participant_count,
    }];
    round::seed_round(game, 1, now_ms, rng, &mut effects)?;
    Ok(effects)
}

/// Complete one of the participant's actionable units.
///
/// # Errors
///
/// - [`RelayError::InvalidState`] if the game is not in progress.
/// - [`RelayError::ParticipantNotFound`], [`RelayError::UnitNotFound`], or
///   [`RelayError::NotOwned`] from the relay engine.
pub fn complete_unit(
    game: &mut Game,
    participant_id: ParticipantId,
    unit_id: UnitId,
    now_ms: i64,
    rng: &mut impl Rng,
) -> Result<Vec<RelayEffect>, RelayError> {
    game_transition(game.status, GameEvent::UnitPlayed)?;

    let mut effects = Vec::new();
    relay::complete_unit(game, participant_id, unit_id, now_ms, rng, &mut effects)?;
    Ok(effects)
}
