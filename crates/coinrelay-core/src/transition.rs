//! Status transitions for participants and games.
//!
//! The relay cascade never writes a status directly. It feeds a named
//! event into one of the pure functions below and stores the result, so
//! every legal move is listed in one place and illegal ones surface as
//! [`RelayError::InvalidState`].

use coinrelay_types::{GameStatus, ParticipantStatus};

use crate::error::RelayError;

/// Events that change a participant's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantEvent {
    /// Units were moved into the participant's actionable set.
    Activated,
    /// The participant ran out of actionable units mid-round.
    Starved,
    /// The participant finished every unit of a round.
    RoundFinished,
    /// The game ended.
    GameFinished,
}

/// Events that change a game's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// A participant asked to join.
    ParticipantJoined,
    /// The game was started.
    Started,
    /// A participant completed a unit.
    UnitPlayed,
    /// The last participant finished the final round.
    Finished,
}

/// Apply `event` to a participant in `status`.
///
/// # Errors
///
/// Returns [`RelayError::InvalidState`] once the participant is idle, since
/// nothing but another `GameFinished` may touch a finished participant.
pub fn participant_transition(
    status: ParticipantStatus,
    event: ParticipantEvent,
) -> Result<ParticipantStatus, RelayError> {
    use ParticipantEvent as E;
    use ParticipantStatus as S;

    match (status, event) {
        (_, E::GameFinished) => Ok(S::Idle),
        (S::Waiting | S::Active, E::Activated) => Ok(S::Active),
        (S::Waiting | S::Active, E::Starved | E::RoundFinished) => Ok(S::Waiting),
        (S::Idle, other) => Err(RelayError::invalid_state(format!(
            "participant is idle and cannot handle {other:?}"
        ))),
    }
}

/// Apply `event` to a game in `status`.
///
/// # Errors
///
/// Returns [`RelayError::InvalidState`] for joins or starts outside the
/// waiting status, plays outside the in-progress status, and anything at
/// all once the game is completed.
pub fn game_transition(status: GameStatus, event: GameEvent) -> Result<GameStatus, RelayError> {
    use GameEvent as E;
    use GameStatus as S;

    match (status, event) {
        (S::Waiting, E::ParticipantJoined) => Ok(S::Waiting),
        (S::Waiting, E::Started) => Ok(S::InProgress),
        (S::InProgress, E::UnitPlayed) => Ok(S::InProgress),
        (S::InProgress, E::Finished) => Ok(S::Completed),
        (S::InProgress, E::ParticipantJoined) => Err(RelayError::invalid_state(
            "cannot join a game that is already in progress",
        )),
        (S::InProgress, E::Started) => Err(RelayError::invalid_state("game already started")),
        (S::Waiting, E::UnitPlayed | E::Finished) => {
            Err(RelayError::invalid_state("game has not started"))
        }
        (S::Completed, _) => Err(RelayError::invalid_state("game is already completed")),
    }
}
