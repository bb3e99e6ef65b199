//! Error types for the relay engine.
//!
//! Every public engine operation returns `Result<_, RelayError>`. Failures
//! are local and non-fatal: the game they refer to is left exactly as it
//! was before the call.

use coinrelay_types::{GameId, ParticipantId, UnitId};

/// Coarse classification of a [`RelayError`], used by adapters to pick a
/// response code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A referenced game, participant, or unit does not exist.
    NotFound,
    /// The operation is not legal in the current game or participant status.
    InvalidState,
    /// The unit exists but is not actionable by the calling participant.
    NotOwned,
}

/// Errors that can occur during game operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// No game with this id is registered.
    #[error("game not found: {0}")]
    GameNotFound(GameId),

    /// No participant with this id has joined the game.
    #[error("participant not found: {0}")]
    ParticipantNotFound(ParticipantId),

    /// No unit with this id exists in the game.
    #[error("unit not found: {0}")]
    UnitNotFound(UnitId),

    /// The operation is not allowed right now.
    #[error("invalid state: {reason}")]
    InvalidState {
        /// Why the operation was rejected.
        reason: String,
    },

    /// The unit is not in the participant's actionable set.
    #[error("unit {unit} is not actionable by participant {participant}")]
    NotOwned {
        /// The unit the caller tried to complete.
        unit: UnitId,
        /// The calling participant.
        participant: ParticipantId,
    },
}

impl RelayError {
    /// Build an [`RelayError::InvalidState`] from any message.
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }

    /// Classify the error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::GameNotFound(_) | Self::ParticipantNotFound(_) | Self::UnitNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::NotOwned { .. } => ErrorKind::NotOwned,
        }
    }
}
