//! Enumeration types for the Coin Relay game.
//!
//! Wire names match what the browser client expects: unit and participant
//! statuses serialize in `PascalCase`, game status in `snake_case`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// The side a coin must land on for a unit to count.
///
/// Every unit produced by one round-generation event shares the same side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum TargetSide {
    /// Flip the coin to heads.
    Heads,
    /// Flip the coin to tails.
    Tails,
}

impl core::fmt::Display for TargetSide {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Heads => f.write_str("Heads"),
            Self::Tails => f.write_str("Tails"),
        }
    }
}

/// Lifecycle of a single unit. There is no way back from `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum UnitStatus {
    /// Not yet flipped by its owner.
    Pending,
    /// Flipped; eligible to be cloned downstream.
    Completed,
}

/// Where a participant is in the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum ParticipantStatus {
    /// Joined, or between pieces of work.
    Waiting,
    /// Holds actionable units.
    Active,
    /// The game is over.
    Idle,
}

/// Global status of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum GameStatus {
    /// Accepting participants; no units exist yet.
    Waiting,
    /// Rounds are being played.
    InProgress,
    /// The last participant finished the final round.
    Completed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_status_uses_snake_case() {
        let json = serde_json::to_string(&GameStatus::InProgress).ok();
        assert_eq!(json.as_deref(), Some("\"in_progress\""));
    }

    #[test]
    fn participant_status_keeps_variant_names() {
        let json = serde_json::to_string(&ParticipantStatus::Waiting).ok();
        assert_eq!(json.as_deref(), Some("\"Waiting\""));
    }

    #[test]
    fn target_side_display() {
        assert_eq!(TargetSide::Heads.to_string(), "Heads");
        assert_eq!(TargetSide::Tails.to_string(), "Tails");
    }
}
