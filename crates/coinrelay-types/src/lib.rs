//! Shared type definitions for the Coin Relay game.
//!
//! This crate is the single source of truth for the entity model used by
//! the relay engine and the HTTP/`WebSocket` adapter. Types defined here flow
//! downstream to `TypeScript` via `ts-rs` for the browser client.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for games, participants, and units
//! - [`enums`] -- Target side and status enumerations
//! - [`structs`] -- `Unit`, `Participant`, `Game`, and listing summaries
//! - [`effects`] -- Ordered side effects reported by game operations

pub mod effects;
pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use effects::RelayEffect;
pub use enums::{GameStatus, ParticipantStatus, TargetSide, UnitStatus};
pub use ids::{GameId, ParticipantId, UnitId};
pub use structs::{
    Game, GameSummary, MIN_PARTICIPANTS, Participant, ROUND_COUNT, UNITS_PER_ROUND, Unit,
};
