//! Relay engine, round controller, and game registry for Coin Relay.
//!
//! Participants form an ordered pipeline. Round work is seeded to the
//! first participant, flows downstream one sub-group at a time as units
//! are completed, and the game ends when the last participant finishes
//! the final round.
//!
//! # Modules
//!
//! - [`schedule`] -- Round/sub-group partition and unit generation.
//! - [`transition`] -- Legal participant and game status transitions.
//! - [`relay`] -- Gating, activation, unit completion, and forwarding.
//! - [`round`] -- Round completion, advancement, and game completion.
//! - [`game`] -- Lifecycle entry points on a single game.
//! - [`registry`] -- [`GameRegistry`], the concurrent store of live games.
//! - [`clock`] -- [`Clock`] trait with system and manual implementations.
//! - [`config`] -- Configuration loading from `coinrelay-config.yaml`.
//! - [`error`] -- [`RelayError`] and its [`ErrorKind`] classification.

pub mod clock;
pub mod config;
pub mod error;
pub mod game;
pub mod registry;
pub mod relay;
pub mod round;
pub mod schedule;
pub mod transition;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ErrorKind, RelayError};
pub use registry::GameRegistry;
