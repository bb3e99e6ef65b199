//! HTTP + `WebSocket` adapter for the Coin Relay game.
//!
//! This crate exposes the relay engine over an Axum server:
//!
//! - **REST endpoints** to create, join, start, play, inspect, and remove
//!   games
//! - **`WebSocket` endpoint** (`/ws/games/{game_id}`) that pushes the full
//!   game snapshot after every change and accepts unit completions
//! - **Minimal HTML status page** (`GET /`)
//! - **Background sweeper** that evicts completed games after a retention
//!   window
//!
//! # Architecture
//!
//! Handlers call into [`AppState`], which forwards to the engine's
//! [`GameRegistry`](coinrelay_core::GameRegistry) and then broadcasts the
//! resulting snapshot on a [`tokio::sync::broadcast`] channel. Each socket
//! filters that stream down to its own game.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod sweeper;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::{AppState, GameBroadcast};
