//! Axum router construction for the Coin Relay server.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS and request tracing layers.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// See [`handlers`] for the REST endpoint table. The `WebSocket` channel
/// for a game is `GET /ws/games/{game_id}`.
///
/// CORS allows any origin so browser clients on other hosts of the local
/// network can join.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        // WebSocket
        .route("/ws/games/{game_id}", get(ws::ws_game))
        // REST API
        .route(
            "/api/games",
            get(handlers::list_games).post(handlers::create_game),
        )
        .route(
            "/api/games/{game_id}",
            get(handlers::get_game).delete(handlers::delete_game),
        )
        .route("/api/games/{game_id}/exists", get(handlers::game_exists))
        .route(
            "/api/games/{game_id}/participants",
            post(handlers::join_game),
        )
        .route("/api/games/{game_id}/start", post(handlers::start_game))
        .route(
            "/api/games/{game_id}/participants/{participant_id}/units/{unit_id}/complete",
            post(handlers::complete_unit),
        )
        .route(
            "/api/games/{game_id}/units/{unit_id}/flip",
            post(handlers::flip_unit),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
