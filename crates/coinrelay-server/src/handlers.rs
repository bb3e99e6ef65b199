//! REST API endpoint handlers for the Coin Relay server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/health` | Liveness probe |
//! | `GET` | `/api/games` | List game summaries |
//! | `POST` | `/api/games` | Create a game |
//! | `GET` | `/api/games/{game_id}` | Full game snapshot |
//! | `DELETE` | `/api/games/{game_id}` | Remove a game |
//! | `GET` | `/api/games/{game_id}/exists` | Whether the game exists |
//! | `POST` | `/api/games/{game_id}/participants` | Join a waiting game |
//! | `POST` | `/api/games/{game_id}/start` | Start the game |
//! | `POST` | `/api/games/{game_id}/participants/{participant_id}/units/{unit_id}/complete` | Complete a unit |
//! | `POST` | `/api/games/{game_id}/units/{unit_id}/flip` | Broadcast a flip animation hint |

use std::str::FromStr;
use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use coinrelay_types::{Game, GameId, GameStatus, GameSummary, ParticipantId, RelayEffect, UnitId};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request and response bodies
// ---------------------------------------------------------------------------

/// Body of `POST /api/games/{game_id}/participants`.
#[derive(Debug, serde::Deserialize)]
pub struct JoinRequest {
    /// Display name of the joining participant.
    pub name: String,
}

/// Response of `POST /api/games`.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct CreateGameResponse {
    /// Id of the new game.
    pub game_id: GameId,
}

/// Response of `POST /api/games/{game_id}/participants`.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct JoinResponse {
    /// Id assigned to the new participant.
    pub participant_id: ParticipantId,
}

/// Response of `GET /api/games/{game_id}/exists`.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ExistsResponse {
    /// Whether the game is registered.
    pub exists: bool,
}

/// Response of the mutating game endpoints.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ActionResponse {
    /// Short outcome label (`started`, `completed`, `flipped`).
    pub status: String,
    /// What the operation did, in order.
    #[serde(default)]
    pub effects: Vec<RelayEffect>,
}

impl ActionResponse {
    fn new(status: &str, effects: Vec<RelayEffect>) -> Self {
        Self {
            status: status.to_owned(),
            effects,
        }
    }
}

// ---------------------------------------------------------------------------
// GET / and GET /health
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page with game counts and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let games = state.registry.list_games();
    let total = games.len();
    let waiting = count_status(&games, GameStatus::Waiting);
    let in_progress = count_status(&games, GameStatus::InProgress);
    let completed = count_status(&games, GameStatus::Completed);

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Coin Relay</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #f2cc60; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #f2cc60; font-size: 1.5rem; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
    </style>
</head>
<body>
    <h1>Coin Relay</h1>
    <p class="subtitle">Multiplayer coin-flip relay server</p>

    <div>
        <div class="metric"><div class="label">Games</div><div class="value">{total}</div></div>
        <div class="metric"><div class="label">Waiting</div><div class="value">{waiting}</div></div>
        <div class="metric"><div class="label">In progress</div><div class="value">{in_progress}</div></div>
        <div class="metric"><div class="label">Completed</div><div class="value">{completed}</div></div>
    </div>

    <h2>API</h2>
    <ul>
        <li><a href="/api/games">GET /api/games</a></li>
        <li>POST /api/games</li>
        <li>GET /api/games/{{game_id}}</li>
        <li>POST /api/games/{{game_id}}/participants</li>
        <li>POST /api/games/{{game_id}}/start</li>
        <li>POST /api/games/{{game_id}}/participants/{{participant_id}}/units/{{unit_id}}/complete</li>
        <li>GET /ws/games/{{game_id}}</li>
    </ul>
</body>
</html>"#
    ))
}

/// Liveness probe.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// /api/games
// ---------------------------------------------------------------------------

/// List every registered game.
pub async fn list_games(State(state): State<Arc<AppState>>) -> Json<Vec<GameSummary>> {
    Json(state.registry.list_games())
}

/// Create an empty game.
pub async fn create_game(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let game_id = state.registry.create_game();
    (StatusCode::CREATED, Json(CreateGameResponse { game_id }))
}

/// Full snapshot of one game.
pub async fn get_game(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
) -> Result<Json<Game>, ApiError> {
    let game_id: GameId = parse_id(&game_id)?;
    Ok(Json(state.registry.get_state(game_id)?))
}

/// Whether a game exists.
pub async fn game_exists(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
) -> Result<Json<ExistsResponse>, ApiError> {
    let game_id: GameId = parse_id(&game_id)?;
    Ok(Json(ExistsResponse {
        exists: state.registry.game_exists(game_id),
    }))
}

/// Remove a game.
pub async fn delete_game(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let game_id: GameId = parse_id(&game_id)?;
    state.remove_game(game_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Join a waiting game.
pub async fn join_game(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
    body: Result<Json<JoinRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let game_id: GameId = parse_id(&game_id)?;
    let Json(request) = body.map_err(|e| ApiError::InvalidBody(e.body_text()))?;
    let participant_id = state
        .add_participant(game_id, &request.name)
        .inspect_err(|e| warn!(%game_id, error = %e, "Join rejected"))?;
    Ok((StatusCode::CREATED, Json(JoinResponse { participant_id })))
}

/// Start a game.
pub async fn start_game(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    let game_id: GameId = parse_id(&game_id)?;
    let effects = state
        .start_game(game_id)
        .inspect_err(|e| warn!(%game_id, error = %e, "Start rejected"))?;
    info!(%game_id, "Game started via API");
    Ok(Json(ActionResponse::new("started", effects)))
}

/// Complete a unit on behalf of a participant.
pub async fn complete_unit(
    State(state): State<Arc<AppState>>,
    Path((game_id, participant_id, unit_id)): Path<(String, String, String)>,
) -> Result<Json<ActionResponse>, ApiError> {
    let game_id: GameId = parse_id(&game_id)?;
    let participant_id: ParticipantId = parse_id(&participant_id)?;
    let unit_id: UnitId = parse_id(&unit_id)?;
    let effects = state
        .complete_unit(game_id, participant_id, unit_id)
        .inspect_err(|e| warn!(%game_id, %participant_id, %unit_id, error = %e, "Completion rejected"))?;
    Ok(Json(ActionResponse::new("completed", effects)))
}

/// Broadcast a flip animation hint. Game state is not changed.
pub async fn flip_unit(
    State(state): State<Arc<AppState>>,
    Path((game_id, unit_id)): Path<(String, String)>,
) -> Result<Json<ActionResponse>, ApiError> {
    let game_id: GameId = parse_id(&game_id)?;
    let unit_id: UnitId = parse_id(&unit_id)?;
    state.flip_unit(game_id, unit_id)?;
    Ok(Json(ActionResponse::new("flipped", Vec::new())))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a typed id from a path segment.
pub(crate) fn parse_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| ApiError::InvalidId(format!("{raw}: {e}")))
}

fn count_status(games: &[GameSummary], status: GameStatus) -> usize {
    games.iter().filter(|g| g.status == status).count()
}
