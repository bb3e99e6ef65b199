//! `WebSocket` channel for one game.
//!
//! Clients connect to `GET /ws/games/{game_id}` and receive every
//! [`GameBroadcast`] for that game as a JSON text frame. They may also
//! send `{"type":"complete_unit","participant_id":..,"unit_id":..}` to
//! play a unit without a separate REST call. Rejected commands are
//! answered on the same socket with `{"type":"error","error":..}`;
//! accepted ones show up as the broadcast that follows.
//!
//! If a client falls behind, lagged messages are skipped and the client
//! resumes from the most recent update.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::Response;
use coinrelay_core::RelayError;
use coinrelay_types::{GameId, ParticipantId, UnitId};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::state::{AppState, GameBroadcast};

/// Commands a client may send over the socket.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Complete one of the participant's actionable units.
    CompleteUnit {
        /// The acting participant.
        participant_id: ParticipantId,
        /// The unit to complete.
        unit_id: UnitId,
    },
}

/// Upgrade to a `WebSocket` subscribed to one game.
///
/// # Route
///
/// `GET /ws/games/{game_id}`
pub async fn ws_game(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
) -> Result<Response, ApiError> {
    let game_id: GameId = parse_id(&game_id)?;
    if !state.registry.game_exists(game_id) {
        return Err(RelayError::GameNotFound(game_id).into());
    }
    Ok(ws.on_upgrade(move |socket| handle_ws(socket, state, game_id)))
}

async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>, game_id: GameId) {
    debug!(%game_id, "WebSocket client connected");

    let mut rx = state.subscribe();

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(update) if update.game_id() == game_id => {
                        let removed = matches!(update, GameBroadcast::GameRemoved { .. });
                        if !send_json(&mut socket, &update).await || removed {
                            debug!(%game_id, "WebSocket closed after final update");
                            return;
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(n)) => {
                        debug!(%game_id, skipped = n, "WebSocket client lagged, skipping ahead");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Broadcast channel closed, shutting down WebSocket");
                        return;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(%game_id, "WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Text(text))) => {
                        if let Err(message) = handle_command(&state, game_id, text.as_str()) {
                            let reply = serde_json::json!({ "type": "error", "error": message });
                            if !send_json(&mut socket, &reply).await {
                                return;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!(%game_id, "WebSocket client disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(%game_id, "WebSocket error: {e}");
                        return;
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Decode and run one client command, returning the error text on failure.
fn handle_command(state: &AppState, game_id: GameId, text: &str) -> Result<(), String> {
    let command: ClientMessage =
        serde_json::from_str(text).map_err(|e| format!("invalid message: {e}"))?;
    match command {
        ClientMessage::CompleteUnit {
            participant_id,
            unit_id,
        } => state
            .complete_unit(game_id, participant_id, unit_id)
            .map(|_| ())
            .map_err(|e| {
                warn!(%game_id, %participant_id, %unit_id, error = %e, "Socket completion rejected");
                e.to_string()
            }),
    }
}

/// Serialize `value` and send it as a text frame. Returns `false` once the
/// socket is gone.
async fn send_json<T: serde::Serialize + Sync>(socket: &mut WebSocket, value: &T) -> bool {
    let json = match serde_json::to_string(value) {
        Ok(j) => j,
        Err(e) => {
            warn!("Failed to serialize WebSocket message: {e}");
            return true;
        }
    };
    socket.send(Message::Text(json.into())).await.is_ok()
}
