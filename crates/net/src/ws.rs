use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use uuid::Uuid;

use world::protocol::{parse_client_message, ClientMessage};
use world::session::SessionId;

use crate::auth::bearer_token;
use crate::http::AppState;

/// Inbound frames above this size are rejected by the socket.
const READ_LIMIT_BYTES: usize = 2048;
/// A silent peer is dropped after this long; any inbound frame (pongs
/// included) resets the clock.
const READ_TIMEOUT: Duration = Duration::from_secs(60);
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);
const PING_PERIOD: Duration = Duration::from_secs(20);
const CHARACTER_LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

/// `GET /v1/world/ws`: authenticate, upgrade, and hand the socket to the
/// session pumps.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let token = query
        .token
        .clone()
        .or_else(|| bearer_token(&headers).map(str::to_owned));
    let Some(token) = token else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "missing token"})),
        )
            .into_response();
    };
    let account_id = match state.auth.parse_token(&token) {
        Ok(account_id) => account_id,
        Err(_) => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "invalid token"})),
            )
                .into_response();
        }
    };

    ws.max_message_size(READ_LIMIT_BYTES)
        .on_upgrade(move |socket| handle_session(socket, state, account_id))
}

async fn handle_session(socket: WebSocket, state: Arc<AppState>, account_id: Uuid) {
    let (session_id, outbound) = state.world.register(account_id).await;
    tracing::info!(session = %session_id, account = %account_id, "websocket session connected");

    let (sink, stream) = socket.split();
    let writer = tokio::spawn(write_pump(sink, outbound, session_id));

    read_pump(stream, &state, session_id, account_id).await;
    state.world.unregister(session_id).await;

    // Unregister closed the outbound queue; the writer sends its close
    // frame and exits on its own.
    let _ = writer.await;
    tracing::info!(session = %session_id, "websocket session ended");
}

/// Drain the outbound queue to the socket, pinging across idle stretches.
/// Every write carries a deadline so one stuck peer cannot pin the task.
async fn write_pump(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<String>,
    session_id: SessionId,
) {
    let mut ping = tokio::time::interval_at(
        tokio::time::Instant::now() + PING_PERIOD,
        PING_PERIOD,
    );
    ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(text) => {
                    let send = sink.send(Message::Text(text.into()));
                    match tokio::time::timeout(WRITE_TIMEOUT, send).await {
                        Ok(Ok(())) => {}
                        Ok(Err(err)) => {
                            tracing::debug!(session = %session_id, error = %err, "websocket write failed");
                            return;
                        }
                        Err(_) => {
                            tracing::debug!(session = %session_id, "websocket write deadline expired");
                            return;
                        }
                    }
                }
                None => {
                    let close = sink.send(Message::Close(None));
                    let _ = tokio::time::timeout(WRITE_TIMEOUT, close).await;
                    return;
                }
            },
            _ = ping.tick() => {
                let send = sink.send(Message::Ping(Bytes::new()));
                if !matches!(tokio::time::timeout(WRITE_TIMEOUT, send).await, Ok(Ok(()))) {
                    tracing::debug!(session = %session_id, "keep-alive ping failed");
                    return;
                }
            }
        }
    }
}

/// Parse inbound frames and dispatch them to the world. Any read error or
/// an expired deadline ends the session.
async fn read_pump(
    mut stream: SplitStream<WebSocket>,
    state: &Arc<AppState>,
    session_id: SessionId,
    account_id: Uuid,
) {
    loop {
        let frame = match tokio::time::timeout(READ_TIMEOUT, stream.next()).await {
            Ok(Some(Ok(frame))) => frame,
            Ok(Some(Err(err))) => {
                tracing::debug!(session = %session_id, error = %err, "websocket read error");
                return;
            }
            Ok(None) => return,
            Err(_) => {
                tracing::debug!(session = %session_id, "read deadline expired");
                return;
            }
        };

        match frame {
            Message::Text(text) => dispatch(state, session_id, account_id, text.as_str()).await,
            Message::Close(_) => return,
            // Pings are answered by the socket layer; pongs and binary
            // frames only serve to reset the read deadline above.
            Message::Ping(_) | Message::Pong(_) | Message::Binary(_) => {}
        }
    }
}

async fn dispatch(state: &Arc<AppState>, session_id: SessionId, account_id: Uuid, text: &str) {
    let message = match parse_client_message(text) {
        Ok(message) => message,
        Err(reason) => {
            state.world.send_error(session_id, reason).await;
            return;
        }
    };

    match message {
        ClientMessage::Join { character_id } => {
            let character_id = match Uuid::parse_str(character_id.trim()) {
                Ok(id) => id,
                Err(_) => {
                    state.world.send_error(session_id, "invalid character_id").await;
                    return;
                }
            };
            let lookup = state.characters.get_for_account(account_id, character_id);
            match tokio::time::timeout(CHARACTER_LOOKUP_TIMEOUT, lookup).await {
                Ok(Ok(character)) => state.world.join(session_id, character).await,
                Ok(Err(_)) | Err(_) => {
                    state.world.send_error(session_id, "character not found").await;
                }
            }
        }
        ClientMessage::Move { dx, dy } => state.world.move_player(session_id, dx, dy).await,
        ClientMessage::Attack { target_id } => {
            if target_id.trim().is_empty() {
                state.world.send_error(session_id, "target_id is required").await;
                return;
            }
            state.world.attack(session_id, &target_id).await;
        }
    }
}
