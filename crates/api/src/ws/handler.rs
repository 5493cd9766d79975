//! WebSocket upgrade endpoint and per-session read/write loops.
//!
//! `GET /ws/rooms/{id}?access_token=...&user_id=...` -- browsers cannot set
//! custom headers on a WebSocket handshake, so credentials travel as query
//! parameters. The access token is validated before admission and its
//! subject must equal the supplied `user_id`.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::response::Response;
use chrono::Utc;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use huddle_core::error::CoreError;
use huddle_core::types::DbId;
use huddle_db::repositories::{ChatRepo, ParticipantRepo};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::ws::hub::SessionId;
use crate::ws::messages::{
    ChatAckPayload, ChatPayload, ParticipantStateItem, PeerEventPayload, StatePayload, WsMessage,
};

/// Maximum chat message length in characters.
const MAX_CHAT_CHARS: usize = 4000;

/// Deadline for a single socket write.
const WRITE_DEADLINE: Duration = Duration::from_secs(5);

/// Credentials carried on the upgrade request.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub access_token: Option<String>,
    pub user_id: Option<String>,
}

/// HTTP handler that authenticates and upgrades the connection.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(room_id): Path<Uuid>,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> AppResult<Response> {
    let token = query
        .access_token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("missing access_token".into()))?;

    let user_id: DbId = query
        .user_id
        .as_deref()
        .map(str::trim)
        .and_then(|v| v.parse().ok())
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::Unauthorized("invalid user_id".into()))?;

    let subject = state.signer.user_id_from_token(token)?;
    if subject != user_id {
        return Err(AppError::Unauthorized(
            "user_id does not match token subject".into(),
        ));
    }

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, room_id, user_id)))
}

/// Manage one live session from admission to teardown.
///
/// The teardown sequence (hub removal, best-effort leave, `peer_left`
/// broadcast, socket close) runs however the read loop exits -- error, read
/// deadline, client close, or a panic inside the loop task.
async fn handle_socket(socket: WebSocket, state: AppState, room_id: Uuid, user_id: DbId) {
    let session_id: SessionId = Uuid::new_v4();
    let ping_interval = Duration::from_secs(state.config.rooms.ping_interval_secs);

    let rx = state.hub.add(room_id, session_id, user_id).await;
    tracing::info!(%room_id, user_id, %session_id, "websocket session joined");

    let (sink, stream) = socket.split();

    let write_task = tokio::spawn(write_loop(
        sink,
        rx,
        state.clone(),
        room_id,
        user_id,
        ping_interval,
    ));

    // Snapshot for the joining session only, then announce to the room.
    send_state_snapshot(&state, room_id, session_id).await;
    state
        .hub
        .broadcast(room_id, &peer_event_joined(room_id, user_id))
        .await;

    let read_task = tokio::spawn(read_loop(
        stream,
        state.clone(),
        room_id,
        session_id,
        user_id,
        ping_interval,
    ));
    if let Err(err) = read_task.await {
        tracing::error!(%room_id, user_id, error = %err, "websocket read task aborted");
    }

    // Teardown. Removal precedes the close of the underlying socket.
    state.hub.remove(room_id, session_id).await;

    if let Err(err) = ParticipantRepo::leave(&state.pool, room_id, user_id).await {
        tracing::debug!(%room_id, user_id, error = %err, "leave on disconnect failed");
    }
    state
        .hub
        .broadcast(room_id, &peer_event_left(room_id, user_id))
        .await;

    write_task.abort();
    tracing::info!(%room_id, user_id, %session_id, "websocket session left");
}

fn peer_event_joined(room_id: Uuid, user_id: DbId) -> WsMessage {
    WsMessage::PeerJoined(PeerEventPayload {
        room_id: room_id.to_string(),
        user_id: user_id.to_string(),
    })
}

fn peer_event_left(room_id: Uuid, user_id: DbId) -> WsMessage {
    WsMessage::PeerLeft(PeerEventPayload {
        room_id: room_id.to_string(),
        user_id: user_id.to_string(),
    })
}

/// Push the current roster to the session that just joined. Existing
/// sessions are not re-synchronized; they get the incremental `peer_joined`.
async fn send_state_snapshot(state: &AppState, room_id: Uuid, session_id: SessionId) {
    let participants = match ParticipantRepo::list_by_room(&state.pool, room_id).await {
        Ok(rows) => rows,
        Err(err) => {
            tracing::warn!(%room_id, error = %err, "failed to load roster for snapshot");
            return;
        }
    };

    let items = participants
        .into_iter()
        .map(|p| ParticipantStateItem {
            user_id: p.user_id.to_string(),
            joined_at_unix: p.joined_at.timestamp(),
            last_seen_unix: p.last_seen.timestamp(),
        })
        .collect();

    let snapshot = WsMessage::State(StatePayload {
        room_id: room_id.to_string(),
        participants: items,
    });
    if !state.hub.send_to(room_id, session_id, &snapshot).await {
        tracing::warn!(%room_id, %session_id, "failed to queue state snapshot");
    }
}

/// Consume inbound frames until the socket closes, errors, or goes silent
/// for twice the ping interval.
async fn read_loop(
    mut stream: SplitStream<WebSocket>,
    state: AppState,
    room_id: Uuid,
    session_id: SessionId,
    user_id: DbId,
    ping_interval: Duration,
) {
    let read_deadline = 2 * ping_interval;

    // Mark presence as soon as the channel is live.
    touch_heartbeat(&state, room_id, user_id).await;

    loop {
        let frame = match tokio::time::timeout(read_deadline, stream.next()).await {
            Err(_) => {
                tracing::debug!(%room_id, user_id, "read deadline exceeded");
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(err))) => {
                tracing::debug!(%room_id, user_id, error = %err, "websocket receive error");
                break;
            }
            Ok(Some(Ok(frame))) => frame,
        };

        match frame {
            Message::Close(_) => break,
            Message::Pong(_) => {
                touch_heartbeat(&state, room_id, user_id).await;
            }
            Message::Text(text) => {
                handle_text_frame(&state, room_id, session_id, user_id, text.as_str()).await;
            }
            // Binary frames and client pings are ignored; the transport
            // answers pings on its own.
            _ => {}
        }
    }
}

/// Dispatch one inbound text frame. Unparseable and unknown frames are
/// dropped.
async fn handle_text_frame(
    state: &AppState,
    room_id: Uuid,
    session_id: SessionId,
    user_id: DbId,
    text: &str,
) {
    let Ok(message) = serde_json::from_str::<WsMessage>(text) else {
        return;
    };
    match message {
        WsMessage::Chat(payload) => {
            handle_chat(state, room_id, session_id, user_id, &payload.message).await;
        }
        // Server-originated frame types coming from a client are dropped.
        _ => {}
    }
}

/// Persist and fan out one chat message.
///
/// On a persistence failure the message is still broadcast with a
/// server-assigned timestamp and no id; the ack is only sent when the
/// message actually persisted, so the sender can clear its pending state
/// and deduplicate against the broadcast copy.
async fn handle_chat(
    state: &AppState,
    room_id: Uuid,
    session_id: SessionId,
    user_id: DbId,
    raw_message: &str,
) {
    let text = raw_message.trim();
    if text.is_empty() {
        return;
    }

    let (msg_id, ts_unix) = match save_chat(state, room_id, user_id, text).await {
        Ok(message) => (
            Some(message.id.to_string()),
            Some(message.created_at.timestamp()),
        ),
        Err(err) => {
            tracing::warn!(%room_id, user_id, error = %err, "chat save failed");
            (None, Some(Utc::now().timestamp()))
        }
    };

    // One broadcast to everyone, the sender included; no separate echo.
    let outbound = WsMessage::Chat(ChatPayload {
        room_id: room_id.to_string(),
        user_id: user_id.to_string(),
        message: text.to_string(),
        msg_id: msg_id.clone(),
        ts_unix,
    });
    state.hub.broadcast(room_id, &outbound).await;

    if let Some(msg_id) = msg_id {
        let ack = WsMessage::ChatAck(ChatAckPayload { msg_id });
        state.hub.send_to(room_id, session_id, &ack).await;
    }
}

/// Validate and persist a chat message.
async fn save_chat(
    state: &AppState,
    room_id: Uuid,
    user_id: DbId,
    text: &str,
) -> AppResult<huddle_db::models::message::ChatMessage> {
    if text.chars().count() > MAX_CHAT_CHARS {
        return Err(AppError::Core(CoreError::Validation(format!(
            "message exceeds {MAX_CHAT_CHARS} characters"
        ))));
    }
    let message = ChatRepo::save(&state.pool, room_id, user_id, text, None).await?;
    Ok(message)
}

/// Forward queued frames to the socket and ping on the configured interval.
/// Exits when the outbound queue closes (hub removal) or a write fails.
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: tokio::sync::mpsc::Receiver<Message>,
    state: AppState,
    room_id: Uuid,
    user_id: DbId,
    ping_interval: Duration,
) {
    let mut ticker = tokio::time::interval(ping_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately; the loop should ping one full
    // interval from now.
    ticker.tick().await;

    loop {
        tokio::select! {
            maybe = rx.recv() => match maybe {
                Some(frame) => {
                    if write_with_deadline(&mut sink, frame).await.is_err() {
                        tracing::debug!(%room_id, user_id, "websocket write failed");
                        break;
                    }
                }
                None => break,
            },
            _ = ticker.tick() => {
                if write_with_deadline(&mut sink, Message::Ping(Vec::new().into())).await.is_err() {
                    tracing::debug!(%room_id, user_id, "websocket ping failed");
                    break;
                }
                touch_heartbeat(&state, room_id, user_id).await;
            }
        }
    }

    let _ = sink.close().await;
}

/// One socket write bounded by [`WRITE_DEADLINE`].
async fn write_with_deadline(
    sink: &mut SplitSink<WebSocket, Message>,
    frame: Message,
) -> Result<(), ()> {
    match tokio::time::timeout(WRITE_DEADLINE, sink.send(frame)).await {
        Ok(Ok(())) => Ok(()),
        _ => Err(()),
    }
}

/// Best-effort presence refresh; failures never terminate the session.
async fn touch_heartbeat(state: &AppState, room_id: Uuid, user_id: DbId) {
    if let Err(err) = ParticipantRepo::touch_heartbeat(&state.pool, room_id, user_id).await {
        tracing::debug!(%room_id, user_id, error = %err, "heartbeat touch failed");
    }
}
