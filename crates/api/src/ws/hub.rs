//! In-memory registry of live WebSocket sessions, keyed by room.
//!
//! Authoritative for one process only. Mutation takes the write lock;
//! broadcast iterates under the read lock and never calls back into
//! add/remove while holding it -- dead sessions found during a broadcast are
//! removed afterwards.

use std::collections::HashMap;

use axum::extract::ws::Message;
use huddle_core::types::DbId;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::ws::messages::WsMessage;

/// Identifier of one live session (connection), unique per process.
pub type SessionId = Uuid;

/// Per-session bounded outbound queue. A session this far behind has its
/// frames dropped rather than stalling fan-out to the rest of the room.
const OUTBOUND_QUEUE: usize = 64;

/// Hub-side handle to one live session: who it is and how to reach its
/// writer task. The socket itself is owned by the session's tasks, never by
/// the hub.
struct SessionHandle {
    user_id: DbId,
    sender: mpsc::Sender<Message>,
}

/// Registry mapping each room id to its set of live sessions.
pub struct RoomHub {
    rooms: RwLock<HashMap<Uuid, HashMap<SessionId, SessionHandle>>>,
}

impl RoomHub {
    /// Create a new, empty hub.
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Register a session and return the receiver half of its outbound
    /// queue for the writer task.
    pub async fn add(
        &self,
        room_id: Uuid,
        session_id: SessionId,
        user_id: DbId,
    ) -> mpsc::Receiver<Message> {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE);
        let handle = SessionHandle {
            user_id,
            sender: tx,
        };
        self.rooms
            .write()
            .await
            .entry(room_id)
            .or_default()
            .insert(session_id, handle);
        rx
    }

    /// Remove a session. Dropping its sender closes the outbound queue,
    /// which ends the writer task. Empty rooms are pruned.
    pub async fn remove(&self, room_id: Uuid, session_id: SessionId) {
        let mut rooms = self.rooms.write().await;
        if let Some(sessions) = rooms.get_mut(&room_id) {
            sessions.remove(&session_id);
            if sessions.is_empty() {
                rooms.remove(&room_id);
            }
        }
    }

    /// Broadcast a message to every session in a room, including the
    /// sender's own session.
    ///
    /// Sends are non-blocking: a full queue drops the frame for that session
    /// only, and sessions whose queue is closed are cleaned out of the map
    /// after the iteration.
    pub async fn broadcast(&self, room_id: Uuid, message: &WsMessage) {
        let Some(frame) = encode_frame(message) else {
            return;
        };

        let mut dead: Vec<SessionId> = Vec::new();
        {
            let rooms = self.rooms.read().await;
            let Some(sessions) = rooms.get(&room_id) else {
                return;
            };
            for (session_id, handle) in sessions {
                match handle.sender.try_send(frame.clone()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        tracing::debug!(%room_id, %session_id, user_id = handle.user_id,
                            "outbound queue full, dropping frame");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        dead.push(*session_id);
                    }
                }
            }
        }

        for session_id in dead {
            self.remove(room_id, session_id).await;
        }
    }

    /// Send a message to one session only (snapshot, chat ack).
    ///
    /// Returns `false` when the session is gone or its queue rejected the
    /// frame.
    pub async fn send_to(
        &self,
        room_id: Uuid,
        session_id: SessionId,
        message: &WsMessage,
    ) -> bool {
        let Some(frame) = encode_frame(message) else {
            return false;
        };
        let rooms = self.rooms.read().await;
        rooms
            .get(&room_id)
            .and_then(|sessions| sessions.get(&session_id))
            .is_some_and(|handle| handle.sender.try_send(frame).is_ok())
    }

    /// Number of live sessions in one room.
    pub async fn room_session_count(&self, room_id: Uuid) -> usize {
        self.rooms
            .read()
            .await
            .get(&room_id)
            .map_or(0, HashMap::len)
    }

    /// Total number of live sessions across all rooms.
    pub async fn session_count(&self) -> usize {
        self.rooms.read().await.values().map(HashMap::len).sum()
    }

    /// Send a Close frame to every session, then clear the map.
    ///
    /// Used during graceful shutdown after the listener stops accepting.
    pub async fn shutdown_all(&self) {
        let mut rooms = self.rooms.write().await;
        let count: usize = rooms.values().map(HashMap::len).sum();
        for sessions in rooms.values() {
            for handle in sessions.values() {
                let _ = handle.sender.try_send(Message::Close(None));
            }
        }
        rooms.clear();
        tracing::info!(count, "Closed all WebSocket sessions");
    }
}

impl Default for RoomHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialize a message once per broadcast.
fn encode_frame(message: &WsMessage) -> Option<Message> {
    match serde_json::to_string(message) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(err) => {
            tracing::error!(error = %err, "failed to encode ws frame");
            None
        }
    }
}
