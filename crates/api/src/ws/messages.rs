//! WebSocket wire envelope: `{ "type": ..., "payload": ... }`.
//!
//! User ids cross this boundary as decimal strings -- JavaScript clients
//! cannot represent the full int64 range as numbers.

use serde::{Deserialize, Serialize};

/// Every frame on the live channel. Unknown `type` values fail to
/// deserialize and are dropped by the read loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum WsMessage {
    /// Roster snapshot, sent only to a session that just joined.
    State(StatePayload),
    /// A peer was admitted to the room.
    PeerJoined(PeerEventPayload),
    /// A peer left the room (disconnect, deadline, or explicit close).
    PeerLeft(PeerEventPayload),
    /// Chat message, client→server and server→all.
    Chat(ChatPayload),
    /// Persistence acknowledgement, sent only to the chat sender.
    ChatAck(ChatAckPayload),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatePayload {
    pub room_id: String,
    pub participants: Vec<ParticipantStateItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantStateItem {
    pub user_id: String,
    pub joined_at_unix: i64,
    pub last_seen_unix: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerEventPayload {
    pub room_id: String,
    pub user_id: String,
}

/// Chat payload. Inbound frames carry only `message`; the server fills the
/// rest before fan-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatPayload {
    #[serde(default)]
    pub room_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts_unix: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatAckPayload {
    pub msg_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_frame_round_trips_with_wire_names() {
        let msg = WsMessage::Chat(ChatPayload {
            room_id: "r1".into(),
            user_id: "7".into(),
            message: "hello".into(),
            msg_id: Some("m1".into()),
            ts_unix: Some(1_700_000_000),
        });
        let json = serde_json::to_value(&msg).expect("serialize");

        assert_eq!(json["type"], "chat");
        assert_eq!(json["payload"]["room_id"], "r1");
        assert_eq!(json["payload"]["msg_id"], "m1");

        let back: WsMessage = serde_json::from_value(json).expect("deserialize");
        assert!(matches!(back, WsMessage::Chat(p) if p.message == "hello"));
    }

    #[test]
    fn inbound_chat_needs_only_message() {
        let raw = r#"{"type":"chat","payload":{"message":"hi there"}}"#;
        let msg: WsMessage = serde_json::from_str(raw).expect("deserialize");
        match msg {
            WsMessage::Chat(p) => {
                assert_eq!(p.message, "hi there");
                assert!(p.msg_id.is_none());
            }
            other => panic!("expected chat frame, got {other:?}"),
        }
    }

    #[test]
    fn optional_fields_are_omitted_when_absent() {
        let msg = WsMessage::Chat(ChatPayload {
            room_id: "r1".into(),
            user_id: "7".into(),
            message: "x".into(),
            msg_id: None,
            ts_unix: None,
        });
        let json = serde_json::to_string(&msg).expect("serialize");
        assert!(!json.contains("msg_id"));
        assert!(!json.contains("ts_unix"));
    }

    #[test]
    fn unknown_type_is_a_parse_error() {
        let raw = r#"{"type":"mystery","payload":{}}"#;
        assert!(serde_json::from_str::<WsMessage>(raw).is_err());
    }

    #[test]
    fn peer_event_wire_shape() {
        let msg = WsMessage::PeerJoined(PeerEventPayload {
            room_id: "r1".into(),
            user_id: "42".into(),
        });
        let json = serde_json::to_value(&msg).expect("serialize");
        assert_eq!(json["type"], "peer_joined");
        assert_eq!(json["payload"]["user_id"], "42");
    }
}
