//! WebSocket frame types for the realtime gateway.
//!
//! Every frame is a JSON text message tagged by `event`:
//! - Client → Server: `join-user-room`, `send-message`, `ping`
//! - Server → Client: `receive-message`, `message-error`, `joined`, `pong`

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;
use crate::domain::messaging::RealtimeEnvelope;

// ============================================
// Server → Client Messages
// ============================================

/// All frames the server can push to a connection.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// A live message for the connection's room.
    ReceiveMessage(RealtimeEnvelope),

    /// A frame from this connection could not be handled.
    MessageError(ErrorMessage),

    /// The connection joined a user room.
    Joined(JoinedMessage),

    /// Heartbeat response.
    Pong(PongMessage),
}

impl ServerMessage {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        ServerMessage::MessageError(ErrorMessage {
            code: code.into(),
            message: message.into(),
            timestamp: Timestamp::now().to_rfc3339(),
        })
    }

    pub fn joined(room: impl Into<String>) -> Self {
        ServerMessage::Joined(JoinedMessage { room: room.into() })
    }

    pub fn pong() -> Self {
        ServerMessage::Pong(PongMessage {
            timestamp: Timestamp::now().to_rfc3339(),
        })
    }
}

/// Error sent back to the connection that caused it.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorMessage {
    pub code: String,
    pub message: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinedMessage {
    pub room: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PongMessage {
    pub timestamp: String,
}

// ============================================
// Client → Server Messages
// ============================================

/// All frames a client can send.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Subscribe this connection to a user's room.
    JoinUserRoom(JoinUserRoom),

    /// Relay a live message to the receiver's room.
    SendMessage(SendMessageFrame),

    /// Heartbeat.
    Ping,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinUserRoom {
    #[serde(default)]
    pub user_id: String,
}

/// Fields are optional on the wire so that a missing one is reported as a
/// `message-error` rather than an unparseable frame.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageFrame {
    #[serde(default)]
    pub sender_id: String,
    #[serde(default)]
    pub receiver_id: String,
    #[serde(default)]
    pub sender_name: String,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;

    #[test]
    fn join_frame_deserializes() {
        let frame: ClientMessage =
            serde_json::from_str(r#"{"event":"join-user-room","userId":"B"}"#).unwrap();

        match frame {
            ClientMessage::JoinUserRoom(join) => assert_eq!(join.user_id, "B"),
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[test]
    fn send_frame_deserializes_with_missing_fields() {
        let frame: ClientMessage =
            serde_json::from_str(r#"{"event":"send-message","senderId":"A"}"#).unwrap();

        match frame {
            ClientMessage::SendMessage(send) => {
                assert_eq!(send.sender_id, "A");
                assert!(send.receiver_id.is_empty());
            }
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[test]
    fn ping_frame_deserializes() {
        let frame: ClientMessage = serde_json::from_str(r#"{"event":"ping"}"#).unwrap();
        assert!(matches!(frame, ClientMessage::Ping));
    }

    #[test]
    fn unknown_event_is_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"event":"typing"}"#).is_err());
    }

    #[test]
    fn receive_message_serializes_envelope_fields() {
        let envelope = RealtimeEnvelope::new(UserId::new("A").unwrap(), "Alice", "hi");
        let json = serde_json::to_value(ServerMessage::ReceiveMessage(envelope)).unwrap();

        assert_eq!(json["event"], "receive-message");
        assert_eq!(json["senderId"], "A");
        assert_eq!(json["senderName"], "Alice");
        assert_eq!(json["message"], "hi");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn error_serializes_code_and_message() {
        let json = serde_json::to_value(ServerMessage::error("VALIDATION_FAILED", "bad")).unwrap();

        assert_eq!(json["event"], "message-error");
        assert_eq!(json["code"], "VALIDATION_FAILED");
        assert_eq!(json["message"], "bad");
    }
}
