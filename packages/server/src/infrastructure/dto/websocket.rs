//! WebSocket message DTOs.
//!
//! Inbound events are a tagged enum (`type` field selects the variant).
//! Outbound events are one struct per event, each carrying its
//! `MessageType` tag, so the wire shape stays flat and explicit.

use serde::{Deserialize, Serialize};

/// Wire representation of a fan-out destination.
///
/// `{"kind": "room", "id": 7}` or
/// `{"kind": "conversation", "id": "conv_1_2"}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum DestinationDto {
    Room(i64),
    Conversation(String),
}

/// Events a connected client may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinRoom {
        room_id: i64,
    },
    LeaveRoom {
        room_id: i64,
    },
    SendMessage {
        destination: DestinationDto,
        content: String,
    },
    TypingStart {
        destination: DestinationDto,
    },
    TypingStop {
        destination: DestinationDto,
    },
    MarkSeen {
        message_id: i64,
        destination: DestinationDto,
    },
}

/// Outbound event tags.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Message,
    UserOnline,
    UserOffline,
    OnlineSnapshot,
    TypingStart,
    TypingStop,
    MessageSeen,
    Error,
}

/// A chat message delivered to recipients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEvent {
    pub r#type: MessageType,
    pub id: i64,
    pub sender_id: i64,
    pub sender_name: String,
    pub destination: DestinationDto,
    pub content: String,
    pub status: String,
    pub created_at: String,
}

/// Presence: a user came online.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserOnlineMessage {
    pub r#type: MessageType,
    pub user_id: i64,
    pub display_name: String,
}

/// Presence: a user went offline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserOfflineMessage {
    pub r#type: MessageType,
    pub user_id: i64,
}

/// One entry of the online snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnlineUserInfo {
    pub user_id: i64,
    pub display_name: String,
}

/// Snapshot of currently online users, sent once per new connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnlineSnapshotMessage {
    pub r#type: MessageType,
    pub users: Vec<OnlineUserInfo>,
}

/// A peer started typing in a destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypingStartMessage {
    pub r#type: MessageType,
    pub user_id: i64,
    pub display_name: String,
    pub destination: DestinationDto,
}

/// A peer stopped typing in a destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypingStopMessage {
    pub r#type: MessageType,
    pub user_id: i64,
    pub destination: DestinationDto,
}

/// A read receipt for a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageSeenMessage {
    pub r#type: MessageType,
    pub message_id: i64,
    pub seen_by: i64,
    pub seen_by_name: String,
}

/// A request-scoped error, sent only to the originating connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub r#type: MessageType,
    pub code: String,
    pub message: String,
}

impl ErrorMessage {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            r#type: MessageType::Error,
            code: code.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_event_send_message_deserializes() {
        // テスト項目: send_message イベントの JSON が正しくパースされる
        // given (前提条件):
        let raw = r#"{"type":"send_message","destination":{"kind":"room","id":7},"content":"hi"}"#;

        // when (操作):
        let event: ClientEvent = serde_json::from_str(raw).unwrap();

        // then (期待する結果):
        assert_eq!(
            event,
            ClientEvent::SendMessage {
                destination: DestinationDto::Room(7),
                content: "hi".to_string(),
            }
        );
    }

    #[test]
    fn test_client_event_mark_seen_deserializes() {
        // テスト項目: mark_seen イベントの JSON が正しくパースされる
        // given (前提条件):
        let raw = r#"{"type":"mark_seen","message_id":3,"destination":{"kind":"conversation","id":"conv_1_2"}}"#;

        // when (操作):
        let event: ClientEvent = serde_json::from_str(raw).unwrap();

        // then (期待する結果):
        assert_eq!(
            event,
            ClientEvent::MarkSeen {
                message_id: 3,
                destination: DestinationDto::Conversation("conv_1_2".to_string()),
            }
        );
    }

    #[test]
    fn test_unknown_event_type_is_rejected() {
        // テスト項目: 未知のイベント種別がパースエラーになる
        // given (前提条件):
        let raw = r#"{"type":"shout","content":"hi"}"#;

        // when (操作):
        let result = serde_json::from_str::<ClientEvent>(raw);

        // then (期待する結果):
        assert!(result.is_err());
    }

    #[test]
    fn test_outbound_message_event_serializes_with_tag() {
        // テスト項目: 配信メッセージの JSON に type タグが含まれる
        // given (前提条件):
        let event = MessageEvent {
            r#type: MessageType::Message,
            id: 1,
            sender_id: 2,
            sender_name: "alice".to_string(),
            destination: DestinationDto::Room(7),
            content: "hi".to_string(),
            status: "sent".to_string(),
            created_at: "2023-01-01T00:00:00+00:00".to_string(),
        };

        // when (操作):
        let json = serde_json::to_string(&event).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        // then (期待する結果):
        assert_eq!(value["type"], "message");
        assert_eq!(value["destination"]["kind"], "room");
        assert_eq!(value["destination"]["id"], 7);
    }

    #[test]
    fn test_error_message_constructor() {
        // テスト項目: エラーイベントが type=error で生成される
        // given (前提条件):

        // when (操作):
        let error = ErrorMessage::new("not_found", "room not found: 9");

        // then (期待する結果):
        assert_eq!(error.r#type, MessageType::Error);
        assert_eq!(error.code, "not_found");
    }
}
