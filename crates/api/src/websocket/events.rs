//! WebSocket event types and serialization
//!
//! Type-safe definitions of everything that crosses the socket, tagged with
//! a kebab-case `type` field and camelCase payload fields.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use helpdesk_shared::{
    ChatMessage, ChatStatus, MessageId, MessageType, SenderType, SessionId, UserId,
};

// =============================================================================
// Client-to-Server Events
// =============================================================================

/// Events sent from client to server
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Attach this connection to a chat session room
    JoinChat { session_id: SessionId },

    /// Detach from a chat session room
    LeaveChat { session_id: SessionId },

    /// Send a chat message into a session
    ChatMessage {
        session_id: SessionId,
        message: String,
        sender_name: String,
    },

    /// Typing indicator, relayed to the rest of the room
    Typing {
        session_id: SessionId,
        is_typing: bool,
        user_name: String,
    },
}

// =============================================================================
// Server-to-Client Events
// =============================================================================

/// Events sent from server to client
#[derive(Debug, Serialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Connection acknowledged
    Connected { connection_id: Uuid },

    /// New message appended to a joined session
    NewMessage {
        id: MessageId,
        session_id: SessionId,
        sender_id: UserId,
        sender_name: String,
        sender_type: SenderType,
        message_type: MessageType,
        content: String,
        #[serde(with = "time::serde::rfc3339")]
        timestamp: OffsetDateTime,
    },

    /// Someone else in the room started or stopped typing
    UserTyping {
        session_id: SessionId,
        user_name: String,
        is_typing: bool,
    },

    /// Session lifecycle changed (claimed, transferred, ended)
    SessionUpdated {
        session_id: SessionId,
        status: ChatStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        agent_id: Option<UserId>,
    },

    /// Error message
    Error { message: String },
}

impl ServerEvent {
    pub fn new_message(message: &ChatMessage, sender_name: &str) -> Self {
        ServerEvent::NewMessage {
            id: message.id,
            session_id: message.session_id,
            sender_id: message.sender_id,
            sender_name: sender_name.to_string(),
            sender_type: message.sender_type,
            message_type: message.message_type,
            content: message.content.clone(),
            timestamp: message.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_event_deserialization() {
        let json = r#"{"type":"join-chat","sessionId":"550e8400-e29b-41d4-a716-446655440000"}"#;
        let event: ClientEvent = serde_json::from_str(json).unwrap();
        match event {
            ClientEvent::JoinChat { session_id } => {
                assert_eq!(
                    session_id.to_string(),
                    "550e8400-e29b-41d4-a716-446655440000"
                );
            }
            _ => panic!("Expected JoinChat event"),
        }
    }

    #[test]
    fn test_typing_event_deserialization() {
        let json = format!(
            r#"{{"type":"typing","sessionId":"{}","isTyping":true,"userName":"Alice"}}"#,
            SessionId::new()
        );
        let event: ClientEvent = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            event,
            ClientEvent::Typing { is_typing: true, .. }
        ));
    }

    #[test]
    fn test_server_event_wire_shape() {
        let event = ServerEvent::SessionUpdated {
            session_id: SessionId::new(),
            status: ChatStatus::Active,
            agent_id: Some(UserId::new()),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "session-updated");
        assert_eq!(json["status"], "active");
        assert!(json.get("sessionId").is_some());
        assert!(json.get("agentId").is_some());
    }

    #[test]
    fn test_session_updated_omits_absent_agent() {
        let event = ServerEvent::SessionUpdated {
            session_id: SessionId::new(),
            status: ChatStatus::Ended,
            agent_id: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("agentId").is_none());
    }

    #[test]
    fn test_error_event_serialization() {
        let event = ServerEvent::Error {
            message: "Test error".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("error"));
        assert!(json.contains("Test error"));
    }
}
