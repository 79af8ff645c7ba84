//! HTTP DTOs for chat endpoints.
//!
//! These types decouple the HTTP API from domain types. All bodies are
//! camelCase JSON and every response carries a `success` flag.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::application::handlers::messaging::{SentMessage, UserConversation};
use crate::domain::messaging::{Conversation, Message};
use crate::ports::UserSummary;

// ════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════
//
// Fields default to empty so a missing one is reported as a validation
// failure in the response envelope, not as a body rejection.

/// POST /start
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartConversationRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub other_user_id: String,
}

/// Body of DELETE /conversations/{id} and PUT /conversations/{id}/read.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActingUserRequest {
    #[serde(default)]
    pub user_id: String,
}

/// POST /messages
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub sender_id: String,
    #[serde(default)]
    pub receiver_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub conversation_id: String,
    #[serde(default)]
    pub client_message_id: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationView {
    pub id: String,
    pub conversation_id: String,
    pub participants: Vec<String>,
    /// Preview text; null until the first message
    pub last_message: Option<String>,
    pub last_message_at: Option<String>,
    pub last_message_sender: Option<String>,
    pub unread_counts: BTreeMap<String, u32>,
    pub deleted_by: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Conversation> for ConversationView {
    fn from(conversation: &Conversation) -> Self {
        let preview = conversation.last_message();
        Self {
            id: conversation.id().to_string(),
            conversation_id: conversation.key().to_string(),
            participants: conversation
                .participants()
                .iter()
                .map(|p| p.to_string())
                .collect(),
            last_message: preview.map(|last| last.content.clone()),
            last_message_at: preview.map(|last| last.sent_at.to_rfc3339()),
            last_message_sender: preview.map(|last| last.sender_id.to_string()),
            unread_counts: conversation
                .unread_counts()
                .iter()
                .map(|(user, count)| (user.to_string(), *count))
                .collect(),
            deleted_by: conversation.deleted_by().iter().map(|u| u.to_string()).collect(),
            created_at: conversation.created_at().to_rfc3339(),
            updated_at: conversation.updated_at().to_rfc3339(),
        }
    }
}

/// A conversation in a user's list, with that user's own unread count.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConversationView {
    #[serde(flatten)]
    pub conversation: ConversationView,
    pub unread_count: u32,
}

impl From<&UserConversation> for UserConversationView {
    fn from(item: &UserConversation) -> Self {
        Self {
            conversation: ConversationView::from(&item.conversation),
            unread_count: item.unread_count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub timestamp: String,
    pub read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_message_id: Option<String>,
    /// Populated on send only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<UserSummary>,
}

impl From<&Message> for MessageView {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id().to_string(),
            conversation_id: message.conversation_key().to_string(),
            sender_id: message.sender_id().to_string(),
            receiver_id: message.receiver_id().to_string(),
            content: message.content().to_string(),
            timestamp: message.sent_at().to_rfc3339(),
            read: message.is_read(),
            client_message_id: message.client_message_id().map(|c| c.to_string()),
            sender: None,
        }
    }
}

impl From<&SentMessage> for MessageView {
    fn from(sent: &SentMessage) -> Self {
        Self {
            sender: Some(sent.sender.clone()),
            ..MessageView::from(&sent.message)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationResponse {
    pub success: bool,
    pub conversation: ConversationView,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationListResponse {
    pub success: bool,
    pub conversations: Vec<UserConversationView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageListResponse {
    pub success: bool,
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: MessageView,
}

/// Acknowledgement for commands without a payload.
#[derive(Debug, Clone, Serialize)]
pub struct AckResponse {
    pub success: bool,
    pub message: String,
}

impl AckResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Failure envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_FAILED", message)
    }
}
