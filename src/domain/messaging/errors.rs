//! Messaging-specific error types.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};

/// Errors returned by the messaging command and query handlers.
///
/// Expected conditions (validation, not found, not a participant) are
/// ordinary variants; anything the store reports beyond that is `Store`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagingError {
    /// A required field was missing, empty or malformed. Nothing was written.
    #[error("Validation failed for '{field}': {message}")]
    Validation { field: String, message: String },

    /// No conversation exists for the given key.
    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    /// The acting user is not one of the two participants.
    #[error("User {user_id} is not a participant of conversation {conversation}")]
    NotParticipant {
        user_id: String,
        conversation: String,
    },

    /// Persistence failure, with the underlying message for diagnostics.
    #[error("Store error: {0}")]
    Store(String),
}

impl MessagingError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        MessagingError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        MessagingError::Store(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            MessagingError::Validation { .. } => ErrorCode::ValidationFailed,
            MessagingError::ConversationNotFound(_) => ErrorCode::ConversationNotFound,
            MessagingError::NotParticipant { .. } => ErrorCode::NotParticipant,
            MessagingError::Store(_) => ErrorCode::DatabaseError,
        }
    }
}

impl From<ValidationError> for MessagingError {
    fn from(err: ValidationError) -> Self {
        MessagingError::Validation {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<DomainError> for MessagingError {
    fn from(err: DomainError) -> Self {
        let detail = |key: &str| err.details.get(key).cloned().unwrap_or_default();
        match err.code {
            ErrorCode::ValidationFailed => MessagingError::Validation {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message.clone(),
            },
            ErrorCode::ConversationNotFound => {
                MessagingError::ConversationNotFound(detail("conversation_id"))
            }
            ErrorCode::NotParticipant => MessagingError::NotParticipant {
                user_id: detail("user_id"),
                conversation: detail("conversation_id"),
            },
            ErrorCode::DatabaseError => MessagingError::Store(err.to_string()),
        }
    }
}
