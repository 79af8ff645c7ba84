//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps and error types that form the
//! vocabulary of the messaging domain.

mod errors;
mod ids;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{
    ClientMessageId, ConversationId, ConversationKey, MessageId, UserId,
    CONVERSATION_KEY_SEPARATOR, MAX_CLIENT_MESSAGE_ID_LENGTH,
};
pub use timestamp::Timestamp;
