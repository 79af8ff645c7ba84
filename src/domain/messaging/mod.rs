//! Direct messaging domain: conversations between two users and the
//! messages exchanged in them.

mod conversation;
mod envelope;
mod errors;
mod message;

pub use conversation::{conversation_not_found, not_participant, Conversation, LastMessage};
pub use envelope::{RealtimeEnvelope, RoomDelivery};
pub use errors::MessagingError;
pub use message::{Message, DEFAULT_MAX_CONTENT_LENGTH};
