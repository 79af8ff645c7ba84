//! Messaging command and query handlers.
//!
//! Together these make up the conversation and message service: every REST
//! operation maps to exactly one handler.

mod delete_conversation;
mod get_conversation_messages;
mod list_user_conversations;
mod mark_conversation_read;
mod send_message;
mod start_conversation;

pub use delete_conversation::{DeleteConversationCommand, DeleteConversationHandler};
pub use get_conversation_messages::{GetConversationMessagesHandler, GetConversationMessagesQuery};
pub use list_user_conversations::{
    ListUserConversationsHandler, ListUserConversationsQuery, UserConversation,
};
pub use mark_conversation_read::{MarkConversationReadCommand, MarkConversationReadHandler};
pub use send_message::{SendMessageCommand, SendMessageHandler, SentMessage};
pub use start_conversation::{StartConversationCommand, StartConversationHandler};
