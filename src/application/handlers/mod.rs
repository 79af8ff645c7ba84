//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod messaging;

pub use messaging::{
    DeleteConversationCommand, DeleteConversationHandler, GetConversationMessagesHandler,
    GetConversationMessagesQuery, ListUserConversationsHandler, ListUserConversationsQuery,
    MarkConversationReadCommand, MarkConversationReadHandler, SendMessageCommand,
    SendMessageHandler, SentMessage, StartConversationCommand, StartConversationHandler,
    UserConversation,
};
