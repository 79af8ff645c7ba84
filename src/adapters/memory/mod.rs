//! In-memory adapters.
//!
//! Used by tests and by the server when no database is configured. Each
//! store keeps its state behind a single `tokio::sync::RwLock`, so every
//! mutation is atomic with respect to concurrent callers.

mod backplane;
mod conversation_store;
mod message_store;
mod user_directory;

pub use backplane::InMemoryBackplane;
pub use conversation_store::InMemoryConversationStore;
pub use message_store::InMemoryMessageStore;
pub use user_directory::InMemoryUserDirectory;
