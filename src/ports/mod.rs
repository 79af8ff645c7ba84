//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Persistence Ports
//!
//! - `MessageStore` - Append-only message persistence
//! - `ConversationStore` - Conversation aggregate with atomic field updates
//!
//! ## Collaborator Ports
//!
//! - `UserDirectory` - Read-only display identity from the profile service
//!
//! ## Realtime Ports
//!
//! - `RoomBackplane` - Cross-instance fan-out of realtime envelopes
//! - `DeliveryHandler` - Local delivery of envelopes arriving on the backplane

mod conversation_store;
mod message_store;
mod room_backplane;
mod user_directory;

pub use conversation_store::ConversationStore;
pub use message_store::{AppendOutcome, HistoryPage, HistoryWindow, MessageStore};
pub use room_backplane::{BackplaneError, DeliveryHandler, RoomBackplane};
pub use user_directory::{UserDirectory, UserSummary};
