//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `messaging` - Conversation aggregate, message entity and messaging errors

pub mod foundation;
pub mod messaging;
