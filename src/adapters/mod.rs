//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `memory` - In-process stores, directory and backplane
//! - `postgres` - sqlx-backed stores and user directory
//! - `http` - REST endpoints and the application router
//! - `websocket` - Realtime gateway, rooms and the Redis backplane

pub mod http;
pub mod memory;
pub mod postgres;
pub mod websocket;
