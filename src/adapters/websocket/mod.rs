//! WebSocket adapters for the realtime gateway.
//!
//! # Architecture
//!
//! ```text
//!   client ──ws──▶ handler ──▶ RealtimeGateway ──publish──▶ RoomBackplane
//!                                   │                          │ (optional)
//!                                   │ local                    │ subscribe
//!                                   ▼                          ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      RoomManager                                     │
//! │   Room: user-alice     Room: user-bob                                │
//! │   ├── client-a         ├── client-c                                  │
//! │   └── client-b         └── client-a                                  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`messages`] - WebSocket frame types
//! - [`rooms`] - Connection and room registry
//! - [`gateway`] - Join / relay / disconnect
//! - [`handler`] - Axum WebSocket upgrade handler
//! - [`redis_backplane`] - Redis pub/sub fan-out across instances

pub mod gateway;
pub mod handler;
pub mod messages;
pub mod redis_backplane;
pub mod rooms;

pub use gateway::{GatewayError, RealtimeGateway, RelayOutcome};
pub use handler::{websocket_router, ws_handler, WebSocketState};
pub use messages::{
    ClientMessage, ErrorMessage, JoinUserRoom, JoinedMessage, PongMessage, SendMessageFrame,
    ServerMessage,
};
pub use redis_backplane::{RedisBackplane, DEFAULT_CHANNEL};
pub use rooms::{ClientId, RoomManager};
