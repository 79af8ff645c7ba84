//! HTTP adapter for the chat REST API.

mod dto;
mod handlers;
mod routes;

pub use dto::*;
pub use handlers::MessagingHandlers;
pub use routes::messaging_routes;
