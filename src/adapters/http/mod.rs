//! HTTP adapters - REST API and application router.
//!
//! `build_router` assembles the chat REST endpoints, the WebSocket
//! endpoint and a liveness probe behind the shared tower-http layers.

pub mod messaging;

use std::time::Duration;

use axum::{extract::State, routing::get, Json, Router};
use http::HeaderValue;
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::adapters::websocket::{websocket_router, WebSocketState};
use crate::config::ServerConfig;

pub use messaging::{messaging_routes, MessagingHandlers};

/// Liveness payload with a snapshot of realtime activity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub connections: usize,
    pub active_rooms: usize,
}

/// GET /health
pub async fn health(State(state): State<WebSocketState>) -> Json<HealthResponse> {
    let rooms = state.gateway.rooms();
    Json(HealthResponse {
        status: "ok",
        connections: rooms.total_client_count().await,
        active_rooms: rooms.active_rooms().await.len(),
    })
}

/// Builds the full application router.
pub fn build_router(
    messaging: MessagingHandlers,
    websocket: WebSocketState,
    server: &ServerConfig,
) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(websocket_router())
        .with_state(websocket)
        .nest(
            "/api/chat",
            messaging_routes(messaging).layer(CompressionLayer::new()),
        )
        .layer(TimeoutLayer::new(Duration::from_secs(
            server.request_timeout_secs,
        )))
        .layer(cors_layer(server))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}
