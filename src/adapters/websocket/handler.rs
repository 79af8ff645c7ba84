//! WebSocket upgrade handler for the realtime gateway.
//!
//! Connection lifecycle:
//! 1. Upgrade to WebSocket and register the connection (Connected)
//! 2. `join-user-room` frames add it to user rooms (Joined)
//! 3. Forward queued frames to the socket and handle incoming frames
//! 4. On close or error, leave every room (Disconnected)

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};

use super::gateway::RealtimeGateway;
use super::messages::{ClientMessage, ServerMessage};
use super::rooms::ClientId;

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    pub gateway: Arc<RealtimeGateway>,
}

impl WebSocketState {
    pub fn new(gateway: Arc<RealtimeGateway>) -> Self {
        Self { gateway }
    }
}

/// Handle WebSocket upgrade requests.
///
/// Route: `GET /ws`
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WebSocketState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.gateway))
}

/// Runs for the lifetime of one connection.
async fn handle_socket(socket: WebSocket, gateway: Arc<RealtimeGateway>) {
    let (mut sender, mut receiver) = socket.split();
    let (client_id, mut outbound) = gateway.connect().await;

    // Forward queued frames to the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!(client_id = %client_id, error = %e, "Frame serialization failed");
                    continue;
                }
            };
            if let Err(e) = sender.send(Message::Text(json)).await {
                tracing::debug!(client_id = %client_id, "Send error, closing connection: {}", e);
                break;
            }
        }
    });

    // Handle incoming frames
    let recv_gateway = gateway.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    handle_frame(&recv_gateway, &client_id, &text).await;
                }
                Ok(Message::Binary(_)) => {
                    tracing::warn!(client_id = %client_id, "Received unsupported binary message");
                    recv_gateway
                        .reply(
                            &client_id,
                            ServerMessage::error("INVALID_FRAME", "binary frames are not supported"),
                        )
                        .await;
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                    // Protocol-level heartbeats are answered by axum
                }
                Ok(Message::Close(_)) => {
                    tracing::debug!(client_id = %client_id, "Client sent close frame");
                    break;
                }
                Err(e) => {
                    tracing::debug!(client_id = %client_id, "Receive error: {}", e);
                    break;
                }
            }
        }
    });

    // Wait for either side to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    gateway.disconnect(&client_id).await;
}

/// Dispatch one text frame. Failures are answered with `message-error` to
/// this connection only.
pub(crate) async fn handle_frame(gateway: &RealtimeGateway, client_id: &ClientId, text: &str) {
    let frame = match serde_json::from_str::<ClientMessage>(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::debug!(client_id = %client_id, error = %e, "Malformed frame");
            gateway
                .reply(client_id, ServerMessage::error("INVALID_FRAME", e.to_string()))
                .await;
            return;
        }
    };

    let reply = match frame {
        ClientMessage::JoinUserRoom(join) => match gateway.join(client_id, &join.user_id).await {
            Ok(room) => ServerMessage::joined(room),
            Err(e) => ServerMessage::error(e.code(), e.to_string()),
        },
        ClientMessage::SendMessage(send) => match gateway.relay(send).await {
            Ok(_) => return,
            Err(e) => {
                tracing::warn!(client_id = %client_id, error = %e, "Relay failed");
                ServerMessage::error(e.code(), e.to_string())
            }
        },
        ClientMessage::Ping => ServerMessage::pong(),
    };

    gateway.reply(client_id, reply).await;
}

/// Create axum router for the WebSocket endpoint.
pub fn websocket_router() -> Router<WebSocketState> {
    Router::new().route("/ws", get(ws_handler))
}
