//! HTTP routes for chat endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};

use super::handlers::{
    delete_conversation, get_messages, list_conversations, mark_conversation_read, send_message,
    start_conversation, MessagingHandlers,
};

/// Creates the chat router, meant to be nested under `/api/chat`.
///
/// `/conversations/:id` takes a user id on GET and a conversation key on
/// DELETE, matching the published API.
pub fn messaging_routes(handlers: MessagingHandlers) -> Router {
    Router::new()
        .route("/start", post(start_conversation))
        .route(
            "/conversations/:id",
            get(list_conversations).delete(delete_conversation),
        )
        .route("/conversations/:id/read", put(mark_conversation_read))
        .route("/messages", post(send_message))
        .route("/messages/:id", get(get_messages))
        .with_state(handlers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use tower::ServiceExt;

    use crate::adapters::memory::{
        InMemoryConversationStore, InMemoryMessageStore, InMemoryUserDirectory,
    };
    use crate::config::MessagingConfig;

    fn test_app() -> Router {
        let handlers = MessagingHandlers::from_ports(
            Arc::new(InMemoryConversationStore::new()),
            Arc::new(InMemoryMessageStore::new()),
            Arc::new(InMemoryUserDirectory::new()),
            &MessagingConfig::default(),
        );
        messaging_routes(handlers)
    }

    fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn start_returns_conversation() {
        let response = test_app()
            .oneshot(json_request(
                Method::POST,
                "/start",
                serde_json::json!({"userId": "B", "otherUserId": "A"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["conversation"]["conversationId"], "A_B");
    }

    #[tokio::test]
    async fn start_with_missing_field_is_bad_request() {
        let response = test_app()
            .oneshot(json_request(
                Method::POST,
                "/start",
                serde_json::json!({"userId": "A"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["success"], false);
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/messages")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = test_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn send_then_read_history() {
        let app = test_app();

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/messages",
                serde_json::json!({
                    "senderId": "A",
                    "receiverId": "B",
                    "content": "hello",
                    "conversationId": "A_B"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let sent = body_json(response).await;
        assert_eq!(sent["message"]["sender"]["id"], "A");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/messages/A_B")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["messages"].as_array().map(Vec::len), Some(1));
        assert_eq!(json["messages"][0]["content"], "hello");
    }

    #[tokio::test]
    async fn mark_read_on_unknown_conversation_is_404() {
        let response = test_app()
            .oneshot(json_request(
                Method::PUT,
                "/conversations/A_B/read",
                serde_json::json!({"userId": "A"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_by_outsider_is_forbidden() {
        let app = test_app();
        app.clone()
            .oneshot(json_request(
                Method::POST,
                "/start",
                serde_json::json!({"userId": "A", "otherUserId": "B"}),
            ))
            .await
            .unwrap();

        let response = app
            .oneshot(json_request(
                Method::DELETE,
                "/conversations/A_B",
                serde_json::json!({"userId": "C"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
