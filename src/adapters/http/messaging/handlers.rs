//! HTTP handlers for chat endpoints.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::application::handlers::messaging::{
    DeleteConversationCommand, DeleteConversationHandler, GetConversationMessagesHandler,
    GetConversationMessagesQuery, ListUserConversationsHandler, ListUserConversationsQuery,
    MarkConversationReadCommand, MarkConversationReadHandler, SendMessageCommand,
    SendMessageHandler, StartConversationCommand, StartConversationHandler,
};
use crate::config::MessagingConfig;
use crate::domain::messaging::MessagingError;
use crate::ports::{ConversationStore, MessageStore, UserDirectory};

use super::dto::{
    AckResponse, ActingUserRequest, ConversationListResponse, ConversationResponse,
    ConversationView, ErrorResponse, MessageListResponse, MessageResponse, MessageView,
    SendMessageRequest, StartConversationRequest, UserConversationView,
};

// ════════════════════════════════════════════════════════════════════════════
// Handler state
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct MessagingHandlers {
    start_handler: Arc<StartConversationHandler>,
    list_handler: Arc<ListUserConversationsHandler>,
    delete_handler: Arc<DeleteConversationHandler>,
    mark_read_handler: Arc<MarkConversationReadHandler>,
    history_handler: Arc<GetConversationMessagesHandler>,
    send_handler: Arc<SendMessageHandler>,
}

impl MessagingHandlers {
    pub fn new(
        start_handler: Arc<StartConversationHandler>,
        list_handler: Arc<ListUserConversationsHandler>,
        delete_handler: Arc<DeleteConversationHandler>,
        mark_read_handler: Arc<MarkConversationReadHandler>,
        history_handler: Arc<GetConversationMessagesHandler>,
        send_handler: Arc<SendMessageHandler>,
    ) -> Self {
        Self {
            start_handler,
            list_handler,
            delete_handler,
            mark_read_handler,
            history_handler,
            send_handler,
        }
    }

    /// Builds every handler over the same set of ports.
    pub fn from_ports(
        conversations: Arc<dyn ConversationStore>,
        messages: Arc<dyn MessageStore>,
        users: Arc<dyn UserDirectory>,
        config: &MessagingConfig,
    ) -> Self {
        Self::new(
            Arc::new(StartConversationHandler::new(conversations.clone())),
            Arc::new(ListUserConversationsHandler::new(conversations.clone())),
            Arc::new(DeleteConversationHandler::new(conversations.clone())),
            Arc::new(MarkConversationReadHandler::new(
                conversations.clone(),
                messages.clone(),
            )),
            Arc::new(GetConversationMessagesHandler::new(
                messages.clone(),
                config.history_page(),
            )),
            Arc::new(SendMessageHandler::new(
                messages,
                conversations,
                users,
                config.max_content_length,
            )),
        )
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HTTP handlers
// ════════════════════════════════════════════════════════════════════════════

/// POST /api/chat/start - Find or create the conversation for a pair
pub async fn start_conversation(
    State(handlers): State<MessagingHandlers>,
    body: Result<Json<StartConversationRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => return handle_rejection(rejection),
    };

    let cmd = match StartConversationCommand::parse(&req.user_id, &req.other_user_id) {
        Ok(cmd) => cmd,
        Err(e) => return handle_messaging_error(e),
    };

    match handlers.start_handler.handle(cmd).await {
        Ok(conversation) => {
            let response = ConversationResponse {
                success: true,
                conversation: ConversationView::from(&conversation),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => handle_messaging_error(e),
    }
}

/// GET /api/chat/conversations/:id - List a user's visible conversations
pub async fn list_conversations(
    State(handlers): State<MessagingHandlers>,
    Path(user_id): Path<String>,
) -> Response {
    let query = match ListUserConversationsQuery::parse(&user_id) {
        Ok(query) => query,
        Err(e) => return handle_messaging_error(e),
    };

    match handlers.list_handler.handle(query).await {
        Ok(items) => {
            let response = ConversationListResponse {
                success: true,
                conversations: items.iter().map(UserConversationView::from).collect(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => handle_messaging_error(e),
    }
}

/// DELETE /api/chat/conversations/:id - Hide a conversation for one user
pub async fn delete_conversation(
    State(handlers): State<MessagingHandlers>,
    Path(conversation_id): Path<String>,
    body: Result<Json<ActingUserRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => return handle_rejection(rejection),
    };

    let cmd = match DeleteConversationCommand::parse(&conversation_id, &req.user_id) {
        Ok(cmd) => cmd,
        Err(e) => return handle_messaging_error(e),
    };

    match handlers.delete_handler.handle(cmd).await {
        Ok(()) => (StatusCode::OK, Json(AckResponse::new("Conversation deleted"))).into_response(),
        Err(e) => handle_messaging_error(e),
    }
}

/// PUT /api/chat/conversations/:id/read - Zero the caller's unread count
pub async fn mark_conversation_read(
    State(handlers): State<MessagingHandlers>,
    Path(conversation_id): Path<String>,
    body: Result<Json<ActingUserRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => return handle_rejection(rejection),
    };

    let cmd = match MarkConversationReadCommand::parse(&conversation_id, &req.user_id) {
        Ok(cmd) => cmd,
        Err(e) => return handle_messaging_error(e),
    };

    match handlers.mark_read_handler.handle(cmd).await {
        Ok(_) => (
            StatusCode::OK,
            Json(AckResponse::new("Conversation marked as read")),
        )
            .into_response(),
        Err(e) => handle_messaging_error(e),
    }
}

/// GET /api/chat/messages/:id - Message history, ascending
pub async fn get_messages(
    State(handlers): State<MessagingHandlers>,
    Path(conversation_id): Path<String>,
) -> Response {
    let query = match GetConversationMessagesQuery::parse(&conversation_id) {
        Ok(query) => query,
        Err(e) => return handle_messaging_error(e),
    };

    match handlers.history_handler.handle(query).await {
        Ok(messages) => {
            let response = MessageListResponse {
                success: true,
                messages: messages.iter().map(MessageView::from).collect(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => handle_messaging_error(e),
    }
}

/// POST /api/chat/messages - Persist a message
///
/// Answers 201 for a new message and 200 when the client message id
/// matched an earlier send.
pub async fn send_message(
    State(handlers): State<MessagingHandlers>,
    body: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => return handle_rejection(rejection),
    };

    let cmd = match SendMessageCommand::parse(
        &req.sender_id,
        &req.receiver_id,
        &req.content,
        &req.conversation_id,
        req.client_message_id.as_deref(),
    ) {
        Ok(cmd) => cmd,
        Err(e) => return handle_messaging_error(e),
    };

    match handlers.send_handler.handle(cmd).await {
        Ok(sent) => {
            let status = if sent.duplicate {
                StatusCode::OK
            } else {
                StatusCode::CREATED
            };
            let response = MessageResponse {
                success: true,
                message: MessageView::from(&sent),
            };
            (status, Json(response)).into_response()
        }
        Err(e) => handle_messaging_error(e),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Error handling
// ════════════════════════════════════════════════════════════════════════════

fn handle_rejection(rejection: JsonRejection) -> Response {
    tracing::debug!(error = %rejection, "rejected request body");
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::bad_request(rejection.body_text())),
    )
        .into_response()
}

fn handle_messaging_error(error: MessagingError) -> Response {
    let code = error.code().to_string();
    match error {
        MessagingError::Validation { field, message } => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                code,
                format!("Validation failed for {}: {}", field, message),
            )),
        )
            .into_response(),
        MessagingError::ConversationNotFound(id) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(
                code,
                format!("Conversation not found: {}", id),
            )),
        )
            .into_response(),
        err @ MessagingError::NotParticipant { .. } => (
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::new(code, err.to_string())),
        )
            .into_response(),
        MessagingError::Store(msg) => {
            tracing::error!(error = %msg, "chat store failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(code, msg)),
            )
                .into_response()
        }
    }
}
