//! PostgreSQL implementation of MessageStore.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{
    ClientMessageId, ConversationKey, DomainError, MessageId, Timestamp, UserId,
};
use crate::domain::messaging::Message;
use crate::ports::{AppendOutcome, HistoryPage, HistoryWindow, MessageStore};

use super::column;

const MESSAGE_COLUMNS: &str =
    "id, seq, conversation_key, sender_id, receiver_id, content, sent_at, read, client_message_id";

/// PostgreSQL implementation of MessageStore.
#[derive(Clone)]
pub struct PostgresMessageStore {
    pool: PgPool,
}

impl PostgresMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_by_client_id(
        &self,
        sender_id: &UserId,
        client_message_id: &ClientMessageId,
    ) -> Result<Option<Message>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM messages WHERE sender_id = $1 AND client_message_id = $2",
            MESSAGE_COLUMNS
        ))
        .bind(sender_id.as_str())
        .bind(client_message_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to fetch message: {}", e)))?;

        row.map(row_to_message).transpose()
    }
}

#[async_trait]
impl MessageStore for PostgresMessageStore {
    async fn append(&self, message: &Message) -> Result<AppendOutcome, DomainError> {
        // The partial unique index on (sender_id, client_message_id) makes the
        // duplicate check and the insert one statement.
        let result = sqlx::query(
            r#"
            INSERT INTO messages (
                id, conversation_key, sender_id, receiver_id, content, sent_at, read,
                client_message_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (sender_id, client_message_id) WHERE client_message_id IS NOT NULL
            DO NOTHING
            "#,
        )
        .bind(message.id().as_uuid())
        .bind(message.conversation_key().as_str())
        .bind(message.sender_id().as_str())
        .bind(message.receiver_id().as_str())
        .bind(message.content())
        .bind(message.sent_at().as_datetime())
        .bind(message.is_read())
        .bind(message.client_message_id().map(ClientMessageId::as_str))
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to insert message: {}", e)))?;

        if result.rows_affected() > 0 {
            return Ok(AppendOutcome::Inserted(message.clone()));
        }

        let client_id = message.client_message_id().ok_or_else(|| {
            DomainError::database(format!("Message {} was not inserted", message.id()))
        })?;
        let original = self
            .find_by_client_id(message.sender_id(), client_id)
            .await?
            .ok_or_else(|| {
                DomainError::database(format!(
                    "Conflicting message for client id {} disappeared",
                    client_id
                ))
            })?;

        Ok(AppendOutcome::Duplicate(original))
    }

    async fn list_for_conversation(
        &self,
        key: &ConversationKey,
        page: HistoryPage,
    ) -> Result<Vec<Message>, DomainError> {
        let sql = match page.window {
            HistoryWindow::Oldest => format!(
                "SELECT {} FROM messages WHERE conversation_key = $1 \
                 ORDER BY sent_at ASC, seq ASC LIMIT $2",
                MESSAGE_COLUMNS
            ),
            HistoryWindow::Latest => format!(
                "SELECT * FROM ( \
                     SELECT {} FROM messages WHERE conversation_key = $1 \
                     ORDER BY sent_at DESC, seq DESC LIMIT $2 \
                 ) latest ORDER BY sent_at ASC, seq ASC",
                MESSAGE_COLUMNS
            ),
        };

        let rows = sqlx::query(&sql)
            .bind(key.as_str())
            .bind(i64::from(page.limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to fetch messages: {}", e)))?;

        rows.into_iter().map(row_to_message).collect()
    }

    async fn mark_read_for(
        &self,
        key: &ConversationKey,
        receiver_id: &UserId,
        up_to: Timestamp,
    ) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE messages SET read = TRUE
            WHERE conversation_key = $1 AND receiver_id = $2 AND sent_at <= $3 AND NOT read
            "#,
        )
        .bind(key.as_str())
        .bind(receiver_id.as_str())
        .bind(up_to.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to mark messages read: {}", e)))?;

        Ok(result.rows_affected())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Helper functions
// ════════════════════════════════════════════════════════════════════════════

fn row_to_message(row: sqlx::postgres::PgRow) -> Result<Message, DomainError> {
    let id: uuid::Uuid = column(&row, "id")?;
    let key: String = column(&row, "conversation_key")?;
    let sender_id: String = column(&row, "sender_id")?;
    let receiver_id: String = column(&row, "receiver_id")?;
    let content: String = column(&row, "content")?;
    let sent_at: DateTime<Utc> = column(&row, "sent_at")?;
    let read: bool = column(&row, "read")?;
    let client_message_id: Option<String> = column(&row, "client_message_id")?;

    let invalid = |e: crate::domain::foundation::ValidationError| {
        DomainError::database(format!("Invalid stored message {}: {}", id, e))
    };

    Ok(Message::reconstitute(
        MessageId::from_uuid(id),
        ConversationKey::parse(&key).map_err(invalid)?,
        UserId::new(sender_id).map_err(invalid)?,
        UserId::new(receiver_id).map_err(invalid)?,
        content,
        Timestamp::from_datetime(sent_at),
        read,
        client_message_id
            .map(ClientMessageId::new)
            .transpose()
            .map_err(invalid)?,
    ))
}
