//! PostgreSQL implementation of ConversationStore.
//!
//! The aggregate is split over two tables: `conversations` holds the
//! preview, `conversation_participants` holds one row per participant with
//! its unread count and deleted flag. Every mutation is a targeted UPDATE on
//! those columns, so concurrent sends never lose an increment.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::PgPool;

use crate::domain::foundation::{
    ConversationId, ConversationKey, DomainError, Timestamp, UserId, ValidationError,
};
use crate::domain::messaging::{
    conversation_not_found, not_participant, Conversation, LastMessage, Message,
};
use crate::ports::ConversationStore;

use super::column;

/// Which participant column a targeted update sets.
#[derive(Debug, Clone, Copy)]
enum ParticipantUpdate {
    ZeroUnread,
    MarkDeleted,
}

impl ParticipantUpdate {
    fn sql(self) -> &'static str {
        match self {
            ParticipantUpdate::ZeroUnread => {
                "UPDATE conversation_participants SET unread_count = 0 \
                 WHERE conversation_key = $1 AND user_id = $2"
            }
            ParticipantUpdate::MarkDeleted => {
                "UPDATE conversation_participants SET deleted = TRUE \
                 WHERE conversation_key = $1 AND user_id = $2"
            }
        }
    }
}

/// PostgreSQL implementation of ConversationStore.
#[derive(Clone)]
pub struct PostgresConversationStore {
    pool: PgPool,
}

impl PostgresConversationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load(&self, key: &ConversationKey) -> Result<Option<Conversation>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT conversation_key, id, last_message, last_message_at, last_message_sender,
                   created_at, updated_at
            FROM conversations
            WHERE conversation_key = $1
            "#,
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to fetch conversation: {}", e)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut participants = self.participants_of(&[key.as_str().to_string()]).await?;
        let rows = participants.remove(key.as_str()).unwrap_or_default();
        row_to_conversation(row, rows).map(Some)
    }

    async fn load_existing(&self, key: &ConversationKey) -> Result<Conversation, DomainError> {
        self.load(key)
            .await?
            .ok_or_else(|| conversation_not_found(key))
    }

    async fn participants_of(
        &self,
        keys: &[String],
    ) -> Result<HashMap<String, Vec<ParticipantRow>>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT conversation_key, user_id, unread_count, deleted
            FROM conversation_participants
            WHERE conversation_key = ANY($1)
            "#,
        )
        .bind(keys)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to fetch participants: {}", e)))?;

        let mut grouped: HashMap<String, Vec<ParticipantRow>> = HashMap::new();
        for row in rows {
            let key: String = column(&row, "conversation_key")?;
            grouped.entry(key).or_default().push(ParticipantRow {
                user_id: column(&row, "user_id")?,
                unread_count: column(&row, "unread_count")?,
                deleted: column(&row, "deleted")?,
            });
        }
        Ok(grouped)
    }

    /// Apply a participant update, telling not-found from not-a-participant.
    async fn update_participant(
        &self,
        key: &ConversationKey,
        user_id: &UserId,
        update: ParticipantUpdate,
    ) -> Result<Conversation, DomainError> {
        if !key.includes(user_id) {
            return match self.load(key).await? {
                Some(_) => Err(not_participant(key, user_id)),
                None => Err(conversation_not_found(key)),
            };
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database(format!("Failed to begin transaction: {}", e)))?;

        let result = sqlx::query(update.sql())
            .bind(key.as_str())
            .bind(user_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::database(format!("Failed to update participant: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(conversation_not_found(key));
        }

        sqlx::query("UPDATE conversations SET updated_at = NOW() WHERE conversation_key = $1")
            .bind(key.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::database(format!("Failed to touch conversation: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database(format!("Failed to commit: {}", e)))?;

        self.load_existing(key).await
    }
}

#[async_trait]
impl ConversationStore for PostgresConversationStore {
    async fn find_by_key(&self, key: &ConversationKey) -> Result<Option<Conversation>, DomainError> {
        self.load(key).await
    }

    async fn find_or_create(&self, key: &ConversationKey) -> Result<Conversation, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database(format!("Failed to begin transaction: {}", e)))?;

        insert_conversation(&mut tx, key).await?;
        insert_participants(&mut tx, key).await?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database(format!("Failed to commit: {}", e)))?;

        self.load_existing(key).await
    }

    async fn record_message(&self, message: &Message) -> Result<Conversation, DomainError> {
        let key = message.conversation_key();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database(format!("Failed to begin transaction: {}", e)))?;

        insert_conversation(&mut tx, key).await?;
        insert_participants(&mut tx, key).await?;

        // Concurrent claims of one id serialize on the primary key.
        let claimed = sqlx::query(
            r#"
            INSERT INTO recorded_messages (message_id, conversation_key)
            VALUES ($1, $2)
            ON CONFLICT (message_id) DO NOTHING
            "#,
        )
        .bind(message.id().as_uuid())
        .bind(key.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::database(format!("Failed to claim message: {}", e)))?;

        if claimed.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| DomainError::database(format!("Failed to roll back: {}", e)))?;
            tracing::debug!(message_id = %message.id(), "Message already recorded");
            return self.load_existing(key).await;
        }

        // Preview moves forward only; every SET expression sees the old row.
        sqlx::query(
            r#"
            UPDATE conversations SET
                last_message = CASE WHEN last_message_at IS NULL OR last_message_at <= $3
                                    THEN $2 ELSE last_message END,
                last_message_sender = CASE WHEN last_message_at IS NULL OR last_message_at <= $3
                                           THEN $4 ELSE last_message_sender END,
                last_message_at = CASE WHEN last_message_at IS NULL OR last_message_at <= $3
                                       THEN $3 ELSE last_message_at END,
                updated_at = NOW()
            WHERE conversation_key = $1
            "#,
        )
        .bind(key.as_str())
        .bind(message.content())
        .bind(message.sent_at().as_datetime())
        .bind(message.sender_id().as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::database(format!("Failed to update preview: {}", e)))?;

        sqlx::query(
            r#"
            UPDATE conversation_participants SET unread_count = unread_count + 1
            WHERE conversation_key = $1 AND user_id = $2
            "#,
        )
        .bind(key.as_str())
        .bind(message.receiver_id().as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::database(format!("Failed to increment unread: {}", e)))?;

        sqlx::query(
            "UPDATE conversation_participants SET deleted = FALSE WHERE conversation_key = $1",
        )
        .bind(key.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::database(format!("Failed to reactivate conversation: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database(format!("Failed to commit: {}", e)))?;

        self.load_existing(key).await
    }

    async fn mark_read(
        &self,
        key: &ConversationKey,
        user_id: &UserId,
    ) -> Result<Conversation, DomainError> {
        self.update_participant(key, user_id, ParticipantUpdate::ZeroUnread)
            .await
    }

    async fn soft_delete(
        &self,
        key: &ConversationKey,
        user_id: &UserId,
    ) -> Result<Conversation, DomainError> {
        self.update_participant(key, user_id, ParticipantUpdate::MarkDeleted)
            .await
    }

    async fn list_visible_for(&self, user_id: &UserId) -> Result<Vec<Conversation>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT c.conversation_key, c.id, c.last_message, c.last_message_at,
                   c.last_message_sender, c.created_at, c.updated_at
            FROM conversations c
            JOIN conversation_participants p ON p.conversation_key = c.conversation_key
            WHERE p.user_id = $1 AND NOT p.deleted
            ORDER BY c.last_message_at DESC NULLS LAST, c.created_at DESC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list conversations: {}", e)))?;

        let keys = rows
            .iter()
            .map(|row| column::<String>(row, "conversation_key"))
            .collect::<Result<Vec<_>, _>>()?;
        let mut participants = self.participants_of(&keys).await?;

        rows.into_iter()
            .zip(keys)
            .map(|(row, key)| row_to_conversation(row, participants.remove(&key).unwrap_or_default()))
            .collect()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Helper functions
// ════════════════════════════════════════════════════════════════════════════

struct ParticipantRow {
    user_id: String,
    unread_count: i32,
    deleted: bool,
}

async fn insert_conversation(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    key: &ConversationKey,
) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        INSERT INTO conversations (conversation_key, id, created_at, updated_at)
        VALUES ($1, $2, NOW(), NOW())
        ON CONFLICT (conversation_key) DO NOTHING
        "#,
    )
    .bind(key.as_str())
    .bind(ConversationId::new().as_uuid())
    .execute(&mut **tx)
    .await
    .map_err(|e| DomainError::database(format!("Failed to insert conversation: {}", e)))?;
    Ok(())
}

async fn insert_participants(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    key: &ConversationKey,
) -> Result<(), DomainError> {
    let [first, second] = key.participants();
    sqlx::query(
        r#"
        INSERT INTO conversation_participants (conversation_key, user_id, unread_count, deleted)
        VALUES ($1, $2, 0, FALSE), ($1, $3, 0, FALSE)
        ON CONFLICT (conversation_key, user_id) DO NOTHING
        "#,
    )
    .bind(key.as_str())
    .bind(first.as_str())
    .bind(second.as_str())
    .execute(&mut **tx)
    .await
    .map_err(|e| DomainError::database(format!("Failed to insert participants: {}", e)))?;
    Ok(())
}

fn row_to_conversation(
    row: PgRow,
    participants: Vec<ParticipantRow>,
) -> Result<Conversation, DomainError> {
    let key: String = column(&row, "conversation_key")?;
    let id: uuid::Uuid = column(&row, "id")?;
    let last_message: Option<String> = column(&row, "last_message")?;
    let last_message_at: Option<DateTime<Utc>> = column(&row, "last_message_at")?;
    let last_message_sender: Option<String> = column(&row, "last_message_sender")?;
    let created_at: DateTime<Utc> = column(&row, "created_at")?;
    let updated_at: DateTime<Utc> = column(&row, "updated_at")?;

    let invalid = |e: ValidationError| {
        DomainError::database(format!("Invalid stored conversation {}: {}", key, e))
    };

    let conversation_key = ConversationKey::parse(&key).map_err(invalid)?;

    let preview = match (last_message, last_message_at, last_message_sender) {
        (Some(content), Some(sent_at), Some(sender)) => Some(LastMessage {
            content,
            sent_at: Timestamp::from_datetime(sent_at),
            sender_id: UserId::new(sender).map_err(invalid)?,
        }),
        _ => None,
    };

    let mut unread_counts = BTreeMap::new();
    let mut deleted_by = BTreeSet::new();
    for participant in participants {
        let user_id = UserId::new(participant.user_id).map_err(invalid)?;
        if participant.deleted {
            deleted_by.insert(user_id.clone());
        }
        unread_counts.insert(user_id, participant.unread_count.max(0) as u32);
    }

    let mut conversation = Conversation::reconstitute(
        ConversationId::from_uuid(id),
        conversation_key,
        preview,
        unread_counts,
        deleted_by,
        Timestamp::from_datetime(created_at),
        Timestamp::from_datetime(updated_at),
    );
    conversation.ensure_counters();
    Ok(conversation)
}
