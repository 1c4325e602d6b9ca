//! PostgreSQL-backed collaborator implementations.
//!
//! The relational schema (chats, chat_participants, messages, users) is
//! owned by the CRUD side of the application; the gateway only inserts
//! messages and runs the read-only participant check.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

use crate::config::settings::DatabaseSettings;
use crate::domain::{ChatDirectory, Message, MessageStore, MessageType};
use crate::shared::GatewayError;

/// Create a PostgreSQL connection pool
pub async fn create_pool(settings: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout))
        .connect(&settings.url)
        .await
}

/// Read-only participant lookup over `chat_participants`.
pub struct PgChatDirectory {
    pool: PgPool,
}

impl PgChatDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatDirectory for PgChatDirectory {
    async fn is_participant(&self, user_id: i64, room_id: i64) -> Result<bool, GatewayError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM chat_participants
                WHERE chat_id = $1 AND user_id = $2 AND is_active
            )
            "#,
        )
        .bind(room_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}

/// Message persistence over the `messages` table.
pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Internal row type for the insert-returning query joined with sender
/// display fields.
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: i64,
    chat_id: i64,
    sender_id: i64,
    sender_name: String,
    sender_avatar: Option<String>,
    content: String,
    message_type: String,
    created_at: DateTime<Utc>,
}

impl MessageRow {
    fn into_message(self) -> Message {
        Message {
            id: self.id,
            room_id: self.chat_id,
            sender_id: self.sender_id,
            sender_name: self.sender_name,
            sender_avatar: self.sender_avatar,
            content: self.content,
            message_type: MessageType::from_str(&self.message_type),
            created_at: self.created_at,
        }
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    /// Insert a message and return it with the sender's display fields, so
    /// live delivery needs no second lookup.
    async fn create(
        &self,
        room_id: i64,
        sender_id: i64,
        content: &str,
        message_type: MessageType,
    ) -> Result<Message, GatewayError> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            WITH inserted AS (
                INSERT INTO messages (chat_id, sender_id, content, message_type)
                VALUES ($1, $2, $3, $4)
                RETURNING id, chat_id, sender_id, content,
                          message_type::text AS message_type, created_at
            )
            SELECT i.id, i.chat_id, i.sender_id,
                   u.display_name AS sender_name, u.avatar_url AS sender_avatar,
                   i.content, i.message_type, i.created_at
            FROM inserted i
            JOIN users u ON u.id = i.sender_id
            "#,
        )
        .bind(room_id)
        .bind(sender_id)
        .bind(content)
        .bind(message_type.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_message())
    }
}
