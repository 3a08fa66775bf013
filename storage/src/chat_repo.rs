//! Chat repository: SQLite persistence for conversations and messages.
//!
//! Messages carry an autoincrement sequence column; reads order by it so the log comes
//! back exactly in submission order. Deleting a conversation removes its messages in the
//! same transaction.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;
use tracing::{debug, info};

use crate::error::StorageError;
use crate::models::{now, ConversationRecord, MessageMetadata, MessageRecord};
use crate::repository::ChatRepository;
use crate::sqlite_pool::SqlitePoolManager;
use crate::title::PLACEHOLDER_TITLE;

const MESSAGE_COLUMNS: &str = "id, conversation_id, role, content, metadata, created_at";

#[derive(Clone)]
pub struct SqliteChatRepository {
    pool_manager: SqlitePoolManager,
}

impl SqliteChatRepository {
    pub async fn new(database_url: &str) -> Result<Self, StorageError> {
        let pool_manager = SqlitePoolManager::new(database_url).await?;
        Self::from_pool(pool_manager).await
    }

    /// Builds the repository on an existing pool (e.g. shared with the knowledge store).
    pub async fn from_pool(pool_manager: SqlitePoolManager) -> Result<Self, StorageError> {
        let repo = Self { pool_manager };
        repo.init().await?;
        Ok(repo)
    }

    pub fn pool_manager(&self) -> &SqlitePoolManager {
        &self.pool_manager
    }

    async fn init(&self) -> Result<(), StorageError> {
        info!("Creating chat tables if not exist");

        let pool = self.pool_manager.pool();

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                domain TEXT NOT NULL,
                title TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                metadata TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_conversations_owner_domain ON conversations(owner_id, domain, updated_at);
            CREATE INDEX IF NOT EXISTS idx_messages_conversation_seq ON messages(conversation_id, seq);
            "#,
        )
        .execute(pool)
        .await?;

        info!("Chat tables created successfully");
        Ok(())
    }

    async fn insert_conversation(&self, record: &ConversationRecord) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO conversations (id, owner_id, domain, title, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.owner_id)
        .bind(&record.domain)
        .bind(&record.title)
        .bind(format_timestamp(&record.created_at))
        .bind(format_timestamp(&record.updated_at))
        .execute(self.pool_manager.pool())
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ChatRepository for SqliteChatRepository {
    async fn create_conversation(
        &self,
        owner_id: &str,
        domain: &str,
    ) -> Result<ConversationRecord, StorageError> {
        let record = ConversationRecord::new(owner_id, domain);
        self.insert_conversation(&record).await?;
        info!(conversation_id = %record.id, owner_id, domain, "Created conversation");
        Ok(record)
    }

    async fn get_conversation(
        &self,
        owner_id: &str,
        conversation_id: &str,
    ) -> Result<Option<ConversationRecord>, StorageError> {
        let record = sqlx::query_as::<_, ConversationRecord>(
            "SELECT * FROM conversations WHERE id = ? AND owner_id = ?",
        )
        .bind(conversation_id)
        .bind(owner_id)
        .fetch_optional(self.pool_manager.pool())
        .await?;
        Ok(record)
    }

    async fn list_conversations(
        &self,
        owner_id: &str,
        domain: &str,
    ) -> Result<Vec<ConversationRecord>, StorageError> {
        let records = sqlx::query_as::<_, ConversationRecord>(
            "SELECT * FROM conversations WHERE owner_id = ? AND domain = ? ORDER BY updated_at DESC, id ASC",
        )
        .bind(owner_id)
        .bind(domain)
        .fetch_all(self.pool_manager.pool())
        .await?;

        debug!(owner_id, domain, count = records.len(), "Listed conversations");
        Ok(records)
    }

    async fn rename_conversation(
        &self,
        owner_id: &str,
        conversation_id: &str,
        title: &str,
    ) -> Result<(), StorageError> {
        let result = sqlx::query(
            "UPDATE conversations SET title = ?, updated_at = ? WHERE id = ? AND owner_id = ?",
        )
        .bind(title)
        .bind(format_timestamp(&now()))
        .bind(conversation_id)
        .bind(owner_id)
        .execute(self.pool_manager.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!(
                "conversation {conversation_id}"
            )));
        }
        Ok(())
    }

    async fn set_title_if_placeholder(
        &self,
        conversation_id: &str,
        title: &str,
    ) -> Result<bool, StorageError> {
        let result = sqlx::query("UPDATE conversations SET title = ? WHERE id = ? AND title = ?")
            .bind(title)
            .bind(conversation_id)
            .bind(PLACEHOLDER_TITLE)
            .execute(self.pool_manager.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_conversation(
        &self,
        owner_id: &str,
        conversation_id: &str,
    ) -> Result<bool, StorageError> {
        let mut tx = self.pool_manager.pool().begin().await?;

        let owned: Option<(String,)> =
            sqlx::query_as("SELECT id FROM conversations WHERE id = ? AND owner_id = ?")
                .bind(conversation_id)
                .bind(owner_id)
                .fetch_optional(&mut *tx)
                .await?;
        if owned.is_none() {
            return Ok(false);
        }

        let messages = sqlx::query("DELETE FROM messages WHERE conversation_id = ?")
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM conversations WHERE id = ?")
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(
            conversation_id,
            messages = messages.rows_affected(),
            "Deleted conversation"
        );
        Ok(true)
    }

    async fn append_message(&self, message: &MessageRecord) -> Result<(), StorageError> {
        let metadata = message
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let mut tx = self.pool_manager.pool().begin().await?;

        let touched = sqlx::query(
            "UPDATE conversations SET updated_at = MAX(updated_at, ?) WHERE id = ?",
        )
        .bind(format_timestamp(&message.created_at))
        .bind(&message.conversation_id)
        .execute(&mut *tx)
        .await?;
        if touched.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!(
                "conversation {}",
                message.conversation_id
            )));
        }

        sqlx::query(&format!(
            "INSERT INTO messages ({MESSAGE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?)"
        ))
        .bind(&message.id)
        .bind(&message.conversation_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(metadata)
        .bind(format_timestamp(&message.created_at))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(
            conversation_id = %message.conversation_id,
            role = %message.role,
            "Saved message"
        );
        Ok(())
    }

    async fn list_messages(
        &self,
        owner_id: &str,
        conversation_id: &str,
    ) -> Result<Vec<MessageRecord>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT m.id, m.conversation_id, m.role, m.content, m.metadata, m.created_at
            FROM messages m
            JOIN conversations c ON c.id = m.conversation_id
            WHERE m.conversation_id = ? AND c.owner_id = ?
            ORDER BY m.seq ASC
            "#,
        )
        .bind(conversation_id)
        .bind(owner_id)
        .fetch_all(self.pool_manager.pool())
        .await?;

        rows.iter().map(row_to_message).collect()
    }

    async fn recent_messages(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, StorageError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS} FROM (
                SELECT seq, {MESSAGE_COLUMNS} FROM messages
                WHERE conversation_id = ?
                ORDER BY seq DESC
                LIMIT ?
            ) ORDER BY seq ASC
            "#
        ))
        .bind(conversation_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(self.pool_manager.pool())
        .await?;

        debug!(conversation_id, count = rows.len(), "Retrieved recent messages");
        rows.iter().map(row_to_message).collect()
    }
}

/// Fixed-width RFC 3339 so lexical order in SQL equals chronological order.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<MessageRecord, StorageError> {
    let role: String = row.try_get("role")?;
    let metadata: Option<String> = row.try_get("metadata")?;
    let metadata = metadata
        .as_deref()
        .map(serde_json::from_str::<MessageMetadata>)
        .transpose()?;

    Ok(MessageRecord {
        id: row.try_get("id")?,
        conversation_id: row.try_get("conversation_id")?,
        role: role.parse()?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
        metadata,
    })
}
