//! # SQLite Knowledge Store
//!
//! One table per knowledge namespace. Embeddings are stored as little-endian f32 blobs;
//! similarity and keyword matching are both computed in process after loading the rows,
//! so case folding is Unicode-aware like the in-memory store.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

use crate::error::KnowledgeError;
use crate::keyword::keyword_matches;
use crate::similarity::rank_by_similarity;
use crate::store::KnowledgeStore;
use crate::types::{KnowledgeChunk, SearchResult};

const MAX_TABLE_NAME_LEN: usize = 64;

const COLUMNS: &str =
    "id, title, body, category, metadata, embedding, word_count, created_at, updated_at";

#[derive(Clone)]
pub struct SqliteKnowledgeStore {
    pool: SqlitePool,
    table: String,
}

impl SqliteKnowledgeStore {
    /// Opens (and creates if missing) the knowledge table `table` on `pool`.
    ///
    /// The table name is interpolated into SQL, so only `[A-Za-z_][A-Za-z0-9_]*` is accepted.
    pub async fn new(pool: SqlitePool, table: impl Into<String>) -> Result<Self, KnowledgeError> {
        let table = table.into();
        validate_table_name(&table)?;
        let store = Self { pool, table };
        store.init().await?;
        Ok(store)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    async fn init(&self) -> Result<(), KnowledgeError> {
        info!(table = %self.table, "Creating knowledge table if not exist");

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                category TEXT,
                metadata TEXT NOT NULL,
                embedding BLOB NOT NULL,
                word_count INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            table = self.table
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_created_at ON {table}(created_at)",
            table = self.table
        ))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch_all(&self) -> Result<Vec<KnowledgeChunk>, KnowledgeError> {
        let rows = sqlx::query(&format!("SELECT {COLUMNS} FROM {}", self.table))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_chunk).collect()
    }
}

#[async_trait]
impl KnowledgeStore for SqliteKnowledgeStore {
    async fn insert(&self, chunk: &KnowledgeChunk) -> Result<(), KnowledgeError> {
        sqlx::query(&format!(
            "INSERT INTO {} ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.table
        ))
        .bind(&chunk.id)
        .bind(&chunk.title)
        .bind(&chunk.body)
        .bind(chunk.category())
        .bind(serde_json::to_string(&chunk.metadata)?)
        .bind(encode_embedding(&chunk.embedding))
        .bind(i64::from(chunk.word_count))
        .bind(format_timestamp(&chunk.created_at))
        .bind(format_timestamp(&chunk.updated_at))
        .execute(&self.pool)
        .await?;

        debug!(table = %self.table, id = %chunk.id, "Inserted knowledge chunk");
        Ok(())
    }

    async fn update(&self, chunk: &KnowledgeChunk) -> Result<(), KnowledgeError> {
        let result = sqlx::query(&format!(
            r#"
            UPDATE {} SET title = ?, body = ?, category = ?, metadata = ?, embedding = ?,
                word_count = ?, updated_at = ?
            WHERE id = ?
            "#,
            self.table
        ))
        .bind(&chunk.title)
        .bind(&chunk.body)
        .bind(chunk.category())
        .bind(serde_json::to_string(&chunk.metadata)?)
        .bind(encode_embedding(&chunk.embedding))
        .bind(i64::from(chunk.word_count))
        .bind(format_timestamp(&chunk.updated_at))
        .bind(&chunk.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(KnowledgeError::NotFound(chunk.id.clone()));
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<KnowledgeChunk>, KnowledgeError> {
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM {} WHERE id = ?",
            self.table
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_chunk).transpose()
    }

    async fn delete(&self, id: &str) -> Result<bool, KnowledgeError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = ?", self.table))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<usize, KnowledgeError> {
        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", self.table))
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as usize)
    }

    #[instrument(skip(self, query_embedding), fields(table = %self.table, dims = query_embedding.len()))]
    async fn vector_search(
        &self,
        query_embedding: &[f32],
        threshold: f32,
        count: usize,
    ) -> Result<Vec<SearchResult>, KnowledgeError> {
        let chunks = self.fetch_all().await?;
        let results = rank_by_similarity(chunks.iter(), query_embedding, threshold, count);
        debug!(
            candidates = chunks.len(),
            matched = results.len(),
            "Vector search complete"
        );
        Ok(results)
    }

    #[instrument(skip(self), fields(table = %self.table))]
    async fn keyword_search(
        &self,
        terms: &[String],
        cap: usize,
    ) -> Result<Vec<SearchResult>, KnowledgeError> {
        if terms.is_empty() || cap == 0 {
            return Ok(Vec::new());
        }

        // SQLite lower()/LIKE only fold ASCII, so matching runs on the Rust side.
        let chunks = self.fetch_all().await?;
        let results = keyword_matches(chunks.iter(), terms, cap);

        debug!(matched = results.len(), "Keyword search complete");
        Ok(results)
    }
}

fn validate_table_name(table: &str) -> Result<(), KnowledgeError> {
    let mut chars = table.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_start && valid_rest && table.len() <= MAX_TABLE_NAME_LEN {
        Ok(())
    } else {
        Err(KnowledgeError::InvalidTable(table.to_string()))
    }
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_embedding(bytes: &[u8]) -> Result<Vec<f32>, KnowledgeError> {
    if bytes.len() % 4 != 0 {
        return Err(KnowledgeError::Invalid(format!(
            "embedding blob length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Fixed-width RFC 3339 so lexical order in SQL equals chronological order.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, KnowledgeError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| KnowledgeError::Invalid(format!("bad timestamp {raw}: {e}")))
}

fn row_to_chunk(row: &SqliteRow) -> Result<KnowledgeChunk, KnowledgeError> {
    let metadata: String = row.try_get("metadata")?;
    let metadata: BTreeMap<String, String> = serde_json::from_str(&metadata)?;
    let embedding: Vec<u8> = row.try_get("embedding")?;
    let word_count: i64 = row.try_get("word_count")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(KnowledgeChunk {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        body: row.try_get("body")?,
        metadata,
        embedding: decode_embedding(&embedding)?,
        word_count: u32::try_from(word_count).unwrap_or(0),
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}
