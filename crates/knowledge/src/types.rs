//! Core knowledge types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Metadata key holding the chunk's category.
pub const CATEGORY_KEY: &str = "category";

/// Input for ingestion: everything except the derived fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewKnowledgeChunk {
    pub title: String,
    pub body: String,
    /// Open key-value metadata (category, tags, source...).
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl NewKnowledgeChunk {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_category(self, category: impl Into<String>) -> Self {
        self.with_metadata(CATEGORY_KEY, category)
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A single indexed unit of domain knowledge with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    pub id: String,
    pub title: String,
    pub body: String,
    pub metadata: BTreeMap<String, String>,
    /// Embedding of `body`; fixed dimensionality per store.
    pub embedding: Vec<f32>,
    /// Whitespace-separated word count of `body`.
    pub word_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl KnowledgeChunk {
    /// Builds a chunk from ingestion input and the embedding of its body.
    pub(crate) fn from_new(input: NewKnowledgeChunk, embedding: Vec<f32>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            word_count: word_count(&input.body),
            title: input.title,
            body: input.body,
            metadata: input.metadata,
            embedding,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces body and embedding together and refreshes derived fields.
    pub(crate) fn replace_body(&mut self, body: String, embedding: Vec<f32>) {
        self.word_count = word_count(&body);
        self.body = body;
        self.embedding = embedding;
        self.updated_at = Utc::now();
    }

    pub fn category(&self) -> Option<&str> {
        self.metadata.get(CATEGORY_KEY).map(String::as_str)
    }
}

/// Derived word count.
pub fn word_count(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}

/// A chunk with its similarity to the query, in [0, 1].
///
/// Keyword fallback matches carry a fixed nominal similarity so both search paths
/// share one shape downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub chunk: KnowledgeChunk,
    pub similarity: f32,
}
