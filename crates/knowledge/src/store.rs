//! # Knowledge Storage
//!
//! The `KnowledgeStore` trait is implemented by storage backends (in-memory, SQLite).
//! Reads are side-effect free; writes are expected to come only from [`crate::KnowledgeIngestor`].

use async_trait::async_trait;

use crate::error::KnowledgeError;
use crate::types::{KnowledgeChunk, SearchResult};

#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Inserts a new chunk. The chunk must already carry the embedding of its body.
    async fn insert(&self, chunk: &KnowledgeChunk) -> Result<(), KnowledgeError>;

    /// Replaces an existing chunk (body, embedding and metadata are written together).
    /// Returns [`KnowledgeError::NotFound`] when the id does not exist.
    async fn update(&self, chunk: &KnowledgeChunk) -> Result<(), KnowledgeError>;

    async fn get(&self, id: &str) -> Result<Option<KnowledgeChunk>, KnowledgeError>;

    /// Deletes a chunk. Returns whether a row was removed.
    async fn delete(&self, id: &str) -> Result<bool, KnowledgeError>;

    async fn count(&self) -> Result<usize, KnowledgeError>;

    /// Chunks with similarity at or above `threshold`, highest first, at most `count`.
    /// An empty store or no qualifying chunk yields an empty vector, not an error.
    async fn vector_search(
        &self,
        query_embedding: &[f32],
        threshold: f32,
        count: usize,
    ) -> Result<Vec<SearchResult>, KnowledgeError>;

    /// Chunks whose title, body or category contains any of `terms` (lowercase),
    /// newest first, at most `cap`, each with the nominal keyword similarity.
    async fn keyword_search(
        &self,
        terms: &[String],
        cap: usize,
    ) -> Result<Vec<SearchResult>, KnowledgeError>;
}
