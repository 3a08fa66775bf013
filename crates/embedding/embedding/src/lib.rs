//! # Text Embeddings
//!
//! This crate defines the embedding provider interface used both when knowledge
//! chunks are ingested and when a chat query arrives.
//!
//! Providers are opaque: text in, fixed-length vector out. Identical text is
//! expected to produce near-identical vectors; callers use them for ranking only.

use async_trait::async_trait;

mod config;
pub use config::{EmbeddingConfig, EnvEmbeddingConfig, DEFAULT_EMBEDDING_MODEL};

/// Service for generating text embeddings.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Generates an embedding vector for a single text string.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, anyhow::Error>;

    /// Generates embedding vectors for multiple texts in a single API call.
    /// Output order matches input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, anyhow::Error>;
}
