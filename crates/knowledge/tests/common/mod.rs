//! Shared test utilities for knowledge integration tests.
//!
//! Provides deterministic embedding services so ranking can be asserted without
//! calling an external provider.

#![allow(dead_code)]

use async_trait::async_trait;
use embedding::EmbeddingService;
use knowledge::{KnowledgeChunk, KnowledgeIngestor, KnowledgeStore, NewKnowledgeChunk};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const VOCABULARY: [&str; 6] = ["refund", "shipping", "keyword", "backlink", "pricing", "growth"];

/// Embeds text as word counts over [`VOCABULARY`]. Texts sharing words score high.
#[derive(Default)]
pub struct VocabularyEmbedder {
    pub calls: AtomicUsize,
}

impl VocabularyEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn vocabulary_vector(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    VOCABULARY
        .iter()
        .map(|word| lower.matches(word).count() as f32)
        .collect()
}

#[async_trait]
impl EmbeddingService for VocabularyEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, anyhow::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vocabulary_vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, anyhow::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| vocabulary_vector(t)).collect())
    }
}

/// Embedding service whose provider is always down.
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingService for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, anyhow::Error> {
        Err(anyhow::anyhow!("embedding provider unavailable"))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, anyhow::Error> {
        Err(anyhow::anyhow!("embedding provider unavailable"))
    }
}

/// Ingests a small mixed corpus through the real write path.
pub async fn seed_corpus(store: Arc<dyn KnowledgeStore>) -> Vec<KnowledgeChunk> {
    let ingestor = KnowledgeIngestor::new(store, Arc::new(VocabularyEmbedder::default()));
    ingestor
        .ingest_batch(vec![
            NewKnowledgeChunk::new("Refund policy", "A refund is issued within 14 days.")
                .with_category("policies"),
            NewKnowledgeChunk::new("Shipping times", "Standard shipping takes 3 days.")
                .with_category("logistics"),
            NewKnowledgeChunk::new("Keyword research", "Start keyword research from intent.")
                .with_category("seo"),
            NewKnowledgeChunk::new("Pricing growth", "Tiered pricing supports growth.")
                .with_category("strategy"),
        ])
        .await
        .unwrap()
}
