//! # Knowledge Ingestion
//!
//! The single write path into a [`KnowledgeStore`]. Every body is embedded before it is
//! written, and body and embedding are always written together, so a chunk's vector never
//! describes stale text. If the embedding provider fails nothing is written.

use embedding::EmbeddingService;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::error::KnowledgeError;
use crate::store::KnowledgeStore;
use crate::types::{KnowledgeChunk, NewKnowledgeChunk};

#[derive(Clone)]
pub struct KnowledgeIngestor {
    store: Arc<dyn KnowledgeStore>,
    embedder: Arc<dyn EmbeddingService>,
}

impl KnowledgeIngestor {
    pub fn new(store: Arc<dyn KnowledgeStore>, embedder: Arc<dyn EmbeddingService>) -> Self {
        Self { store, embedder }
    }

    pub fn store(&self) -> &Arc<dyn KnowledgeStore> {
        &self.store
    }

    /// Embeds the body and inserts a new chunk.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn ingest(&self, input: NewKnowledgeChunk) -> Result<KnowledgeChunk, KnowledgeError> {
        validate(&input)?;

        let embedding = self.embed_one(&input.body).await?;
        let chunk = KnowledgeChunk::from_new(input, embedding);
        self.store.insert(&chunk).await?;

        info!(id = %chunk.id, words = chunk.word_count, "Ingested knowledge chunk");
        Ok(chunk)
    }

    /// Embeds all bodies in one provider call, then inserts the chunks in input order.
    ///
    /// Validation and embedding happen before any write: a bad item or a provider failure
    /// leaves the store untouched.
    #[instrument(skip(self, inputs), fields(count = inputs.len()))]
    pub async fn ingest_batch(
        &self,
        inputs: Vec<NewKnowledgeChunk>,
    ) -> Result<Vec<KnowledgeChunk>, KnowledgeError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        for input in &inputs {
            validate(input)?;
        }

        let bodies: Vec<String> = inputs.iter().map(|i| i.body.clone()).collect();
        let embeddings = self
            .embedder
            .embed_batch(&bodies)
            .await
            .map_err(|e| KnowledgeError::Embedding(e.to_string()))?;

        if embeddings.len() != inputs.len() {
            return Err(KnowledgeError::Embedding(format!(
                "provider returned {} embeddings for {} inputs",
                embeddings.len(),
                inputs.len()
            )));
        }
        if let Some(dims) = embeddings.first().map(Vec::len) {
            if dims == 0 || embeddings.iter().any(|e| e.len() != dims) {
                return Err(KnowledgeError::Embedding(
                    "provider returned inconsistent embedding dimensions".to_string(),
                ));
            }
        }

        let mut chunks = Vec::with_capacity(inputs.len());
        for (input, embedding) in inputs.into_iter().zip(embeddings) {
            let chunk = KnowledgeChunk::from_new(input, embedding);
            self.store.insert(&chunk).await?;
            chunks.push(chunk);
        }

        info!(inserted = chunks.len(), "Ingested knowledge batch");
        Ok(chunks)
    }

    /// Replaces the body of an existing chunk, re-embedding it first.
    #[instrument(skip(self, body))]
    pub async fn update_body(
        &self,
        id: &str,
        body: impl Into<String> + Send,
    ) -> Result<KnowledgeChunk, KnowledgeError> {
        let body = body.into();
        if body.trim().is_empty() {
            return Err(KnowledgeError::Invalid("body must not be empty".to_string()));
        }

        let mut chunk = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| KnowledgeError::NotFound(id.to_string()))?;

        let embedding = self.embed_one(&body).await?;
        chunk.replace_body(body, embedding);
        self.store.update(&chunk).await?;

        info!(id = %chunk.id, words = chunk.word_count, "Updated knowledge chunk body");
        Ok(chunk)
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, KnowledgeError> {
        let embedding = self.embedder.embed(text).await.map_err(|e| {
            warn!(error = %e, "Embedding provider failed, nothing written");
            KnowledgeError::Embedding(e.to_string())
        })?;
        if embedding.is_empty() {
            return Err(KnowledgeError::Embedding(
                "provider returned an empty embedding".to_string(),
            ));
        }
        Ok(embedding)
    }
}

fn validate(input: &NewKnowledgeChunk) -> Result<(), KnowledgeError> {
    if input.title.trim().is_empty() {
        return Err(KnowledgeError::Invalid("title must not be empty".to_string()));
    }
    if input.body.trim().is_empty() {
        return Err(KnowledgeError::Invalid("body must not be empty".to_string()));
    }
    Ok(())
}
