//! # In-Memory Knowledge Store
//!
//! Simple in-memory storage for tests, development and small static knowledge bases.
//! Data is lost on restart. Uses `Arc<RwLock<>>` for concurrent reads.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::KnowledgeError;
use crate::keyword::keyword_matches;
use crate::similarity::rank_by_similarity;
use crate::store::KnowledgeStore;
use crate::types::{KnowledgeChunk, SearchResult};

#[derive(Debug, Clone, Default)]
pub struct InMemoryKnowledgeStore {
    chunks: Arc<RwLock<HashMap<String, KnowledgeChunk>>>,
}

impl InMemoryKnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_empty(&self) -> bool {
        self.chunks.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.chunks.write().await.clear();
    }
}

#[async_trait]
impl KnowledgeStore for InMemoryKnowledgeStore {
    async fn insert(&self, chunk: &KnowledgeChunk) -> Result<(), KnowledgeError> {
        let mut chunks = self.chunks.write().await;
        if chunks.contains_key(&chunk.id) {
            return Err(KnowledgeError::Invalid(format!(
                "duplicate chunk id {}",
                chunk.id
            )));
        }
        chunks.insert(chunk.id.clone(), chunk.clone());
        Ok(())
    }

    async fn update(&self, chunk: &KnowledgeChunk) -> Result<(), KnowledgeError> {
        let mut chunks = self.chunks.write().await;
        match chunks.get_mut(&chunk.id) {
            Some(existing) => {
                *existing = chunk.clone();
                Ok(())
            }
            None => Err(KnowledgeError::NotFound(chunk.id.clone())),
        }
    }

    async fn get(&self, id: &str) -> Result<Option<KnowledgeChunk>, KnowledgeError> {
        Ok(self.chunks.read().await.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<bool, KnowledgeError> {
        Ok(self.chunks.write().await.remove(id).is_some())
    }

    async fn count(&self) -> Result<usize, KnowledgeError> {
        Ok(self.chunks.read().await.len())
    }

    async fn vector_search(
        &self,
        query_embedding: &[f32],
        threshold: f32,
        count: usize,
    ) -> Result<Vec<SearchResult>, KnowledgeError> {
        let chunks = self.chunks.read().await;
        Ok(rank_by_similarity(
            chunks.values(),
            query_embedding,
            threshold,
            count,
        ))
    }

    async fn keyword_search(
        &self,
        terms: &[String],
        cap: usize,
    ) -> Result<Vec<SearchResult>, KnowledgeError> {
        let chunks = self.chunks.read().await;
        Ok(keyword_matches(chunks.values(), terms, cap))
    }
}
