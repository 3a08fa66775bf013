//! Knowledge retrieval for one turn: vector search first, keyword search when the vector
//! path yields nothing.
//!
//! Any failure on the way (embedding provider down, search error, step out of budget) is
//! logged and treated as "no results from this path". Retrieval itself never fails a turn.

use embedding::EmbeddingService;
use knowledge::{extract_terms, KnowledgeStore, SearchResult, KEYWORD_RESULT_CAP};
use storage::SearchMethod;
use tracing::{debug, info, instrument, warn};

use crate::budget::TurnBudget;
use crate::domain::DomainProfile;

/// Share of the retrieval budget the query embedding may use, so a stalled provider still
/// leaves time for the keyword fallback.
pub const EMBEDDING_BUDGET_SHARE: f64 = 0.5;

/// Outcome of retrieval: which path produced the results, and the results in rank order.
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieval {
    pub method: SearchMethod,
    pub results: Vec<SearchResult>,
}

impl Retrieval {
    pub fn none() -> Self {
        Self {
            method: SearchMethod::None,
            results: Vec::new(),
        }
    }

    pub fn chunk_ids(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.chunk.id.as_str()).collect()
    }
}

/// Runs vector search, falling back to keyword search on an empty or failed vector path.
#[instrument(skip(embedder, store, profile, query, budget), fields(domain = %profile.domain))]
pub async fn retrieve(
    embedder: &dyn EmbeddingService,
    store: &dyn KnowledgeStore,
    profile: &DomainProfile,
    query: &str,
    budget: &TurnBudget,
) -> Retrieval {
    let vector_results = vector_path(embedder, store, profile, query, budget).await;
    if !vector_results.is_empty() {
        info!(
            results = vector_results.len(),
            top_similarity = vector_results[0].similarity,
            "step: retrieval done via vector search"
        );
        return Retrieval {
            method: SearchMethod::Vector,
            results: vector_results,
        };
    }

    let keyword_results = keyword_path(store, query, budget).await;
    if !keyword_results.is_empty() {
        info!(
            results = keyword_results.len(),
            "step: retrieval done via keyword fallback"
        );
        return Retrieval {
            method: SearchMethod::Keyword,
            results: keyword_results,
        };
    }

    info!("step: retrieval found no knowledge, continuing without context");
    Retrieval::none()
}

async fn vector_path(
    embedder: &dyn EmbeddingService,
    store: &dyn KnowledgeStore,
    profile: &DomainProfile,
    query: &str,
    budget: &TurnBudget,
) -> Vec<SearchResult> {
    let query_embedding = match budget
        .share(EMBEDDING_BUDGET_SHARE)
        .run(embedder.embed(query))
        .await
    {
        Ok(Ok(embedding)) if !embedding.is_empty() => embedding,
        Ok(Ok(_)) => {
            warn!("Embedding provider returned an empty vector, falling back to keyword search");
            return Vec::new();
        }
        Ok(Err(e)) => {
            warn!(error = %e, "Embedding failed, falling back to keyword search");
            return Vec::new();
        }
        Err(exceeded) => {
            warn!(reason = %exceeded, "Embedding did not complete, falling back to keyword search");
            return Vec::new();
        }
    };

    match budget
        .run(store.vector_search(
            &query_embedding,
            profile.match_threshold,
            profile.match_count,
        ))
        .await
    {
        Ok(Ok(results)) => {
            if results.is_empty() {
                info!(
                    threshold = profile.match_threshold,
                    "Vector search returned no chunk above threshold"
                );
            }
            results
        }
        Ok(Err(e)) => {
            warn!(error = %e, "Vector search failed, falling back to keyword search");
            Vec::new()
        }
        Err(exceeded) => {
            warn!(reason = %exceeded, "Vector search did not complete, falling back to keyword search");
            Vec::new()
        }
    }
}

async fn keyword_path(store: &dyn KnowledgeStore, query: &str, budget: &TurnBudget) -> Vec<SearchResult> {
    let terms = extract_terms(query);
    if terms.is_empty() {
        debug!("No usable keyword terms in query");
        return Vec::new();
    }
    debug!(terms = ?terms, "Running keyword fallback search");

    match budget.run(store.keyword_search(&terms, KEYWORD_RESULT_CAP)).await {
        Ok(Ok(results)) => results,
        Ok(Err(e)) => {
            warn!(error = %e, "Keyword search failed, continuing without knowledge");
            Vec::new()
        }
        Err(exceeded) => {
            warn!(reason = %exceeded, "Keyword search did not complete, continuing without knowledge");
            Vec::new()
        }
    }
}
