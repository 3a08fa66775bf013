//! Tests for [`rag_chat::retrieve`]: vector path, keyword fallback and budget behavior.

mod common;

use common::{FailingEmbedder, HangingEmbedder, VocabularyEmbedder};
use knowledge::{
    InMemoryKnowledgeStore, KnowledgeIngestor, NewKnowledgeChunk, KEYWORD_MATCH_SIMILARITY,
};
use rag_chat::{retrieve, Domain, DomainProfile, SearchMethod, TurnBudget};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

async fn seeded_store() -> Arc<InMemoryKnowledgeStore> {
    let store = Arc::new(InMemoryKnowledgeStore::new());
    let ingestor = KnowledgeIngestor::new(store.clone(), Arc::new(VocabularyEmbedder::default()));
    ingestor
        .ingest_batch(vec![
            NewKnowledgeChunk::new("Refund policy", "A refund is issued within 14 days.")
                .with_category("policies"),
            NewKnowledgeChunk::new("Refund pricing", "Refunds affect pricing.")
                .with_category("policies"),
            NewKnowledgeChunk::new("Warranty coverage", "Every warranty lasts two years.")
                .with_category("support"),
        ])
        .await
        .expect("seed");
    store
}

fn budget(secs: u64) -> TurnBudget {
    TurnBudget::new(Duration::from_secs(secs), CancellationToken::new())
}

/// **Test: Vector results are ranked by similarity, highest first, all above threshold.**
///
/// **Setup:** "Refund pricing" matches both vocabulary words, "Refund policy" only one.
/// **Action:** retrieve("refund pricing").
/// **Expected:** Vector method; "Refund pricing" (1.0) before "Refund policy" (~0.707).
#[tokio::test]
async fn vector_results_sorted_descending() {
    let store = seeded_store().await;
    let embedder = VocabularyEmbedder::default();
    let profile = DomainProfile::defaults(Domain::General);

    let retrieval = retrieve(&embedder, store.as_ref(), &profile, "refund pricing", &budget(5)).await;

    assert_eq!(retrieval.method, SearchMethod::Vector);
    assert_eq!(retrieval.results.len(), 2);
    assert_eq!(retrieval.results[0].chunk.title, "Refund pricing");
    assert_eq!(retrieval.results[1].chunk.title, "Refund policy");
    assert!((retrieval.results[0].similarity - 1.0).abs() < 1e-5);
    assert!((retrieval.results[1].similarity - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-4);
    for pair in retrieval.results.windows(2) {
        assert!(pair[0].similarity >= pair[1].similarity);
    }
    assert!(retrieval
        .results
        .iter()
        .all(|r| r.similarity >= profile.match_threshold));
}

/// **Test: Embedding failure falls back to keyword search.**
///
/// **Setup:** Embedder always errors.
/// **Expected:** Keyword method; both refund chunks match with the nominal keyword similarity.
#[tokio::test]
async fn embedding_failure_uses_keyword_fallback() {
    let store = seeded_store().await;
    let profile = DomainProfile::defaults(Domain::General);

    let retrieval = retrieve(&FailingEmbedder, store.as_ref(), &profile, "refund window", &budget(5)).await;

    assert_eq!(retrieval.method, SearchMethod::Keyword);
    assert_eq!(retrieval.results.len(), 2);
    assert!(retrieval
        .results
        .iter()
        .all(|r| r.similarity == KEYWORD_MATCH_SIMILARITY));
}

/// **Test: No chunk above threshold falls back to keyword search.**
///
/// **Setup:** "warranty" is outside the embedder vocabulary, so the query vector is
/// orthogonal to every chunk.
/// **Expected:** Keyword method with the warranty chunk only.
#[tokio::test]
async fn below_threshold_uses_keyword_fallback() {
    let store = seeded_store().await;
    let embedder = VocabularyEmbedder::default();
    let profile = DomainProfile::defaults(Domain::General);

    let retrieval = retrieve(&embedder, store.as_ref(), &profile, "warranty length", &budget(5)).await;

    assert_eq!(retrieval.method, SearchMethod::Keyword);
    assert_eq!(retrieval.results.len(), 1);
    assert_eq!(retrieval.results[0].chunk.title, "Warranty coverage");
}

/// **Test: Nothing matches on either path.**
///
/// **Expected:** Method none and no results; retrieval itself does not fail.
#[tokio::test]
async fn no_match_on_either_path_is_none() {
    let store = seeded_store().await;
    let embedder = VocabularyEmbedder::default();
    let profile = DomainProfile::defaults(Domain::General);

    let retrieval = retrieve(&embedder, store.as_ref(), &profile, "quantum entanglement", &budget(5)).await;

    assert_eq!(retrieval.method, SearchMethod::None);
    assert!(retrieval.results.is_empty());
}

/// **Test: Retrieval is idempotent for a fixed store.**
///
/// **Expected:** Two calls with the same query return the same method, ids and scores.
#[tokio::test]
async fn retrieval_is_idempotent() {
    let store = seeded_store().await;
    let embedder = VocabularyEmbedder::default();
    let profile = DomainProfile::defaults(Domain::General);

    let first = retrieve(&embedder, store.as_ref(), &profile, "refund pricing", &budget(5)).await;
    let second = retrieve(&embedder, store.as_ref(), &profile, "refund pricing", &budget(5)).await;

    assert_eq!(first, second);
    assert_eq!(first.chunk_ids(), second.chunk_ids());
}

/// **Test: A stalled embedding provider still leaves time for the keyword fallback.**
///
/// **Setup:** Embedder never returns; budget of 400ms.
/// **Expected:** Keyword results, returned well before the embedder would finish.
#[tokio::test]
async fn hanging_embedder_degrades_to_keyword() {
    let store = seeded_store().await;
    let profile = DomainProfile::defaults(Domain::General);
    let budget = TurnBudget::new(Duration::from_millis(400), CancellationToken::new());

    let started = std::time::Instant::now();
    let retrieval = retrieve(&HangingEmbedder, store.as_ref(), &profile, "warranty", &budget).await;

    assert_eq!(retrieval.method, SearchMethod::Keyword);
    assert_eq!(retrieval.results.len(), 1);
    assert!(started.elapsed() < Duration::from_secs(5));
}

/// **Test: A cancelled turn retrieves nothing.**
#[tokio::test]
async fn cancelled_budget_returns_none() {
    let store = seeded_store().await;
    let embedder = VocabularyEmbedder::default();
    let profile = DomainProfile::defaults(Domain::General);
    let token = CancellationToken::new();
    token.cancel();
    let budget = TurnBudget::new(Duration::from_secs(5), token);

    let retrieval = retrieve(&embedder, store.as_ref(), &profile, "refund pricing", &budget).await;

    assert_eq!(retrieval.method, SearchMethod::None);
    assert_eq!(embedder.calls(), 0);
}
