//! Vector similarity: cosine similarity and threshold ranking.

use crate::types::{KnowledgeChunk, SearchResult};
use std::cmp::Ordering;

/// Cosine similarity between two vectors, in [-1, 1].
///
/// Empty, zero-norm or mismatched-length vectors return 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Ranks `chunks` against `query`: keeps scores at or above `threshold`, highest first,
/// at most `count`. Ties break on chunk id so the order is stable for a fixed score set.
///
/// Chunks whose embedding dimensionality differs from the query are skipped.
/// Pure function of its inputs.
pub fn rank_by_similarity<'a, I>(
    chunks: I,
    query: &[f32],
    threshold: f32,
    count: usize,
) -> Vec<SearchResult>
where
    I: IntoIterator<Item = &'a KnowledgeChunk>,
{
    if query.is_empty() || count == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(f32, &KnowledgeChunk)> = chunks
        .into_iter()
        .filter(|c| c.embedding.len() == query.len())
        .map(|c| (cosine_similarity(query, &c.embedding).clamp(0.0, 1.0), c))
        .filter(|(score, _)| *score >= threshold)
        .collect();

    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.1.id.cmp(&b.1.id))
    });

    scored
        .into_iter()
        .take(count)
        .map(|(similarity, chunk)| SearchResult {
            chunk: chunk.clone(),
            similarity,
        })
        .collect()
}
