//! Keyword fallback search: term extraction and case-insensitive substring matching.
//!
//! Used only when vector search yields nothing (including when the query could not be
//! embedded). Zero matches is a normal, empty result.

use crate::types::{KnowledgeChunk, SearchResult};

/// Nominal similarity assigned to every keyword match.
pub const KEYWORD_MATCH_SIMILARITY: f32 = 0.5;

/// At most this many query terms are used.
pub const MAX_KEYWORD_TERMS: usize = 5;

/// At most this many keyword matches are returned.
pub const KEYWORD_RESULT_CAP: usize = 8;

/// Tokens shorter than this (in chars) are dropped.
pub const MIN_TERM_CHARS: usize = 3;

const STOPWORDS: &[&str] = &[
    "about", "after", "again", "all", "also", "and", "any", "are", "because", "been", "before",
    "being", "but", "can", "could", "did", "does", "doing", "for", "from", "had", "has", "have",
    "her", "here", "him", "his", "how", "into", "its", "just", "more", "most", "not", "now",
    "off", "once", "only", "other", "our", "out", "over", "own", "same", "she", "should", "some",
    "such", "than", "that", "the", "their", "them", "then", "there", "these", "they", "this",
    "those", "through", "too", "under", "until", "very", "was", "were", "what", "when", "where",
    "which", "while", "who", "whom", "why", "will", "with", "would", "you", "your",
];

/// Splits `query` into lowercase alphanumeric tokens, drops short tokens and stopwords,
/// dedupes preserving first occurrence, and keeps the first [`MAX_KEYWORD_TERMS`].
pub fn extract_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for token in query
        .split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
    {
        if token.chars().count() < MIN_TERM_CHARS || STOPWORDS.contains(&token.as_str()) {
            continue;
        }
        if terms.contains(&token) {
            continue;
        }
        terms.push(token);
        if terms.len() == MAX_KEYWORD_TERMS {
            break;
        }
    }
    terms
}

/// True when any of `terms` (already lowercase) occurs in the chunk's title, body or category.
pub fn chunk_matches(chunk: &KnowledgeChunk, terms: &[String]) -> bool {
    let title = chunk.title.to_lowercase();
    let body = chunk.body.to_lowercase();
    let category = chunk.category().map(str::to_lowercase).unwrap_or_default();
    terms.iter().any(|t| {
        title.contains(t.as_str()) || body.contains(t.as_str()) || category.contains(t.as_str())
    })
}

/// OR-matches `terms` over `chunks`; newest first (id breaks ties), capped at `cap`.
pub fn keyword_matches<'a, I>(chunks: I, terms: &[String], cap: usize) -> Vec<SearchResult>
where
    I: IntoIterator<Item = &'a KnowledgeChunk>,
{
    if terms.is_empty() || cap == 0 {
        return Vec::new();
    }

    let mut matched: Vec<&KnowledgeChunk> = chunks
        .into_iter()
        .filter(|c| chunk_matches(c, terms))
        .collect();

    matched.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    matched
        .into_iter()
        .take(cap)
        .map(|chunk| SearchResult {
            chunk: chunk.clone(),
            similarity: KEYWORD_MATCH_SIMILARITY,
        })
        .collect()
}
