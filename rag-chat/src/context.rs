//! Context assembly: retrieved chunks and history into a bounded prompt, plus the
//! citation list returned to the caller.

use knowledge::SearchResult;
use prompt::{KnowledgeSnippet, PromptPayload};
use storage::CitedChunk;

use crate::domain::DomainProfile;

/// Chunks cited back to the caller and stored with the assistant message.
pub const MAX_CITED_CHUNKS: usize = 3;

pub fn to_snippet(result: &SearchResult) -> KnowledgeSnippet {
    KnowledgeSnippet {
        title: result.chunk.title.clone(),
        category: result.chunk.category().map(str::to_string),
        body: result.chunk.body.clone(),
        similarity: result.similarity,
    }
}

pub fn to_cited(result: &SearchResult) -> CitedChunk {
    CitedChunk {
        id: result.chunk.id.clone(),
        title: result.chunk.title.clone(),
        category: result.chunk.category().map(str::to_string),
        similarity: result.similarity,
    }
}

/// Builds the prompt for one turn. Pure: same inputs, same payload.
pub fn assemble_prompt(
    profile: &DomainProfile,
    results: &[SearchResult],
    history: &[String],
) -> PromptPayload {
    let snippets: Vec<KnowledgeSnippet> = results.iter().map(to_snippet).collect();
    PromptPayload::assemble(&profile.instructions, &snippets, history)
}

/// Top results as citations, in rank order.
pub fn citations(results: &[SearchResult]) -> Vec<CitedChunk> {
    results.iter().take(MAX_CITED_CHUNKS).map(to_cited).collect()
}
