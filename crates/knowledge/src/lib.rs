//! # Knowledge
//!
//! Shared, read-mostly collection of knowledge chunks used for retrieval.
//!
//! ## Modules
//!
//! - [`types`] - KnowledgeChunk, NewKnowledgeChunk, SearchResult
//! - [`store`] - KnowledgeStore trait
//! - [`similarity`] - cosine similarity and threshold ranking (vector search)
//! - [`keyword`] - query term extraction and substring matching (keyword fallback)
//! - [`inmemory`] - in-memory store for tests and small deployments
//! - [`sqlite`] - SQLite store, one table per knowledge namespace
//! - [`ingest`] - KnowledgeIngestor, the only write path; keeps embeddings in sync with bodies
//!
//! ## Invariant
//!
//! A chunk's embedding always corresponds to its current body. Writes go through
//! [`KnowledgeIngestor`], which embeds first and only then writes body and vector together.

pub mod error;
pub mod ingest;
pub mod inmemory;
pub mod keyword;
pub mod similarity;
pub mod sqlite;
pub mod store;
pub mod types;

pub use error::KnowledgeError;
pub use ingest::KnowledgeIngestor;
pub use inmemory::InMemoryKnowledgeStore;
pub use keyword::{
    extract_terms, KEYWORD_MATCH_SIMILARITY, KEYWORD_RESULT_CAP, MAX_KEYWORD_TERMS,
    MIN_TERM_CHARS,
};
pub use similarity::{cosine_similarity, rank_by_similarity};
pub use sqlite::SqliteKnowledgeStore;
pub use store::KnowledgeStore;
pub use types::{word_count, KnowledgeChunk, NewKnowledgeChunk, SearchResult};
