//! Knowledge store error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KnowledgeError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The embedding provider failed; nothing was written.
    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Knowledge chunk not found: {0}")]
    NotFound(String),

    #[error("Invalid knowledge table name: {0}")]
    InvalidTable(String),

    #[error("Invalid knowledge chunk: {0}")]
    Invalid(String),
}
