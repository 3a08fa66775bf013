//! Storage crate: conversation and message persistence.
//!
//! ## Modules
//!
//! - [`error`] – Storage error types
//! - [`models`] – ConversationRecord, MessageRecord, retrieval metadata
//! - [`repository`] – ChatRepository trait
//! - [`chat_repo`] – SqliteChatRepository (SQLite)
//! - [`sqlite_pool`] – SqlitePoolManager
//! - [`title`] – conversation title derivation

mod chat_repo;
mod error;
mod models;
mod repository;
mod sqlite_pool;
mod title;

pub use chat_repo::SqliteChatRepository;
pub use error::StorageError;
pub use models::{
    CitedChunk, ConversationRecord, MessageMetadata, MessageRecord, MessageRole, SearchMethod,
};
pub use repository::ChatRepository;
pub use sqlite_pool::SqlitePoolManager;
pub use title::{derive_title, PLACEHOLDER_TITLE, TITLE_MARKER, TITLE_MAX_CHARS};
