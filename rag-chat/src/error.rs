//! Error types for the chat pipeline.
//!
//! Retrieval degradation and persistence failures never surface here; they are logged
//! and the turn continues. Only failures that leave the caller without an answer do.

use llm_client::GenerationError;
use std::time::Duration;
use storage::StorageError;
use thiserror::Error;

/// The single user-visible text shown in place of the pending reply on any failure.
pub const USER_FAILURE_MESSAGE: &str =
    "Something went wrong processing your request, please try again.";

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Message must not be empty")]
    EmptyMessage,

    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("Unknown domain: {0}")]
    UnknownDomain(String),

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Turn timed out after {0:?}")]
    Timeout(Duration),

    #[error("Turn cancelled")]
    Cancelled,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ChatError {
    /// Text to show the end user. Details stay in the logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            ChatError::EmptyMessage => "Please enter a message.",
            _ => USER_FAILURE_MESSAGE,
        }
    }
}
