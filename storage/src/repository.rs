//! Repository trait for conversations and their message logs.
//!
//! Conversations are owned by one user; every owner-facing operation is scoped by
//! `owner_id` so one user can never read or mutate another's conversations.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::models::{ConversationRecord, MessageRecord};

#[async_trait]
pub trait ChatRepository: Send + Sync {
    async fn create_conversation(
        &self,
        owner_id: &str,
        domain: &str,
    ) -> Result<ConversationRecord, StorageError>;

    /// Returns the conversation only if it belongs to `owner_id`.
    async fn get_conversation(
        &self,
        owner_id: &str,
        conversation_id: &str,
    ) -> Result<Option<ConversationRecord>, StorageError>;

    /// Owner's conversations in one domain, most recently updated first.
    async fn list_conversations(
        &self,
        owner_id: &str,
        domain: &str,
    ) -> Result<Vec<ConversationRecord>, StorageError>;

    async fn rename_conversation(
        &self,
        owner_id: &str,
        conversation_id: &str,
        title: &str,
    ) -> Result<(), StorageError>;

    /// Sets the title only while it is still the placeholder. Returns whether it was set.
    async fn set_title_if_placeholder(
        &self,
        conversation_id: &str,
        title: &str,
    ) -> Result<bool, StorageError>;

    /// Deletes the conversation and all of its messages. Returns whether it existed.
    async fn delete_conversation(
        &self,
        owner_id: &str,
        conversation_id: &str,
    ) -> Result<bool, StorageError>;

    /// Appends a message and bumps the conversation's `updated_at`.
    async fn append_message(&self, message: &MessageRecord) -> Result<(), StorageError>;

    /// Full message log of an owned conversation in submission order.
    async fn list_messages(
        &self,
        owner_id: &str,
        conversation_id: &str,
    ) -> Result<Vec<MessageRecord>, StorageError>;

    /// The last `limit` messages, oldest first.
    async fn recent_messages(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, StorageError>;
}
