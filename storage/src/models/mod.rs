//! Persisted models: conversations, messages and their retrieval metadata.

mod conversation;
mod message_record;

pub use conversation::{now, ConversationRecord};
pub use message_record::{CitedChunk, MessageMetadata, MessageRecord, MessageRole, SearchMethod};
