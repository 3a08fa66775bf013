//! Conversation history: the most recent turns of a conversation as role-tagged lines.

use prompt::{format_history_line, MessageRole as PromptRole};
use std::sync::Arc;
use storage::{ChatRepository, MessageRecord, MessageRole};
use tracing::{debug, warn};

#[derive(Clone)]
pub struct HistoryManager {
    repo: Arc<dyn ChatRepository>,
    limit: usize,
}

impl HistoryManager {
    pub fn new(repo: Arc<dyn ChatRepository>, limit: usize) -> Self {
        Self { repo, limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Last `limit` messages of the conversation, oldest first, as `"Role: content"` lines.
    ///
    /// No conversation yet means no history. A read failure is logged and also yields
    /// no history; the turn continues without short-term memory.
    pub async fn load(&self, conversation_id: Option<&str>) -> Vec<String> {
        let Some(conversation_id) = conversation_id else {
            return Vec::new();
        };

        match self.repo.recent_messages(conversation_id, self.limit).await {
            Ok(messages) => {
                debug!(
                    conversation_id,
                    count = messages.len(),
                    "Loaded conversation history"
                );
                messages.iter().map(history_line).collect()
            }
            Err(e) => {
                warn!(conversation_id, error = %e, "Failed to load history, continuing without it");
                Vec::new()
            }
        }
    }
}

fn history_line(message: &MessageRecord) -> String {
    let role = match message.role {
        MessageRole::User => PromptRole::User,
        MessageRole::Assistant => PromptRole::Assistant,
    };
    format_history_line(role, &message.content)
}
