//! # Prompt
//!
//! Formats retrieved knowledge and conversation history into the payload sent to a
//! chat model.
//!
//! ## Format
//!
//! The system message is made of three bounded sections:
//!
//! - **Instructions**: persona + formatting rules, fixed per assistant domain
//! - **Relevant knowledge**: at most [`MAX_KNOWLEDGE_SNIPPETS`] snippets, each body cut to
//!   [`KNOWLEDGE_CHAR_BUDGET`] chars plus [`CONTINUATION_MARKER`]; when nothing was
//!   retrieved the section holds [`NO_KNOWLEDGE_NOTICE`] instead of disappearing
//! - **Conversation (recent)**: role-tagged history lines, oldest first (omitted when empty)
//!
//! The current user message is sent as a separate, final `user` message.

/// Role of a message, one-to-one with OpenAI Chat Completions API `role` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    /// Prefix used in serialized history lines ("User: ...").
    pub fn label(&self) -> &'static str {
        match self {
            MessageRole::System => "System",
            MessageRole::User => "User",
            MessageRole::Assistant => "Assistant",
        }
    }
}

/// A single chat message, one-to-one with one element of OpenAI `messages` array.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Section title for retrieved knowledge.
pub const SECTION_KNOWLEDGE: &str = "Relevant knowledge:";

/// Section title for the recent conversation.
pub const SECTION_RECENT: &str = "Conversation (recent):";

/// Replaces the knowledge block when retrieval found nothing.
pub const NO_KNOWLEDGE_NOTICE: &str = "No matching knowledge was found for this question. \
Answer from your general domain guidance only, say so when you are unsure, and do not cite or invent sources.";

/// Appended to a snippet body that was cut at the character budget.
pub const CONTINUATION_MARKER: &str = "...";

/// Maximum number of knowledge snippets placed in one prompt.
pub const MAX_KNOWLEDGE_SNIPPETS: usize = 5;

/// Per-snippet body budget in characters (Unicode scalar values).
pub const KNOWLEDGE_CHAR_BUDGET: usize = 1000;

/// One retrieved knowledge chunk as it appears in the prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeSnippet {
    pub title: String,
    pub category: Option<String>,
    pub body: String,
    pub similarity: f32,
}

/// Cuts `text` to exactly `budget` chars and appends [`CONTINUATION_MARKER`].
/// Text within budget is returned unchanged.
pub fn truncate_with_marker(text: &str, budget: usize) -> String {
    match text.char_indices().nth(budget) {
        Some((byte_idx, _)) => {
            let mut out = String::with_capacity(byte_idx + CONTINUATION_MARKER.len());
            out.push_str(&text[..byte_idx]);
            out.push_str(CONTINUATION_MARKER);
            out
        }
        None => text.to_string(),
    }
}

/// Serializes one history turn as "Role: content".
pub fn format_history_line(role: MessageRole, content: &str) -> String {
    format!("{}: {}", role.label(), content)
}

/// Parses a single line in "Role: content" form into a `ChatMessage`.
///
/// Supports "User: ...", "Assistant: ...", "System: ...". Content is trimmed.
/// Returns `None` for empty lines or unknown prefixes.
pub fn parse_message_line(line: &str) -> Option<ChatMessage> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if let Some(content) = line.strip_prefix("User:") {
        return Some(ChatMessage::user(content.trim()));
    }
    if let Some(content) = line.strip_prefix("Assistant:") {
        return Some(ChatMessage::assistant(content.trim()));
    }
    if let Some(content) = line.strip_prefix("System:") {
        return Some(ChatMessage::system(content.trim()));
    }
    None
}

fn format_snippet(index: usize, snippet: &KnowledgeSnippet) -> String {
    let mut header = format!("[{}] {}", index + 1, snippet.title);
    match &snippet.category {
        Some(category) => header.push_str(&format!(
            " (category: {}, similarity: {:.2})",
            category, snippet.similarity
        )),
        None => header.push_str(&format!(" (similarity: {:.2})", snippet.similarity)),
    }
    format!(
        "{}\n{}",
        header,
        truncate_with_marker(&snippet.body, KNOWLEDGE_CHAR_BUDGET)
    )
}

/// Assembled prompt: the three sections plus helpers to render them for a model.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptPayload {
    pub instructions: String,
    /// Rendered knowledge block, or [`NO_KNOWLEDGE_NOTICE`].
    pub knowledge: String,
    /// Serialized history lines, oldest first.
    pub history: Vec<String>,
    /// Number of snippets that made it into the knowledge block.
    pub knowledge_count: usize,
}

impl PromptPayload {
    /// Builds the payload. Only the first [`MAX_KNOWLEDGE_SNIPPETS`] snippets are used.
    pub fn assemble<H, S>(instructions: &str, snippets: &[KnowledgeSnippet], history: H) -> Self
    where
        H: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let used: Vec<&KnowledgeSnippet> = snippets.iter().take(MAX_KNOWLEDGE_SNIPPETS).collect();
        let knowledge = if used.is_empty() {
            NO_KNOWLEDGE_NOTICE.to_string()
        } else {
            used.iter()
                .enumerate()
                .map(|(i, s)| format_snippet(i, s))
                .collect::<Vec<_>>()
                .join("\n\n")
        };
        Self {
            instructions: instructions.trim().to_string(),
            knowledge,
            history: history
                .into_iter()
                .map(|h| h.as_ref().to_string())
                .collect(),
            knowledge_count: used.len(),
        }
    }

    pub fn has_knowledge(&self) -> bool {
        self.knowledge_count > 0
    }

    /// Renders the system message text: instructions, knowledge section, history section.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.instructions);
        out.push_str("\n\n");
        out.push_str(SECTION_KNOWLEDGE);
        out.push('\n');
        out.push_str(&self.knowledge);
        out.push('\n');
        if !self.history.is_empty() {
            out.push('\n');
            out.push_str(SECTION_RECENT);
            out.push('\n');
            for line in &self.history {
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }

    /// System message followed by the current user message.
    pub fn to_messages(&self, user_message: &str) -> Vec<ChatMessage> {
        vec![ChatMessage::system(self.render()), ChatMessage::user(user_message)]
    }
}
