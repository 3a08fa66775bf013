//! Conversation title derivation.

/// Title of a conversation that has not had a successful turn yet.
pub const PLACEHOLDER_TITLE: &str = "New conversation";

/// Characters of the first user message kept in a derived title.
pub const TITLE_MAX_CHARS: usize = 50;

pub const TITLE_MARKER: &str = "...";

/// Derives a conversation title from the first user message: the first
/// [`TITLE_MAX_CHARS`] characters of the trimmed message followed by [`TITLE_MARKER`].
///
/// Returns `None` for a blank message so the placeholder stays in place.
pub fn derive_title(first_message: &str) -> Option<String> {
    let trimmed = first_message.trim();
    if trimmed.is_empty() {
        return None;
    }
    let head: String = trimmed.chars().take(TITLE_MAX_CHARS).collect();
    Some(format!("{head}{TITLE_MARKER}"))
}
