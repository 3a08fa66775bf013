//! Conversation record model.
//!
//! Maps to the `conversations` table. A conversation belongs to one owner and one
//! assistant domain; its title starts as a placeholder and is replaced once.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::title::PLACEHOLDER_TITLE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConversationRecord {
    pub id: String,
    pub owner_id: String,
    /// Assistant persona tag (e.g. `strategy`, `seo`, `general`).
    pub domain: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationRecord {
    /// Creates a new record with a generated UUID, the placeholder title and current timestamps.
    pub fn new(owner_id: impl Into<String>, domain: impl Into<String>) -> Self {
        let ts = now();
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            domain: domain.into(),
            title: PLACEHOLDER_TITLE.to_string(),
            created_at: ts,
            updated_at: ts,
        }
    }

    pub fn has_placeholder_title(&self) -> bool {
        self.title == PLACEHOLDER_TITLE
    }
}

/// Current time at the precision stored in SQLite (microseconds), so records
/// read back compare equal to the ones written.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
