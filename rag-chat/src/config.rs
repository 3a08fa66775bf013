//! Chat service configuration loaded from environment variables.

use anyhow::{bail, Context, Result};
use std::env;
use std::time::Duration;

use crate::domain::{Domain, DomainProfile, DomainTable};

pub const DEFAULT_DATABASE_URL: &str = "./data/rag_chat.db";
pub const DEFAULT_LOG_FILE: &str = "logs/rag-chat.log";
pub const DEFAULT_TURN_TIMEOUT_SECS: u64 = 45;
pub const MIN_TURN_TIMEOUT_SECS: u64 = 30;
pub const MAX_TURN_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// SQLite path or `sqlite:` URL for conversations, messages and knowledge tables.
    pub database_url: String,
    pub log_file: String,
    /// Budget for one whole turn (retrieval + generation).
    pub turn_timeout: Duration,
    /// Number of prior messages given to the generator.
    pub history_limit: usize,
    pub profiles: DomainTable<DomainProfile>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            log_file: DEFAULT_LOG_FILE.to_string(),
            turn_timeout: Duration::from_secs(DEFAULT_TURN_TIMEOUT_SECS),
            history_limit: DEFAULT_HISTORY_LIMIT,
            profiles: DomainTable::from_fn(DomainProfile::defaults),
        }
    }
}

impl ChatConfig {
    /// Loads from environment variables; unset values fall back to defaults.
    ///
    /// `TURN_TIMEOUT_SECS` is clamped to 30..=60. Thresholds must lie in [0, 1].
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = non_empty_var("DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(log_file) = non_empty_var("LOG_FILE") {
            config.log_file = log_file;
        }
        if let Some(raw) = non_empty_var("TURN_TIMEOUT_SECS") {
            let secs: u64 = raw
                .parse()
                .with_context(|| format!("TURN_TIMEOUT_SECS is not a number: {raw}"))?;
            config.turn_timeout =
                Duration::from_secs(secs.clamp(MIN_TURN_TIMEOUT_SECS, MAX_TURN_TIMEOUT_SECS));
        }
        if let Some(raw) = non_empty_var("HISTORY_LIMIT") {
            config.history_limit = raw
                .parse()
                .with_context(|| format!("HISTORY_LIMIT is not a number: {raw}"))?;
        }

        for domain in Domain::ALL {
            let key = threshold_var(domain);
            if let Some(raw) = non_empty_var(&key) {
                let threshold: f32 = raw
                    .parse()
                    .with_context(|| format!("{key} is not a number: {raw}"))?;
                if !(0.0..=1.0).contains(&threshold) {
                    bail!("{key} must be within [0, 1], got {threshold}");
                }
                config.profiles.get_mut(domain).match_threshold = threshold;
            }
        }

        Ok(config)
    }

    pub fn profile(&self, domain: Domain) -> &DomainProfile {
        self.profiles.get(domain)
    }
}

fn threshold_var(domain: Domain) -> String {
    format!("{}_MATCH_THRESHOLD", domain.as_str().to_ascii_uppercase())
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
