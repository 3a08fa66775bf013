//! Assistant domains and their per-domain settings.
//!
//! One pipeline serves every domain; what differs (persona instructions, knowledge table,
//! similarity threshold, output length) lives in a [`DomainProfile`]. Per-domain resources
//! are held in a [`DomainTable`], an enum-keyed table resolved once at construction.

use llm_client::GenerationOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ChatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Strategy,
    Seo,
    General,
}

impl Domain {
    pub const ALL: [Domain; 3] = [Domain::Strategy, Domain::Seo, Domain::General];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Strategy => "strategy",
            Domain::Seo => "seo",
            Domain::General => "general",
        }
    }

    /// Knowledge table for this domain.
    pub fn knowledge_table(&self) -> &'static str {
        match self {
            Domain::Strategy => "knowledge_strategy",
            Domain::Seo => "knowledge_seo",
            Domain::General => "knowledge_general",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strategy" => Ok(Domain::Strategy),
            "seo" => Ok(Domain::Seo),
            "general" => Ok(Domain::General),
            other => Err(ChatError::UnknownDomain(other.to_string())),
        }
    }
}

pub const DEFAULT_MATCH_COUNT: usize = 5;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

const STRATEGY_INSTRUCTIONS: &str = "You are a business strategy advisor. Give concrete, \
prioritized recommendations grounded in the knowledge provided. Use short sections and \
bullet points. When you rely on a knowledge entry, mention its title. If the knowledge does \
not cover the question, say so and answer from general strategy practice without inventing sources.";

const SEO_INSTRUCTIONS: &str = "You are an SEO advisor. Explain recommendations step by step \
and tie each one to the knowledge provided. Use bullet points for action items. When you rely \
on a knowledge entry, mention its title. If the knowledge does not cover the question, say so \
and answer from established SEO practice without inventing sources.";

const GENERAL_INSTRUCTIONS: &str = "You are a helpful assistant. Answer clearly and concisely, \
using the knowledge provided when it is relevant and mentioning the titles you rely on. If the \
knowledge does not cover the question, say so and answer from general knowledge without \
inventing sources.";

/// Everything the pipeline needs to know about one assistant persona.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainProfile {
    pub domain: Domain,
    pub instructions: String,
    pub knowledge_table: String,
    /// Minimum cosine similarity for a vector match.
    pub match_threshold: f32,
    /// Maximum vector matches requested per turn.
    pub match_count: usize,
    pub generation: GenerationOptions,
}

impl DomainProfile {
    pub fn defaults(domain: Domain) -> Self {
        let (instructions, match_threshold, max_output_tokens) = match domain {
            Domain::Strategy => (STRATEGY_INSTRUCTIONS, 0.30, 2500),
            Domain::Seo => (SEO_INSTRUCTIONS, 0.35, 2500),
            Domain::General => (GENERAL_INSTRUCTIONS, 0.20, 2000),
        };
        Self {
            domain,
            instructions: instructions.to_string(),
            knowledge_table: domain.knowledge_table().to_string(),
            match_threshold,
            match_count: DEFAULT_MATCH_COUNT,
            generation: GenerationOptions {
                temperature: DEFAULT_TEMPERATURE,
                max_output_tokens,
            },
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.match_threshold = threshold;
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }
}

/// A value per [`Domain`]. Lookup is total: every domain always has an entry.
#[derive(Debug, Clone)]
pub struct DomainTable<T> {
    strategy: T,
    seo: T,
    general: T,
}

impl<T> DomainTable<T> {
    pub fn new(strategy: T, seo: T, general: T) -> Self {
        Self {
            strategy,
            seo,
            general,
        }
    }

    pub fn from_fn(mut f: impl FnMut(Domain) -> T) -> Self {
        Self::new(f(Domain::Strategy), f(Domain::Seo), f(Domain::General))
    }

    pub fn get(&self, domain: Domain) -> &T {
        match domain {
            Domain::Strategy => &self.strategy,
            Domain::Seo => &self.seo,
            Domain::General => &self.general,
        }
    }

    pub fn get_mut(&mut self, domain: Domain) -> &mut T {
        match domain {
            Domain::Strategy => &mut self.strategy,
            Domain::Seo => &mut self.seo,
            Domain::General => &mut self.general,
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(Domain, T) -> U) -> DomainTable<U> {
        DomainTable {
            strategy: f(Domain::Strategy, self.strategy),
            seo: f(Domain::Seo, self.seo),
            general: f(Domain::General, self.general),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_domain_tuning() {
        let strategy = DomainProfile::defaults(Domain::Strategy);
        assert_eq!(strategy.match_threshold, 0.30);
        assert_eq!(strategy.generation.max_output_tokens, 2500);
        assert_eq!(strategy.knowledge_table, "knowledge_strategy");

        let seo = DomainProfile::defaults(Domain::Seo);
        assert_eq!(seo.match_threshold, 0.35);

        let general = DomainProfile::defaults(Domain::General);
        assert_eq!(general.match_threshold, 0.20);
        assert_eq!(general.generation.max_output_tokens, 2000);

        for domain in Domain::ALL {
            let profile = DomainProfile::defaults(domain);
            assert_eq!(profile.generation.temperature, 0.7);
            assert_eq!(profile.match_count, 5);
        }
    }

    #[test]
    fn domain_parses_case_insensitively() {
        assert_eq!("SEO".parse::<Domain>().unwrap(), Domain::Seo);
        assert_eq!(" general ".parse::<Domain>().unwrap(), Domain::General);
        assert!(matches!(
            "finance".parse::<Domain>(),
            Err(ChatError::UnknownDomain(d)) if d == "finance"
        ));
    }

    #[test]
    fn table_lookup_is_keyed_by_domain() {
        let table = DomainTable::from_fn(|d| d.knowledge_table().to_string());
        assert_eq!(table.get(Domain::Seo), "knowledge_seo");

        let lengths = table.map(|_, name| name.len());
        assert_eq!(*lengths.get(Domain::General), "knowledge_general".len());
    }
}
