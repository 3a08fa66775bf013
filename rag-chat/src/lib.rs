//! # RAG chat
//!
//! Retrieval-augmented chat core shared by the strategy, SEO and general assistants.
//! Wires embedding, knowledge search, history, prompt assembly, generation and storage
//! into one [`ChatPipeline`] parameterized by [`Domain`].
//!
//! ## Modules
//!
//! - [`domain`] - Domain, DomainProfile, enum-keyed DomainTable
//! - [`config`] - ChatConfig from environment
//! - [`logger`] - tracing setup (stdout + file)
//! - [`error`] - ChatError and the user-facing failure text
//! - [`budget`] - TurnBudget: deadline + cancellation for every awaited step
//! - [`retrieval`] - vector search with keyword fallback
//! - [`history`] - bounded conversation history
//! - [`context`] - prompt assembly and citations
//! - [`pipeline`] - ChatPipeline, TurnRequest, TurnResponse
//! - [`client_sync`] - optimistic client conversation state
//! - [`components`] - factory wiring OpenAI providers and SQLite stores

pub mod budget;
pub mod client_sync;
pub mod components;
pub mod config;
pub mod context;
pub mod domain;
pub mod error;
pub mod history;
pub mod logger;
pub mod pipeline;
pub mod retrieval;

pub use budget::{BudgetExceeded, TurnBudget};
pub use client_sync::{ClientConversation, ClientMessage, ClientSyncError, MessageState, PendingTurn};
pub use components::{build_components, build_from_env, build_with_providers, ChatComponents};
pub use config::ChatConfig;
pub use context::{assemble_prompt, citations, MAX_CITED_CHUNKS};
pub use domain::{Domain, DomainProfile, DomainTable};
pub use error::{ChatError, USER_FAILURE_MESSAGE};
pub use history::HistoryManager;
pub use logger::init_tracing;
pub use pipeline::{
    ChatPipeline, DomainResources, PipelineSettings, TurnRequest, TurnResponse,
    RETRIEVAL_BUDGET_SHARE,
};
pub use retrieval::{retrieve, Retrieval, EMBEDDING_BUDGET_SHARE};

pub use storage::{CitedChunk, SearchMethod};
