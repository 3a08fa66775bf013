//! # Chat pipeline
//!
//! One turn: history → embed + vector search → keyword fallback → context assembly →
//! generation → persistence. A single implementation serves every [`Domain`]; per-domain
//! differences come from the [`DomainResources`] table built at construction.
//!
//! Turns on the same conversation are serialized by a per-conversation lock, so messages
//! are appended in submission order and only the first successful turn sets the title.

use embedding::EmbeddingService;
use knowledge::KnowledgeStore;
use llm_client::LlmClient;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;
use storage::{
    derive_title, ChatRepository, CitedChunk, MessageMetadata, MessageRecord, SearchMethod,
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::budget::{BudgetExceeded, TurnBudget};
use crate::context::{assemble_prompt, citations};
use crate::domain::{Domain, DomainProfile, DomainTable};
use crate::error::ChatError;
use crate::history::HistoryManager;
use crate::retrieval::{retrieve, Retrieval};

/// Share of the remaining turn budget that retrieval may use; the rest is kept for generation.
pub const RETRIEVAL_BUDGET_SHARE: f64 = 0.5;

/// Caller → pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

impl TurnRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            conversation_id: None,
        }
    }

    pub fn in_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }
}

/// Pipeline → caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnResponse {
    pub response: String,
    /// Up to three cited chunks, highest similarity first.
    pub context: Vec<CitedChunk>,
    pub search_method: SearchMethod,
    pub results_found: usize,
    /// Conversation the turn was stored in. `None` only when a new conversation could not
    /// be created.
    pub conversation_id: Option<String>,
}

/// Knowledge store and settings for one domain.
#[derive(Clone)]
pub struct DomainResources {
    pub profile: DomainProfile,
    pub store: Arc<dyn KnowledgeStore>,
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub turn_timeout: Duration,
    pub history_limit: usize,
}

pub struct ChatPipeline {
    repo: Arc<dyn ChatRepository>,
    embedder: Arc<dyn EmbeddingService>,
    llm: Arc<dyn LlmClient>,
    domains: DomainTable<DomainResources>,
    history: HistoryManager,
    turn_timeout: Duration,
    conversation_locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ChatPipeline {
    pub fn new(
        repo: Arc<dyn ChatRepository>,
        embedder: Arc<dyn EmbeddingService>,
        llm: Arc<dyn LlmClient>,
        domains: DomainTable<DomainResources>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            history: HistoryManager::new(repo.clone(), settings.history_limit),
            repo,
            embedder,
            llm,
            domains,
            turn_timeout: settings.turn_timeout,
            conversation_locks: StdMutex::new(HashMap::new()),
        }
    }

    pub fn repository(&self) -> &Arc<dyn ChatRepository> {
        &self.repo
    }

    pub fn profile(&self, domain: Domain) -> &DomainProfile {
        &self.domains.get(domain).profile
    }

    /// Handles one turn with a fresh cancellation token.
    pub async fn handle_turn(
        &self,
        owner_id: &str,
        domain: Domain,
        request: TurnRequest,
    ) -> Result<TurnResponse, ChatError> {
        self.handle_turn_with_cancel(owner_id, domain, request, CancellationToken::new())
            .await
    }

    /// Handles one turn; cancelling `cancel` stops retrieval and generation.
    ///
    /// Generation failure, timeout and cancellation are fatal and nothing is persisted.
    /// Persistence failures after a successful generation are logged and the answer is
    /// still returned.
    #[instrument(skip(self, request, cancel), fields(domain = %domain, conversation_id = ?request.conversation_id))]
    pub async fn handle_turn_with_cancel(
        &self,
        owner_id: &str,
        domain: Domain,
        request: TurnRequest,
        cancel: CancellationToken,
    ) -> Result<TurnResponse, ChatError> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        info!(owner_id, "step: chat turn start");

        let budget = TurnBudget::new(self.turn_timeout, cancel);

        let Some(conversation_id) = request.conversation_id.as_deref() else {
            return self.run_turn(owner_id, domain, message, None, &budget).await;
        };

        if self
            .repo
            .get_conversation(owner_id, conversation_id)
            .await?
            .is_none()
        {
            warn!(owner_id, conversation_id, "Conversation not found for owner");
            return Err(ChatError::ConversationNotFound(conversation_id.to_string()));
        }

        let entry = self.conversation_lock(conversation_id);
        let _turn = entry.lock().lock().await;
        self.run_turn(owner_id, domain, message, Some(conversation_id), &budget)
            .await
    }

    async fn run_turn(
        &self,
        owner_id: &str,
        domain: Domain,
        message: &str,
        conversation_id: Option<&str>,
        budget: &TurnBudget,
    ) -> Result<TurnResponse, ChatError> {
        let resources = self.domains.get(domain);

        let history = self.history.load(conversation_id).await;
        info!(history = history.len(), "step: history loaded");

        let retrieval = retrieve(
            self.embedder.as_ref(),
            resources.store.as_ref(),
            &resources.profile,
            message,
            &budget.share(RETRIEVAL_BUDGET_SHARE),
        )
        .await;

        let prompt = assemble_prompt(&resources.profile, &retrieval.results, &history);
        info!(
            search_method = %retrieval.method,
            knowledge = prompt.knowledge_count,
            "step: context assembled"
        );

        let response = match budget
            .run(
                self.llm
                    .generate(&prompt, message, resources.profile.generation),
            )
            .await
        {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                error!(error = %e, "Generation failed, turn aborted");
                return Err(ChatError::Generation(e));
            }
            Err(BudgetExceeded::Timeout) => {
                error!(timeout = ?budget.total(), "Generation did not finish within the turn budget");
                return Err(ChatError::Timeout(budget.total()));
            }
            Err(BudgetExceeded::Cancelled) => {
                info!("Turn cancelled before generation finished");
                return Err(ChatError::Cancelled);
            }
        };
        info!(chars = response.chars().count(), "step: generation done");

        let conversation_id = self
            .persist_turn(owner_id, domain, conversation_id, message, &response, &retrieval)
            .await;

        info!(conversation_id = ?conversation_id, "step: chat turn finished");
        Ok(TurnResponse {
            response,
            context: citations(&retrieval.results),
            search_method: retrieval.method,
            results_found: retrieval.results.len(),
            conversation_id,
        })
    }

    /// Stores the user message, then the assistant message, then derives the title.
    /// Each write is independent; failures are logged and do not affect the answer.
    async fn persist_turn(
        &self,
        owner_id: &str,
        domain: Domain,
        conversation_id: Option<&str>,
        message: &str,
        response: &str,
        retrieval: &Retrieval,
    ) -> Option<String> {
        let conversation_id = match conversation_id {
            Some(id) => id.to_string(),
            None => match self.repo.create_conversation(owner_id, domain.as_str()).await {
                Ok(conversation) => conversation.id,
                Err(e) => {
                    error!(owner_id, error = %e, "Failed to create conversation, turn not persisted");
                    return None;
                }
            },
        };

        let user_record = MessageRecord::user(&conversation_id, message);
        let user_saved = match self.repo.append_message(&user_record).await {
            Ok(()) => true,
            Err(e) => {
                error!(conversation_id = %conversation_id, role = "user", error = %e, "Failed to persist message");
                false
            }
        };

        let metadata = MessageMetadata {
            context: citations(&retrieval.results),
            search_method: retrieval.method,
            results_count: u32::try_from(retrieval.results.len()).unwrap_or(u32::MAX),
        };
        let assistant_record = MessageRecord::assistant(&conversation_id, response, metadata);
        if let Err(e) = self.repo.append_message(&assistant_record).await {
            error!(conversation_id = %conversation_id, role = "assistant", error = %e, "Failed to persist message");
        }

        if user_saved {
            if let Some(title) = derive_title(message) {
                match self
                    .repo
                    .set_title_if_placeholder(&conversation_id, &title)
                    .await
                {
                    Ok(true) => info!(conversation_id = %conversation_id, title = %title, "Conversation titled"),
                    Ok(false) => {}
                    Err(e) => {
                        warn!(conversation_id = %conversation_id, error = %e, "Failed to set conversation title")
                    }
                }
            }
        }

        info!(conversation_id = %conversation_id, "step: turn persisted");
        Some(conversation_id)
    }

    /// Conversations with a turn running or waiting.
    pub fn locked_conversations(&self) -> usize {
        self.conversation_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn conversation_lock(&self, conversation_id: &str) -> ConversationLock<'_> {
        let mut locks = self
            .conversation_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let lock = locks
            .entry(conversation_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        ConversationLock {
            locks: &self.conversation_locks,
            conversation_id: conversation_id.to_string(),
            lock,
        }
    }
}

/// Handle on one conversation's turn lock. Dropping it removes the map entry once no
/// other turn holds or waits on it, including when the turn future is dropped mid-way.
struct ConversationLock<'a> {
    locks: &'a StdMutex<HashMap<String, Arc<Mutex<()>>>>,
    conversation_id: String,
    lock: Arc<Mutex<()>>,
}

impl ConversationLock<'_> {
    fn lock(&self) -> &Mutex<()> {
        &self.lock
    }
}

impl Drop for ConversationLock<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // The map and this handle are the only owners left.
        if let Some(lock) = locks.get(&self.conversation_id) {
            if Arc::strong_count(lock) == 2 {
                locks.remove(&self.conversation_id);
            }
        }
    }
}
