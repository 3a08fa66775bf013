//! Shared test utilities for rag-chat integration tests.
//!
//! Provides deterministic embedders, scripted LLM clients, a repository wrapper that can
//! fail on demand, and a harness that wires them into a ChatPipeline backed by in-memory
//! knowledge stores and an in-memory SQLite chat database.

#![allow(dead_code)]

use async_trait::async_trait;
use embedding::EmbeddingService;
use knowledge::{InMemoryKnowledgeStore, KnowledgeChunk, KnowledgeIngestor, NewKnowledgeChunk};
use llm_client::{GenerationError, GenerationOptions, LlmClient};
use prompt::ChatMessage;
use rag_chat::{ChatPipeline, Domain, DomainProfile, DomainResources, DomainTable, PipelineSettings};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use storage::{
    ChatRepository, ConversationRecord, MessageRecord, SqliteChatRepository, StorageError,
};

pub const VOCABULARY: [&str; 8] = [
    "refund", "delivery", "fast", "keyword", "backlink", "pricing", "growth", "return",
];

/// Word counts over [`VOCABULARY`].
pub fn vocabulary_vector(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    VOCABULARY
        .iter()
        .map(|word| lower.matches(word).count() as f32)
        .collect()
}

#[derive(Default)]
pub struct VocabularyEmbedder {
    pub calls: AtomicUsize,
}

impl VocabularyEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingService for VocabularyEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, anyhow::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vocabulary_vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, anyhow::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| vocabulary_vector(t)).collect())
    }
}

pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingService for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, anyhow::Error> {
        Err(anyhow::anyhow!("embedding provider unavailable"))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, anyhow::Error> {
        Err(anyhow::anyhow!("embedding provider unavailable"))
    }
}

/// Embedder that never answers within any reasonable budget.
pub struct HangingEmbedder;

#[async_trait]
impl EmbeddingService for HangingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, anyhow::Error> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, anyhow::Error> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }
}

/// LLM that answers "Answer to: <user message>" and records every request.
#[derive(Default)]
pub struct StubLlm {
    pub requests: Mutex<Vec<(Vec<ChatMessage>, GenerationOptions)>>,
    pub delay: Option<Duration>,
}

impl StubLlm {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            delay: Some(delay),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// System prompt text of the most recent request.
    pub fn last_system_prompt(&self) -> String {
        let requests = self.requests.lock().unwrap();
        let (messages, _) = requests.last().expect("no request recorded");
        messages[0].content.clone()
    }

    pub fn last_options(&self) -> GenerationOptions {
        self.requests.lock().unwrap().last().expect("no request recorded").1
    }
}

#[async_trait]
impl LlmClient for StubLlm {
    async fn get_llm_response_with_messages(
        &self,
        messages: Vec<ChatMessage>,
        options: GenerationOptions,
    ) -> Result<String, GenerationError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let question = messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.requests.lock().unwrap().push((messages, options));
        Ok(format!("Answer to: {question}"))
    }
}

/// LLM whose provider always fails like an HTTP 500.
pub struct FailingLlm;

#[async_trait]
impl LlmClient for FailingLlm {
    async fn get_llm_response_with_messages(
        &self,
        _messages: Vec<ChatMessage>,
        _options: GenerationOptions,
    ) -> Result<String, GenerationError> {
        Err(GenerationError::Provider("HTTP 500 Internal Server Error".to_string()))
    }
}

/// Wraps a real repository and fails selected operations.
pub struct FlakyRepository {
    pub inner: Arc<SqliteChatRepository>,
    pub fail_appends: bool,
    pub fail_create: bool,
    pub fail_history: bool,
}

impl FlakyRepository {
    pub fn new(inner: Arc<SqliteChatRepository>) -> Self {
        Self {
            inner,
            fail_appends: false,
            fail_create: false,
            fail_history: false,
        }
    }
}

fn injected(op: &str) -> StorageError {
    StorageError::Database(format!("injected failure: {op}"))
}

#[async_trait]
impl ChatRepository for FlakyRepository {
    async fn create_conversation(
        &self,
        owner_id: &str,
        domain: &str,
    ) -> Result<ConversationRecord, StorageError> {
        if self.fail_create {
            return Err(injected("create_conversation"));
        }
        self.inner.create_conversation(owner_id, domain).await
    }

    async fn get_conversation(
        &self,
        owner_id: &str,
        conversation_id: &str,
    ) -> Result<Option<ConversationRecord>, StorageError> {
        self.inner.get_conversation(owner_id, conversation_id).await
    }

    async fn list_conversations(
        &self,
        owner_id: &str,
        domain: &str,
    ) -> Result<Vec<ConversationRecord>, StorageError> {
        self.inner.list_conversations(owner_id, domain).await
    }

    async fn rename_conversation(
        &self,
        owner_id: &str,
        conversation_id: &str,
        title: &str,
    ) -> Result<(), StorageError> {
        self.inner
            .rename_conversation(owner_id, conversation_id, title)
            .await
    }

    async fn set_title_if_placeholder(
        &self,
        conversation_id: &str,
        title: &str,
    ) -> Result<bool, StorageError> {
        self.inner
            .set_title_if_placeholder(conversation_id, title)
            .await
    }

    async fn delete_conversation(
        &self,
        owner_id: &str,
        conversation_id: &str,
    ) -> Result<bool, StorageError> {
        self.inner.delete_conversation(owner_id, conversation_id).await
    }

    async fn append_message(&self, message: &MessageRecord) -> Result<(), StorageError> {
        if self.fail_appends {
            return Err(injected("append_message"));
        }
        self.inner.append_message(message).await
    }

    async fn list_messages(
        &self,
        owner_id: &str,
        conversation_id: &str,
    ) -> Result<Vec<MessageRecord>, StorageError> {
        self.inner.list_messages(owner_id, conversation_id).await
    }

    async fn recent_messages(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, StorageError> {
        if self.fail_history {
            return Err(injected("recent_messages"));
        }
        self.inner.recent_messages(conversation_id, limit).await
    }
}

pub async fn memory_repo() -> Arc<SqliteChatRepository> {
    Arc::new(
        SqliteChatRepository::new("sqlite::memory:")
            .await
            .expect("Failed to create repository"),
    )
}

/// Pipeline plus handles to its collaborators.
pub struct Harness {
    pub pipeline: ChatPipeline,
    pub repo: Arc<SqliteChatRepository>,
    pub stores: DomainTable<Arc<InMemoryKnowledgeStore>>,
}

impl Harness {
    /// Ingests `chunks` into the domain's store through the embedding-consistent write path.
    pub async fn seed(&self, domain: Domain, chunks: Vec<NewKnowledgeChunk>) -> Vec<KnowledgeChunk> {
        let ingestor = KnowledgeIngestor::new(
            self.stores.get(domain).clone(),
            Arc::new(VocabularyEmbedder::default()),
        );
        ingestor.ingest_batch(chunks).await.expect("seed knowledge")
    }
}

pub struct HarnessBuilder {
    embedder: Arc<dyn EmbeddingService>,
    llm: Arc<dyn LlmClient>,
    repo_wrapper: Option<Box<dyn FnOnce(Arc<SqliteChatRepository>) -> Arc<dyn ChatRepository>>>,
    turn_timeout: Duration,
    history_limit: usize,
}

impl HarnessBuilder {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            embedder: Arc::new(VocabularyEmbedder::default()),
            llm,
            repo_wrapper: None,
            turn_timeout: Duration::from_secs(30),
            history_limit: 10,
        }
    }

    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingService>) -> Self {
        self.embedder = embedder;
        self
    }

    pub fn wrap_repo(
        mut self,
        wrapper: impl FnOnce(Arc<SqliteChatRepository>) -> Arc<dyn ChatRepository> + 'static,
    ) -> Self {
        self.repo_wrapper = Some(Box::new(wrapper));
        self
    }

    pub fn turn_timeout(mut self, timeout: Duration) -> Self {
        self.turn_timeout = timeout;
        self
    }

    pub fn history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub async fn build(self) -> Harness {
        let repo = memory_repo().await;
        let pipeline_repo: Arc<dyn ChatRepository> = match self.repo_wrapper {
            Some(wrap) => wrap(repo.clone()),
            None => repo.clone(),
        };

        let stores = DomainTable::from_fn(|_| Arc::new(InMemoryKnowledgeStore::new()));
        let domains = DomainTable::from_fn(|domain| DomainResources {
            profile: DomainProfile::defaults(domain),
            store: stores.get(domain).clone(),
        });

        let pipeline = ChatPipeline::new(
            pipeline_repo,
            self.embedder,
            self.llm,
            domains,
            PipelineSettings {
                turn_timeout: self.turn_timeout,
                history_limit: self.history_limit,
            },
        );

        Harness {
            pipeline,
            repo,
            stores,
        }
    }
}
