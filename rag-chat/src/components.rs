//! Component factory: builds the pipeline and ingestors from config. Isolates assembly
//! from callers.

use anyhow::Result;
use embedding::{EmbeddingConfig, EmbeddingService, EnvEmbeddingConfig};
use knowledge::{KnowledgeIngestor, KnowledgeStore, SqliteKnowledgeStore};
use llm_client::{EnvLlmConfig, LlmClient, LlmConfig, OpenAILlmClient};
use openai_embedding::OpenAIEmbedding;
use std::sync::Arc;
use storage::{ChatRepository, SqliteChatRepository, SqlitePoolManager};
use tracing::{error, info, instrument};

use crate::config::ChatConfig;
use crate::domain::{Domain, DomainTable};
use crate::pipeline::{ChatPipeline, DomainResources, PipelineSettings};

/// Everything a service needs: the pipeline plus per-domain ingestors sharing its stores.
pub struct ChatComponents {
    pub pipeline: ChatPipeline,
    pub ingestors: DomainTable<KnowledgeIngestor>,
}

/// Loads `.env`, reads all configs from the environment and builds the components.
pub async fn build_from_env() -> Result<(ChatConfig, ChatComponents)> {
    dotenvy::dotenv().ok();
    let config = ChatConfig::from_env()?;
    let embedding_config = EnvEmbeddingConfig::from_env()?;
    let llm_config = EnvLlmConfig::from_env()?;
    let components = build_components(&config, &embedding_config, &llm_config).await?;
    Ok((config, components))
}

/// Builds OpenAI-backed providers and SQLite stores, then the pipeline.
#[instrument(skip(config, embedding_config, llm_config), fields(database_url = %config.database_url))]
pub async fn build_components(
    config: &ChatConfig,
    embedding_config: &dyn EmbeddingConfig,
    llm_config: &dyn LlmConfig,
) -> Result<ChatComponents> {
    let embedder: Arc<dyn EmbeddingService> = Arc::new(OpenAIEmbedding::from_config(embedding_config));
    let llm: Arc<dyn LlmClient> = Arc::new(OpenAILlmClient::from_config(llm_config));
    info!(
        embedding_model = %embedding_config.model(),
        llm_model = %llm_config.model(),
        "Providers configured"
    );
    build_with_providers(config, embedder, llm).await
}

/// Builds SQLite-backed stores on one pool and wires them with the given providers.
pub async fn build_with_providers(
    config: &ChatConfig,
    embedder: Arc<dyn EmbeddingService>,
    llm: Arc<dyn LlmClient>,
) -> Result<ChatComponents> {
    let pool_manager = SqlitePoolManager::new(&config.database_url)
        .await
        .map_err(|e| {
            error!(error = %e, database_url = %config.database_url, "Failed to open database");
            anyhow::anyhow!("Failed to open database: {}", e)
        })?;

    let repo: Arc<dyn ChatRepository> = Arc::new(
        SqliteChatRepository::from_pool(pool_manager.clone())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to initialize chat storage: {}", e))?,
    );

    let stores = DomainTable::new(
        open_knowledge_store(&pool_manager, config, Domain::Strategy).await?,
        open_knowledge_store(&pool_manager, config, Domain::Seo).await?,
        open_knowledge_store(&pool_manager, config, Domain::General).await?,
    );

    let domains = DomainTable::from_fn(|domain| DomainResources {
        profile: config.profile(domain).clone(),
        store: stores.get(domain).clone(),
    });
    let ingestors = DomainTable::from_fn(|domain| {
        KnowledgeIngestor::new(domains.get(domain).store.clone(), embedder.clone())
    });

    let pipeline = ChatPipeline::new(
        repo,
        embedder,
        llm,
        domains,
        PipelineSettings {
            turn_timeout: config.turn_timeout,
            history_limit: config.history_limit,
        },
    );

    Ok(ChatComponents {
        pipeline,
        ingestors,
    })
}

async fn open_knowledge_store(
    pool_manager: &SqlitePoolManager,
    config: &ChatConfig,
    domain: Domain,
) -> Result<Arc<dyn KnowledgeStore>> {
    let table = &config.profile(domain).knowledge_table;
    let store = SqliteKnowledgeStore::new(pool_manager.pool().clone(), table.as_str())
        .await
        .map_err(|e| {
            error!(error = %e, table = %table, "Failed to initialize knowledge store");
            anyhow::anyhow!("Failed to initialize knowledge table {}: {}", table, e)
        })?;
    info!(domain = %domain, table = %table, "Knowledge store ready");
    Ok(Arc::new(store))
}
