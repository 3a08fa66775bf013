//! # OpenAI Embedding Service
//!
//! Implementation of [`EmbeddingService`] on top of OpenAI's embeddings API (or any
//! OpenAI-compatible endpoint via a custom base URL).
//!
//! ## Supported Models
//!
//! - `text-embedding-3-small`: 1536 dimensions, cost-effective (default)
//! - `text-embedding-3-large`: 3072 dimensions, higher accuracy
//!
//! Every request runs under a timeout so a hung provider surfaces as an error, which the
//! chat pipeline treats as "no vector available" and answers from keyword fallback instead.

use async_openai::{types::CreateEmbeddingRequestArgs, Client};
use async_trait::async_trait;
use embedding::{EmbeddingConfig, EmbeddingService, DEFAULT_EMBEDDING_MODEL};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Default timeout for a single embed request (connect + request + response).
pub const DEFAULT_EMBED_TIMEOUT: Duration = Duration::from_secs(30);

/// Batch requests carry larger payloads and get a longer budget.
pub const DEFAULT_EMBED_BATCH_TIMEOUT: Duration = Duration::from_secs(60);

const LOG_PREVIEW_LEN: usize = 200;

/// OpenAI embedding service implementation. Holds the async-openai client and model name.
#[derive(Debug, Clone)]
pub struct OpenAIEmbedding {
    client: Client<async_openai::config::OpenAIConfig>,
    model: String,
    timeout: Duration,
    batch_timeout: Duration,
}

impl OpenAIEmbedding {
    /// Creates a new OpenAI embedding service.
    ///
    /// * `api_key` - OpenAI API key. If empty, falls back to the `OPENAI_API_KEY` environment variable.
    /// * `model` - The embedding model to use.
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_base_url(api_key, model, None)
    }

    /// Creates a service that sends requests to `base_url` when it is `Some` and non-empty.
    pub fn new_with_base_url(api_key: String, model: String, base_url: Option<&str>) -> Self {
        let api_key = if api_key.is_empty() {
            std::env::var("OPENAI_API_KEY").unwrap_or_default()
        } else {
            api_key
        };

        let mut openai_config = async_openai::config::OpenAIConfig::new().with_api_key(api_key);
        if let Some(url) = base_url.filter(|s| !s.is_empty()) {
            openai_config = openai_config.with_api_base(url);
        }

        Self {
            client: Client::with_config(openai_config),
            model,
            timeout: DEFAULT_EMBED_TIMEOUT,
            batch_timeout: DEFAULT_EMBED_BATCH_TIMEOUT,
        }
    }

    /// Builds the service from any [`EmbeddingConfig`] (e.g. `EnvEmbeddingConfig::from_env()`).
    pub fn from_config(config: &dyn EmbeddingConfig) -> Self {
        Self::new_with_base_url(
            config.api_key().to_string(),
            config.model().to_string(),
            config.base_url(),
        )
    }

    /// Creates a service with the default model.
    pub fn with_api_key(api_key: String) -> Self {
        Self::new(api_key, DEFAULT_EMBEDDING_MODEL.to_string())
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    /// Overrides the single and batch request timeouts.
    pub fn with_timeouts(mut self, single: Duration, batch: Duration) -> Self {
        self.timeout = single;
        self.batch_timeout = batch;
        self
    }

    /// Returns the embedding model name (for tests and diagnostics).
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Char-boundary-safe preview of `text` for log lines.
fn preview(text: &str) -> String {
    match text.char_indices().nth(LOG_PREVIEW_LEN) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[async_trait]
impl EmbeddingService for OpenAIEmbedding {
    /// Sends one embeddings request and returns the first vector of the response.
    ///
    /// # Errors
    ///
    /// - the API key is missing or rejected
    /// - network failure, rate limit or timeout
    /// - the response carries no embedding
    #[instrument(skip(self, text), fields(model = %self.model, text_len = text.len()))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>, anyhow::Error> {
        info!(
            model = %self.model,
            text_preview = %preview(text),
            "step: embedding OpenAI embed request"
        );

        let request = CreateEmbeddingRequestArgs::default()
            .model(self.model.clone())
            .input(vec![text])
            .build()?;

        let embeddings = self.client.embeddings();
        let response = match tokio::time::timeout(self.timeout, embeddings.create(request)).await {
            Ok(Ok(r)) => {
                debug!("OpenAI embed response received");
                r
            }
            Ok(Err(e)) => {
                warn!(error = %e, "OpenAI embed request failed");
                return Err(e.into());
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.timeout.as_secs(),
                    "OpenAI embed request timed out"
                );
                anyhow::bail!(
                    "OpenAI embed request timed out after {} seconds",
                    self.timeout.as_secs()
                );
            }
        };

        let embedding = match response.data.into_iter().next() {
            Some(item) => item.embedding,
            None => {
                warn!("OpenAI embed response has no embedding data");
                anyhow::bail!("No embedding in response");
            }
        };

        info!(
            dimension = embedding.len(),
            "step: embedding OpenAI embed done"
        );
        Ok(embedding)
    }

    /// Embeds all `texts` in one request. Used by knowledge ingestion.
    ///
    /// Returns an error when the provider returns a different number of vectors than inputs.
    #[instrument(skip(self, texts), fields(model = %self.model, batch_size = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, anyhow::Error> {
        if texts.is_empty() {
            debug!("OpenAI embed_batch empty input, skipping");
            return Ok(vec![]);
        }

        info!(
            model = %self.model,
            batch_size = texts.len(),
            "step: embedding OpenAI embed_batch request"
        );

        let inputs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
        let request = CreateEmbeddingRequestArgs::default()
            .model(self.model.clone())
            .input(inputs)
            .build()?;

        let embeddings = self.client.embeddings();
        let response =
            match tokio::time::timeout(self.batch_timeout, embeddings.create(request)).await {
                Ok(Ok(r)) => r,
                Ok(Err(e)) => {
                    warn!(error = %e, "OpenAI embed_batch request failed");
                    return Err(e.into());
                }
                Err(_) => {
                    warn!(
                        timeout_secs = self.batch_timeout.as_secs(),
                        "OpenAI embed_batch request timed out"
                    );
                    anyhow::bail!(
                        "OpenAI embed_batch request timed out after {} seconds",
                        self.batch_timeout.as_secs()
                    );
                }
            };

        let mut data = response.data;
        // The API documents `index`; sort so output order always matches input order.
        data.sort_by_key(|item| item.index);
        let embeddings: Vec<Vec<f32>> = data.into_iter().map(|item| item.embedding).collect();

        if embeddings.len() != texts.len() {
            warn!(
                expected = texts.len(),
                got = embeddings.len(),
                "OpenAI embed_batch response count mismatch"
            );
            anyhow::bail!(
                "Expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            );
        }

        info!(
            count = embeddings.len(),
            dimension = embeddings.first().map(|v| v.len()).unwrap_or(0),
            "step: embedding OpenAI embed_batch done"
        );
        Ok(embeddings)
    }
}
