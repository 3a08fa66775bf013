//! OpenAI implementation of [`LlmClient`]: wraps openai-client and maps its errors.

use async_trait::async_trait;
use openai_client::CompletionParams;
use prompt::ChatMessage;
use tracing::{instrument, warn};

use super::{chat_message_to_openai, GenerationError, GenerationOptions, LlmClient, LlmConfig};

/// Default chat model when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// [`LlmClient`] backed by an OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct OpenAILlmClient {
    client: openai_client::OpenAIClient,
    model: String,
}

impl OpenAILlmClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: openai_client::OpenAIClient::new(api_key),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: openai_client::OpenAIClient::with_base_url(api_key, base_url),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn from_config(config: &dyn LlmConfig) -> Self {
        Self::with_base_url(config.api_key().to_string(), config.base_url().to_string())
            .with_model(config.model().to_string())
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LlmClient for OpenAILlmClient {
    #[instrument(skip(self, messages), fields(model = %self.model, message_count = messages.len()))]
    async fn get_llm_response_with_messages(
        &self,
        messages: Vec<ChatMessage>,
        options: GenerationOptions,
    ) -> Result<String, GenerationError> {
        let openai_messages = messages
            .iter()
            .map(chat_message_to_openai)
            .collect::<anyhow::Result<Vec<_>>>()
            .map_err(|e| GenerationError::InvalidRequest(e.to_string()))?;

        let params = CompletionParams {
            temperature: options.temperature,
            max_output_tokens: options.max_output_tokens,
        };

        self.client
            .chat_completion(&self.model, openai_messages, params)
            .await
            .map_err(|e| {
                let err = GenerationError::from(e);
                warn!(error = %err, "generation failed");
                err
            })
    }
}
