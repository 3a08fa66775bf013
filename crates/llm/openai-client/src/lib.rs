//! # OpenAI API client
//!
//! Thin wrapper around [async-openai] for a single, non-streaming chat completion.
//! Provides token masking for safe logging and maps provider failures into
//! [`ChatCompletionError`].

use async_openai::{types::CreateChatCompletionRequestArgs, Client};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use async_openai::error::{ApiError, OpenAIError};
pub use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
};

/// Masks an API key/token for safe logging: shows first 7 chars + "***" + last 4 chars.
/// If length <= 11, returns "***" to avoid leaking any part of the key.
pub fn mask_token(token: &str) -> String {
    let len = token.len();
    if len <= 11 || !token.is_ascii() {
        return "***".to_string();
    }
    format!("{}***{}", &token[..7], &token[len - 4..])
}

/// Errors from a chat completion call.
#[derive(Error, Debug)]
pub enum ChatCompletionError {
    /// HTTP, API (non-2xx) or deserialization failure reported by async-openai.
    #[error("OpenAI request failed: {0}")]
    Provider(#[from] OpenAIError),

    #[error("No choices in completion response")]
    NoChoices,

    /// The first choice carries no (or only whitespace) content.
    #[error("Completion response has no content")]
    MissingContent,
}

/// Sampling limits for one completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionParams {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_output_tokens: 2000,
        }
    }
}

/// async-openai retries transient failures with exponential backoff by default; a zero
/// elapsed-time budget turns that off so a failed generation surfaces immediately.
fn no_retry_backoff() -> backoff::ExponentialBackoff {
    backoff::ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

/// OpenAI chat client. Wraps async-openai client; optionally holds API key for masked logging.
#[derive(Clone)]
pub struct OpenAIClient {
    client: Arc<Client<async_openai::config::OpenAIConfig>>,
    /// API key stored only for logging (masked). None when created via `with_client()`.
    api_key_for_logging: Option<String>,
}

impl OpenAIClient {
    /// Builds a client using the given API key and default API base URL.
    pub fn new(api_key: String) -> Self {
        let config = async_openai::config::OpenAIConfig::new().with_api_key(api_key.clone());
        Self {
            client: Arc::new(Client::with_config(config).with_backoff(no_retry_backoff())),
            api_key_for_logging: Some(api_key),
        }
    }

    /// Builds a client with a custom base URL (e.g. for proxies or compatible endpoints).
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let config = async_openai::config::OpenAIConfig::new()
            .with_api_key(api_key.clone())
            .with_api_base(base_url);
        Self {
            client: Arc::new(Client::with_config(config).with_backoff(no_retry_backoff())),
            api_key_for_logging: Some(api_key),
        }
    }

    /// Builds a client from an existing async-openai client (no API key stored for logging).
    /// The client's own backoff policy is kept.
    pub fn with_client(client: Client<async_openai::config::OpenAIConfig>) -> Self {
        Self {
            client: Arc::new(client),
            api_key_for_logging: None,
        }
    }

    fn masked_key(&self) -> String {
        self.api_key_for_logging
            .as_deref()
            .map(mask_token)
            .unwrap_or_else(|| "***".to_string())
    }

    /// Sends a chat completion request and returns the first choice's content.
    ///
    /// Logs masked API key, request JSON at debug level, and token usage. Clients built with
    /// `new` or `with_base_url` never retry, rate-limit errors included; a client passed to
    /// `with_client` keeps its own backoff.
    pub async fn chat_completion(
        &self,
        model: &str,
        messages: Vec<ChatCompletionRequestMessage>,
        params: CompletionParams,
    ) -> Result<String, ChatCompletionError> {
        tracing::info!(
            model = %model,
            message_count = messages.len(),
            temperature = params.temperature,
            max_output_tokens = params.max_output_tokens,
            api_key = %self.masked_key(),
            "OpenAI chat_completion request"
        );

        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(messages)
            .temperature(params.temperature)
            .max_tokens(params.max_output_tokens)
            .build()?;

        if let Ok(json) = serde_json::to_string_pretty(&request) {
            tracing::debug!(request_json = %json, "OpenAI chat_completion request JSON");
        }

        let response = self.client.chat().create(request).await.map_err(|e| {
            tracing::warn!(error = %e, "OpenAI chat_completion failed");
            ChatCompletionError::from(e)
        })?;

        if let Some(ref u) = response.usage {
            tracing::info!(
                prompt_tokens = u.prompt_tokens,
                completion_tokens = u.completion_tokens,
                total_tokens = u.total_tokens,
                "OpenAI chat_completion usage"
            );
        }

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or(ChatCompletionError::NoChoices)?;

        match choice.message.content {
            Some(content) if !content.trim().is_empty() => Ok(content),
            _ => Err(ChatCompletionError::MissingContent),
        }
    }
}
