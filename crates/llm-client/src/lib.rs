//! # LLM client abstraction
//!
//! Defines the [`LlmClient`] trait and an OpenAI implementation. Transport-agnostic;
//! the chat pipeline only sees `generate(prompt, user_message)`.
//!
//! One invocation per turn, no streaming, no automatic retry: any provider failure is
//! returned as a [`GenerationError`] and is fatal for the turn.

use async_trait::async_trait;
use openai_client::{
    ChatCompletionError, ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
};
use prompt::{ChatMessage, MessageRole, PromptPayload};
use thiserror::Error;

mod config;
mod openai_llm;

pub use config::{EnvLlmConfig, LlmConfig};
pub use openai_llm::OpenAILlmClient;

/// Sampling options for one generation; tuned per assistant domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_output_tokens: 2000,
        }
    }
}

/// Why a generation call failed.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// Non-2xx response or API error object from the provider.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Network-level failure (connect, TLS, body read).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body could not be parsed or had no choices.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Response parsed but the content field was missing or blank.
    #[error("Empty content in generation response")]
    EmptyContent,

    /// The request could not be built (e.g. invalid message arguments).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<ChatCompletionError> for GenerationError {
    fn from(e: ChatCompletionError) -> Self {
        use openai_client::ChatCompletionError as E;
        match e {
            E::Provider(inner) => from_openai_error(inner),
            E::NoChoices => GenerationError::MalformedResponse("no choices".to_string()),
            E::MissingContent => GenerationError::EmptyContent,
        }
    }
}

fn from_openai_error(e: openai_client::OpenAIError) -> GenerationError {
    use openai_client::OpenAIError as E;
    match e {
        E::ApiError(api) => GenerationError::Provider(api.message),
        E::Reqwest(inner) => GenerationError::Transport(inner.to_string()),
        E::JSONDeserialize(inner) => GenerationError::MalformedResponse(inner.to_string()),
        E::InvalidArgument(msg) => GenerationError::InvalidRequest(msg),
        other => GenerationError::Provider(other.to_string()),
    }
}

/// LLM client interface: produce one reply for a list of role-tagged messages.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Returns the model reply text for the given messages (system/user/assistant).
    async fn get_llm_response_with_messages(
        &self,
        messages: Vec<ChatMessage>,
        options: GenerationOptions,
    ) -> Result<String, GenerationError>;

    /// Generates a reply for an assembled prompt and the current user message.
    async fn generate(
        &self,
        prompt: &PromptPayload,
        user_message: &str,
        options: GenerationOptions,
    ) -> Result<String, GenerationError> {
        self.get_llm_response_with_messages(prompt.to_messages(user_message), options)
            .await
    }
}

/// Converts a single [`ChatMessage`] into OpenAI API message format.
fn chat_message_to_openai(msg: &ChatMessage) -> anyhow::Result<ChatCompletionRequestMessage> {
    let content = msg.content.clone();
    let openai_msg: ChatCompletionRequestMessage = match msg.role {
        MessageRole::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(content)
            .build()?
            .into(),
        MessageRole::User => ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()?
            .into(),
        MessageRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(content)
            .build()?
            .into(),
    };
    Ok(openai_msg)
}
