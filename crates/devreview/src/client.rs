//! OpenAI review client.
//!
//! Wraps a chat-completion provider behind two calls: construction from a
//! [`ClientConfig`] and a single-turn generation. Structural oddities in the
//! reply (no choices, no content field, refusal, empty text) are returned as
//! a [`Generation`] value; only transport and API failures are errors.

use std::fmt;
use std::sync::Arc;

use reqwest::Client;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::{ClientConfig, GenerationSettings};
use crate::llm::{
    ChatRequest, ChatResponse, LLMError, LLMProvider, Message, OpenAICompatibleProvider,
};

/// System instruction sent ahead of every prompt.
pub const SYSTEM_PROMPT: &str = "You are an expert Developer.";

// ============================================================================
// Generation
// ============================================================================

/// Outcome of a successful chat completion round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    /// Non-empty text from the first choice, verbatim.
    Text(String),
    /// The model declined; carries its refusal text.
    Refused(String),
    /// Content was null or empty and no refusal was given.
    Empty,
    /// The reply did not have the expected shape.
    Malformed(Malformation),
}

/// Ways a completion reply can be structurally wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Malformation {
    NoChoices,
    MissingContent,
}

impl Generation {
    /// Classify the first choice of `response`.
    pub fn from_response(response: ChatResponse) -> Self {
        let Some(choice) = response.choices.into_iter().next() else {
            return Self::Malformed(Malformation::NoChoices);
        };

        let Some(message) = choice.message else {
            return Self::Malformed(Malformation::MissingContent);
        };
        match message.content {
            None => Self::Malformed(Malformation::MissingContent),
            Some(Some(text)) if !text.is_empty() => Self::Text(text),
            Some(_) => match message.refusal {
                Some(refusal) if !refusal.is_empty() => Self::Refused(refusal),
                _ => Self::Empty,
            },
        }
    }

    /// Render into the plain string returned by [`OpenAIClient::generate_response`].
    pub fn into_message(self) -> String {
        match self {
            Self::Text(text) => text,
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Refused(refusal) => write!(f, "OpenAI refused the request: {refusal}"),
            Self::Empty => {
                f.write_str("No review generated. The model returned an empty response.")
            }
            Self::Malformed(Malformation::NoChoices) => {
                f.write_str("Error: No response choices returned from OpenAI")
            }
            Self::Malformed(Malformation::MissingContent) => {
                f.write_str("Error: Unexpected response format from OpenAI")
            }
        }
    }
}

// ============================================================================
// ClientError
// ============================================================================

/// Errors raised while constructing an [`OpenAIClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("missing OpenAI API key")]
    MissingApiKey,

    #[error("failed to build http client: {0}")]
    Http(#[from] reqwest::Error),
}

// ============================================================================
// OpenAIClient
// ============================================================================

/// A client that turns a prompt into a single chat completion.
pub struct OpenAIClient {
    provider: Arc<dyn LLMProvider>,
    settings: GenerationSettings,
}

impl OpenAIClient {
    /// Build a client talking to the OpenAI-compatible API in `config`.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        Self::build(config).inspect_err(|e| {
            error!(error = %e, "Error initializing OpenAI client");
        })
    }

    fn build(config: ClientConfig) -> Result<Self, ClientError> {
        if config.api_key.trim().is_empty() {
            return Err(ClientError::MissingApiKey);
        }

        let http = Client::builder().build()?;
        let provider = OpenAICompatibleProvider::new(http, config.base_url, config.api_key);

        Ok(Self::with_provider(Arc::new(provider), config.settings))
    }

    /// Build a client over an arbitrary provider.
    pub fn with_provider(provider: Arc<dyn LLMProvider>, settings: GenerationSettings) -> Self {
        info!(
            model = %settings.model,
            temperature = settings.temperature,
            max_completion_tokens = settings.max_completion_tokens,
            "OpenAI client initialized successfully"
        );
        Self { provider, settings }
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Request one completion for `prompt` and classify the reply.
    pub async fn generate(&self, prompt: &str) -> Result<Generation, LLMError> {
        info!(model = %self.settings.model, "Generating response from OpenAI model");

        let response = self
            .provider
            .chat(self.request(prompt))
            .await
            .inspect_err(|e| {
                error!(error = %e, "Error generating response from OpenAI model");
            })?;
        info!("Response generated successfully");

        log_response_shape(&response);
        let generation = Generation::from_response(response);
        log_outcome(&generation);

        Ok(generation)
    }

    /// Like [`generate`](Self::generate), rendering every outcome as a string.
    pub async fn generate_response(&self, prompt: &str) -> Result<String, LLMError> {
        self.generate(prompt).await.map(Generation::into_message)
    }

    fn request(&self, prompt: &str) -> ChatRequest {
        ChatRequest {
            model: self.settings.model.clone(),
            messages: vec![Message::system(SYSTEM_PROMPT), Message::user(prompt)],
            temperature: self.settings.temperature,
            max_completion_tokens: self.settings.max_completion_tokens,
        }
    }
}

fn log_response_shape(response: &ChatResponse) {
    if let Some(usage) = &response.usage {
        debug!(
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            total_tokens = usage.total_tokens,
            "Token usage"
        );
    }

    let Some(choice) = response.choices.first() else {
        return;
    };
    info!(finish_reason = ?choice.finish_reason, "Response choice received");

    let Some(message) = &choice.message else {
        return;
    };
    match &message.content {
        Some(Some(text)) if !text.is_empty() => {
            info!(content_length = text.chars().count(), "Response content received");
        }
        Some(content) => {
            warn!(content_is_null = content.is_none(), "OpenAI message content is null or empty");
            if message.refusal.as_deref().is_none_or(str::is_empty) {
                warn!(response_message = ?message, "Full message object");
            }
        }
        None => {}
    }
}

fn log_outcome(generation: &Generation) {
    match generation {
        Generation::Text(_) => {}
        Generation::Refused(refusal) => {
            error!(refusal = %refusal, "OpenAI refused the request");
        }
        Generation::Empty => warn!("OpenAI returned an empty response"),
        Generation::Malformed(Malformation::NoChoices) => error!("Response has no choices"),
        Generation::Malformed(Malformation::MissingContent) => {
            error!("Response message has no content field");
        }
    }
}
