//! Adapter from `edgequake-llm` providers to [`InferenceClient`].
//!
//! `edgequake-llm` already knows how to talk to Anthropic, Gemini, Ollama,
//! LM Studio, Azure and friends, reading each vendor's API key from its
//! usual environment variable. This adapter only reshapes messages: text
//! parts of a message are joined, image parts become `ImageData`
//! attachments.

use super::{Choice, InferenceClient, InferenceRequest, InferenceResponse, Role, TokenUsage};
use crate::error::{InferenceError, NotesError};
use async_trait::async_trait;
use edgequake_llm::{
    ChatMessage, CompletionOptions, ImageData, LLMProvider, LlmError, ProviderFactory,
};
use std::sync::Arc;
use tracing::debug;

pub struct ProviderClient {
    provider: Arc<dyn LLMProvider>,
    name: String,
}

impl ProviderClient {
    /// Wrap an already-constructed provider.
    pub fn new(provider: Arc<dyn LLMProvider>, name: impl Into<String>) -> Self {
        Self {
            provider,
            name: name.into(),
        }
    }

    /// Instantiate a named provider (e.g. `"anthropic"`) for `model`.
    ///
    /// Fails with [`NotesError::Configuration`] when the provider is unknown
    /// or its credential is missing; no request is sent.
    pub fn from_name(provider_name: &str, model: &str) -> Result<Self, NotesError> {
        let provider =
            ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
                NotesError::Configuration {
                    hint: format!(
                        "LLM provider '{provider_name}' could not be created: {e}\n\
                         Check the provider name and its API key environment variable."
                    ),
                }
            })?;
        Ok(Self::new(provider, provider_name))
    }
}

/// Keep the vendor/transport split of [`InferenceError`] so that retry
/// decisions see real statuses instead of a blanket "unknown".
fn map_llm_error(provider: &str, err: LlmError) -> InferenceError {
    let service = |status: Option<u16>, message: String| InferenceError::Service {
        status,
        code: Some(provider.to_string()),
        message,
    };
    match err {
        LlmError::RateLimited(m) => service(Some(429), m),
        LlmError::AuthError(m) => service(Some(401), m),
        LlmError::InvalidRequest(m) | LlmError::ConfigError(m) | LlmError::NotSupported(m) => {
            service(Some(400), m)
        }
        e @ LlmError::TokenLimitExceeded { .. } => service(Some(400), e.to_string()),
        LlmError::ModelNotFound(m) => service(Some(404), m),
        LlmError::NetworkError(m) => InferenceError::Transport(m),
        LlmError::Timeout => InferenceError::Transport("request timed out".into()),
        LlmError::SerializationError(e) => InferenceError::Malformed(e.to_string()),
        LlmError::ApiError(m) | LlmError::ProviderError(m) | LlmError::Unknown(m) => {
            service(None, m)
        }
    }
}

fn to_chat_messages(request: &InferenceRequest) -> Vec<ChatMessage> {
    request
        .messages
        .iter()
        .map(|m| match m.role {
            Role::System => ChatMessage::system(m.text()),
            Role::User => {
                let images: Vec<ImageData> = m
                    .images()
                    .map(|img| {
                        ImageData::new(img.data().to_string(), img.mime_type()).with_detail("high")
                    })
                    .collect();
                ChatMessage::user_with_images(m.text(), images)
            }
        })
        .collect()
}

#[async_trait]
impl InferenceClient for ProviderClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: InferenceRequest,
    ) -> Result<InferenceResponse, InferenceError> {
        let messages = to_chat_messages(&request);
        let options = CompletionOptions {
            temperature: Some(request.temperature),
            max_tokens: Some(request.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| map_llm_error(&self.name, e))?;

        debug!(
            "{}: {} in / {} out tokens",
            self.name, response.prompt_tokens, response.completion_tokens
        );

        let usage = TokenUsage {
            input_tokens: response.prompt_tokens as u64,
            output_tokens: response.completion_tokens as u64,
        };
        // edgequake-llm reports a missing message as empty content.
        let message = if response.content.is_empty() {
            None
        } else {
            Some(response.content.clone())
        };

        Ok(InferenceResponse {
            choices: vec![Choice { message }],
            usage,
        })
    }
}
