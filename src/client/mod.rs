//! The inference collaborator and its backends.
//!
//! Every stage talks to the model through [`InferenceClient`], so tests and
//! embedders can supply their own transport. Two backends ship with the
//! crate:
//!
//! * [`OpenAiClient`]: OpenAI-compatible chat completions over `reqwest`.
//! * [`ProviderClient`]: any `edgequake-llm` provider (Anthropic, Gemini,
//!   Ollama, Azure, …).

mod openai;
mod provider;

pub use openai::OpenAiClient;
pub use provider::ProviderClient;

use crate::error::InferenceError;
use crate::pipeline::encode::DataUrl;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One piece of a message: plain text or an inline image.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    Image(DataUrl),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub parts: Vec<ContentPart>,
}

impl Message {
    pub fn user(parts: Vec<ContentPart>) -> Self {
        Self {
            role: Role::User,
            parts,
        }
    }

    /// Concatenated text parts, in order.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::Text(t) => Some(t.as_str()),
                ContentPart::Image(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn images(&self) -> impl Iterator<Item = &DataUrl> {
        self.parts.iter().filter_map(|p| match p {
            ContentPart::Image(img) => Some(img),
            ContentPart::Text(_) => None,
        })
    }
}

/// A single request to the inference service.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: usize,
    pub temperature: f32,
}

impl InferenceRequest {
    /// All text carried by the request, for inspection and logging.
    pub fn text(&self) -> String {
        self.messages
            .iter()
            .map(Message::text)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn image_count(&self) -> usize {
        self.messages.iter().map(|m| m.images().count()).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Choice {
    pub message: Option<String>,
}

/// Token accounting reported by the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.input_tokens += rhs.input_tokens;
        self.output_tokens += rhs.output_tokens;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InferenceResponse {
    pub choices: Vec<Choice>,
    pub usage: TokenUsage,
}

impl InferenceResponse {
    /// A response with one choice carrying `text`.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            choices: vec![Choice {
                message: Some(text.into()),
            }],
            usage: TokenUsage::default(),
        }
    }

    /// Message text of the first choice, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.message.as_deref())
    }
}

/// Request/response access to a generative model.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    async fn complete(&self, request: InferenceRequest)
        -> Result<InferenceResponse, InferenceError>;
}
