//! OpenAI-compatible chat-completions backend.
//!
//! Images travel as `image_url` parts holding the data URL, which every
//! OpenAI-compatible server (OpenAI, Azure via gateway, vLLM, LiteLLM)
//! accepts. Error bodies follow the `{"error": {"message", "code"}}` shape;
//! anything else is reported with the raw body.

use super::{Choice, ContentPart, InferenceClient, InferenceRequest, InferenceResponse, Role, TokenUsage};
use crate::error::InferenceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat-completions client with an injected API key.
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl OpenAiClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, InferenceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InferenceError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: Role,
    content: Vec<WirePart<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WirePart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: WireImage },
}

#[derive(Serialize)]
struct WireImage {
    url: String,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    choices: Vec<ReplyChoice>,
    #[serde(default)]
    usage: Option<ReplyUsage>,
}

#[derive(Deserialize)]
struct ReplyChoice {
    #[serde(default)]
    message: Option<ReplyMessage>,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ReplyUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

fn to_wire(request: &InferenceRequest) -> ChatBody<'_> {
    ChatBody {
        model: &request.model,
        messages: request
            .messages
            .iter()
            .map(|m| WireMessage {
                role: m.role,
                content: m
                    .parts
                    .iter()
                    .map(|p| match p {
                        ContentPart::Text(text) => WirePart::Text { text },
                        ContentPart::Image(img) => WirePart::ImageUrl {
                            image_url: WireImage {
                                url: img.to_string(),
                            },
                        },
                    })
                    .collect(),
            })
            .collect(),
        max_tokens: request.max_tokens,
        temperature: request.temperature,
    }
}

/// Map a non-2xx body to a vendor error.
fn service_error(status: u16, body: &str) -> InferenceError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) => {
            let code = env
                .error
                .code
                .map(|c| match c {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .or(env.error.kind);
            InferenceError::Service {
                status: Some(status),
                code,
                message: env.error.message,
            }
        }
        Err(_) => InferenceError::Service {
            status: Some(status),
            code: None,
            message: body.trim().to_string(),
        },
    }
}

fn from_reply(reply: ChatReply) -> InferenceResponse {
    InferenceResponse {
        choices: reply
            .choices
            .into_iter()
            .map(|c| Choice {
                message: c.message.and_then(|m| m.content),
            })
            .collect(),
        usage: reply
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default(),
    }
}

#[async_trait]
impl InferenceClient for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(
        &self,
        request: InferenceRequest,
    ) -> Result<InferenceResponse, InferenceError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = to_wire(&request);

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| InferenceError::Transport(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| InferenceError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(service_error(status.as_u16(), &text));
        }

        let reply: ChatReply =
            serde_json::from_str(&text).map_err(|e| InferenceError::Malformed(e.to_string()))?;
        let response = from_reply(reply);
        debug!(
            "{}: {} choices, {} in / {} out tokens",
            request.model,
            response.choices.len(),
            response.usage.input_tokens,
            response.usage.output_tokens
        );
        Ok(response)
    }
}
