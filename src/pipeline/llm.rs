//! A single model call: request assembly, cancellation and opt-in retry.
//!
//! Prompt wording lives in [`crate::prompts`]; this module only decides how
//! a call is sent and what counts as a usable answer.
//!
//! ## Retry Strategy
//!
//! Retries are off by default (`max_retries = 0`): a failed stage is
//! terminal and the user re-triggers it. When enabled, only transient
//! errors (rate limits, 5xx, network) are retried, with exponential
//! backoff `retry_backoff_ms * 2^(attempt-1)`.

use super::{Stage, StageContext};
use crate::client::{ContentPart, InferenceRequest, Message, TokenUsage};
use crate::config::DigitizerConfig;
use crate::error::CallError;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Text of a successful call plus its token cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,
}

/// Per-call limits.
#[derive(Debug, Clone, Copy)]
pub struct CallOptions {
    pub stage: Stage,
    pub max_tokens: usize,
    pub max_retries: u32,
}

impl CallOptions {
    /// Limits for an extraction stage, honouring the configured retries.
    pub fn extraction(stage: Stage, config: &DigitizerConfig) -> Self {
        let max_tokens = match stage {
            Stage::Detection => config.detection_max_tokens,
            Stage::Summary => config.summary_max_tokens,
            Stage::Transcription | Stage::Judge => config.max_tokens,
        };
        Self {
            stage,
            max_tokens,
            max_retries: config.max_retries,
        }
    }

    /// Limits for the summary call, which is never retried.
    pub fn summary(config: &DigitizerConfig) -> Self {
        Self {
            stage: Stage::Summary,
            max_tokens: config.summary_max_tokens,
            max_retries: 0,
        }
    }
}

/// Build a one-message user request.
pub fn build_request(
    config: &DigitizerConfig,
    parts: Vec<ContentPart>,
    max_tokens: usize,
) -> InferenceRequest {
    InferenceRequest {
        model: config.model.clone(),
        messages: vec![Message::user(parts)],
        max_tokens,
        temperature: config.temperature,
    }
}

/// Send `parts` to the model and return the first choice's text.
///
/// A missing or blank first choice is [`CallError::EmptyResponse`]. The
/// cancellation token is checked before each attempt and raced against the
/// in-flight request and any backoff sleep.
pub async fn ask(
    ctx: StageContext<'_>,
    options: CallOptions,
    parts: Vec<ContentPart>,
) -> Result<Completion, CallError> {
    let request = build_request(ctx.config, parts, options.max_tokens);
    let mut attempt: u32 = 0;

    loop {
        if ctx.cancel.is_cancelled() {
            return Err(CallError::Cancelled);
        }

        let outcome = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return Err(CallError::Cancelled),
            r = ctx.client.complete(request.clone()) => r,
        };

        match outcome {
            Ok(response) => {
                debug!(
                    "{} via {}: {} input tokens, {} output tokens",
                    options.stage,
                    ctx.client.name(),
                    response.usage.input_tokens,
                    response.usage.output_tokens
                );
                return match response.first_text() {
                    Some(text) if !text.trim().is_empty() => Ok(Completion {
                        text: text.to_string(),
                        usage: response.usage,
                    }),
                    _ => Err(CallError::EmptyResponse),
                };
            }
            Err(e) if attempt < options.max_retries && e.is_transient() => {
                attempt += 1;
                let backoff = ctx.config.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    "{}: attempt {} failed — {}; retry {}/{} after {}ms",
                    options.stage, attempt, e, attempt, options.max_retries, backoff
                );
                tokio::select! {
                    biased;
                    _ = ctx.cancel.cancelled() => return Err(CallError::Cancelled),
                    _ = sleep(Duration::from_millis(backoff)) => {}
                }
            }
            Err(e) => {
                warn!("{}: call failed — {}", options.stage, e);
                return Err(CallError::Inference(e));
            }
        }
    }
}
