//! Error types for the notescribe library.
//!
//! Failures come in two weights:
//!
//! * [`NotesError`]: **Fatal** for the action that raised it: the
//!   extraction run or the summary cannot proceed at all (no credential,
//!   empty input, summary call failed). Returned as `Err(NotesError)`.
//!
//! * [`StageError`]: **Non-fatal**: one image's stage chain failed but its
//!   siblings are fine. Rendered into that item's
//!   [`crate::output::PipelineResult`] content so a batch with one blurry
//!   photo still yields every other transcription.
//!
//! Below those sit [`InferenceError`] (the collaborator failed) and
//! [`CallError`] (one model call failed, including empty replies and
//! cancellation).

use crate::pipeline::encode::EncodingError;
use crate::prompts::Variant;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the notescribe library.
#[derive(Debug, Error)]
pub enum NotesError {
    // ── Configuration errors ─────────────────────────────────────────────
    /// No credential or provider is available; nothing was sent.
    #[error("Inference service is not configured.\n{hint}")]
    Configuration { hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Input errors ─────────────────────────────────────────────────────
    /// An extraction run was requested with no items.
    #[error("Nothing to extract: the batch contains no images and no text notes")]
    EmptyBatch,

    /// Two items in one batch share an id.
    #[error("Duplicate item id '{id}' in batch")]
    DuplicateItemId { id: String },

    /// An edit targeted an id that is not in the result set.
    #[error("No result with id '{id}'")]
    UnknownItem { id: String },

    // ── Summary errors ───────────────────────────────────────────────────
    /// Summary requested over an empty result list.
    #[error("Cannot summarize: there are no extracted results")]
    EmptySummaryInput,

    /// The summary call failed or returned no text.
    #[error("Summary generation failed: {0}")]
    Summary(#[source] CallError),

    // ── I/O errors ───────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure reported by an [`crate::client::InferenceClient`].
#[derive(Debug, Clone, Error)]
pub enum InferenceError {
    /// The service answered with a vendor error (HTTP status, error code).
    #[error("Service error{}: {message}", describe_service(.status, .code))]
    Service {
        status: Option<u16>,
        code: Option<String>,
        message: String,
    },

    /// The request never produced a response (DNS, TLS, timeout, …).
    #[error("Request failed: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("Malformed response: {0}")]
    Malformed(String),
}

fn describe_service(status: &Option<u16>, code: &Option<String>) -> String {
    match (status, code) {
        (Some(s), Some(c)) => format!(" (HTTP {s}, {c})"),
        (Some(s), None) => format!(" (HTTP {s})"),
        (None, Some(c)) => format!(" ({c})"),
        (None, None) => String::new(),
    }
}

impl InferenceError {
    /// Whether a retry has a chance of succeeding (rate limits, 5xx, network).
    pub fn is_transient(&self) -> bool {
        match self {
            InferenceError::Service { status, .. } => {
                matches!(status, Some(429) | Some(500..=599) | None)
            }
            InferenceError::Transport(_) => true,
            InferenceError::Malformed(_) => false,
        }
    }
}

/// Failure of a single model call.
#[derive(Debug, Clone, Error)]
pub enum CallError {
    #[error(transparent)]
    Inference(#[from] InferenceError),

    /// The first choice carried no message text.
    #[error("model returned an empty response")]
    EmptyResponse,

    /// The caller's cancellation token fired.
    #[error("cancelled")]
    Cancelled,
}

/// A non-fatal failure of one image's stage chain.
///
/// The `Display` output is exactly what lands in the item's content slot,
/// so every variant carries its stage prefix.
#[derive(Debug, Clone, Error)]
pub enum StageError {
    #[error("Image encoding failed: {0}")]
    Encoding(#[from] EncodingError),

    #[error("Transcription failed: variant {variant}: {source}")]
    Transcription {
        variant: Variant,
        #[source]
        source: CallError,
    },

    #[error("Judge step failed: {0}")]
    Judge(#[source] CallError),

    #[error("Extraction cancelled")]
    Cancelled,
}

impl StageError {
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            StageError::Cancelled
                | StageError::Judge(CallError::Cancelled)
                | StageError::Transcription {
                    source: CallError::Cancelled,
                    ..
                }
        )
    }
}
