//! Pipeline stages for note digitization.
//!
//! Each submodule implements exactly one step, so every stage can be tested
//! against a scripted client without the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ detect ──▶ ensemble (A ∥ B ∥ C) ──▶ judge ──▶ result
//! (items)   (data URL)  (language)  (three transcriptions)   (reconciled)
//! ```
//!
//! 1. [`input`]: batch items and synthesized filenames
//! 2. [`encode`]: photo bytes → inline data URL
//! 3. [`detect`]: dominant language, best effort (`unknown` on failure)
//! 4. [`ensemble`]: three differently biased transcriptions, all-or-nothing
//! 5. [`judge`]: one reconciled transcription, image breaks ties
//! 6. [`postprocess`]: deterministic cleanup of model output
//!
//! [`llm`] drives a single model call (cancellation, opt-in retry) and
//! [`gather`] holds the two fan-out combinators.

pub mod detect;
pub mod encode;
pub mod ensemble;
pub mod gather;
pub mod input;
pub mod judge;
pub mod llm;
pub mod postprocess;

use crate::client::InferenceClient;
use crate::config::DigitizerConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio_util::sync::CancellationToken;

/// Model-facing stage, for logs and progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Detection,
    Transcription,
    Judge,
    Summary,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Detection => "language detection",
            Stage::Transcription => "transcription",
            Stage::Judge => "judge",
            Stage::Summary => "summary",
        })
    }
}

/// Everything a stage needs to issue model calls.
#[derive(Clone, Copy)]
pub struct StageContext<'a> {
    pub client: &'a dyn InferenceClient,
    pub config: &'a DigitizerConfig,
    pub cancel: &'a CancellationToken,
}

impl<'a> StageContext<'a> {
    pub fn new(
        client: &'a dyn InferenceClient,
        config: &'a DigitizerConfig,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            client,
            config,
            cancel,
        }
    }
}
