//! # notescribe
//!
//! Digitize handwritten inspection notes with vision language models.
//!
//! ## Why an ensemble?
//!
//! A single transcription pass over a phone photo of field notes guesses at
//! every smudged word and never tells you which ones it guessed. This crate
//! asks the model for three readings of the same photo, each biased
//! differently (accuracy, completeness, structure), and then has a judge
//! call reconcile them against the image. Spans the judge cannot settle are
//! kept visible as `word[alt1/alt2]` or `[alt1, alt2, alt3]` so a human can
//! decide while reviewing.
//!
//! ## Pipeline Overview
//!
//! ```text
//! batch (photos + typed notes)
//!  │
//!  ├─ text ───────────────────────────────────────────────▶ result (as typed)
//!  │
//!  └─ image ─┬─ 1. Encode    bytes → data URL
//!            ├─ 2. Detect    dominant language (unknown on failure)
//!            ├─ 3. Ensemble  A ∥ B ∥ C transcriptions, all-or-nothing
//!            └─ 4. Judge     one reconciled transcription ─▶ result
//!
//! results ─▶ user edits ─▶ 5. Summary (german / english / french / italian)
//! ```
//!
//! Images run concurrently. One failing photo never fails the batch: its
//! result carries a stage-prefixed error message instead of a transcription.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use notescribe::{Batch, Digitizer, DigitizerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DigitizerConfig::builder()
//!         .api_key(std::env::var("OPENAI_API_KEY")?)
//!         .build()?;
//!     let digitizer = Digitizer::new(config)?;
//!
//!     let batch = Batch::new()
//!         .image_path("IMG_0042.jpg")
//!         .text("Leak detected at valve 3");
//!     let results = digitizer.extract(batch.items()).await?;
//!     for r in results.results() {
//!         println!("{} [{:?}]\n{}\n", r.filename, r.status, r.content);
//!     }
//!
//!     let summary = digitizer.summarize(&results, "english").await?;
//!     println!("{}", summary.text);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `notescribe` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! notescribe = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod language;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod stream;
pub mod summary;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::{InferenceClient, InferenceRequest, InferenceResponse, TokenUsage};
pub use config::{DigitizerConfig, DigitizerConfigBuilder};
pub use error::{CallError, InferenceError, NotesError, StageError};
pub use extract::Digitizer;
pub use language::{DetectedLanguage, Language};
pub use output::{ExtractionStats, ItemKind, PipelineResult, ResultSet, ResultStatus, Summary};
pub use pipeline::input::{Batch, InputItem};
pub use pipeline::Stage;
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use prompts::Variant;
pub use stream::ResultStream;
pub use tokio_util::sync::CancellationToken;
