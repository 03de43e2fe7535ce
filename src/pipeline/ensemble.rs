//! Ensemble transcription: three differently biased readings of one photo.
//!
//! The three calls start together and are gathered fail-fast. A partial
//! ensemble is useless to the judge, so the first failure fails the step.

use super::encode::DataUrl;
use super::gather::gather_all;
use super::llm::{ask, CallOptions, Completion};
use super::postprocess::clean_transcription;
use super::{Stage, StageContext};
use crate::client::{ContentPart, TokenUsage};
use crate::error::{CallError, StageError};
use crate::language::DetectedLanguage;
use crate::prompts::{transcription_prompt, Variant};

/// The three ensemble outputs, addressed by variant.
///
/// Only ever used as judge input; never persisted on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptionTriple {
    pub accuracy: String,
    pub completeness: String,
    pub structure: String,
}

impl TranscriptionTriple {
    pub fn new(
        accuracy: impl Into<String>,
        completeness: impl Into<String>,
        structure: impl Into<String>,
    ) -> Self {
        Self {
            accuracy: accuracy.into(),
            completeness: completeness.into(),
            structure: structure.into(),
        }
    }

    pub fn get(&self, variant: Variant) -> &str {
        match variant {
            Variant::Accuracy => &self.accuracy,
            Variant::Completeness => &self.completeness,
            Variant::Structure => &self.structure,
        }
    }

    fn slot(&mut self, variant: Variant) -> &mut String {
        match variant {
            Variant::Accuracy => &mut self.accuracy,
            Variant::Completeness => &mut self.completeness,
            Variant::Structure => &mut self.structure,
        }
    }

    /// `(variant, text)` pairs in A, B, C order.
    pub fn labelled(&self) -> [(Variant, &str); 3] {
        Variant::ALL.map(|v| (v, self.get(v)))
    }
}

async fn transcribe_variant(
    ctx: StageContext<'_>,
    variant: Variant,
    detected: DetectedLanguage,
    image: &DataUrl,
) -> Result<Completion, StageError> {
    ask(
        ctx,
        CallOptions::extraction(Stage::Transcription, ctx.config),
        vec![
            ContentPart::Text(transcription_prompt(variant, detected)),
            ContentPart::Image(image.clone()),
        ],
    )
    .await
    .map_err(|source| StageError::Transcription { variant, source })
}

/// Transcribe `image` three times concurrently, once per [`Variant`].
pub async fn transcribe_all(
    ctx: StageContext<'_>,
    image: &DataUrl,
    detected: DetectedLanguage,
) -> Result<(TranscriptionTriple, TokenUsage), StageError> {
    let completions = gather_all(
        Variant::ALL.map(|variant| transcribe_variant(ctx, variant, detected, image)),
    )
    .await?;

    let mut triple = TranscriptionTriple::default();
    let mut usage = TokenUsage::default();
    for (variant, completion) in Variant::ALL.into_iter().zip(completions) {
        usage += completion.usage;
        let text = clean_transcription(&completion.text);
        if text.trim().is_empty() {
            return Err(StageError::Transcription {
                variant,
                source: CallError::EmptyResponse,
            });
        }
        *triple.slot(variant) = text;
    }
    Ok((triple, usage))
}
