//! Judge: reconcile the ensemble into one transcription.
//!
//! The model sees all three readings plus the photo and settles
//! disagreements by looking at the image. Spans it cannot settle come back
//! as `[alt1, alt2, alt3]`; that notation is passed through as-is.

use super::encode::DataUrl;
use super::ensemble::TranscriptionTriple;
use super::llm::{ask, CallOptions, Completion};
use super::postprocess::clean_transcription;
use super::{Stage, StageContext};
use crate::client::ContentPart;
use crate::error::{CallError, StageError};
use crate::language::DetectedLanguage;
use crate::prompts::judge_prompt;

/// Produce the reconciled transcription for one image.
pub async fn reconcile(
    ctx: StageContext<'_>,
    triple: &TranscriptionTriple,
    image: &DataUrl,
    detected: DetectedLanguage,
) -> Result<Completion, StageError> {
    let completion = ask(
        ctx,
        CallOptions::extraction(Stage::Judge, ctx.config),
        vec![
            ContentPart::Text(judge_prompt(triple.labelled(), detected)),
            ContentPart::Image(image.clone()),
        ],
    )
    .await
    .map_err(StageError::Judge)?;

    let text = clean_transcription(&completion.text);
    if text.is_empty() {
        return Err(StageError::Judge(CallError::EmptyResponse));
    }
    Ok(Completion {
        text,
        usage: completion.usage,
    })
}
