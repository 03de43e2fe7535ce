//! Language detection: best-effort classification of an image's dominant
//! language.
//!
//! [`detect`] reports every failure as a [`DetectionError`]. The pipeline
//! never blocks on detection, so [`detect_or_unknown`] is the single place
//! where those failures are logged and collapsed into
//! [`DetectedLanguage::Unknown`].

use super::encode::DataUrl;
use super::llm::{ask, CallOptions};
use super::{Stage, StageContext};
use crate::client::{ContentPart, TokenUsage};
use crate::error::CallError;
use crate::language::{DetectedLanguage, Language, UnsupportedLanguage};
use crate::prompts::{language_detection_prompt, DETECTION_MARKER};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Error)]
pub enum DetectionError {
    #[error(transparent)]
    Call(#[from] CallError),

    #[error("reply does not contain 'DOMINANT_LANGUAGE: <language>': {0:?}")]
    Unparseable(String),

    #[error(transparent)]
    Unsupported(#[from] UnsupportedLanguage),
}

static RE_DETECTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i){DETECTION_MARKER}\s*:\s*\**\s*([\p{{L}}]+)")).unwrap()
});

/// Parse a `DOMINANT_LANGUAGE: <token>` reply. The token is matched
/// case-insensitively against the supported languages.
pub fn parse_detection_reply(reply: &str) -> Result<DetectedLanguage, DetectionError> {
    let caps = RE_DETECTION
        .captures(reply)
        .ok_or_else(|| DetectionError::Unparseable(reply.trim().to_string()))?;
    let language: Language = caps[1].parse()?;
    Ok(language.into())
}

/// Ask the model for the dominant language of `image`.
pub async fn detect(
    ctx: StageContext<'_>,
    image: &DataUrl,
) -> Result<(DetectedLanguage, TokenUsage), DetectionError> {
    let completion = ask(
        ctx,
        CallOptions::extraction(Stage::Detection, ctx.config),
        vec![
            ContentPart::Text(language_detection_prompt().to_string()),
            ContentPart::Image(image.clone()),
        ],
    )
    .await?;
    let language = parse_detection_reply(&completion.text)?;
    debug!("Detected dominant language: {}", language);
    Ok((language, completion.usage))
}

/// [`detect`], with every failure collapsed into `Unknown`.
pub async fn detect_or_unknown(
    ctx: StageContext<'_>,
    image: &DataUrl,
) -> (DetectedLanguage, TokenUsage) {
    match detect(ctx, image).await {
        Ok(found) => found,
        Err(e) => {
            warn!("Language detection failed, continuing with 'unknown': {}", e);
            (DetectedLanguage::Unknown, TokenUsage::default())
        }
    }
}
