//! Eager extraction: run every item, then return the whole result set.
//!
//! Use [`crate::stream::extract_stream`] instead when results should be
//! shown as soon as each image finishes.
//!
//! ## Failure policy
//!
//! Only batch-level problems (no client, empty batch, duplicate ids) are
//! returned as `Err`. Everything that goes wrong inside one image becomes
//! that image's result with a stage-prefixed message, so the caller always
//! gets exactly one [`PipelineResult`] per submitted item.

use crate::client::{InferenceClient, OpenAiClient, ProviderClient, TokenUsage};
use crate::config::DigitizerConfig;
use crate::error::{NotesError, StageError};
use crate::language::DetectedLanguage;
use crate::output::{image_reference, ItemKind, PipelineResult, ResultSet, ResultStatus, Summary};
use crate::pipeline::detect::detect_or_unknown;
use crate::pipeline::encode::encode;
use crate::pipeline::ensemble::transcribe_all;
use crate::pipeline::gather::gather_settled;
use crate::pipeline::input::{find_duplicate_id, ImageInput, InputItem, TextInput};
use crate::pipeline::judge::reconcile;
use crate::pipeline::{Stage, StageContext};
use crate::progress::ProgressCallback;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Entry point of the library: owns the resolved inference client and the
/// configuration shared by every run.
///
/// ```rust,no_run
/// use notescribe::{Batch, Digitizer, DigitizerConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = DigitizerConfig::builder().api_key("sk-...").build()?;
/// let digitizer = Digitizer::new(config)?;
///
/// let batch = Batch::new()
///     .image_path("site-visit/page1.jpg")
///     .text("Leak detected at valve 3");
/// let mut results = digitizer.extract(batch.items()).await?;
///
/// results.edit_content("image-001", "Pump 2: pressure OK")?;
/// let summary = digitizer.summarize(&results, "german").await?;
/// println!("{}", summary.text);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Digitizer {
    client: Arc<dyn InferenceClient>,
    config: DigitizerConfig,
}

impl std::fmt::Debug for Digitizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Digitizer")
            .field("client", &self.client.name())
            .field("config", &self.config)
            .finish()
    }
}

impl Digitizer {
    /// Resolve the inference client from `config`.
    ///
    /// Fails with [`NotesError::Configuration`] before any network attempt
    /// when neither a client, a provider name nor an API key is set.
    pub fn new(config: DigitizerConfig) -> Result<Self, NotesError> {
        let client = resolve_client(&config)?;
        info!("Using inference client '{}' with model {}", client.name(), config.model);
        Ok(Self { client, config })
    }

    /// Use `client` regardless of what `config` names.
    pub fn with_client(client: Arc<dyn InferenceClient>, config: DigitizerConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &DigitizerConfig {
        &self.config
    }

    pub fn client(&self) -> &Arc<dyn InferenceClient> {
        &self.client
    }

    pub(crate) fn context<'a>(&'a self, cancel: &'a CancellationToken) -> StageContext<'a> {
        StageContext::new(self.client.as_ref(), &self.config, cancel)
    }

    /// Extract every item. Text results come first, then image results, each
    /// group in submission order.
    pub async fn extract(&self, items: &[InputItem]) -> Result<ResultSet, NotesError> {
        self.extract_with_cancel(items, &CancellationToken::new()).await
    }

    /// [`Digitizer::extract`] with a caller-owned cancellation token.
    ///
    /// Cancelling does not fail the run: images still in flight come back
    /// with [`ResultStatus::Cancelled`].
    pub async fn extract_with_cancel(
        &self,
        items: &[InputItem],
        cancel: &CancellationToken,
    ) -> Result<ResultSet, NotesError> {
        let start = Instant::now();
        validate_batch(items)?;

        let (texts, images) = split_items(items);
        info!(
            "Starting extraction: {} image(s), {} text note(s)",
            images.len(),
            texts.len()
        );

        let progress = self.config.progress_callback.as_ref();
        if let Some(cb) = progress {
            cb.on_extraction_start(items.len());
        }

        let mut results: Vec<PipelineResult> = texts
            .into_iter()
            .map(|t| {
                let result = text_result(t);
                report_text(progress, &result);
                result
            })
            .collect();

        let ctx = self.context(cancel);
        let image_results = gather_settled(
            images.into_iter().map(|image| process_image(ctx, image)),
            self.config.concurrency,
        )
        .await;
        results.extend(image_results);

        let set = ResultSet::new(results);
        let stats = set.stats();
        info!(
            "Extraction complete: {}/{} ok, {} failed, {} cancelled, {}ms",
            stats.succeeded,
            stats.total_items,
            stats.failed,
            stats.cancelled,
            start.elapsed().as_millis()
        );
        if let Some(cb) = progress {
            cb.on_extraction_complete(stats.total_items, stats.succeeded);
        }
        Ok(set)
    }

    /// Synchronous wrapper around [`Digitizer::extract`].
    ///
    /// Creates a temporary tokio runtime internally; do not call from
    /// inside an async context.
    pub fn extract_sync(&self, items: &[InputItem]) -> Result<ResultSet, NotesError> {
        tokio::runtime::Runtime::new()
            .map_err(|e| NotesError::Internal(format!("Failed to create tokio runtime: {}", e)))?
            .block_on(self.extract(items))
    }

    /// Summarize the current contents of `results` in the language named by
    /// `language` (`"german"`, `"english"`, …; unknown labels fall back to
    /// English).
    pub async fn summarize(&self, results: &ResultSet, language: &str) -> Result<Summary, NotesError> {
        self.summarize_with_cancel(results, language, &CancellationToken::new())
            .await
    }

    pub async fn summarize_with_cancel(
        &self,
        results: &ResultSet,
        language: &str,
        cancel: &CancellationToken,
    ) -> Result<Summary, NotesError> {
        crate::summary::summarize_set(self.context(cancel), results, language).await
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Pick the inference client, from most to least specific:
///
/// 1. a pre-built client (`config.client`);
/// 2. a named `edgequake-llm` provider (`config.provider_name`);
/// 3. the OpenAI-compatible HTTP client with `config.api_key`.
fn resolve_client(config: &DigitizerConfig) -> Result<Arc<dyn InferenceClient>, NotesError> {
    if let Some(ref client) = config.client {
        return Ok(Arc::clone(client));
    }

    if let Some(ref name) = config.provider_name {
        let client = ProviderClient::from_name(name, &config.model)?;
        return Ok(Arc::new(client));
    }

    match config.api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => {
            let client = OpenAiClient::new(
                key,
                config.base_url.as_deref(),
                Duration::from_secs(config.api_timeout_secs),
            )
            .map_err(|e| NotesError::Configuration {
                hint: format!("Could not set up the HTTP client: {e}"),
            })?;
            Ok(Arc::new(client))
        }
        _ => Err(NotesError::Configuration {
            hint: "No API key configured.\n\
                   Pass an API key, name an LLM provider, or supply a client."
                .to_string(),
        }),
    }
}

/// Reject empty batches and duplicate ids.
pub(crate) fn validate_batch(items: &[InputItem]) -> Result<(), NotesError> {
    if items.is_empty() {
        return Err(NotesError::EmptyBatch);
    }
    if let Some(id) = find_duplicate_id(items) {
        return Err(NotesError::DuplicateItemId { id: id.to_string() });
    }
    Ok(())
}

/// Split into text and image items, keeping submission order in each.
pub(crate) fn split_items(items: &[InputItem]) -> (Vec<&TextInput>, Vec<&ImageInput>) {
    let mut texts = Vec::new();
    let mut images = Vec::new();
    for item in items {
        match item {
            InputItem::Text(t) => texts.push(t),
            InputItem::Image(i) => images.push(i),
        }
    }
    (texts, images)
}

/// Typed notes need no model call; the text is the content.
pub(crate) fn text_result(text: &TextInput) -> PipelineResult {
    PipelineResult {
        id: text.id.clone(),
        filename: text.filename.clone(),
        kind: ItemKind::Text,
        preview: None,
        content: text.text.clone(),
        original: Some(text.text.clone()),
        status: ResultStatus::Ok,
        detected_language: None,
        usage: TokenUsage::default(),
        duration_ms: 0,
    }
}

/// Text items pass through at once; report them as started and finished.
pub(crate) fn report_text(progress: Option<&ProgressCallback>, result: &PipelineResult) {
    if let Some(cb) = progress {
        cb.on_item_start(&result.id, &result.filename);
        cb.on_item_complete(&result.id, &result.filename, result.content.len());
    }
}

/// Run one image through encode → detect → ensemble → judge.
///
/// Never fails: a stage error is rendered into the result's content.
pub(crate) async fn process_image(ctx: StageContext<'_>, image: &ImageInput) -> PipelineResult {
    let start = Instant::now();
    let progress = ctx.config.progress_callback.as_ref();
    if let Some(cb) = progress {
        cb.on_item_start(&image.id, &image.filename);
    }

    let mut usage = TokenUsage::default();
    let mut detected = None;
    let outcome = run_stages(ctx, image, &mut usage, &mut detected).await;

    let (content, status) = match outcome {
        Ok(text) => {
            debug!("{}: {} chars transcribed", image.filename, text.len());
            if let Some(cb) = progress {
                cb.on_item_complete(&image.id, &image.filename, text.len());
            }
            (text, ResultStatus::Ok)
        }
        Err(e) => {
            let message = e.to_string();
            let status = if e.is_cancelled() {
                ResultStatus::Cancelled
            } else {
                ResultStatus::Failed
            };
            warn!("{}: {}", image.filename, message);
            if let Some(cb) = progress {
                cb.on_item_error(&image.id, &image.filename, &message);
            }
            (message, status)
        }
    };

    PipelineResult {
        id: image.id.clone(),
        filename: image.filename.clone(),
        kind: ItemKind::Image,
        preview: image.preview().map(|p| p.display().to_string()),
        content,
        original: Some(image_reference(&image.filename)),
        status,
        detected_language: detected,
        usage,
        duration_ms: start.elapsed().as_millis() as u64,
    }
}

async fn run_stages(
    ctx: StageContext<'_>,
    image: &ImageInput,
    usage: &mut TokenUsage,
    detected: &mut Option<DetectedLanguage>,
) -> Result<String, StageError> {
    let stage = |s: Stage| {
        if let Some(cb) = ctx.config.progress_callback.as_ref() {
            cb.on_stage(&image.id, s);
        }
    };

    if ctx.cancel.is_cancelled() {
        return Err(StageError::Cancelled);
    }
    let data_url = encode(&image.source).await?;

    stage(Stage::Detection);
    let (language, detection_usage) = detect_or_unknown(ctx, &data_url).await;
    *usage += detection_usage;
    *detected = Some(language);

    // A cancelled detection reads as `unknown`; don't start the ensemble.
    if ctx.cancel.is_cancelled() {
        return Err(StageError::Cancelled);
    }

    stage(Stage::Transcription);
    let (triple, ensemble_usage) = transcribe_all(ctx, &data_url, language).await?;
    *usage += ensemble_usage;

    stage(Stage::Judge);
    let judged = reconcile(ctx, &triple, &data_url, language).await?;
    *usage += judged.usage;
    Ok(judged.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::input::Batch;

    #[test]
    fn missing_credential_is_configuration_error() {
        let config = DigitizerConfig::default();
        let err = Digitizer::new(config).unwrap_err();
        assert!(matches!(err, NotesError::Configuration { .. }));
    }

    #[test]
    fn blank_api_key_is_configuration_error() {
        let config = DigitizerConfig::builder().api_key("  ").build().unwrap();
        assert!(matches!(
            Digitizer::new(config),
            Err(NotesError::Configuration { .. })
        ));
    }

    #[test]
    fn api_key_resolves_http_client() {
        let config = DigitizerConfig::builder().api_key("sk-test").build().unwrap();
        let digitizer = Digitizer::new(config).expect("client resolves");
        assert_eq!(digitizer.client().name(), "openai");
    }

    #[test]
    fn batch_validation() {
        assert!(matches!(validate_batch(&[]), Err(NotesError::EmptyBatch)));

        let mut items = Batch::new().text("a").text("b").into_items();
        assert!(validate_batch(&items).is_ok());
        if let InputItem::Text(t) = &mut items[1] {
            t.id = "text-001".into();
        }
        assert!(matches!(
            validate_batch(&items),
            Err(NotesError::DuplicateItemId { id }) if id == "text-001"
        ));
    }

    #[test]
    fn split_keeps_submission_order() {
        let batch = Batch::new()
            .image_encoded("AAAA", "one.jpg")
            .text("first")
            .image_encoded("BBBB", "two.jpg")
            .text("second");
        let (texts, images) = split_items(batch.items());
        let texts: Vec<_> = texts.iter().map(|t| t.text.as_str()).collect();
        let images: Vec<_> = images.iter().map(|i| i.filename.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(images, vec!["one.jpg", "two.jpg"]);
    }

    #[test]
    fn text_result_is_verbatim() {
        let items = Batch::new().text("Leak detected at valve 3").into_items();
        let InputItem::Text(t) = &items[0] else {
            panic!("expected text item");
        };
        let r = text_result(t);
        assert_eq!(r.content, "Leak detected at valve 3");
        assert_eq!(r.original.as_deref(), Some("Leak detected at valve 3"));
        assert_eq!(r.filename, "digital_notes_01.txt");
        assert_eq!(r.kind, ItemKind::Text);
        assert!(r.preview.is_none());
    }
}
