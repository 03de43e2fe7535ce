//! Streaming extraction API: emit results as they complete.
//!
//! Typed notes need no model call, so their results are yielded first and
//! immediately. Image results follow in completion order, which is not
//! necessarily submission order; collect and sort by id if order matters,
//! or use the eager [`crate::Digitizer::extract`].

use crate::error::NotesError;
use crate::extract::{process_image, report_text, text_result, validate_batch, Digitizer};
use crate::output::PipelineResult;
use crate::pipeline::input::InputItem;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// A boxed stream of item results.
pub type ResultStream = Pin<Box<dyn Stream<Item = PipelineResult> + Send>>;

impl Digitizer {
    /// Extract `items`, yielding each result as soon as it is ready.
    ///
    /// The batch is validated up front; after that the stream yields exactly
    /// one result per item. Progress callbacks fire as with
    /// [`Digitizer::extract`]; the completion event follows the last result.
    /// Cancelling `cancel` makes the remaining images
    /// finish early with a cancelled status.
    ///
    /// # Example
    /// ```rust,no_run
    /// use futures::StreamExt;
    /// use notescribe::{Batch, Digitizer, DigitizerConfig};
    /// use tokio_util::sync::CancellationToken;
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let digitizer = Digitizer::new(DigitizerConfig::builder().api_key("sk-...").build()?)?;
    /// let batch = Batch::new().image_path("IMG_0042.jpg").text("Leak at valve 3");
    /// let mut results = digitizer.extract_stream(batch.into_items(), CancellationToken::new())?;
    /// while let Some(result) = results.next().await {
    ///     println!("{}: {}", result.filename, result.content);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn extract_stream(
        &self,
        items: Vec<InputItem>,
        cancel: CancellationToken,
    ) -> Result<ResultStream, NotesError> {
        validate_batch(&items)?;

        let total = items.len();
        let mut texts = Vec::new();
        let mut images = Vec::new();
        for item in items {
            match item {
                InputItem::Text(t) => texts.push(text_result(&t)),
                InputItem::Image(i) => images.push(i),
            }
        }
        info!(
            "Starting streaming extraction: {} image(s), {} text note(s)",
            images.len(),
            texts.len()
        );

        let progress = self.config().progress_callback.clone();
        if let Some(cb) = &progress {
            cb.on_extraction_start(total);
        }
        let text_progress = progress.clone();
        let text_results =
            stream::iter(texts).inspect(move |r| report_text(text_progress.as_ref(), r));

        let concurrency = self.config().concurrency.unwrap_or(images.len()).max(1);
        let owner = self.clone();
        let image_results = stream::iter(images.into_iter().map(move |image| {
            let digitizer = owner.clone();
            let cancel = cancel.clone();
            async move { process_image(digitizer.context(&cancel), &image).await }
        }))
        .buffer_unordered(concurrency);

        let succeeded = Arc::new(AtomicUsize::new(0));
        let counter = succeeded.clone();
        let results = text_results.chain(image_results).inspect(move |r| {
            if r.is_ok() {
                counter.fetch_add(1, Ordering::Relaxed);
            }
        });
        let finished = stream::once(async move {
            let ok = succeeded.load(Ordering::Relaxed);
            info!("Streaming extraction complete: {ok}/{total} ok");
            if let Some(cb) = &progress {
                cb.on_extraction_complete(total, ok);
            }
        })
        .filter_map(|()| async { None::<PipelineResult> });

        Ok(Box::pin(results.chain(finished)))
    }
}
