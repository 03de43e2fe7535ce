//! Progress-callback trait for per-item extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::DigitizerConfigBuilder::progress_callback`] to receive
//! events as each item moves through the pipeline. Callers can forward them
//! to a terminal progress bar, a channel or a UI without the library
//! knowing how the host application communicates.
//!
//! # Example
//!
//! ```rust
//! use notescribe::{DigitizerConfig, ExtractionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for CountingCallback {
//!     fn on_item_complete(&self, _id: &str, filename: &str, content_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{filename}: {content_len} chars");
//!     }
//! }
//!
//! let config = DigitizerConfig::builder()
//!     .api_key("sk-test")
//!     .progress_callback(Arc::new(CountingCallback { completed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::pipeline::Stage;
use std::sync::Arc;

/// Called by the orchestrator as it processes each item.
///
/// Image items are processed concurrently, so every method may be called
/// from interleaved tasks; implementations must be `Send + Sync` and guard
/// shared mutable state. All methods default to no-ops.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once before any item is processed.
    fn on_extraction_start(&self, total_items: usize) {
        let _ = total_items;
    }

    /// Called when an item's processing begins.
    fn on_item_start(&self, id: &str, filename: &str) {
        let _ = (id, filename);
    }

    /// Called when an image enters a model-facing stage.
    fn on_stage(&self, id: &str, stage: Stage) {
        let _ = (id, stage);
    }

    /// Called when an item produced content.
    fn on_item_complete(&self, id: &str, filename: &str, content_len: usize) {
        let _ = (id, filename, content_len);
    }

    /// Called when an item failed or was cancelled.
    fn on_item_error(&self, id: &str, filename: &str, error: &str) {
        let _ = (id, filename, error);
    }

    /// Called once after every item has been attempted.
    fn on_extraction_complete(&self, total_items: usize, success_count: usize) {
        let _ = (total_items, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::DigitizerConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
