//! Output types: per-item results, the editable result set, summaries.
//!
//! A [`ResultSet`] is what an extraction run returns and what the
//! summarizer reads. Edits go through [`ResultSet::edit_content`], which
//! bumps a monotonic version; a [`Summary`] remembers the version it was
//! generated from so callers can flag it as outdated.

use crate::client::TokenUsage;
use crate::error::NotesError;
use crate::language::{DetectedLanguage, Language};
use crate::pipeline::postprocess::find_alternatives;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Image,
    Text,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Image => "image",
            ItemKind::Text => "text",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    /// Content was extracted (or supplied as text).
    #[default]
    Ok,
    /// A stage failed; content holds the error message.
    Failed,
    /// The run was cancelled before this item finished.
    Cancelled,
}

/// Outcome for one input item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Mirrors the input item's id.
    pub id: String,
    pub filename: String,
    pub kind: ItemKind,
    /// Preview handle (image path) for image items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    /// Reconciled transcription, raw text, or an error message.
    pub content: String,
    /// Source text for text items, a reference tag for image items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
    #[serde(default)]
    pub status: ResultStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_language: Option<DetectedLanguage>,
    #[serde(default)]
    pub usage: TokenUsage,
    #[serde(default)]
    pub duration_ms: u64,
}

impl PipelineResult {
    pub fn is_ok(&self) -> bool {
        self.status == ResultStatus::Ok
    }

    /// Number of bracket-alternative spans in the content.
    pub fn uncertain_spans(&self) -> usize {
        if self.kind == ItemKind::Image && self.is_ok() {
            find_alternatives(&self.content).len()
        } else {
            0
        }
    }
}

/// Reference tag stored as the `original` of an image result.
pub fn image_reference(filename: &str) -> String {
    format!("[image: {filename}]")
}

/// Ordered, editable results of one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    results: Vec<PipelineResult>,
    #[serde(default)]
    version: u64,
}

impl ResultSet {
    pub fn new(results: Vec<PipelineResult>) -> Self {
        Self {
            results,
            version: 0,
        }
    }

    pub fn results(&self) -> &[PipelineResult] {
        &self.results
    }

    pub fn get(&self, id: &str) -> Option<&PipelineResult> {
        self.results.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Incremented on every edit.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Replace one item's content. Only the content field changes.
    pub fn edit_content(&mut self, id: &str, content: impl Into<String>) -> Result<(), NotesError> {
        let result = self
            .results
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| NotesError::UnknownItem { id: id.to_string() })?;
        result.content = content.into();
        self.version += 1;
        Ok(())
    }

    pub fn stats(&self) -> ExtractionStats {
        let mut stats = ExtractionStats {
            total_items: self.results.len(),
            ..Default::default()
        };
        for r in &self.results {
            match r.kind {
                ItemKind::Image => stats.image_items += 1,
                ItemKind::Text => stats.text_items += 1,
            }
            match r.status {
                ResultStatus::Ok => stats.succeeded += 1,
                ResultStatus::Failed => stats.failed += 1,
                ResultStatus::Cancelled => stats.cancelled += 1,
            }
            stats.uncertain_spans += r.uncertain_spans();
            stats.total_input_tokens += r.usage.input_tokens;
            stats.total_output_tokens += r.usage.output_tokens;
        }
        stats
    }

    /// Load a result set previously written with [`ResultSet::write_json`].
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Write the result set as pretty JSON, atomically.
    pub async fn write_json(&self, path: impl AsRef<Path>) -> Result<(), NotesError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| NotesError::Internal(format!("serialise results: {e}")))?;
        write_atomic(path, json.into_bytes()).await
    }
}

/// Aggregate numbers for one result set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub total_items: usize,
    pub image_items: usize,
    pub text_items: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub uncertain_spans: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
}

/// A cross-item summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub text: String,
    pub language: Language,
    /// [`ResultSet::version`] at generation time.
    pub source_version: u64,
    pub item_count: usize,
    #[serde(default)]
    pub usage: TokenUsage,
}

impl Summary {
    /// Whether `results` was edited after this summary was generated.
    pub fn is_stale(&self, results: &ResultSet) -> bool {
        results.version() != self.source_version
    }

    /// Write the summary text, atomically.
    pub async fn write_to(&self, path: impl AsRef<Path>) -> Result<(), NotesError> {
        let mut text = self.text.clone();
        if !text.ends_with('\n') {
            text.push('\n');
        }
        write_atomic(path.as_ref(), text.into_bytes()).await
    }
}

/// Write via a temp file in the target directory, then rename.
async fn write_atomic(path: &Path, bytes: Vec<u8>) -> Result<(), NotesError> {
    let write_failed = |source: std::io::Error| NotesError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    tokio::fs::create_dir_all(&parent).await.map_err(write_failed)?;

    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
        std::io::Write::write_all(&mut tmp, &bytes)?;
        tmp.persist(&target).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| NotesError::Internal(format!("write task failed: {e}")))?
    .map_err(write_failed)
}
