//! Input items: photographed notes and typed notes.
//!
//! [`Batch`] assigns ids and synthesizes filenames for typed notes
//! (`digital_notes_01.txt`, `digital_notes_02.txt`, …) so callers only say
//! *what* they submit.

use super::encode::ImageSource;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// One unit of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputItem {
    Image(ImageInput),
    Text(TextInput),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub id: String,
    pub source: ImageSource,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextInput {
    pub id: String,
    pub text: String,
    pub filename: String,
}

impl InputItem {
    pub fn id(&self) -> &str {
        match self {
            InputItem::Image(i) => &i.id,
            InputItem::Text(t) => &t.id,
        }
    }

    pub fn filename(&self) -> &str {
        match self {
            InputItem::Image(i) => &i.filename,
            InputItem::Text(t) => &t.filename,
        }
    }
}

impl ImageInput {
    /// Path backing this image, used as the preview handle.
    pub fn preview(&self) -> Option<&Path> {
        match &self.source {
            ImageSource::Path(p) => Some(p),
            ImageSource::Bytes(_) | ImageSource::Encoded(_) => None,
        }
    }
}

/// Filename given to the `n`-th typed note (1-based).
pub fn text_filename(n: usize) -> String {
    format!("digital_notes_{n:02}.txt")
}

/// Ordered collection of items with unique ids.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    items: Vec<InputItem>,
    images: usize,
    texts: usize,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a photo read from `path` when extraction starts.
    pub fn image_path(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.push_image(ImageSource::Path(path), filename);
        self
    }

    /// Add a photo held in memory.
    pub fn image_bytes(mut self, bytes: Vec<u8>, filename: impl Into<String>) -> Self {
        self.push_image(ImageSource::Bytes(bytes), filename.into());
        self
    }

    /// Add a pre-encoded photo (data URL or bare base64).
    pub fn image_encoded(mut self, encoded: impl Into<String>, filename: impl Into<String>) -> Self {
        self.push_image(ImageSource::Encoded(encoded.into()), filename.into());
        self
    }

    /// Add a typed note; its filename is synthesized.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.texts += 1;
        let n = self.texts;
        self.items.push(InputItem::Text(TextInput {
            id: format!("text-{n:03}"),
            text: text.into(),
            filename: text_filename(n),
        }));
        self
    }

    fn push_image(&mut self, source: ImageSource, filename: String) {
        self.images += 1;
        self.items.push(InputItem::Image(ImageInput {
            id: format!("image-{:03}", self.images),
            source,
            filename,
        }));
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[InputItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<InputItem> {
        self.items
    }
}

/// First id that appears twice in `items`, if any.
pub fn find_duplicate_id(items: &[InputItem]) -> Option<&str> {
    let mut seen = HashSet::with_capacity(items.len());
    items.iter().map(InputItem::id).find(|id| !seen.insert(*id))
}
