//! Supported note languages.
//!
//! Handwritten inspection notes arrive in one of four languages. The
//! detector classifies each image into [`DetectedLanguage`] (which adds an
//! `Unknown` sentinel); the summarizer writes in a [`Language`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A supported language for transcription and summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    German,
    #[default]
    English,
    French,
    Italian,
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::German,
        Language::English,
        Language::French,
        Language::Italian,
    ];

    /// Lower-case English name, as used in prompts and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::German => "german",
            Language::English => "english",
            Language::French => "french",
            Language::Italian => "italian",
        }
    }

    /// Capitalised English name for prompt prose.
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::German => "German",
            Language::English => "English",
            Language::French => "French",
            Language::Italian => "Italian",
        }
    }

    /// Lenient lookup used for summary selection: unrecognised labels fall
    /// back to English.
    pub fn from_label(label: &str) -> Language {
        label.parse().unwrap_or_default()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a token is not one of the supported languages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported language '{0}'")]
pub struct UnsupportedLanguage(pub String);

impl FromStr for Language {
    type Err = UnsupportedLanguage;

    /// Case-insensitive match on the English language name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        Language::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(token))
            .ok_or_else(|| UnsupportedLanguage(token.to_string()))
    }
}

/// Dominant language of one image, or `Unknown` when detection gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectedLanguage {
    German,
    English,
    French,
    Italian,
    #[default]
    Unknown,
}

impl DetectedLanguage {
    pub fn known(&self) -> Option<Language> {
        match self {
            DetectedLanguage::German => Some(Language::German),
            DetectedLanguage::English => Some(Language::English),
            DetectedLanguage::French => Some(Language::French),
            DetectedLanguage::Italian => Some(Language::Italian),
            DetectedLanguage::Unknown => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.known().map_or("unknown", |l| l.as_str())
    }
}

impl From<Language> for DetectedLanguage {
    fn from(l: Language) -> Self {
        match l {
            Language::German => DetectedLanguage::German,
            Language::English => DetectedLanguage::English,
            Language::French => DetectedLanguage::French,
            Language::Italian => DetectedLanguage::Italian,
        }
    }
}

impl fmt::Display for DetectedLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
