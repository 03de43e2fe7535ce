//! Image encoding: photo bytes → inline `data:` URL.
//!
//! Vision APIs accept images as base64 data URLs embedded in the JSON
//! request body. The photo is sent as-is (no re-encoding) so handwriting
//! keeps every pixel the camera captured; only the mime type is sniffed
//! from the magic bytes.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

/// Mime type assumed when the payload does not say otherwise.
pub const DEFAULT_MIME: &str = "image/jpeg";

/// Where an image's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// A file on disk, read when the image is encoded.
    Path(PathBuf),
    /// Raw bytes already in memory.
    Bytes(Vec<u8>),
    /// A pre-encoded string: a full `data:` URL or bare base64.
    Encoded(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("could not read '{path}': {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("image payload is empty")]
    Empty,

    #[error("invalid data URL: {0}")]
    InvalidDataUrl(String),
}

/// An inline `data:<mime>;base64,<payload>` image.
#[derive(Clone, PartialEq, Eq)]
pub struct DataUrl {
    mime_type: String,
    data: String,
}

impl DataUrl {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Parse a full `data:` URL. Only base64 payloads are accepted.
    pub fn parse(url: &str) -> Result<Self, EncodingError> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| EncodingError::InvalidDataUrl("missing 'data:' scheme".into()))?;
        let (header, data) = rest
            .split_once(',')
            .ok_or_else(|| EncodingError::InvalidDataUrl("missing ',' separator".into()))?;
        let mime = header
            .strip_suffix(";base64")
            .ok_or_else(|| EncodingError::InvalidDataUrl("payload is not base64".into()))?;
        if data.is_empty() {
            return Err(EncodingError::Empty);
        }
        let mime = if mime.is_empty() { DEFAULT_MIME } else { mime };
        Ok(Self::new(mime, data))
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// The base64 payload without the header.
    pub fn data(&self) -> &str {
        &self.data
    }
}

impl fmt::Display for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime_type, self.data)
    }
}

// Payloads are megabytes of base64; keep them out of logs.
impl fmt::Debug for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataUrl")
            .field("mime_type", &self.mime_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Sniff the mime type from magic bytes, falling back to [`DEFAULT_MIME`].
fn sniff_mime(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .map(|f| f.to_mime_type())
        .unwrap_or(DEFAULT_MIME)
}

/// Encode raw image bytes.
pub fn encode_bytes(bytes: &[u8]) -> Result<DataUrl, EncodingError> {
    if bytes.is_empty() {
        return Err(EncodingError::Empty);
    }
    let mime = sniff_mime(bytes);
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded {} image → {} bytes base64", mime, b64.len());
    Ok(DataUrl::new(mime, b64))
}

/// Normalise a pre-encoded string.
///
/// Strings without the `data:` marker are taken as bare base64 and given
/// the default image marker.
pub fn encode_string(encoded: &str) -> Result<DataUrl, EncodingError> {
    let trimmed = encoded.trim();
    if trimmed.is_empty() {
        return Err(EncodingError::Empty);
    }
    if trimmed.starts_with("data:") {
        DataUrl::parse(trimmed)
    } else {
        Ok(DataUrl::new(DEFAULT_MIME, trimmed))
    }
}

/// Turn an image source into a data URL. Single attempt; reading a path is
/// the only suspension point.
pub async fn encode(source: &ImageSource) -> Result<DataUrl, EncodingError> {
    match source {
        ImageSource::Path(path) => {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| EncodingError::Read {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            encode_bytes(&bytes)
        }
        ImageSource::Bytes(bytes) => encode_bytes(bytes),
        ImageSource::Encoded(s) => encode_string(s),
    }
}
