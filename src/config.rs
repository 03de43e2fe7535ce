//! Configuration for note extraction and summaries.
//!
//! Every knob lives in [`DigitizerConfig`], built via
//! [`DigitizerConfigBuilder`]. The credential and the inference backend are
//! injected here and nowhere else: the library never reads the process
//! environment for them, so tests can hand in a fake client without
//! touching global state.

use crate::client::InferenceClient;
use crate::error::NotesError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::sync::Arc;

/// Configuration for a [`crate::Digitizer`].
///
/// # Example
/// ```rust
/// use notescribe::DigitizerConfig;
///
/// let config = DigitizerConfig::builder()
///     .api_key("sk-test")
///     .model("gpt-4o")
///     .concurrency(4)
///     .build()
///     .unwrap();
/// assert_eq!(config.concurrency, Some(4));
/// ```
#[derive(Clone)]
pub struct DigitizerConfig {
    /// Model identifier sent with every request. Default: `gpt-4o`.
    pub model: String,

    /// API key for the OpenAI-compatible backend.
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible backend. Default: OpenAI.
    pub base_url: Option<String>,

    /// `edgequake-llm` provider name (`anthropic`, `gemini`, `ollama`, …).
    /// Takes precedence over `api_key`.
    pub provider_name: Option<String>,

    /// Pre-constructed client. Takes precedence over everything else.
    pub client: Option<Arc<dyn InferenceClient>>,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Transcription wants the model to report what it sees, not to be
    /// creative about it.
    pub temperature: f32,

    /// Output-token bound for transcription and judge calls. Default: 4096.
    pub max_tokens: usize,

    /// Output-token bound for the language-detection call. Default: 64.
    pub detection_max_tokens: usize,

    /// Output-token bound for the summary call. Default: 4096.
    pub summary_max_tokens: usize,

    /// Word budget stated in the summary prompt. Default: 1000.
    pub summary_word_budget: usize,

    /// Maximum images processed at once. `None` starts every image together.
    pub concurrency: Option<usize>,

    /// Retries for extraction-stage calls on transient errors. Default: 0.
    ///
    /// The summary call is never retried.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Request timeout of the HTTP backend in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Receives per-item progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for DigitizerConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            api_key: None,
            base_url: None,
            provider_name: None,
            client: None,
            temperature: 0.1,
            max_tokens: 4096,
            detection_max_tokens: 64,
            summary_max_tokens: 4096,
            summary_word_budget: 1000,
            concurrency: None,
            max_retries: 0,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for DigitizerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigitizerConfig")
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("provider_name", &self.provider_name)
            .field("client", &self.client.as_ref().map(|c| c.name().to_string()))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("detection_max_tokens", &self.detection_max_tokens)
            .field("summary_max_tokens", &self.summary_max_tokens)
            .field("summary_word_budget", &self.summary_word_budget)
            .field("concurrency", &self.concurrency)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl DigitizerConfig {
    pub fn builder() -> DigitizerConfigBuilder {
        DigitizerConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`DigitizerConfig`].
#[derive(Debug)]
pub struct DigitizerConfigBuilder {
    config: DigitizerConfig,
}

impl DigitizerConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn client(mut self, client: Arc<dyn InferenceClient>) -> Self {
        self.config.client = Some(client);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn detection_max_tokens(mut self, n: usize) -> Self {
        self.config.detection_max_tokens = n;
        self
    }

    pub fn summary_max_tokens(mut self, n: usize) -> Self {
        self.config.summary_max_tokens = n;
        self
    }

    pub fn summary_word_budget(mut self, words: usize) -> Self {
        self.config.summary_word_budget = words.max(50);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = Some(n.max(1));
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<DigitizerConfig, NotesError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(NotesError::InvalidConfig("model must not be empty".into()));
        }
        if c.max_tokens == 0 || c.detection_max_tokens == 0 || c.summary_max_tokens == 0 {
            return Err(NotesError::InvalidConfig(
                "token bounds must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(NotesError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}
