//! Configuration types for PDF analysis.
//!
//! All analysis behaviour is controlled through [`AnalysisConfig`], built via
//! its [`AnalysisConfigBuilder`]. The CLI, the web UI and library callers all
//! funnel into the same struct, so a report produced by `pdf-analyst analyze`
//! and one produced by the upload page are configured identically.

use crate::error::AnalystError;
use crate::pipeline::llm::AnalysisClient;
use crate::progress::ProgressCallback;
use std::fmt;
use std::sync::Arc;

/// Number of characters of extracted text interpolated into the prompt.
pub const DEFAULT_MAX_PROMPT_CHARS: usize = 12_000;

/// Number of characters of extracted text shown in the raw-text preview.
pub const DEFAULT_PREVIEW_CHARS: usize = 5_000;

/// Model used when neither the caller nor the environment names one.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Configuration for a single PDF analysis.
///
/// Built via [`AnalysisConfig::builder()`] or using
/// [`AnalysisConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdf_analyst::AnalysisConfig;
///
/// let config = AnalysisConfig::builder()
///     .model("gpt-4o-mini")
///     .max_prompt_chars(8_000)
///     .build()
///     .unwrap();
/// assert_eq!(config.preview_chars, 5_000);
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// LLM model identifier, e.g. "gpt-4o", "claude-sonnet-4-20250514".
    /// If None, uses [`DEFAULT_MODEL`] or `EDGEQUAKE_MODEL`.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `client`, the provider is auto-detected.
    pub provider_name: Option<String>,

    /// Pre-constructed analysis client. Takes precedence over `provider_name`.
    pub client: Option<Arc<dyn AnalysisClient>>,

    /// Sampling temperature. `None` leaves the provider default in place.
    pub temperature: Option<f32>,

    /// Maximum tokens the model may generate. `None` leaves the provider default.
    pub max_tokens: Option<usize>,

    /// Characters of extracted text sent to the model. Default: 12 000.
    ///
    /// Counted in Unicode scalar values, never bytes, so multi-byte scripts
    /// are never split inside a character.
    pub max_prompt_chars: usize,

    /// Characters of extracted text shown in the preview. Default: 5 000.
    pub preview_chars: usize,

    /// Custom system prompt. If None, uses [`crate::prompts::DEFAULT_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// Custom analysis instructions placed before the document text.
    /// If None, uses [`crate::prompts::ANALYSIS_INSTRUCTIONS`].
    pub instructions: Option<String>,

    /// Retry attempts after a failed LLM call. Default: 0 (a failure aborts
    /// the request and the user retries by hand).
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled on each attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call LLM timeout in seconds. Default: None (client default).
    pub api_timeout_secs: Option<u64>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Send the prompt even when no page yielded text. Default: false.
    pub allow_empty_text: bool,

    /// Stage progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            client: None,
            temperature: None,
            max_tokens: None,
            max_prompt_chars: DEFAULT_MAX_PROMPT_CHARS,
            preview_chars: DEFAULT_PREVIEW_CHARS,
            system_prompt: None,
            instructions: None,
            max_retries: 0,
            retry_backoff_ms: 500,
            api_timeout_secs: None,
            download_timeout_secs: 120,
            password: None,
            allow_empty_text: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("client", &self.client.as_ref().map(|_| "<dyn AnalysisClient>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_prompt_chars", &self.max_prompt_chars)
            .field("preview_chars", &self.preview_chars)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("allow_empty_text", &self.allow_empty_text)
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }

    /// The model that will be requested when the provider is resolved by name.
    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Builder for [`AnalysisConfig`].
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl fmt::Debug for AnalysisConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl AnalysisConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn client(mut self, client: Arc<dyn AnalysisClient>) -> Self {
        self.config.client = Some(client);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = Some(n);
        self
    }

    pub fn max_prompt_chars(mut self, n: usize) -> Self {
        self.config.max_prompt_chars = n;
        self
    }

    pub fn preview_chars(mut self, n: usize) -> Self {
        self.config.preview_chars = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.config.instructions = Some(instructions.into());
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
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn allow_empty_text(mut self, v: bool) -> Self {
        self.config.allow_empty_text = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, AnalystError> {
        let c = &self.config;
        if c.max_prompt_chars == 0 {
            return Err(AnalystError::InvalidConfig(
                "max_prompt_chars must be ≥ 1".into(),
            ));
        }
        if c.preview_chars == 0 {
            return Err(AnalystError::InvalidConfig(
                "preview_chars must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == Some(0) {
            return Err(AnalystError::InvalidConfig(
                "api_timeout_secs must be ≥ 1 when set".into(),
            ));
        }
        if c.max_tokens == Some(0) {
            return Err(AnalystError::InvalidConfig(
                "max_tokens must be ≥ 1 when set".into(),
            ));
        }
        Ok(self.config)
    }
}
