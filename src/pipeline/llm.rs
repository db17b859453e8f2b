//! LLM interaction: send the analysis prompt and collect the answer.
//!
//! The pipeline talks to the model through the [`AnalysisClient`] trait so
//! that tests and embedders can swap in their own implementation.
//! [`ProviderClient`] adapts any `edgequake_llm` provider to it.
//! All prompt text lives in [`crate::prompts`].
//!
//! ## Retry Strategy
//!
//! Off by default: a failed call aborts the request and the user retries.
//! With `max_retries > 0` the wait doubles on each attempt
//! (`retry_backoff_ms * 2^(attempt-1)`, at most 60 s), so 500 ms base and
//! 3 retries wait 500 ms → 1 s → 2 s. A configured `api_timeout_secs` bounds each attempt,
//! not the whole sequence.

use crate::config::AnalysisConfig;
use crate::error::AnalystError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Sampling knobs forwarded to the provider. `None` keeps the provider default.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RequestOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
}

impl RequestOptions {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// One model answer.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub content: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// Anything that can turn a system + user message pair into an answer.
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        options: &RequestOptions,
    ) -> Result<Completion, AnalystError>;
}

/// [`AnalysisClient`] backed by an `edgequake_llm` provider.
pub struct ProviderClient {
    provider: Arc<dyn LLMProvider>,
}

impl ProviderClient {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }

    /// Instantiate a named provider (`"openai"`, `"anthropic"`, `"ollama"`, …).
    ///
    /// The provider reads its API key from the usual environment variable.
    pub fn from_name(provider_name: &str, model: &str) -> Result<Self, AnalystError> {
        let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
            AnalystError::ProviderNotConfigured {
                provider: provider_name.to_string(),
                hint: format!("{e}"),
            }
        })?;
        Ok(Self::new(provider))
    }

    /// Pick the first provider whose credentials are present in the environment.
    pub fn from_env() -> Result<Self, AnalystError> {
        let (llm_provider, _embedding) =
            ProviderFactory::from_env().map_err(|e| AnalystError::ProviderNotConfigured {
                provider: "auto".to_string(),
                hint: format!(
                    "No LLM provider could be auto-detected from environment.\n\
                    Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                    Error: {}",
                    e
                ),
            })?;
        Ok(Self::new(llm_provider))
    }
}

#[async_trait]
impl AnalysisClient for ProviderClient {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        options: &RequestOptions,
    ) -> Result<Completion, AnalystError> {
        let messages = vec![ChatMessage::system(system), ChatMessage::user(user)];
        let completion_options = CompletionOptions {
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&completion_options))
            .await
            .map_err(|e| AnalystError::LlmApiError {
                message: e.to_string(),
            })?;

        Ok(Completion {
            content: response.content,
            prompt_tokens: response.prompt_tokens as u64,
            completion_tokens: response.completion_tokens as u64,
        })
    }
}

/// Longest wait between two attempts.
pub const MAX_BACKOFF_MS: u64 = 60_000;

/// Wait before `attempt` (1-based): `base_ms * 2^(attempt-1)`, capped at
/// [`MAX_BACKOFF_MS`].
pub fn backoff_ms(base_ms: u64, attempt: u32) -> u64 {
    2u64.checked_pow(attempt.saturating_sub(1))
        .and_then(|factor| base_ms.checked_mul(factor))
        .map_or(MAX_BACKOFF_MS, |ms| ms.min(MAX_BACKOFF_MS))
}

/// A successful analysis call.
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub completion: Completion,
    /// Attempts beyond the first.
    pub retries: u32,
    pub duration_ms: u64,
}

/// Send the prompt, honouring the configured timeout and retry budget.
///
/// An answer that is empty after trimming counts as a failed attempt.
/// When every attempt fails, the last error is returned.
pub async fn request_analysis(
    client: &dyn AnalysisClient,
    system: &str,
    user: &str,
    config: &AnalysisConfig,
) -> Result<AnalysisRun, AnalystError> {
    let start = Instant::now();
    let options = RequestOptions::from_config(config);
    let mut last_err = AnalystError::EmptyResponse;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = backoff_ms(config.retry_backoff_ms, attempt);
            warn!(
                "LLM retry {}/{} after {}ms",
                attempt, config.max_retries, backoff
            );
            if let Some(ref cb) = config.progress_callback {
                cb.on_analysis_retry(attempt, config.max_retries, &last_err.to_string());
            }
            sleep(Duration::from_millis(backoff)).await;
        }

        let call = client.complete(system, user, &options);
        let result = match config.api_timeout_secs {
            Some(secs) => match timeout(Duration::from_secs(secs), call).await {
                Ok(inner) => inner,
                Err(_) => Err(AnalystError::ApiTimeout { secs }),
            },
            None => call.await,
        };

        match result {
            Ok(completion) if completion.content.trim().is_empty() => {
                warn!("LLM attempt {} returned an empty answer", attempt + 1);
                last_err = AnalystError::EmptyResponse;
            }
            Ok(completion) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                debug!(
                    "LLM answered: {} input tokens, {} output tokens, {}ms",
                    completion.prompt_tokens, completion.completion_tokens, duration_ms
                );
                return Ok(AnalysisRun {
                    completion,
                    retries: attempt,
                    duration_ms,
                });
            }
            Err(e) => {
                warn!("LLM attempt {} failed: {}", attempt + 1, e);
                last_err = e;
            }
        }
    }

    Err(last_err)
}
