//! Progress-callback trait for analysis stage events.
//!
//! Inject an [`Arc<dyn AnalysisProgressCallback>`] via
//! [`crate::config::AnalysisConfigBuilder::progress_callback`] to be told when
//! each stage of the pipeline starts and finishes. The CLI drives its spinner
//! from these events; library callers can forward them to a log, a channel or
//! a web socket without the library knowing how.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf_analyst::{AnalysisConfig, AnalysisProgressCallback};
//! use std::sync::Arc;
//!
//! struct Log;
//!
//! impl AnalysisProgressCallback for Log {
//!     fn on_extraction_complete(&self, text_pages: usize, total_pages: usize, chars: usize) {
//!         eprintln!("{text_pages}/{total_pages} pages had text ({chars} chars)");
//!     }
//! }
//!
//! let config = AnalysisConfig::builder()
//!     .progress_callback(Arc::new(Log) as Arc<dyn AnalysisProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it moves through its stages.
///
/// Implementations must be `Send + Sync`: the web UI shares one config
/// between concurrent requests. All methods default to no-ops.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called once the input resolved to a readable PDF.
    fn on_extraction_start(&self, source: &str) {
        let _ = source;
    }

    /// Called after text extraction.
    ///
    /// # Arguments
    /// * `text_pages`: pages that yielded text
    /// * `total_pages`: pages in the document
    /// * `chars`: characters of joined text
    fn on_extraction_complete(&self, text_pages: usize, total_pages: usize, chars: usize) {
        let _ = (text_pages, total_pages, chars);
    }

    /// Called just before the LLM request is sent.
    ///
    /// # Arguments
    /// * `prompt_chars`: characters in the user message
    fn on_analysis_start(&self, prompt_chars: usize) {
        let _ = prompt_chars;
    }

    /// Called before a retry of a failed LLM call.
    fn on_analysis_retry(&self, attempt: u32, max_retries: u32, error: &str) {
        let _ = (attempt, max_retries, error);
    }

    /// Called when the model answered.
    fn on_analysis_complete(&self, analysis_chars: usize) {
        let _ = analysis_chars;
    }

    /// Called when a `CSV:` section was found but could not be parsed.
    fn on_table_warning(&self, warning: &str) {
        let _ = warning;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AnalysisConfig`].
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;
