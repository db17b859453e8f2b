//! # edgequake-pdf-analyst
//!
//! Upload a PDF, get back an LLM-written analysis: a short summary, key
//! topics, sentiment and tone, action points and, when the document holds
//! tabular data, a table.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    resolve local file, URL download or in-memory upload
//!  ├─ 2. Extract  text layer of every page via lopdf (spawn_blocking)
//!  ├─ 3. Prompt   fixed instructions + first 12 000 chars of text
//!  ├─ 4. LLM      one chat call to gpt-4o / claude / gemini / …
//!  ├─ 5. Table    parse the rows after the `CSV:` marker, if any
//!  └─ 6. Report   preview (5 000 chars), analysis, table, download
//! ```
//!
//! Only step 5 is allowed to fail softly: an unparseable `CSV:` section turns
//! into a warning while the analysis and its download stay available. Every
//! other failure is returned as an [`AnalystError`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf_analyst::{analyze, AnalysisConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = AnalysisConfig::default();
//!     let report = analyze("report.pdf", &config).await?;
//!     println!("{}", report.analysis);
//!     if let Some(table) = report.table.table() {
//!         eprintln!("table: {} columns, {} rows", table.headers.len(), table.rows.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | Single-page web UI (axum + askama) |
//! | `cli`    | on      | Enables the `pdf-analyst` binary (clap + anyhow + tracing-subscriber); implies `server` |
//!
//! Disable both when using only the library:
//! ```toml
//! edgequake-pdf-analyst = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod report;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{
    analyze, analyze_bytes, analyze_sync, analyze_to_file, extract_text, inspect, resolve_client,
};
pub use config::{AnalysisConfig, AnalysisConfigBuilder};
pub use error::{AnalystError, TableError};
pub use output::{
    AnalysisReport, AnalysisStats, DocumentMetadata, ExtractedDocument, ExtractedTable, PageText,
    TableOutcome, DOWNLOAD_FILE_NAME, TABLE_WARNING,
};
pub use pipeline::llm::{AnalysisClient, Completion, ProviderClient, RequestOptions};
pub use progress::{AnalysisProgressCallback, NoopProgressCallback, ProgressCallback};
