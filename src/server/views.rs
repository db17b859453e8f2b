//! askama templates for the upload, result and error pages.

use crate::output::{AnalysisReport, TableOutcome};
use askama::Template;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// `data:` URI whose payload is exactly `bytes`.
pub fn download_href(bytes: &[u8]) -> String {
    format!("data:text/plain;base64,{}", STANDARD.encode(bytes))
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexPage {
    pub version: &'static str,
}

impl Default for IndexPage {
    fn default() -> Self {
        Self { version: VERSION }
    }
}

#[derive(Template)]
#[template(path = "result.html")]
pub struct ResultPage {
    pub version: &'static str,
    pub file_name: String,
    pub preview: String,
    pub analysis: String,
    pub download_href: String,
    pub download_name: &'static str,
    pub has_table: bool,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Empty when there is nothing to warn about.
    pub warning: String,
    pub text_pages: usize,
    pub total_pages: usize,
    pub prompt_chars: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_duration_ms: u64,
}

impl From<&AnalysisReport> for ResultPage {
    fn from(report: &AnalysisReport) -> Self {
        let (has_table, headers, rows) = match &report.table {
            TableOutcome::Parsed { table } => (true, table.headers.clone(), table.rows.clone()),
            _ => (false, Vec::new(), Vec::new()),
        };
        Self {
            version: VERSION,
            file_name: report.source.clone(),
            preview: report.preview.clone(),
            analysis: report.analysis.clone(),
            download_href: download_href(report.download_bytes()),
            download_name: report.download_file_name(),
            has_table,
            headers,
            rows,
            warning: report.table.warning().unwrap_or_default().to_string(),
            text_pages: report.stats.text_pages,
            total_pages: report.stats.total_pages,
            prompt_chars: report.stats.prompt_chars,
            input_tokens: report.stats.input_tokens,
            output_tokens: report.stats.output_tokens,
            total_duration_ms: report.stats.total_duration_ms,
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorPage {
    pub version: &'static str,
    pub code: String,
    pub message: String,
}

impl ErrorPage {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            version: VERSION,
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}
