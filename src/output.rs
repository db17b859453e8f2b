//! Output types produced by the analysis pipeline.
//!
//! Everything here is plain data with `Serialize`/`Deserialize`, so the same
//! [`AnalysisReport`] feeds the terminal, the `--json` flag and the web UI.

use crate::error::TableError;
use serde::{Deserialize, Serialize};

/// File name offered for the downloadable analysis.
pub const DOWNLOAD_FILE_NAME: &str = "analysis.txt";

/// Warning shown in place of the table when the `CSV:` section is unusable.
pub const TABLE_WARNING: &str = "Table parsing error or no valid CSV detected.";

/// Document-level information read from the PDF trailer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
    pub is_encrypted: bool,
}

/// Text of a single page. `text` is `None` for pages without a text layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    /// 1-indexed page number.
    pub page_num: usize,
    pub text: Option<String>,
}

/// Result of the extraction stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDocument {
    /// Non-empty page texts joined with `\n`, in page order.
    pub text: String,
    pub pages: Vec<PageText>,
    pub metadata: DocumentMetadata,
}

impl ExtractedDocument {
    /// Number of pages that contributed text.
    pub fn text_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.text.is_some()).count()
    }
}

/// Table parsed from the `CSV:` section of an analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedTable {
    pub headers: Vec<String>,
    /// Data rows; each row has exactly `headers.len()` cells.
    pub rows: Vec<Vec<String>>,
}

/// What became of the optional table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableOutcome {
    /// The analysis has no `CSV:` marker; the parser was never run.
    Absent,
    /// The section after the marker parsed into a table.
    Parsed { table: ExtractedTable },
    /// The section after the marker did not parse.
    Invalid { error: TableError, warning: String },
}

impl TableOutcome {
    pub fn table(&self) -> Option<&ExtractedTable> {
        match self {
            TableOutcome::Parsed { table } => Some(table),
            _ => None,
        }
    }

    pub fn warning(&self) -> Option<&str> {
        match self {
            TableOutcome::Invalid { warning, .. } => Some(warning),
            _ => None,
        }
    }
}

/// Timing and token counts for one analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisStats {
    pub total_pages: usize,
    /// Pages that yielded text.
    pub text_pages: usize,
    /// Characters of extracted text.
    pub extracted_chars: usize,
    /// Characters of extracted text that went into the prompt.
    pub prompt_chars: usize,
    /// Whether the document text was cut to fit the prompt.
    pub prompt_truncated: bool,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// LLM attempts beyond the first.
    pub retries: u32,
    pub extraction_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a finished analysis shows the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// File name or path the report was produced from.
    pub source: String,
    /// Full extracted text.
    pub extracted_text: String,
    /// Truncated extracted text for display.
    pub preview: String,
    /// The model's answer, verbatim.
    pub analysis: String,
    pub table: TableOutcome,
    pub metadata: DocumentMetadata,
    pub stats: AnalysisStats,
}

impl AnalysisReport {
    /// Bytes of the downloadable report: the analysis text, unchanged.
    pub fn download_bytes(&self) -> &[u8] {
        self.analysis.as_bytes()
    }

    /// Suggested file name for the download.
    pub fn download_file_name(&self) -> &'static str {
        DOWNLOAD_FILE_NAME
    }
}
