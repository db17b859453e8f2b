//! Error types for the edgequake-pdf-analyst library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`AnalystError`]: **Fatal**: the request cannot produce a report at all
//!   (bad upload, unreadable PDF, no text, provider not configured, API
//!   failure). Returned as `Err(AnalystError)` from the `analyze*` functions
//!   and surfaced to the user, who has to try again.
//!
//! * [`TableError`]: **Non-fatal**: the model announced a `CSV:` section but
//!   it does not parse as comma-separated rows. Stored inside
//!   [`crate::output::TableOutcome::Invalid`] so the analysis text and the
//!   download stay available while the table is replaced by a warning.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf-analyst library.
#[derive(Debug, Error)]
pub enum AnalystError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// No file was uploaded, or the uploaded file is empty.
    #[error("No PDF uploaded (the upload was empty)")]
    EmptyUpload,

    /// The uploaded file does not carry a `.pdf` extension.
    #[error("Unsupported upload '{file_name}': only .pdf files are accepted")]
    UnsupportedUpload { file_name: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Every page came back empty: nothing to send to the model.
    #[error(
        "No extractable text in '{path}' ({pages} pages).\n\
Scanned or image-only PDFs carry no text layer; run them through OCR first."
    )]
    NoExtractableText { path: PathBuf, pages: usize },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API returned an error (after any configured retries).
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    /// The LLM call exceeded the configured per-call timeout.
    #[error("LLM call timed out after {secs}s")]
    ApiTimeout { secs: u64 },

    /// The model answered with an empty message.
    #[error("LLM returned an empty analysis")]
    EmptyResponse,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output report file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AnalystError {
    /// Whether the failure is caused by what the user supplied (as opposed to
    /// the provider or the host). The web UI maps this to a 4xx status.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            AnalystError::FileNotFound { .. }
                | AnalystError::InvalidInput { .. }
                | AnalystError::EmptyUpload
                | AnalystError::UnsupportedUpload { .. }
                | AnalystError::NotAPdf { .. }
                | AnalystError::CorruptPdf { .. }
                | AnalystError::PasswordRequired { .. }
                | AnalystError::WrongPassword { .. }
                | AnalystError::NoExtractableText { .. }
        )
    }
}

/// Why the `CSV:` section of an analysis could not become a table.
///
/// Never fatal: the pipeline turns it into a warning next to the analysis.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum TableError {
    /// Nothing but whitespace follows the marker.
    #[error("no rows after the CSV marker")]
    Empty,

    /// The csv reader rejected the input.
    #[error("malformed CSV: {detail}")]
    Malformed { detail: String },

    /// A data row has more fields than the header row.
    #[error("row {row} has {found} fields, header has {expected}")]
    TooManyFields {
        row: usize,
        expected: usize,
        found: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_text_display_mentions_ocr() {
        let e = AnalystError::NoExtractableText {
            path: PathBuf::from("scan.pdf"),
            pages: 3,
        };
        let msg = e.to_string();
        assert!(msg.contains("scan.pdf"), "got: {msg}");
        assert!(msg.contains("3 pages"), "got: {msg}");
        assert!(msg.contains("OCR"), "got: {msg}");
    }

    #[test]
    fn api_timeout_display() {
        let e = AnalystError::ApiTimeout { secs: 30 };
        assert!(e.to_string().contains("30s"));
    }

    #[test]
    fn unsupported_upload_display() {
        let e = AnalystError::UnsupportedUpload {
            file_name: "notes.docx".into(),
        };
        assert!(e.to_string().contains("notes.docx"));
        assert!(e.to_string().contains(".pdf"));
    }

    #[test]
    fn user_errors_are_classified() {
        assert!(AnalystError::EmptyUpload.is_user_error());
        assert!(AnalystError::NotAPdf {
            path: PathBuf::from("x"),
            magic: *b"PK\x03\x04",
        }
        .is_user_error());
        assert!(!AnalystError::LlmApiError {
            message: "boom".into()
        }
        .is_user_error());
        assert!(!AnalystError::ApiTimeout { secs: 1 }.is_user_error());
    }

    #[test]
    fn table_error_display() {
        let e = TableError::TooManyFields {
            row: 2,
            expected: 2,
            found: 3,
        };
        assert_eq!(e.to_string(), "row 2 has 3 fields, header has 2");
    }
}
