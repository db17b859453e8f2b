//! Display and download artefacts derived from a finished analysis.

use crate::error::AnalystError;
use std::path::Path;

/// Characters of extracted text shown before the preview is cut.
pub const PREVIEW_CHARS: usize = 5_000;

/// Suffix appended to a preview that was cut.
pub const ELLIPSIS: &str = "...";

/// First `limit` characters of `text`, followed by `...` only when the text
/// is longer than `limit`.
pub fn preview(text: &str, limit: usize) -> String {
    let (head, truncated) = crate::prompts::truncate_chars(text, limit);
    if truncated {
        format!("{head}{ELLIPSIS}")
    } else {
        head.to_string()
    }
}

/// Write `analysis` to `path` without ever leaving a partial file behind.
///
/// Uses atomic write (temp file + rename).
pub async fn write_report(path: &Path, analysis: &str) -> Result<(), AnalystError> {
    let write_err = |e: std::io::Error| AnalystError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, analysis.as_bytes())
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}
