//! Input resolution: turn a path, URL or uploaded buffer into a local PDF file.
//!
//! Uploads and downloads are written into a `TempDir` that lives inside
//! [`ResolvedInput`]; the file disappears when the value is dropped, even if
//! the request fails halfway. Every variant is checked for the `%PDF` magic
//! bytes before it reaches the parser.

use crate::error::AnalystError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// The resolved input: a local path, a downloaded file or an upload.
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; PDF downloaded to a temp directory.
    /// The `TempDir` is kept alive to prevent cleanup until processing completes.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
    /// Input was an in-memory upload, spilled to a temp directory.
    Uploaded {
        path: PathBuf,
        file_name: String,
        _temp_dir: TempDir,
    },
}

impl ResolvedInput {
    /// Get the path to the PDF file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
            ResolvedInput::Uploaded { path, .. } => path,
        }
    }

    /// Human-facing name of the input, used in reports and logs.
    pub fn display_name(&self) -> String {
        match self {
            ResolvedInput::Uploaded { file_name, .. } => file_name.clone(),
            other => other.path().display().to_string(),
        }
    }

    /// Store an uploaded buffer in a managed temp directory.
    ///
    /// The name must end in `.pdf` and the bytes must start with `%PDF`.
    pub fn from_bytes(bytes: &[u8], file_name: &str) -> Result<Self, AnalystError> {
        check_upload_name(file_name)?;
        if bytes.is_empty() {
            return Err(AnalystError::EmptyUpload);
        }

        // Only the final path component is trusted; browsers may send full paths.
        let safe_name = Path::new(file_name)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "upload.pdf".to_string());

        let temp_dir = TempDir::new().map_err(|e| AnalystError::Internal(e.to_string()))?;
        let path = temp_dir.path().join(&safe_name);

        check_magic(&path, bytes)?;

        std::fs::write(&path, bytes)
            .map_err(|e| AnalystError::Internal(format!("Failed to write temp file: {}", e)))?;

        debug!("Stored upload '{}' ({} bytes)", safe_name, bytes.len());
        Ok(ResolvedInput::Uploaded {
            path,
            file_name: safe_name,
            _temp_dir: temp_dir,
        })
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Accept only file names with a `.pdf` extension (any case).
pub fn check_upload_name(file_name: &str) -> Result<(), AnalystError> {
    let is_pdf = Path::new(file_name.trim())
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    if is_pdf {
        Ok(())
    } else {
        Err(AnalystError::UnsupportedUpload {
            file_name: file_name.to_string(),
        })
    }
}

/// Resolve the input string to a local PDF file path.
///
/// If the input is a URL, download it to a temporary directory.
/// If the input is a local file, validate it exists and is readable.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, AnalystError> {
    if input.trim().is_empty() {
        return Err(AnalystError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

/// Resolve a local file path, validating existence and PDF magic bytes.
fn resolve_local(path_str: &str) -> Result<ResolvedInput, AnalystError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(AnalystError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            use std::io::Read;
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_err() || &magic != PDF_MAGIC {
                return Err(AnalystError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(AnalystError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(AnalystError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// Reject buffers that do not start with `%PDF`.
fn check_magic(path: &Path, bytes: &[u8]) -> Result<(), AnalystError> {
    if bytes.len() >= 4 && &bytes[..4] == PDF_MAGIC {
        return Ok(());
    }
    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    Err(AnalystError::NotAPdf {
        path: path.to_path_buf(),
        magic,
    })
}

/// Download a URL to a temporary directory and return the path.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, AnalystError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AnalystError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            AnalystError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            AnalystError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(AnalystError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let filename = filename_from_url(url);

    let temp_dir = TempDir::new().map_err(|e| AnalystError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(&filename);

    let bytes = response
        .bytes()
        .await
        .map_err(|e| AnalystError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    check_magic(&file_path, &bytes)?;

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| AnalystError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded to: {}", file_path.display());

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Last path segment of the URL when it looks like a file name.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn upload_name_must_be_pdf() {
        assert!(check_upload_name("report.pdf").is_ok());
        assert!(check_upload_name("REPORT.PDF").is_ok());
        assert!(matches!(
            check_upload_name("report.docx"),
            Err(AnalystError::UnsupportedUpload { .. })
        ));
        assert!(check_upload_name("pdf").is_err());
        assert!(check_upload_name("").is_err());
    }

    #[test]
    fn filename_from_url_uses_last_segment() {
        assert_eq!(filename_from_url("https://x.org/a/b/paper.pdf"), "paper.pdf");
        assert_eq!(filename_from_url("https://arxiv.org/pdf/1706"), "downloaded.pdf");
    }

    #[test]
    fn from_bytes_rejects_empty_and_non_pdf() {
        assert!(matches!(
            ResolvedInput::from_bytes(b"", "a.pdf"),
            Err(AnalystError::EmptyUpload)
        ));
        match ResolvedInput::from_bytes(b"PK\x03\x04rest", "a.pdf") {
            Err(AnalystError::NotAPdf { magic, .. }) => assert_eq!(&magic, b"PK\x03\x04"),
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("zip bytes must be rejected"),
        }
    }

    #[test]
    fn from_bytes_keeps_file_alive_until_drop() {
        let resolved = ResolvedInput::from_bytes(b"%PDF-1.7\n%%EOF", "../../etc/doc.pdf").unwrap();
        let path = resolved.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(resolved.display_name(), "doc.pdf");
        drop(resolved);
        assert!(!path.exists());
    }

    #[test]
    fn local_non_pdf_is_rejected() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"hello world").unwrap();
        let err = resolve_local(tmp.path().to_str().unwrap()).err().unwrap();
        assert!(matches!(err, AnalystError::NotAPdf { .. }));
    }

    #[tokio::test]
    async fn missing_local_file_is_not_found() {
        let err = resolve_input("/definitely/not/here.pdf", 5).await.err().unwrap();
        assert!(matches!(err, AnalystError::FileNotFound { .. }));
    }
}
