//! Text extraction: read the text layer of every page with lopdf.
//!
//! lopdf parsing is synchronous and CPU-bound, so the public entry point
//! moves the work onto tokio's blocking pool. Pages are visited in ascending
//! page order; a page with no text layer (a scan) or whose content stream
//! fails to decode contributes nothing to the joined text.

use crate::error::AnalystError;
use crate::output::{DocumentMetadata, ExtractedDocument, PageText};
use lopdf::encryption::DecryptionError;
use lopdf::{Dictionary, Document, Object};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Separator between the texts of consecutive non-empty pages.
pub const PAGE_JOINER: &str = "\n";

/// Extract the text of every page and the document metadata.
///
/// Does not fail on empty documents; the caller decides whether an empty
/// text is fatal.
pub async fn extract_document(
    path: &Path,
    password: Option<&str>,
) -> Result<ExtractedDocument, AnalystError> {
    let path = path.to_path_buf();
    let password = password.map(str::to_owned);

    tokio::task::spawn_blocking(move || extract_blocking(&path, password.as_deref()))
        .await
        .map_err(|e| AnalystError::Internal(format!("extraction task panicked: {e}")))?
}

/// Read only the metadata. No page content is decoded.
pub async fn extract_metadata(
    path: &Path,
    password: Option<&str>,
) -> Result<DocumentMetadata, AnalystError> {
    let path = path.to_path_buf();
    let password = password.map(str::to_owned);

    tokio::task::spawn_blocking(move || {
        let (doc, was_encrypted) = load_document(&path, password.as_deref())?;
        Ok(read_metadata(&doc, was_encrypted))
    })
    .await
    .map_err(|e| AnalystError::Internal(format!("metadata task panicked: {e}")))?
}

/// Concatenate the non-empty page texts in page order.
pub fn join_pages(pages: &[PageText]) -> String {
    pages
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect::<Vec<_>>()
        .join(PAGE_JOINER)
}

fn extract_blocking(path: &Path, password: Option<&str>) -> Result<ExtractedDocument, AnalystError> {
    let (doc, was_encrypted) = load_document(path, password)?;
    let metadata = read_metadata(&doc, was_encrypted);

    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    let mut pages = Vec::with_capacity(page_numbers.len());

    for page_number in page_numbers {
        let text = match doc.extract_text(&[page_number]) {
            Ok(raw) => {
                // Whitespace-only pages count as empty and trailing whitespace is trimmed.
                let trimmed = raw.trim_end();
                if trimmed.trim_start().is_empty() {
                    debug!("Page {}: no text layer", page_number);
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Err(e) => {
                warn!("Page {}: text extraction failed: {}", page_number, e);
                None
            }
        };
        pages.push(PageText {
            page_num: page_number as usize,
            text,
        });
    }

    let text = join_pages(&pages);
    let text_pages = pages.iter().filter(|p| p.text.is_some()).count();
    info!(
        "Extracted {} chars from {}/{} pages",
        text.chars().count(),
        text_pages,
        pages.len()
    );

    Ok(ExtractedDocument {
        text,
        pages,
        metadata,
    })
}

/// Parse the file and decrypt it when needed.
///
/// Returns the document and whether it was encrypted on disk.
fn load_document(path: &Path, password: Option<&str>) -> Result<(Document, bool), AnalystError> {
    let mut doc = Document::load(path).map_err(|e| corrupt(path, e))?;

    let encrypted = doc.is_encrypted();
    if encrypted {
        // Many encrypted PDFs only carry an owner password; try the empty user password.
        let attempt = password.unwrap_or("");
        match doc.decrypt(attempt) {
            Ok(()) => debug!("Decrypted {}", path.display()),
            Err(lopdf::Error::Decryption(DecryptionError::IncorrectPassword)) => {
                return Err(match password {
                    Some(_) => AnalystError::WrongPassword {
                        path: path.to_path_buf(),
                    },
                    None => AnalystError::PasswordRequired {
                        path: path.to_path_buf(),
                    },
                });
            }
            Err(e) => return Err(corrupt(path, e)),
        }
    }

    Ok((doc, encrypted))
}

fn corrupt(path: &Path, e: lopdf::Error) -> AnalystError {
    AnalystError::CorruptPdf {
        path: PathBuf::from(path),
        detail: e.to_string(),
    }
}

fn read_metadata(doc: &Document, was_encrypted: bool) -> DocumentMetadata {
    let info: Option<&Dictionary> = match doc.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => doc.get_dictionary(*id).ok(),
        Ok(Object::Dictionary(dict)) => Some(dict),
        _ => None,
    };

    let field = |key: &[u8]| -> Option<String> {
        let bytes = info?.get(key).ok()?.as_str().ok()?;
        let value = decode_pdf_string(bytes);
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    };

    DocumentMetadata {
        title: field(b"Title"),
        author: field(b"Author"),
        subject: field(b"Subject"),
        creator: field(b"Creator"),
        producer: field(b"Producer"),
        page_count: doc.get_pages().len(),
        pdf_version: doc.version.clone(),
        is_encrypted: was_encrypted,
    }
}

/// Decode a PDF text string: UTF-16BE when it carries a BOM, else byte-per-char.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }
    bytes.iter().map(|&b| b as char).collect()
}
