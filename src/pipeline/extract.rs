//! Text extraction: pull the text layer out of a PDF.
//!
//! Extraction is pure CPU work on a memory buffer, so both passes here run
//! under `tokio::task::spawn_blocking` to keep the async executor
//! responsive. A panic inside the underlying parser (malformed PDFs can
//! trigger them) is caught by the join handle and surfaced as a
//! [`Pdf2QaError::CorruptPdf`] instead of taking the process down.
//!
//! Extracted text arrives with PDF artefacts — run-together spaces, `\r`,
//! towers of blank lines. [`normalize_whitespace`] flattens those so the
//! chunker sees clean paragraphs separated by exactly one blank line.

use crate::error::Pdf2QaError;
use std::path::Path;
use tracing::{debug, info, warn};

/// Extract and normalise the text layer of the PDF at `path`.
///
/// # Errors
/// - [`Pdf2QaError::CorruptPdf`] when the document cannot be parsed
/// - [`Pdf2QaError::EmptyDocument`] when no usable text comes out
///   (scanned/image-only documents)
pub async fn extract_text(path: &Path) -> Result<String, Pdf2QaError> {
    info!("Extracting text from: {}", path.display());

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| Pdf2QaError::Internal(format!("Failed to read {}: {e}", path.display())))?;

    let owned_path = path.to_path_buf();
    let extracted = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| Pdf2QaError::CorruptPdf {
            path: owned_path.clone(),
            detail: format!("extraction panicked: {e}"),
        })?
        .map_err(|e| Pdf2QaError::CorruptPdf {
            path: owned_path.clone(),
            detail: e.to_string(),
        })?;

    let normalized = normalize_whitespace(&extracted);
    if normalized.is_empty() {
        warn!("Extraction produced no text for {}", owned_path.display());
        return Err(Pdf2QaError::EmptyDocument { path: owned_path });
    }

    debug!(
        chars = normalized.len(),
        paragraphs = paragraph_count(&normalized),
        "Extraction complete"
    );
    Ok(normalized)
}

/// Page count from the PDF structure, without touching the text layer.
pub async fn page_count(path: &Path) -> Result<usize, Pdf2QaError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| Pdf2QaError::Internal(format!("Failed to read {}: {e}", path.display())))?;

    let owned_path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let document = lopdf::Document::load_mem(&bytes).map_err(|e| Pdf2QaError::CorruptPdf {
            path: owned_path.clone(),
            detail: e.to_string(),
        })?;
        Ok(document.get_pages().len())
    })
    .await
    .map_err(|e| Pdf2QaError::Internal(format!("page-count task failed: {e}")))?
}

/// Paragraphs in normalised text (blank-line separated).
pub fn paragraph_count(text: &str) -> usize {
    text.split("\n\n").filter(|p| !p.trim().is_empty()).count()
}

/// Normalise whitespace: strip `\r`, collapse space runs, cap consecutive
/// newlines at a single paragraph break.
pub fn normalize_whitespace(text: &str) -> String {
    let no_cr = text.replace('\r', "");

    let mut normalized = String::with_capacity(no_cr.len());
    let mut prev_char = ' ';
    let mut newline_count = 0;

    for c in no_cr.chars() {
        if c == '\n' {
            newline_count += 1;
        } else {
            if newline_count > 0 {
                if newline_count >= 2 {
                    normalized.push_str("\n\n");
                } else {
                    normalized.push('\n');
                }
                newline_count = 0;
                prev_char = '\n';
            }

            if !(c == ' ' && prev_char == ' ') {
                normalized.push(c);
            }

            prev_char = c;
        }
    }

    normalized.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_spaces_and_newlines() {
        let text =
            "This  has   multiple    spaces.\n\n\n\nAnd many newlines.\r\nAnd a CRLF ending.";
        let expected = "This has multiple spaces.\n\nAnd many newlines.\nAnd a CRLF ending.";
        assert_eq!(normalize_whitespace(text), expected);
    }

    #[test]
    fn normalize_trims_edges() {
        assert_eq!(normalize_whitespace("  \n\n hello \n\n "), "hello");
        assert_eq!(normalize_whitespace("   "), "");
    }

    #[test]
    fn paragraph_count_ignores_blank_paragraphs() {
        assert_eq!(paragraph_count("a\n\nb\n\n\n\nc"), 3);
        assert_eq!(paragraph_count(""), 0);
        assert_eq!(paragraph_count("single paragraph\nwith two lines"), 1);
    }
}
