//! Error types for the pdf2qa library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdf2QaError`] — **Fatal**: generation cannot proceed at all
//!   (bad input file, no extractable text, no API key). Returned as
//!   `Err(Pdf2QaError)` from the top-level `generate*` functions.
//!
//! * [`ChunkError`] — **Non-fatal**: a single chunk failed (transient API
//!   error, unparseable reply) but all other chunks are fine. Stored inside
//!   [`crate::output::ChunkResult`] so callers can inspect partial success
//!   rather than losing the whole document to one bad chunk.
//!
//! The separation lets callers decide their own tolerance: abort on the first
//! chunk failure, log and continue, or collect all errors for a post-run report.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2qa library.
///
/// Chunk-level failures use [`ChunkError`] and are stored in
/// [`crate::output::ChunkResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Pdf2QaError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{}'\nCheck the path exists and is readable.", path.display())]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{}'\nTry: chmod +r {path:?}", path.display())]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{}'\nFirst bytes: {magic:?}", path.display())]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The PDF structure could not be parsed at all.
    #[error("PDF '{}' could not be parsed: {detail}\nTry repairing with: qpdf input.pdf output.pdf", path.display())]
    CorruptPdf { path: PathBuf, detail: String },

    /// Text extraction produced nothing usable.
    ///
    /// Image-only (scanned) PDFs land here; this tool reads the text layer
    /// and does not OCR.
    #[error("No extractable text in '{}'\nThe document may be scanned or image-only.", path.display())]
    EmptyDocument { path: PathBuf },

    // ── Model errors ──────────────────────────────────────────────────────
    /// No API key could be resolved from config or environment.
    #[error("Gemini API key not configured.\n{hint}")]
    ApiKeyMissing { hint: String },

    /// Every chunk failed after all retries; output would be empty.
    #[error("All {total} chunks failed after {retries} retries each.\nFirst error: {first_error}")]
    AllChunksFailed {
        total: usize,
        retries: u32,
        first_error: String,
    },

    /// Some chunks succeeded but at least one failed.
    ///
    /// Returned by [`crate::output::GenerationOutput::into_result`] when
    /// the caller wants to treat any chunk failure as an error.
    #[error("{failed}/{total} chunks failed during generation")]
    PartialFailure {
        success: usize,
        failed: usize,
        total: usize,
    },

    /// The model answered every chunk but no Q&A pairs could be parsed.
    #[error("The model produced no parseable question/answer pairs across {chunks} chunks")]
    NoPairsGenerated { chunks: usize },

    // ── Render/I/O errors ─────────────────────────────────────────────────
    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{}': {source}", path.display())]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Building the output PDF document failed.
    #[error("Failed to assemble the output PDF: {0}")]
    RenderFailed(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single chunk.
///
/// Stored alongside [`crate::output::ChunkResult`] when a chunk fails.
/// The overall generation continues unless ALL chunks fail.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ChunkError {
    /// Model call failed after retries.
    #[error("Chunk {chunk}: model call failed after {retries} retries: {detail}")]
    ModelFailed {
        chunk: usize,
        retries: u8,
        detail: String,
    },

    /// Model call timed out.
    #[error("Chunk {chunk}: model call timed out after {secs}s")]
    Timeout { chunk: usize, secs: u64 },

    /// The model replied but nothing in the reply parsed as a Q&A pair.
    #[error("Chunk {chunk}: reply contained no question/answer pairs")]
    NoPairs { chunk: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_failure_display() {
        let e = Pdf2QaError::PartialFailure {
            success: 9,
            failed: 1,
            total: 10,
        };
        let msg = e.to_string();
        assert!(msg.contains("1/10"), "got: {msg}");
    }

    #[test]
    fn api_key_missing_display() {
        let e = Pdf2QaError::ApiKeyMissing {
            hint: "Set GEMINI_API_KEY".into(),
        };
        assert!(e.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn all_chunks_failed_display() {
        let e = Pdf2QaError::AllChunksFailed {
            total: 4,
            retries: 3,
            first_error: "HTTP 503".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("4 chunks"));
        assert!(msg.contains("HTTP 503"));
    }

    #[test]
    fn chunk_error_no_pairs_display() {
        let e = ChunkError::NoPairs { chunk: 2 };
        assert!(e.to_string().contains("Chunk 2"));
    }

    #[test]
    fn empty_document_display() {
        let e = Pdf2QaError::EmptyDocument {
            path: PathBuf::from("scan.pdf"),
        };
        assert!(e.to_string().contains("scan.pdf"));
        assert!(e.to_string().contains("image-only"));
    }
}
