//! Streaming generation API: emit chunk results as they complete.
//!
//! ## Why stream?
//!
//! Large documents take minutes. A streams-based API lets callers display
//! partial results immediately, wire up progress bars, or persist pairs
//! incrementally instead of buffering the entire run in memory.
//!
//! Unlike the eager [`crate::generate::generate`] which returns only after
//! all chunks finish, [`generate_stream`] yields `ChunkResult` items via a
//! `Stream` as each chunk completes. Results arrive in completion order
//! (sort by `chunk_index` if text order matters).

use crate::config::GenerationConfig;
use crate::error::{ChunkError, Pdf2QaError};
use crate::generate::resolve_model;
use crate::output::ChunkResult;
use crate::pipeline::{chunk, extract, input, llm};
use futures::stream::{self, StreamExt};
use std::io::Write;
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of chunk results.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChunkResult, ChunkError>> + Send>>;

/// Generate Q&A pairs from a PDF, streaming chunk results as they are ready.
///
/// # Returns
/// - `Ok(ChunkStream)` — a stream of `Result<ChunkResult, ChunkError>`
/// - `Err(Pdf2QaError)` — fatal error (file not found, not a PDF, no API
///   key, no extractable text)
pub async fn generate_stream(
    input_str: impl AsRef<str>,
    config: &GenerationConfig,
) -> Result<ChunkStream, Pdf2QaError> {
    let input_str = input_str.as_ref();
    info!("Starting streaming generation: {}", input_str);

    // ── Resolve input and model ──────────────────────────────────────────
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let pdf_path = resolved.path().to_path_buf();
    let model = resolve_model(config)?;

    // ── Extract and chunk up front; only model calls are streamed ────────
    let text = extract::extract_text(&pdf_path).await?;
    let chunks = chunk::chunk_text(&text, config.chunk_chars);

    let concurrency = config.concurrency;
    let config_clone = config.clone();

    let s = stream::iter(chunks.into_iter().enumerate().map(move |(idx, chunk)| {
        let model = Arc::clone(&model);
        let cfg = config_clone.clone();
        async move {
            let mut result = llm::process_chunk(&model, idx, &chunk, &cfg).await;
            match result.error.take() {
                None => Ok(result),
                Some(err) => Err(err),
            }
        }
    }))
    .buffer_unordered(concurrency);

    Ok(Box::pin(s))
}

/// Generate from PDF bytes in memory, streaming chunk results.
///
/// This is the streaming equivalent of [`crate::generate::generate_from_bytes`].
/// The PDF bytes are written to a temporary file internally; extraction and
/// chunking are fully materialised before this function returns, so the
/// temp file can be removed immediately.
pub async fn generate_stream_from_bytes(
    bytes: &[u8],
    config: &GenerationConfig,
) -> Result<ChunkStream, Pdf2QaError> {
    let mut tmp = tempfile::NamedTempFile::new()
        .map_err(|e| Pdf2QaError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| Pdf2QaError::Internal(format!("tempfile write: {e}")))?;
    let path = tmp.path().to_string_lossy().to_string();
    let stream = generate_stream(&path, config).await?;
    drop(tmp);
    Ok(stream)
}
