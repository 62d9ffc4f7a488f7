//! Eager (full-document) generation entry points.
//!
//! ## Why eager vs. streaming?
//!
//! This module provides the simpler API: wait for all chunks, then return.
//! It collects every [`ChunkResult`] into memory and assembles the final
//! pair list before returning. Use [`crate::stream::generate_stream`]
//! instead when you want pairs progressively, e.g. to preview results while
//! a long document is still being processed.

use crate::config::GenerationConfig;
use crate::error::{ChunkError, Pdf2QaError};
use crate::model::{GeminiModel, GeminiSettings, TextModel, DEFAULT_GEMINI_MODEL};
use crate::output::{ChunkResult, DocumentInfo, GenerationOutput, GenerationStats};
use crate::pipeline::{chunk, extract, input, llm, render};
use crate::prompts;
use futures::stream::{self, StreamExt};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Generate Q&A pairs from a PDF file or URL.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `input_str` — Local file path or HTTP/HTTPS URL to a PDF
/// * `config`    — Generation configuration
///
/// # Returns
/// `Ok(GenerationOutput)` on success, even if some chunks failed
/// (check `output.stats.failed_chunks`).
///
/// # Errors
/// Returns `Err(Pdf2QaError)` only for fatal errors:
/// - File not found / permission denied / not a PDF
/// - No extractable text (scanned document)
/// - No API key configured
/// - All chunks failed and no pairs were produced
pub async fn generate(
    input_str: impl AsRef<str>,
    config: &GenerationConfig,
) -> Result<GenerationOutput, Pdf2QaError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Starting generation: {}", input_str);

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let pdf_path = resolved.path().to_path_buf();

    // ── Step 2: Resolve the model ────────────────────────────────────────
    let model = resolve_model(config)?;

    // ── Step 3: Extract text and document info ──────────────────────────
    let extract_start = Instant::now();
    let text = extract::extract_text(&pdf_path).await?;
    let page_count = extract::page_count(&pdf_path).await?;
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;

    let info = DocumentInfo {
        file_name: file_name_of(&pdf_path),
        page_count,
        char_count: text.chars().count(),
        paragraph_count: extract::paragraph_count(&text),
    };
    info!(
        "Extracted {} chars over {} pages in {}ms",
        info.char_count, info.page_count, extract_duration_ms
    );

    // ── Step 4: Chunk ────────────────────────────────────────────────────
    let chunks = chunk::chunk_text(&text, config.chunk_chars);
    debug!("Split into {} chunks", chunks.len());

    if let Some(ref cb) = config.progress_callback {
        cb.on_generation_start(chunks.len());
    }

    // ── Step 5: Process chunks through the model ─────────────────────────
    let llm_start = Instant::now();
    let mut chunk_results = process_concurrent(&model, &chunks, config).await;
    let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

    // Completion order is arbitrary under concurrency; restore text order.
    chunk_results.sort_by_key(|c| c.chunk_index);

    // ── Step 6: Assemble pairs and stats ─────────────────────────────────
    let pairs: Vec<_> = chunk_results
        .iter()
        .flat_map(|c| c.pairs.iter().cloned())
        .collect();

    let processed = chunk_results.iter().filter(|c| c.error.is_none()).count();
    let failed = chunk_results.len() - processed;

    if processed == 0 {
        let all_empty = chunk_results
            .iter()
            .all(|c| matches!(c.error, Some(ChunkError::NoPairs { .. })));
        if all_empty && !chunk_results.is_empty() {
            return Err(Pdf2QaError::NoPairsGenerated {
                chunks: chunk_results.len(),
            });
        }
        let first_error = chunk_results
            .iter()
            .find_map(|c| c.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(Pdf2QaError::AllChunksFailed {
            total: chunk_results.len(),
            retries: config.max_retries,
            first_error,
        });
    }

    let stats = GenerationStats {
        total_chunks: chunk_results.len(),
        processed_chunks: processed,
        failed_chunks: failed,
        total_pairs: pairs.len(),
        total_input_tokens: chunk_results.iter().map(|c| c.input_tokens).sum(),
        total_output_tokens: chunk_results.iter().map(|c| c.output_tokens).sum(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        extract_duration_ms,
        llm_duration_ms,
    };

    info!(
        "Generation complete: {} pairs from {}/{} chunks, {}ms total",
        pairs.len(),
        processed,
        stats.total_chunks,
        stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_generation_complete(stats.total_chunks, pairs.len());
    }

    Ok(GenerationOutput {
        pairs,
        chunks: chunk_results,
        info,
        stats,
    })
}

/// Generate Q&A pairs and render them straight into a PDF file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn generate_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &GenerationConfig,
) -> Result<GenerationStats, Pdf2QaError> {
    let output = generate(input_str, config).await?;
    let title = config
        .title
        .clone()
        .unwrap_or_else(|| prompts::default_title(config.language).to_string());

    render::render_to_file(&output.pairs, &title, output_path.as_ref()).await?;
    Ok(output.stats)
}

/// Synchronous wrapper around [`generate`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync(
    input_str: impl AsRef<str>,
    config: &GenerationConfig,
) -> Result<GenerationOutput, Pdf2QaError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2QaError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate(input_str, config))
}

/// Generate from PDF bytes in memory.
///
/// This avoids the need for the caller to create a temporary file.
/// Internally the library writes `bytes` to a managed [`tempfile`] and cleans
/// it up automatically on return or panic.
pub async fn generate_from_bytes(
    bytes: &[u8],
    config: &GenerationConfig,
) -> Result<GenerationOutput, Pdf2QaError> {
    let mut tmp = tempfile::NamedTempFile::new()
        .map_err(|e| Pdf2QaError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| Pdf2QaError::Internal(format!("tempfile write: {e}")))?;
    let path = tmp.path().to_string_lossy().to_string();
    // `tmp` is dropped (and the file deleted) when `generate` returns
    generate(&path, config).await
}

/// Report document info without calling the model.
///
/// Does not require an API key. A scanned document (no text layer) is
/// reported with `char_count` 0 rather than failing, so `inspect` can be
/// used to decide whether a document is worth generating from.
pub async fn inspect(input_str: impl AsRef<str>) -> Result<DocumentInfo, Pdf2QaError> {
    let resolved = input::resolve_input(input_str.as_ref(), 120).await?;
    let pdf_path = resolved.path().to_path_buf();

    let text = match extract::extract_text(&pdf_path).await {
        Ok(text) => text,
        Err(Pdf2QaError::EmptyDocument { .. }) => String::new(),
        Err(e) => return Err(e),
    };
    let page_count = extract::page_count(&pdf_path).await?;

    Ok(DocumentInfo {
        file_name: file_name_of(&pdf_path),
        page_count,
        char_count: text.chars().count(),
        paragraph_count: extract::paragraph_count(&text),
    })
}

/// Render an existing pair list into a PDF file.
///
/// Exposed so callers can post-process pairs (dedupe, reorder, translate)
/// between generation and rendering.
pub async fn render_qa_pdf(
    pairs: &[crate::output::QaPair],
    config: &GenerationConfig,
    output_path: impl AsRef<Path>,
) -> Result<(), Pdf2QaError> {
    let title = config
        .title
        .clone()
        .unwrap_or_else(|| prompts::default_title(config.language).to_string());
    render::render_to_file(pairs, &title, output_path.as_ref()).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Resolve the text model, from most-specific to least-specific.
///
/// The fallback chain lets library users and CLI users each set exactly as
/// much or as little as they need:
///
/// 1. **Pre-built model** (`config.text_model`) — the caller constructed and
///    configured the model entirely; we use it as-is. Useful in tests or
///    when the caller needs custom middleware (caching, rate-limiting).
///
/// 2. **Config key + model** — `config.api_key` / `config.model` when set.
///
/// 3. **Environment** — `GEMINI_API_KEY` (then `API_KEY`, which the
///    original `.env` convention used) and `GEMINI_MODEL`.
pub(crate) fn resolve_model(
    config: &GenerationConfig,
) -> Result<Arc<dyn TextModel>, Pdf2QaError> {
    if let Some(ref model) = config.text_model {
        return Ok(Arc::clone(model));
    }

    let api_key = config
        .api_key
        .clone()
        .or_else(|| non_empty_env("GEMINI_API_KEY"))
        .or_else(|| non_empty_env("API_KEY"))
        .ok_or_else(|| Pdf2QaError::ApiKeyMissing {
            hint: "Set GEMINI_API_KEY (or API_KEY) in the environment or a .env file,\n\
                   or pass --api-key / GenerationConfig::api_key."
                .to_string(),
        })?;

    let model_id = config
        .model
        .clone()
        .or_else(|| non_empty_env("GEMINI_MODEL"))
        .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());

    let settings = GeminiSettings::new(api_key)
        .with_model(model_id)
        .with_temperature(config.temperature)
        .with_max_output_tokens(config.max_output_tokens)
        .with_timeout_secs(config.api_timeout_secs);

    let model = GeminiModel::new(settings)
        .map_err(|e| Pdf2QaError::Internal(format!("Failed to build Gemini client: {e}")))?;
    Ok(Arc::new(model))
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Process chunks concurrently through the model.
async fn process_concurrent(
    model: &Arc<dyn TextModel>,
    chunks: &[String],
    config: &GenerationConfig,
) -> Vec<ChunkResult> {
    let total_chunks = chunks.len();
    stream::iter(chunks.iter().enumerate().map(|(idx, chunk)| {
        let model = Arc::clone(model);
        let chunk = chunk.clone();
        let config_clone = config.clone();
        async move {
            if let Some(ref cb) = config_clone.progress_callback {
                cb.on_chunk_start(idx, total_chunks);
            }
            let result = llm::process_chunk(&model, idx, &chunk, &config_clone).await;
            if let Some(ref cb) = config_clone.progress_callback {
                match &result.error {
                    None => cb.on_chunk_complete(idx, total_chunks, result.pairs.len()),
                    Some(e) => cb.on_chunk_error(idx, total_chunks, &e.to_string()),
                }
            }
            result
        }
    }))
    .buffer_unordered(config.concurrency)
    .collect()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_of_strips_directories() {
        assert_eq!(file_name_of(Path::new("/tmp/dir/doc.pdf")), "doc.pdf");
        assert_eq!(file_name_of(Path::new("doc.pdf")), "doc.pdf");
    }

    #[test]
    fn resolve_model_prefers_prebuilt() {
        use crate::model::{ModelError, ModelReply};
        use async_trait::async_trait;

        struct Fixed;
        #[async_trait]
        impl TextModel for Fixed {
            async fn generate(&self, _prompt: &str) -> Result<ModelReply, ModelError> {
                unreachable!("never called in this test")
            }
            fn model_id(&self) -> &str {
                "fixed"
            }
        }

        let config = GenerationConfig::builder()
            .text_model(Arc::new(Fixed))
            .build()
            .unwrap();
        let model = resolve_model(&config).unwrap();
        assert_eq!(model.model_id(), "fixed");
    }

    #[test]
    fn resolve_model_uses_config_key() {
        let config = GenerationConfig::builder()
            .api_key("k-123")
            .model("gemini-2.5-flash")
            .build()
            .unwrap();
        let model = resolve_model(&config).unwrap();
        assert_eq!(model.model_id(), "gemini-2.5-flash");
    }
}
