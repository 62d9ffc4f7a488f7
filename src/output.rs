//! Output types: generated pairs, per-chunk results, and run statistics.
//!
//! [`GenerationOutput`] is deliberately "everything we know": the flat list
//! of pairs most callers want, the per-chunk results for anyone inspecting
//! partial failures or token spend, and the document info the extraction
//! pass collected along the way. All types serialise so the CLI's `--json`
//! mode is a plain `serde_json::to_string_pretty` away.

use crate::error::{ChunkError, Pdf2QaError};
use serde::{Deserialize, Serialize};

/// One generated question with its answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    /// The question text, without its numbering prefix.
    pub question: String,
    /// The answer text. May be empty when the model trailed off.
    pub answer: String,
}

impl QaPair {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Result of processing a single text chunk.
///
/// Always produced, even on failure — `error` is `Some` and `pairs` is empty
/// when the chunk failed, so one bad chunk never aborts the whole document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkResult {
    /// 0-indexed position of the chunk in the extracted text.
    pub chunk_index: usize,
    /// Pairs parsed from the model's reply for this chunk.
    pub pairs: Vec<QaPair>,
    /// Prompt tokens reported by the API (0 if unavailable).
    pub input_tokens: u64,
    /// Completion tokens reported by the API (0 if unavailable).
    pub output_tokens: u64,
    /// Wall-clock duration of the model call including retries.
    pub duration_ms: u64,
    /// How many retries were needed (0 = first attempt succeeded).
    pub retries: u8,
    /// Set when the chunk failed after all retries.
    pub error: Option<ChunkError>,
}

/// Summary statistics for a generation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Chunks the text was split into.
    pub total_chunks: usize,
    /// Chunks that produced at least a reply.
    pub processed_chunks: usize,
    /// Chunks that failed after all retries.
    pub failed_chunks: usize,
    /// Total Q&A pairs generated.
    pub total_pairs: usize,
    /// Sum of prompt tokens across all chunks.
    pub total_input_tokens: u64,
    /// Sum of completion tokens across all chunks.
    pub total_output_tokens: u64,
    /// End-to-end wall-clock duration.
    pub total_duration_ms: u64,
    /// Time spent extracting text from the PDF.
    pub extract_duration_ms: u64,
    /// Time spent in model calls (wall-clock over the concurrent window).
    pub llm_duration_ms: u64,
}

/// Information about the source document, collected without any model call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    /// File name of the source PDF (no directory).
    pub file_name: String,
    /// Page count from the PDF structure.
    pub page_count: usize,
    /// Characters of text extracted after whitespace normalisation.
    pub char_count: usize,
    /// Paragraphs in the normalised text.
    pub paragraph_count: usize,
}

/// Everything a generation run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutput {
    /// All pairs in chunk order — the flat list most callers want.
    pub pairs: Vec<QaPair>,
    /// Per-chunk results, sorted by `chunk_index`.
    pub chunks: Vec<ChunkResult>,
    /// Source document info.
    pub info: DocumentInfo,
    /// Run statistics.
    pub stats: GenerationStats,
}

impl GenerationOutput {
    /// Treat any chunk failure as an error.
    ///
    /// [`crate::generate`] tolerates partial failure by design; callers that
    /// would rather fail the run if even one chunk errored use this.
    pub fn into_result(self) -> Result<GenerationOutput, Pdf2QaError> {
        if self.stats.failed_chunks > 0 {
            return Err(Pdf2QaError::PartialFailure {
                success: self.stats.processed_chunks,
                failed: self.stats.failed_chunks,
                total: self.stats.total_chunks,
            });
        }
        Ok(self)
    }
}
