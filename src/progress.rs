//! Progress-callback trait for per-chunk generation events.
//!
//! Inject an [`Arc<dyn QaProgressCallback>`] via
//! [`crate::config::GenerationConfigBuilder::progress_callback`] to receive
//! real-time events as the pipeline processes each chunk.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a Tokio broadcast channel, a WebSocket, a database record,
//! or a terminal progress bar — without the library knowing anything about how
//! the host application communicates. The trait is `Send + Sync` so it works
//! correctly when chunks are processed concurrently.

use std::sync::Arc;

/// Called by the generation pipeline as it processes each chunk.
///
/// Implementations must be `Send + Sync` (chunks are processed concurrently).
/// All methods have default no-op implementations so callers only override
/// what they care about.
///
/// # Thread safety
///
/// `on_chunk_start`, `on_chunk_complete`, and `on_chunk_error` may be called
/// concurrently from different tasks. Implementations must protect shared
/// mutable state with appropriate synchronisation primitives (e.g. `Mutex`,
/// `AtomicUsize`).
pub trait QaProgressCallback: Send + Sync {
    /// Called once after chunking, before any model call.
    ///
    /// # Arguments
    /// * `total_chunks` — number of chunks that will be processed
    fn on_generation_start(&self, total_chunks: usize) {
        let _ = total_chunks;
    }

    /// Called just before the model request is sent for a chunk.
    ///
    /// # Arguments
    /// * `chunk_index`  — 0-indexed chunk number
    /// * `total_chunks` — total chunks in the document
    fn on_chunk_start(&self, chunk_index: usize, total_chunks: usize) {
        let _ = (chunk_index, total_chunks);
    }

    /// Called when a chunk's reply has been parsed successfully.
    ///
    /// # Arguments
    /// * `chunk_index`  — 0-indexed chunk number
    /// * `total_chunks` — total chunks
    /// * `pair_count`   — Q&A pairs parsed from this chunk's reply
    fn on_chunk_complete(&self, chunk_index: usize, total_chunks: usize, pair_count: usize) {
        let _ = (chunk_index, total_chunks, pair_count);
    }

    /// Called when a chunk fails after all retries are exhausted.
    ///
    /// # Arguments
    /// * `chunk_index`  — 0-indexed chunk number
    /// * `total_chunks` — total chunks
    /// * `error`        — human-readable error description
    fn on_chunk_error(&self, chunk_index: usize, total_chunks: usize, error: &str) {
        let _ = (chunk_index, total_chunks, error);
    }

    /// Called once after all chunks have been attempted.
    ///
    /// # Arguments
    /// * `total_chunks` — chunks attempted
    /// * `pair_count`   — total Q&A pairs generated
    fn on_generation_complete(&self, total_chunks: usize, pair_count: usize) {
        let _ = (total_chunks, pair_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl QaProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::GenerationConfig`].
pub type ProgressCallback = Arc<dyn QaProgressCallback>;
