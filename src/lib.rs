//! # pdf2qa
//!
//! Generate question/answer study sheets from PDF documents with the Gemini
//! API.
//!
//! ## Why this crate?
//!
//! Turning lecture notes, papers, or book chapters into practice questions
//! is mechanical work an LLM does well — but doing it by hand means copying
//! text out of a PDF chunk by chunk and pasting replies back into a
//! document. This crate automates the whole loop: extract the text layer,
//! split it into model-sized chunks, ask Gemini for exam-style questions
//! with answers, and lay the collected pairs out into a fresh PDF.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    resolve local file or download from URL
//!  ├─ 2. Extract  text layer via pdf-extract (CPU-bound, spawn_blocking)
//!  ├─ 3. Chunk    paragraph-aligned pieces of ≤ 4000 chars
//!  ├─ 4. LLM      concurrent Gemini calls, one per chunk, with retry
//!  ├─ 5. Parse    "Question N: / Answer N:" reply → QaPair list
//!  └─ 6. Render   A4 PDF via lopdf (title + numbered Q&A)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2qa::{generate, GenerationConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key read from GEMINI_API_KEY (or API_KEY) in the environment
//!     let config = GenerationConfig::default();
//!     let output = generate("notes.pdf", &config).await?;
//!     for pair in &output.pairs {
//!         println!("Q: {}\nA: {}\n", pair.question, pair.answer);
//!     }
//!     eprintln!("tokens: {} in / {} out",
//!         output.stats.total_input_tokens,
//!         output.stats.total_output_tokens);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2qa` binary (clap + anyhow + indicatif + dotenvy) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! pdf2qa = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{GenerationConfig, GenerationConfigBuilder, Language};
pub use error::{ChunkError, Pdf2QaError};
pub use generate::{
    generate, generate_from_bytes, generate_sync, generate_to_file, inspect, render_qa_pdf,
};
pub use model::{GeminiModel, GeminiSettings, ModelError, ModelReply, TextModel};
pub use output::{ChunkResult, DocumentInfo, GenerationOutput, GenerationStats, QaPair};
pub use progress::{NoopProgressCallback, ProgressCallback, QaProgressCallback};
pub use stream::{generate_stream, generate_stream_from_bytes, ChunkStream};
