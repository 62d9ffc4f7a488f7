//! The text-model seam and its Gemini implementation.
//!
//! The pipeline only ever talks to [`TextModel`], never to a concrete HTTP
//! client. That keeps the retry loop in [`crate::pipeline::llm`] free of
//! transport detail, lets tests drive the full pipeline with a scripted
//! model, and leaves room for embedders to wrap the real client with
//! caching or rate-limiting middleware via
//! [`crate::config::GenerationConfig::text_model`].

use async_trait::async_trait;
use thiserror::Error;

pub mod gemini;

pub use gemini::{GeminiModel, GeminiSettings, DEFAULT_GEMINI_MODEL};

/// A model that turns a prompt into text.
///
/// Implementations must be `Send + Sync`; chunks are processed concurrently
/// and share one model behind an `Arc`.
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<ModelReply, ModelError>;

    /// Model identifier for logs and stats, e.g. "gemini-2.0-flash".
    fn model_id(&self) -> &str;
}

/// A successful model reply.
#[derive(Debug, Clone)]
pub struct ModelReply {
    /// The generated text.
    pub text: String,
    /// Prompt tokens reported by the API (0 if unavailable).
    pub input_tokens: u64,
    /// Completion tokens reported by the API (0 if unavailable).
    pub output_tokens: u64,
}

/// Errors a model call can fail with.
///
/// The split matters to the retry loop: [`ModelError::is_transient`] decides
/// whether a failed attempt is worth repeating.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// HTTP 429 — the API asked us to back off.
    #[error("rate limited by the API")]
    RateLimited,

    /// The request could not be sent or the connection dropped.
    #[error("network error: {0}")]
    Network(String),

    /// The call exceeded the configured timeout.
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Authentication failed (401/403) — retrying will not help.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Any other non-success HTTP status.
    #[error("API error (HTTP {status}): {detail}")]
    Api { status: u16, detail: String },

    /// The response body did not match the expected shape.
    #[error("unexpected response: {0}")]
    Parse(String),
}

impl ModelError {
    /// Whether a retry has a realistic chance of succeeding.
    ///
    /// Rate limits, network blips, timeouts, and 5xx responses are
    /// transient. Auth failures, 4xx responses, and malformed bodies are
    /// not — retrying those only burns quota.
    pub fn is_transient(&self) -> bool {
        match self {
            ModelError::RateLimited | ModelError::Network(_) | ModelError::Timeout { .. } => true,
            ModelError::Api { status, .. } => *status >= 500,
            ModelError::Auth(_) | ModelError::Parse(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(ModelError::RateLimited.is_transient());
        assert!(ModelError::Network("reset".into()).is_transient());
        assert!(ModelError::Timeout { secs: 60 }.is_transient());
        assert!(ModelError::Api {
            status: 503,
            detail: "overloaded".into()
        }
        .is_transient());

        assert!(!ModelError::Auth("bad key".into()).is_transient());
        assert!(!ModelError::Api {
            status: 400,
            detail: "bad request".into()
        }
        .is_transient());
        assert!(!ModelError::Parse("no candidates".into()).is_transient());
    }
}
