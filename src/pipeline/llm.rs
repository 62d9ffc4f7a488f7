//! Model interaction: build the prompt, call the model, retry on transient
//! failures.
//!
//! This module is intentionally thin — all prompt wording lives in
//! [`crate::prompts`] so it can be changed without touching retry or
//! error-handling logic here.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 errors from LLM APIs are transient and frequent under
//! concurrent load. Exponential backoff (`retry_backoff_ms * 2^attempt`)
//! avoids thundering-herd: with 500 ms base and 3 retries the wait sequence
//! is 500 ms → 1 s → 2 s, totalling < 4 s of back-off per chunk. Errors
//! where a retry cannot help (bad key, malformed request) fail the chunk on
//! the spot.

use crate::config::GenerationConfig;
use crate::error::ChunkError;
use crate::model::{ModelError, TextModel};
use crate::output::ChunkResult;
use crate::pipeline::parse;
use crate::prompts;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Generate Q&A pairs for a single chunk.
///
/// Always returns a `ChunkResult` — never propagates the error upward so a
/// single bad chunk doesn't abort the entire document. Callers check
/// `result.error` to decide whether to include or skip the chunk.
pub async fn process_chunk(
    model: &Arc<dyn TextModel>,
    chunk_index: usize,
    chunk: &str,
    config: &GenerationConfig,
) -> ChunkResult {
    let start = Instant::now();
    let prompt = prompts::build_prompt(
        config.prompt_template.as_deref(),
        config.questions_per_chunk,
        config.language,
        chunk,
    );

    let mut last_err: Option<ModelError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                "Chunk {}: retry {}/{} after {}ms",
                chunk_index, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match model.generate(&prompt).await {
            Ok(reply) => {
                let duration = start.elapsed();
                let pairs = parse::parse_qa_response(&reply.text);
                debug!(
                    "Chunk {}: {} pairs, {} input tokens, {} output tokens, {:?}",
                    chunk_index,
                    pairs.len(),
                    reply.input_tokens,
                    reply.output_tokens,
                    duration
                );

                let error = if pairs.is_empty() {
                    warn!("Chunk {}: reply parsed to zero pairs", chunk_index);
                    Some(ChunkError::NoPairs { chunk: chunk_index })
                } else {
                    None
                };

                return ChunkResult {
                    chunk_index,
                    pairs,
                    input_tokens: reply.input_tokens,
                    output_tokens: reply.output_tokens,
                    duration_ms: duration.as_millis() as u64,
                    retries: attempt as u8,
                    error,
                };
            }
            Err(e) => {
                warn!(
                    "Chunk {}: attempt {} failed — {}",
                    chunk_index,
                    attempt + 1,
                    e
                );
                let transient = e.is_transient();
                last_err = Some(e);
                if !transient {
                    break;
                }
            }
        }
    }

    // Retries exhausted (or a permanent error cut them short).
    let duration = start.elapsed();
    let error = match last_err {
        Some(ModelError::Timeout { secs }) => ChunkError::Timeout {
            chunk: chunk_index,
            secs,
        },
        Some(e) => ChunkError::ModelFailed {
            chunk: chunk_index,
            retries: config.max_retries as u8,
            detail: e.to_string(),
        },
        None => ChunkError::ModelFailed {
            chunk: chunk_index,
            retries: config.max_retries as u8,
            detail: "unknown error".to_string(),
        },
    };

    ChunkResult {
        chunk_index,
        pairs: Vec::new(),
        input_tokens: 0,
        output_tokens: 0,
        duration_ms: duration.as_millis() as u64,
        retries: config.max_retries as u8,
        error: Some(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelReply;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted model: fails `failures` times, then replies with `reply`.
    struct ScriptedModel {
        failures: usize,
        failure: ModelError,
        reply: String,
        calls: AtomicUsize,
    }

    impl ScriptedModel {
        fn new(failures: usize, failure: ModelError, reply: &str) -> Self {
            Self {
                failures,
                failure,
                reply: reply.to_string(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TextModel for ScriptedModel {
        async fn generate(&self, _prompt: &str) -> Result<ModelReply, ModelError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(self.failure.clone());
            }
            Ok(ModelReply {
                text: self.reply.clone(),
                input_tokens: 100,
                output_tokens: 30,
            })
        }

        fn model_id(&self) -> &str {
            "scripted"
        }
    }

    fn fast_config() -> GenerationConfig {
        GenerationConfig::builder()
            .retry_backoff_ms(1)
            .build()
            .unwrap()
    }

    const GOOD_REPLY: &str = "Question 1: Why?\nAnswer 1: Because.";

    #[tokio::test]
    async fn succeeds_first_attempt() {
        let model: Arc<dyn TextModel> =
            Arc::new(ScriptedModel::new(0, ModelError::RateLimited, GOOD_REPLY));
        let result = process_chunk(&model, 0, "some text", &fast_config()).await;
        assert!(result.error.is_none());
        assert_eq!(result.pairs.len(), 1);
        assert_eq!(result.retries, 0);
        assert_eq!(result.input_tokens, 100);
    }

    #[tokio::test]
    async fn retries_transient_errors() {
        let scripted = Arc::new(ScriptedModel::new(2, ModelError::RateLimited, GOOD_REPLY));
        let model: Arc<dyn TextModel> = scripted.clone();
        let result = process_chunk(&model, 3, "some text", &fast_config()).await;
        assert!(result.error.is_none());
        assert_eq!(result.retries, 2);
        assert_eq!(scripted.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_fail_the_chunk() {
        let scripted = Arc::new(ScriptedModel::new(
            99,
            ModelError::Api {
                status: 503,
                detail: "overloaded".into(),
            },
            GOOD_REPLY,
        ));
        let model: Arc<dyn TextModel> = scripted.clone();
        let result = process_chunk(&model, 1, "some text", &fast_config()).await;
        assert!(matches!(
            result.error,
            Some(ChunkError::ModelFailed { chunk: 1, .. })
        ));
        assert!(result.pairs.is_empty());
        // max_retries = 3 → 4 attempts total
        assert_eq!(scripted.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let scripted = Arc::new(ScriptedModel::new(
            99,
            ModelError::Auth("bad key".into()),
            GOOD_REPLY,
        ));
        let model: Arc<dyn TextModel> = scripted.clone();
        let result = process_chunk(&model, 0, "some text", &fast_config()).await;
        assert!(result.error.is_some());
        assert_eq!(scripted.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unparseable_reply_is_flagged_not_retried() {
        let scripted = Arc::new(ScriptedModel::new(
            0,
            ModelError::RateLimited,
            "I refuse to follow instructions.",
        ));
        let model: Arc<dyn TextModel> = scripted.clone();
        let result = process_chunk(&model, 2, "some text", &fast_config()).await;
        assert!(matches!(result.error, Some(ChunkError::NoPairs { chunk: 2 })));
        assert_eq!(scripted.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn timeout_maps_to_timeout_error() {
        let model: Arc<dyn TextModel> = Arc::new(ScriptedModel::new(
            99,
            ModelError::Timeout { secs: 60 },
            GOOD_REPLY,
        ));
        let result = process_chunk(&model, 5, "some text", &fast_config()).await;
        assert!(matches!(
            result.error,
            Some(ChunkError::Timeout { chunk: 5, secs: 60 })
        ));
    }
}
