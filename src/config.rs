//! Configuration types for Q&A generation.
//!
//! All generation behaviour is controlled through [`GenerationConfig`], built
//! via its [`GenerationConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across threads, serialise them for logging, and
//! diff two runs to understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A fifteen-field constructor is unreadable and breaks on every new field.
//! The builder pattern lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::error::Pdf2QaError;
use crate::model::TextModel;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Configuration for a PDF-to-Q&A generation run.
///
/// Built via [`GenerationConfig::builder()`] or using
/// [`GenerationConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2qa::{GenerationConfig, Language};
///
/// let config = GenerationConfig::builder()
///     .language(Language::French)
///     .questions_per_chunk(3)
///     .model("gemini-2.0-flash")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct GenerationConfig {
    /// Maximum chunk size in characters. Range: 200–100 000. Default: 4000.
    ///
    /// 4 000 characters is roughly 1 000 tokens of prose — small enough that
    /// the model can attend to the whole excerpt, large enough that each
    /// question has real material behind it. Raise it for dense technical
    /// text where questions should span more context.
    pub chunk_chars: usize,

    /// How many question/answer pairs to request per chunk. Range: 1–10. Default: 2.
    pub questions_per_chunk: usize,

    /// Language the questions and answers are written in. Default: English.
    ///
    /// This controls the prompt wording, the keywords the reply parser
    /// accepts, and the default title of the rendered PDF.
    pub language: Language,

    /// Gemini model identifier, e.g. "gemini-2.0-flash".
    /// If None, `GEMINI_MODEL` from the environment is used, then the default.
    pub model: Option<String>,

    /// Gemini API key. If None, resolved from `GEMINI_API_KEY`, then `API_KEY`.
    pub api_key: Option<String>,

    /// Pre-constructed text model. Takes precedence over `model`/`api_key`.
    ///
    /// The main use is substituting a mock in tests or wrapping the real
    /// client with caching or rate-limiting middleware.
    pub text_model: Option<Arc<dyn TextModel>>,

    /// Sampling temperature for the completion. Default: 0.2.
    ///
    /// Low temperature keeps the questions anchored to what the text
    /// actually says. Higher values produce more varied phrasing at the
    /// cost of occasional drift from the source material.
    pub temperature: f32,

    /// Maximum tokens the model may generate per chunk. Default: 1024.
    ///
    /// Two questions with paragraph-length answers fit comfortably; setting
    /// this too low truncates answers mid-sentence, which the parser then
    /// carries into the output PDF.
    pub max_output_tokens: usize,

    /// Maximum retry attempts on a transient API failure. Default: 3.
    ///
    /// Most 429/5xx/timeout errors are transient. Permanent errors (bad API
    /// key, malformed request) are not retried — they fail the chunk
    /// immediately.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    ///
    /// Doubles after each attempt: 500 ms → 1 s → 2 s. Exponential backoff
    /// avoids the thundering-herd problem where N concurrent workers retry
    /// simultaneously and immediately overwhelm a recovering API endpoint.
    pub retry_backoff_ms: u64,

    /// Number of concurrent model calls. Default: 4.
    ///
    /// The API is network-bound; a handful of in-flight requests cuts
    /// wall-clock time substantially. Lower this if you hit rate limits
    /// (`429`) on a free-tier key.
    pub concurrency: usize,

    /// Title rendered at the top of the output PDF.
    /// If None, a localised default is used ("Questions and Answers", …).
    pub title: Option<String>,

    /// Custom prompt template. `{count}`, `{language}`, and `{text}` are
    /// replaced before each call. If None, uses the built-in default.
    pub prompt_template: Option<String>,

    /// Progress callback fired as chunks are processed.
    pub progress_callback: Option<ProgressCallback>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Per-model-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            chunk_chars: 4000,
            questions_per_chunk: 2,
            language: Language::default(),
            model: None,
            api_key: None,
            text_model: None,
            temperature: 0.2,
            max_output_tokens: 1024,
            max_retries: 3,
            retry_backoff_ms: 500,
            concurrency: 4,
            title: None,
            prompt_template: None,
            progress_callback: None,
            download_timeout_secs: 120,
            api_timeout_secs: 60,
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("chunk_chars", &self.chunk_chars)
            .field("questions_per_chunk", &self.questions_per_chunk)
            .field("language", &self.language)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("text_model", &self.text_model.as_ref().map(|_| "<dyn TextModel>"))
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("max_retries", &self.max_retries)
            .field("concurrency", &self.concurrency)
            .field("title", &self.title)
            .finish()
    }
}

impl GenerationConfig {
    /// Create a new builder for `GenerationConfig`.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`GenerationConfig`].
#[derive(Debug)]
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn chunk_chars(mut self, n: usize) -> Self {
        self.config.chunk_chars = n;
        self
    }

    pub fn questions_per_chunk(mut self, n: usize) -> Self {
        self.config.questions_per_chunk = n.clamp(1, 10);
        self
    }

    pub fn language(mut self, lang: Language) -> Self {
        self.config.language = lang;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn text_model(mut self, model: Arc<dyn TextModel>) -> Self {
        self.config.text_model = Some(model);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_output_tokens(mut self, n: usize) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = Some(title.into());
        self
    }

    pub fn prompt_template(mut self, template: impl Into<String>) -> Self {
        self.config.prompt_template = Some(template.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerationConfig, Pdf2QaError> {
        let c = &self.config;
        if c.chunk_chars < 200 || c.chunk_chars > 100_000 {
            return Err(Pdf2QaError::InvalidConfig(format!(
                "chunk size must be 200–100000 characters, got {}",
                c.chunk_chars
            )));
        }
        if c.questions_per_chunk == 0 {
            return Err(Pdf2QaError::InvalidConfig(
                "questions per chunk must be ≥ 1".into(),
            ));
        }
        if c.concurrency == 0 {
            return Err(Pdf2QaError::InvalidConfig("concurrency must be ≥ 1".into()));
        }
        if let Some(ref template) = c.prompt_template {
            if !template.contains("{text}") {
                return Err(Pdf2QaError::InvalidConfig(
                    "prompt template must contain a {text} placeholder".into(),
                ));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Language of the generated questions and answers.
///
/// The variant drives three things: the prompt fragment asking the model to
/// answer in that language, the keywords the reply parser recognises
/// ("Question"/"Domanda"/"Frage"/…), and the localised default title of the
/// rendered PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    /// English (default).
    #[default]
    English,
    /// Italian.
    Italian,
    /// French.
    French,
    /// Spanish.
    Spanish,
    /// German.
    German,
}

impl Language {
    /// All supported languages, in display order.
    pub const ALL: [Language; 5] = [
        Language::English,
        Language::Italian,
        Language::French,
        Language::Spanish,
        Language::German,
    ];

    /// English name of the language, as used on the CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::English => "english",
            Language::Italian => "italian",
            Language::French => "french",
            Language::Spanish => "spanish",
            Language::German => "german",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Language {
    type Err = Pdf2QaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "english" | "en" => Ok(Language::English),
            "italian" | "italiano" | "it" => Ok(Language::Italian),
            "french" | "français" | "francais" | "fr" => Ok(Language::French),
            "spanish" | "español" | "espanol" | "es" => Ok(Language::Spanish),
            "german" | "deutsch" | "de" => Ok(Language::German),
            other => Err(Pdf2QaError::InvalidConfig(format!(
                "unknown language '{}' (supported: english, italian, french, spanish, german)",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_are_valid() {
        let config = GenerationConfig::builder().build().unwrap();
        assert_eq!(config.chunk_chars, 4000);
        assert_eq!(config.questions_per_chunk, 2);
        assert_eq!(config.language, Language::English);
        assert_eq!(config.concurrency, 4);
    }

    #[test]
    fn builder_clamps_questions_per_chunk() {
        let config = GenerationConfig::builder()
            .questions_per_chunk(99)
            .build()
            .unwrap();
        assert_eq!(config.questions_per_chunk, 10);
    }

    #[test]
    fn builder_rejects_tiny_chunks() {
        let err = GenerationConfig::builder().chunk_chars(50).build();
        assert!(err.is_err());
    }

    #[test]
    fn builder_rejects_template_without_placeholder() {
        let err = GenerationConfig::builder()
            .prompt_template("make questions please")
            .build();
        assert!(err.is_err());
    }

    #[test]
    fn language_round_trips_from_str() {
        for lang in Language::ALL {
            assert_eq!(lang.as_str().parse::<Language>().unwrap(), lang);
        }
        assert_eq!("Deutsch".parse::<Language>().unwrap(), Language::German);
        assert!("klingon".parse::<Language>().is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = GenerationConfig::builder()
            .api_key("secret-key")
            .build()
            .unwrap();
        let dbg = format!("{:?}", config);
        assert!(!dbg.contains("secret-key"));
        assert!(dbg.contains("REDACTED"));
    }
}
