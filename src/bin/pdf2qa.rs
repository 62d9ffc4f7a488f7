//! CLI binary for pdf2qa.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `GenerationConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2qa::{
    generate, generate_to_file, inspect, GenerationConfig, Language, ProgressCallback,
    QaProgressCallback,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: renders a live progress bar and per-chunk log
/// lines using [indicatif]. Designed to work correctly when chunks complete
/// out-of-order (concurrent mode).
struct CliProgressCallback {
    /// The single progress bar anchored at the bottom of the terminal.
    bar: ProgressBar,
    /// Per-chunk wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
    /// Count of chunks that errored out.
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Create a callback whose progress-bar length is set dynamically
    /// by `on_generation_start` (called once the text has been chunked).
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_generation_start

        // Initial style: spinner only (no counter until we know the total).
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    /// Switch to the full progress-bar style once we know `total`.
    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} chunks  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Generating");
        self.bar.reset_eta();
    }
}

impl QaProgressCallback for CliProgressCallback {
    fn on_generation_start(&self, total_chunks: usize) {
        // Switch from spinner-only style to full progress bar now that we
        // know the actual chunk count.
        self.activate_bar(total_chunks);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!(
                "Generating questions from {total_chunks} text chunks…"
            ))
        ));
    }

    fn on_chunk_start(&self, chunk_index: usize, _total: usize) {
        self.start_times
            .lock()
            .unwrap()
            .insert(chunk_index, Instant::now());
        self.bar.set_message(format!("chunk {}", chunk_index + 1));
    }

    fn on_chunk_complete(&self, chunk_index: usize, total: usize, pair_count: usize) {
        let elapsed_ms = self
            .start_times
            .lock()
            .unwrap()
            .remove(&chunk_index)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        self.bar.println(format!(
            "  {} Chunk {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            chunk_index + 1,
            total,
            dim(&format!("{pair_count} pairs")),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_chunk_error(&self, chunk_index: usize, total: usize, error: &str) {
        let elapsed_ms = self
            .start_times
            .lock()
            .unwrap()
            .remove(&chunk_index)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            let head: String = error.chars().take(79).collect();
            format!("{head}\u{2026}")
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Chunk {:>3}/{:<3}  {}  {}",
            red("✗"),
            chunk_index + 1,
            total,
            red(&msg),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_generation_complete(&self, total_chunks: usize, pair_count: usize) {
        let failed = self.errors.load(Ordering::SeqCst);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} pairs generated from {} chunks",
                green("✔"),
                bold(&pair_count.to_string()),
                total_chunks,
            );
        } else {
            eprintln!(
                "{} {} pairs generated  ({}/{} chunks failed)",
                cyan("⚠"),
                bold(&pair_count.to_string()),
                red(&failed.to_string()),
                total_chunks,
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic: writes questions_answers.pdf next to the input
  pdf2qa lecture_notes.pdf

  # Explicit output path and language
  pdf2qa dispensa.pdf -o ripasso.pdf --language italian

  # More questions from bigger chunks
  pdf2qa textbook_chapter.pdf -n 4 --chunk-size 8000

  # Generate from a URL
  pdf2qa https://arxiv.org/pdf/1706.03762 -o attention_quiz.pdf

  # Machine-readable pairs on stdout (no PDF written)
  pdf2qa paper.pdf --json > pairs.json

  # Inspect the document first (no API key needed)
  pdf2qa --inspect-only scan.pdf

SUPPORTED MODELS:
  Model                   Input $/1M  Output $/1M
  ──────────────────────  ──────────  ───────────
  gemini-2.0-flash        $0.10       $0.40   (default)
  gemini-2.0-flash-lite   $0.075      $0.30
  gemini-2.5-flash        $0.30       $2.50
  gemini-2.5-pro          $1.25       $10.00

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY   Gemini API key (API_KEY is also accepted)
  GEMINI_MODEL     Override the model ID
  Both are also read from a .env file in the working directory.

SETUP:
  1. Get a key:   https://aistudio.google.com/apikey
  2. Save it:     echo 'GEMINI_API_KEY=...' >> .env
  3. Generate:    pdf2qa notes.pdf
"#;

/// Generate Q&A study sheets from PDF files and URLs using Gemini.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2qa",
    version,
    about = "Generate question/answer study sheets from PDF files and URLs using Gemini",
    long_about = "Extract the text of a PDF document (local file or URL), ask the Gemini API to \
generate exam-style questions with answers for each chunk of text, and render the collected \
pairs into a new PDF.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Write the Q&A PDF to this path (default: questions_answers.pdf next to the input).
    #[arg(short, long, env = "PDF2QA_OUTPUT")]
    output: Option<PathBuf>,

    /// Language of the generated questions and answers.
    #[arg(short, long, env = "PDF2QA_LANGUAGE", value_enum, default_value = "english")]
    language: LanguageArg,

    /// Questions to generate per text chunk (1–10).
    #[arg(short = 'n', long, env = "PDF2QA_QUESTIONS", default_value_t = 2,
          value_parser = clap::value_parser!(usize))]
    questions_per_chunk: usize,

    /// Maximum chunk size in characters (200–100000).
    #[arg(long, env = "PDF2QA_CHUNK_SIZE", default_value_t = 4000)]
    chunk_size: usize,

    /// Gemini model ID (e.g. gemini-2.0-flash, gemini-2.5-pro).
    #[arg(long, env = "GEMINI_MODEL")]
    model: Option<String>,

    /// Gemini API key (prefer the environment or a .env file over this flag).
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "PDF2QA_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Max model output tokens per chunk.
    #[arg(long, env = "PDF2QA_MAX_TOKENS", default_value_t = 1024)]
    max_tokens: usize,

    /// Retries per chunk on transient API failure.
    #[arg(long, env = "PDF2QA_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Number of concurrent model calls.
    #[arg(short, long, env = "PDF2QA_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Title printed at the top of the output PDF.
    #[arg(long, env = "PDF2QA_TITLE")]
    title: Option<String>,

    /// Path to a text file containing a custom prompt template ({text} required).
    #[arg(long, env = "PDF2QA_PROMPT")]
    prompt: Option<PathBuf>,

    /// Print pairs as JSON on stdout instead of writing a PDF.
    #[arg(long, env = "PDF2QA_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2QA_NO_PROGRESS")]
    no_progress: bool,

    /// Print document info only, no generation (no API key needed).
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2QA_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2QA_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2QA_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Per-chunk model call timeout in seconds.
    #[arg(long, env = "PDF2QA_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum LanguageArg {
    English,
    Italian,
    French,
    Spanish,
    German,
}

impl From<LanguageArg> for Language {
    fn from(v: LanguageArg) -> Self {
        match v {
            LanguageArg::English => Language::English,
            LanguageArg::Italian => Language::Italian,
            LanguageArg::French => Language::French,
            LanguageArg::Spanish => Language::Spanish,
            LanguageArg::German => Language::German,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env first so clap's env-var mirrors see its values.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let info = inspect(&cli.input)
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialise info")?
            );
        } else {
            println!("File:        {}", info.file_name);
            println!("Pages:       {}", info.page_count);
            println!("Characters:  {}", info.char_count);
            println!("Paragraphs:  {}", info.paragraph_count);
            if info.char_count == 0 {
                println!("{}", red("No text layer — generation would fail."));
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn QaProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Run generation ───────────────────────────────────────────────────
    if cli.json {
        let output = generate(&cli.input, &config)
            .await
            .context("Generation failed")?;
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    let output_path = resolve_output_path(&cli);
    let stats = generate_to_file(&cli.input, &output_path, &config)
        .await
        .context("Generation failed")?;

    // Summary line (the callback already printed the per-chunk log).
    if !cli.quiet {
        eprintln!(
            "{}  {} pairs from {}/{} chunks  {}ms  →  {}",
            if stats.failed_chunks == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.total_pairs,
            stats.processed_chunks,
            stats.total_chunks,
            stats.total_duration_ms,
            bold(&output_path.display().to_string()),
        );
        eprintln!(
            "   {} tokens in  /  {} tokens out",
            dim(&stats.total_input_tokens.to_string()),
            dim(&stats.total_output_tokens.to_string()),
        );
    }

    Ok(())
}

/// Map CLI args to `GenerationConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<GenerationConfig> {
    let prompt_template = if let Some(ref path) = cli.prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read prompt template from {:?}", path))?,
        )
    } else {
        None
    };

    let mut builder = GenerationConfig::builder()
        .chunk_chars(cli.chunk_size)
        .questions_per_chunk(cli.questions_per_chunk)
        .language(cli.language.clone().into())
        .temperature(cli.temperature)
        .max_output_tokens(cli.max_tokens)
        .max_retries(cli.max_retries)
        .concurrency(cli.concurrency)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    if let Some(ref template) = prompt_template {
        builder = builder.prompt_template(template.clone());
    }
    if let Some(ref title) = cli.title {
        builder = builder.title(title.clone());
    }

    let mut config = builder.build().context("Invalid configuration")?;

    // Apply fields the builder doesn't have setters for via flags
    config.model = cli.model.clone();
    config.api_key = cli.api_key.clone();

    Ok(config)
}

/// Where the output PDF goes when `-o` is not given: `questions_answers.pdf`
/// next to the input file (current directory for URL inputs).
fn resolve_output_path(cli: &Cli) -> PathBuf {
    let path = match cli.output {
        Some(ref p) => p.clone(),
        None => {
            let dir = if cli.input.starts_with("http://") || cli.input.starts_with("https://") {
                PathBuf::new()
            } else {
                Path::new(&cli.input)
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_default()
            };
            dir.join("questions_answers.pdf")
        }
    };

    // Enforce the .pdf extension so a typo'd -o never produces an
    // extensionless file a viewer refuses to open.
    if path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
    {
        path
    } else {
        path.with_extension("pdf")
    }
}
