//! CLI binary for notescribe.
//!
//! A thin shim over the library crate: `extract` turns photos and typed
//! notes into a JSON result file, `summarize` reads such a file (possibly
//! edited by hand) and writes one summary.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use notescribe::{
    Batch, CancellationToken, Digitizer, DigitizerConfig, ExtractionProgressCallback,
    ProgressCallback, ResultSet, ResultStatus, Stage,
};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
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
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
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

const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar for the batch plus a log line per
/// finished item. Images finish out of order, so timings are keyed by id.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<String, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(SPINNER);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading notes…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} items  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(SPINNER);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Digitizing");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, id: &str) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut times| times.remove(id))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_items: usize) {
        self.activate_bar(total_items);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Digitizing {total_items} item(s)…"))
        ));
    }

    fn on_item_start(&self, id: &str, filename: &str) {
        if let Ok(mut times) = self.start_times.lock() {
            times.insert(id.to_string(), Instant::now());
        }
        self.bar.set_message(filename.to_string());
    }

    fn on_stage(&self, id: &str, stage: Stage) {
        self.bar.set_message(format!("{id}: {stage}"));
    }

    fn on_item_complete(&self, id: &str, filename: &str, content_len: usize) {
        let secs = self.elapsed_secs(id);
        self.bar.println(format!(
            "  {} {:<28}  {:<8}  {}",
            green("✓"),
            filename,
            dim(&format!("{content_len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_item_error(&self, id: &str, filename: &str, error: &str) {
        let secs = self.elapsed_secs(id);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {:<28}  {}  {}",
            red("✗"),
            filename,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_extraction_complete(&self, total_items: usize, success_count: usize) {
        let failed = total_items.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} item(s) digitized",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} item(s) digitized  ({} not)",
                if failed == total_items {
                    red("✘")
                } else {
                    yellow("⚠")
                },
                bold(&success_count.to_string()),
                total_items,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Digitize two photos and a typed note, results as JSON on stdout
  notescribe extract IMG_0042.jpg IMG_0043.jpg --text "Leak detected at valve 3"

  # Write results to a file, then review and edit the "content" fields
  notescribe extract site-visit/*.jpg -o results.json

  # Summarize the (edited) results in German
  notescribe summarize results.json --language german -o summary.txt

  # Extract and summarize in one go
  notescribe extract site-visit/*.jpg -o results.json --summary-language french

  # Use another provider through edgequake-llm
  notescribe --provider anthropic --model claude-sonnet-4-20250514 extract page.jpg

UNCERTAIN READINGS:
  Words the models could not settle are kept visible in the transcription:
    valve[3/8]            two readings of one word
    [pump, pipe, pipes]   judge could not decide between the ensemble readings

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY           API key for the OpenAI-compatible backend
  NOTESCRIBE_BASE_URL      Base URL of an OpenAI-compatible endpoint
  NOTESCRIBE_PROVIDER      edgequake-llm provider (anthropic, gemini, ollama, …)
  NOTESCRIBE_MODEL         Model ID (default: gpt-4o)
  RUST_LOG                 Log filter, overrides --verbose / --quiet
"#;

/// Digitize handwritten inspection notes and summarize them.
#[derive(Parser, Debug)]
#[command(
    name = "notescribe",
    version,
    about = "Digitize handwritten inspection notes with vision LLMs",
    long_about = "Transcribe photos of handwritten inspection notes with a three-way model \
ensemble reconciled by a judge, merge them with typed notes, and write a summary in German, \
English, French or Italian.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    model: ModelArgs,

    /// Disable progress bar.
    #[arg(long, global = true, env = "NOTESCRIBE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "NOTESCRIBE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "NOTESCRIBE_QUIET")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// API key for the OpenAI-compatible backend.
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of an OpenAI-compatible endpoint.
    #[arg(long, global = true, env = "NOTESCRIBE_BASE_URL")]
    base_url: Option<String>,

    /// edgequake-llm provider name: anthropic, gemini, ollama, azure, …
    #[arg(long, global = true, env = "NOTESCRIBE_PROVIDER")]
    provider: Option<String>,

    /// Vision model ID.
    #[arg(long, global = true, env = "NOTESCRIBE_MODEL", default_value = "gpt-4o")]
    model: String,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, global = true, env = "NOTESCRIBE_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Max output tokens per transcription or judge call.
    #[arg(long, global = true, env = "NOTESCRIBE_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Images processed at once (default: all).
    #[arg(short, long, global = true, env = "NOTESCRIBE_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Retries per extraction call on transient errors.
    #[arg(long, global = true, env = "NOTESCRIBE_MAX_RETRIES", default_value_t = 0)]
    max_retries: u32,

    /// HTTP request timeout in seconds.
    #[arg(long, global = true, env = "NOTESCRIBE_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Approximate summary length in words.
    #[arg(long, global = true, env = "NOTESCRIBE_SUMMARY_WORDS", default_value_t = 1000)]
    summary_words: usize,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Transcribe photos and collect typed notes into a JSON result file.
    Extract(ExtractArgs),
    /// Summarize a JSON result file.
    Summarize(SummarizeArgs),
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Photos of handwritten notes (jpeg or png).
    images: Vec<PathBuf>,

    /// A typed note. Repeat for several notes.
    #[arg(long = "text")]
    texts: Vec<String>,

    /// A file whose contents are one typed note. Repeatable.
    #[arg(long = "text-file")]
    text_files: Vec<PathBuf>,

    /// Write JSON results to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write a summary in this language.
    #[arg(long)]
    summary_language: Option<String>,

    /// Where to write the summary (default: stdout).
    #[arg(long, requires = "summary_language")]
    summary_output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SummarizeArgs {
    /// JSON result file written by `extract`.
    results: PathBuf,

    /// Summary language: german, english, french, italian.
    #[arg(short, long, default_value = "english")]
    language: String,

    /// Write the summary to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO logs would tear through the progress bar; keep them off while
    // it is active.
    let show_progress =
        !cli.quiet && !cli.no_progress && matches!(cli.command, Command::Extract(_));
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
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli.model, progress_cb)?;
    let digitizer = Digitizer::new(config).context("Could not set up the inference client")?;

    // ── Ctrl-C cancels in-flight work ────────────────────────────────────
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("{} cancelling…", yellow("⚠"));
                cancel.cancel();
            }
        });
    }

    match &cli.command {
        Command::Extract(args) => run_extract(&digitizer, args, &cancel, cli.quiet).await,
        Command::Summarize(args) => run_summarize(&digitizer, args, &cancel, cli.quiet).await,
    }
}

async fn run_extract(
    digitizer: &Digitizer,
    args: &ExtractArgs,
    cancel: &CancellationToken,
    quiet: bool,
) -> Result<()> {
    let mut batch = Batch::new();
    for path in &args.images {
        batch = batch.image_path(path);
    }
    for text in &args.texts {
        batch = batch.text(text);
    }
    for path in &args.text_files {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read typed note from {:?}", path))?;
        batch = batch.text(text);
    }

    let results = digitizer
        .extract_with_cancel(batch.items(), cancel)
        .await
        .context("Extraction failed")?;

    match &args.output {
        Some(path) => {
            results
                .write_json(path)
                .await
                .context("Failed to write results")?;
            if !quiet {
                eprintln!("   results  →  {}", bold(&path.display().to_string()));
            }
        }
        None => {
            let json =
                serde_json::to_string_pretty(&results).context("Failed to serialise results")?;
            println!("{json}");
        }
    }

    if !quiet {
        print_stats(&results);
    }

    if let Some(ref language) = args.summary_language {
        if cancel.is_cancelled() {
            anyhow::bail!("Cancelled before the summary was generated");
        }
        write_summary(digitizer, &results, language, args.summary_output.as_ref(), cancel, quiet)
            .await?;
    }
    Ok(())
}

async fn run_summarize(
    digitizer: &Digitizer,
    args: &SummarizeArgs,
    cancel: &CancellationToken,
    quiet: bool,
) -> Result<()> {
    let json = tokio::fs::read_to_string(&args.results)
        .await
        .with_context(|| format!("Failed to read results from {:?}", args.results))?;
    let results = ResultSet::from_json(&json)
        .with_context(|| format!("{:?} is not a notescribe result file", args.results))?;

    write_summary(
        digitizer,
        &results,
        &args.language,
        args.output.as_ref(),
        cancel,
        quiet,
    )
    .await
}

async fn write_summary(
    digitizer: &Digitizer,
    results: &ResultSet,
    language: &str,
    output: Option<&PathBuf>,
    cancel: &CancellationToken,
    quiet: bool,
) -> Result<()> {
    let skipped = results.results().iter().filter(|r| !r.is_ok()).count();
    if skipped > 0 && !quiet {
        eprintln!(
            "{} {} item(s) without a transcription; their error text is part of the summary input",
            yellow("⚠"),
            skipped
        );
    }

    let summary = digitizer
        .summarize_with_cancel(results, language, cancel)
        .await
        .context("Summary failed")?;

    match output {
        Some(path) => {
            summary
                .write_to(path)
                .await
                .context("Failed to write summary")?;
            if !quiet {
                eprintln!(
                    "{}  {} summary of {} item(s)  →  {}",
                    green("✔"),
                    summary.language.display_name(),
                    summary.item_count,
                    bold(&path.display().to_string()),
                );
            }
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(summary.text.as_bytes())
                .context("Failed to write to stdout")?;
            if !summary.text.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
        }
    }
    Ok(())
}

fn print_stats(results: &ResultSet) {
    let stats = results.stats();
    if stats.uncertain_spans > 0 {
        eprintln!(
            "   {} uncertain reading(s) marked with [..], review before summarizing",
            yellow(&stats.uncertain_spans.to_string())
        );
    }
    eprintln!(
        "   {} tokens in  /  {} tokens out",
        dim(&stats.total_input_tokens.to_string()),
        dim(&stats.total_output_tokens.to_string()),
    );
    for r in results.results() {
        if r.status == ResultStatus::Cancelled {
            eprintln!("   {} {} was cancelled", yellow("⚠"), r.filename);
        }
    }
}

/// Map CLI args to `DigitizerConfig`.
fn build_config(args: &ModelArgs, progress: Option<ProgressCallback>) -> Result<DigitizerConfig> {
    let mut builder = DigitizerConfig::builder()
        .model(&args.model)
        .temperature(args.temperature)
        .max_tokens(args.max_tokens)
        .max_retries(args.max_retries)
        .api_timeout_secs(args.api_timeout)
        .summary_word_budget(args.summary_words);

    if let Some(n) = args.concurrency {
        builder = builder.concurrency(n);
    }
    if let Some(ref key) = args.api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref url) = args.base_url {
        builder = builder.base_url(url);
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
