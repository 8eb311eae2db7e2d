//! CLI binary for slidenotes.
//!
//! A thin shim over the library crate that maps CLI flags to `NotesConfig`
//! and prints the run summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use slidenotes::{generate, NotesConfig, NotesProgressCallback, ProgressCallback};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live progress bar over the classification
/// and compile phases, with one printed line per interesting event.
struct CliProgressCallback {
    /// The single progress bar anchored at the bottom of the terminal.
    bar: ProgressBar,
    /// Count of slides skipped as irrelevant.
    skipped: AtomicUsize,
}

impl CliProgressCallback {
    /// Create a callback whose progress-bar length is set dynamically by
    /// `on_run_start` (called after rasterisation, once the count is known).
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_run_start

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening slide deck…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            skipped: AtomicUsize::new(0),
        })
    }

    /// Switch to the full progress-bar style once we know the slide count.
    ///
    /// The bar length is two ticks per slide: one for the classification
    /// phase, one for the compile phase (skipped slides tick immediately in
    /// phase two since there is nothing to compile).
    fn activate_bar(&self, total_slides: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len}  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length((total_slides * 2) as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Processing");
        self.bar.reset_eta();
    }
}

impl NotesProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_slides: usize) {
        self.activate_bar(total_slides);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Working through {total_slides} slides…"))
        ));
    }

    fn on_slide_classified(&self, index: usize, total_slides: usize, relevant: bool) {
        self.bar.set_message(format!("slide {index}"));
        if !relevant {
            self.skipped.fetch_add(1, Ordering::SeqCst);
            self.bar.println(format!(
                "  {} Slide {:>3}/{:<3}  {}",
                dim("·"),
                index,
                total_slides,
                dim("skipped — no relevant content"),
            ));
            // Nothing to write or compile for this slide.
            self.bar.inc(2);
        }
    }

    fn on_overlap(&self, previous_index: usize, current_index: usize) {
        self.bar.println(format!(
            "  {} Slides {} → {}  {}",
            yellow("≈"),
            previous_index,
            current_index,
            dim("overlap trimmed"),
        ));
    }

    fn on_slide_written(&self, index: usize, total_slides: usize, body_len: usize) {
        self.bar.println(format!(
            "  {} Slide {:>3}/{:<3}  {}",
            green("✓"),
            index,
            total_slides,
            dim(&format!("{body_len:>5} chars LaTeX")),
        ));
        self.bar.inc(1);
    }

    fn on_compile_done(&self, index: usize, total_slides: usize, ok: bool) {
        if ok {
            self.bar.set_message(format!("compiled slide {index}"));
        } else {
            self.bar.println(format!(
                "  {} Slide {:>3}/{:<3}  {}",
                red("✗"),
                index,
                total_slides,
                red("compilation failed"),
            ));
        }
        self.bar.inc(1);
    }

    fn on_run_complete(&self, rendered: usize, skipped: usize, failed_compiles: usize) {
        self.bar.finish_and_clear();

        if failed_compiles == 0 {
            eprintln!(
                "{} {} slides rendered, {} skipped",
                green("✔"),
                bold(&rendered.to_string()),
                skipped,
            );
        } else {
            eprintln!(
                "{} {}/{} slides compiled, {} skipped  ({} failed)",
                if failed_compiles == rendered {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&(rendered - failed_compiles).to_string()),
                rendered,
                skipped,
                red(&failed_compiles.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Generate notes for a deck
  slidenotes lecture3.pdf --theme "SURFACE WETTING"

  # Custom output directory and model
  slidenotes lecture3.pdf --theme OPTICS --output ./revision --model gpt-4o

  # From a URL
  slidenotes https://example.edu/slides/week3.pdf --theme "ACID-BASE EQUILIBRIA"

  # Encrypted deck, longer compile budget
  slidenotes exam-review.pdf --theme CALCULUS --password hunter2 --compile-timeout 300

  # Structured JSON run report on stdout
  slidenotes lecture3.pdf --theme OPTICS --json > report.json

OUTPUT LAYOUT:
  <output>/<theme>/document_<i>.tex   full XeLaTeX document per kept slide
  <output>/<theme>/document_<i>.txt   bare LaTeX body (diff-friendly)
  <output>/<theme>/document_<i>.pdf   compiled per-slide PDF
  <output>/<theme>/Notes_<theme>.pdf  merged booklet, in slide order

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID

SETUP:
  1. Set API key:      export OPENAI_API_KEY=sk-...
  2. Install XeLaTeX:  e.g. `apt install texlive-xetex texlive-science`
  3. Generate:         slidenotes lecture3.pdf --theme "YOUR TOPIC"
"#;

/// Generate per-slide LaTeX study notes from a lecture deck using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "slidenotes",
    version,
    about = "Generate per-slide LaTeX study notes from a lecture deck using Vision LLMs",
    long_about = "Rasterise a lecture-slide PDF, classify each slide's relevance to a theme with \
a Vision Language Model, trim content repeated between consecutive slides, and typeset the rest \
as one XeLaTeX study document per slide, merged into a single booklet. Supports OpenAI, \
Anthropic, Google Gemini, and any OpenAI-compatible endpoint (Ollama, vLLM, etc.).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local slide-deck PDF path or HTTP/HTTPS URL.
    deck: String,

    /// Subject of the deck, e.g. "SURFACE WETTING". Focuses the relevance
    /// judgment and names the output directory and merged booklet.
    #[arg(short, long, env = "SLIDENOTES_THEME")]
    theme: String,

    /// Root directory for output artifacts.
    #[arg(short, long, env = "SLIDENOTES_OUTPUT", default_value = "notes")]
    output: PathBuf,

    /// Vision LLM model ID (e.g. gpt-4o, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// Max LLM output tokens per call.
    #[arg(long, env = "SLIDENOTES_MAX_TOKENS", default_value_t = 1024)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "SLIDENOTES_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Maximum rendered slide dimension in pixels.
    #[arg(long, env = "SLIDENOTES_MAX_PIXELS", default_value_t = 2000,
          value_parser = clap::value_parser!(u32).range(100..=8000))]
    max_pixels: u32,

    /// PDF user password for encrypted decks.
    #[arg(long, env = "SLIDENOTES_PASSWORD")]
    password: Option<String>,

    /// LaTeX engine binary (must support fontspec/unicode-math).
    #[arg(long, env = "SLIDENOTES_LATEX", default_value = "xelatex")]
    latex_program: String,

    /// Per-document compile timeout in seconds.
    #[arg(long, env = "SLIDENOTES_COMPILE_TIMEOUT", default_value_t = 120)]
    compile_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "SLIDENOTES_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Output the structured run report as JSON on stdout.
    #[arg(long, env = "SLIDENOTES_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "SLIDENOTES_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SLIDENOTES_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SLIDENOTES_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn NotesProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let output = generate(&cli.deck, &config)
        .await
        .context("Notes generation failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise report")?;
        println!("{json}");
        return Ok(());
    }

    // ── Summary ──────────────────────────────────────────────────────────
    if !cli.quiet {
        if !output.skipped.is_empty() {
            eprintln!(
                "   {} {}",
                dim("skipped slides:"),
                dim(&format_indices(&output.skipped)),
            );
        }
        for overlap in &output.overlaps {
            eprintln!(
                "   {} slide {} repeated slide {}",
                yellow("≈"),
                overlap.current_index,
                overlap.previous_index,
            );
        }
        if !output.timed_out.is_empty() {
            eprintln!(
                "   {} compile timeout on slides {}",
                red("✗"),
                format_indices(&output.timed_out),
            );
        }
        eprintln!(
            "   {} tokens in  /  {} tokens out  —  {}ms total",
            dim(&output.stats.usage.input_tokens.to_string()),
            dim(&output.stats.usage.output_tokens.to_string()),
            output.stats.total_duration_ms,
        );
        match &output.merged_pdf {
            Some(path) => eprintln!(
                "{}  {} slides  →  {}",
                green("✔"),
                output.stats.compiled_slides,
                bold(&path.display().to_string()),
            ),
            None => eprintln!("{}  no slides compiled; no booklet produced", red("✘")),
        }
    }

    if output.merged_pdf.is_none() {
        std::process::exit(1);
    }
    Ok(())
}

/// Map CLI args to `NotesConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<NotesConfig> {
    let mut builder = NotesConfig::builder()
        .theme(&cli.theme)
        .output_root(&cli.output)
        .max_rendered_pixels(cli.max_pixels)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .latex_program(&cli.latex_program)
        .compile_timeout_secs(cli.compile_timeout)
        .download_timeout_secs(cli.download_timeout);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    let mut config = builder.build().context("Invalid configuration")?;

    // Optional fields without dedicated builder chains above.
    config.model = cli.model.clone();
    config.provider_name = cli.provider.clone();
    config.password = cli.password.clone();

    Ok(config)
}

/// "2, 5, 7" for a list of slide indices.
fn format_indices(indices: &[usize]) -> String {
    indices
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
