//! # slidenotes
//!
//! Turn a lecture-slide PDF into per-slide LaTeX study notes using Vision
//! Language Models (VLMs).
//!
//! ## Why this crate?
//!
//! Lecture decks are a terrible revision medium: half the slides are title
//! cards and video stills, and consecutive slides repeat each other through
//! incremental bullet reveals. This crate rasterises each slide, lets a VLM
//! read it as a student would, skips the slides that carry nothing, trims the
//! content a slide repeats from its predecessor, and typesets what remains as
//! one structured XeLaTeX document per slide — merged at the end into a
//! single `Notes_<theme>.pdf` booklet.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Slide deck (PDF)
//!  │
//!  ├─ 1. Input     resolve local file or download from URL
//!  ├─ 2. Render    rasterise slides via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. Encode    PNG → base64 ImageData
//!  ├─ 4. Classify  VLM relevance verdict per slide, against the theme
//!  ├─ 5. Overlap   compare consecutive kept slides, trim repeated content
//!  ├─ 6. Format    VLM casts each description into a fixed LaTeX grammar
//!  ├─ 7. Polish    deterministic cleanup (fences, escaping, graphics)
//!  ├─ 8. Compile   xelatex per document, bounded by a wall-clock budget
//!  └─ 9. Merge     compiled PDFs → Notes_<theme>.pdf, in slide order
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use slidenotes::{generate, NotesConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = NotesConfig::builder()
//!         .theme("SURFACE WETTING")
//!         .build()?;
//!     let output = generate("lecture3.pdf", &config).await?;
//!     println!(
//!         "{} slides rendered, {} skipped, {} overlaps trimmed",
//!         output.stats.rendered_slides,
//!         output.stats.skipped_slides,
//!         output.stats.overlap_count,
//!     );
//!     if let Some(pdf) = output.merged_pdf {
//!         println!("booklet: {}", pdf.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `slidenotes` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! slidenotes = { version = "0.3", default-features = false }
//! ```
//!
//! ## Partial failure
//!
//! A slide whose document fails to compile (or times out) keeps its `.tex`
//! and `.txt` artifacts, carries a [`SlideError`] in its [`SlideRecord`], and
//! is excluded from the merged booklet. Only deck-level problems abort the
//! run. The LaTeX engine and the VLM are both trait seams ([`LatexEngine`],
//! [`SlideOracle`]), so the whole run is testable offline.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod oracle;
pub mod output;
pub mod overlap;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod run;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{NotesConfig, NotesConfigBuilder};
pub use error::{CompileError, NotesError, SlideError};
pub use oracle::{Comparison, LlmOracle, OracleUsage, SlideImage, SlideOracle, SlideVerdict};
pub use output::{OverlapRecord, RunOutput, RunStats, SlideRecord};
pub use overlap::{OverlapResolver, Resolution};
pub use pipeline::compile::{LatexEngine, XelatexEngine};
pub use progress::{NoopProgressCallback, NotesProgressCallback, ProgressCallback};
pub use run::{generate, generate_from_slides, generate_with};
