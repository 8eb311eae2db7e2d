//! Run orchestration: the top-level entry points that tie the pipeline
//! together.
//!
//! [`generate`] is the primary entry point: it resolves the input, rasterises
//! the deck, constructs the production oracle and LaTeX engine, and delegates
//! to [`generate_from_slides`]. The latter is public so callers (and the
//! integration tests) can drive the whole run with their own [`SlideOracle`]
//! and [`LatexEngine`] implementations — no network, no TeX install.
//!
//! The run is strictly sequential by slide index. Overlap resolution depends
//! on the previous relevant slide's description, so classifying slides
//! concurrently would change the comparisons; one deck is one conversation
//! with the deck's own order.

use crate::config::NotesConfig;
use crate::error::{NotesError, SlideError};
use crate::oracle::{LlmOracle, SlideImage, SlideOracle, SlideVerdict};
use crate::output::{RunOutput, RunStats, SlideRecord};
use crate::overlap::OverlapResolver;
use crate::pipeline::compile::{LatexEngine, XelatexEngine};
use crate::pipeline::{assemble, encode, input, merge, postprocess, render};
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Model used when the caller names a provider without a model.
const DEFAULT_MODEL: &str = "gpt-4o";

/// Generate per-slide study notes for a deck at a local path or URL.
///
/// Renders every slide, classifies each against `config.theme`, trims
/// overlapping content between consecutive relevant slides, writes one
/// XeLaTeX document per kept slide, compiles them, and merges the results
/// into `Notes_<theme>.pdf` under [`NotesConfig::theme_dir`].
///
/// A slide whose document fails to compile is recorded in the returned
/// [`RunOutput`] and excluded from the merge; only deck-level problems (bad
/// file, wrong password, oracle transport failure) abort the run.
pub async fn generate(deck: &str, config: &NotesConfig) -> Result<RunOutput, NotesError> {
    let provider = resolve_provider(config)?;
    let oracle = LlmOracle::new(provider, config);
    let engine = XelatexEngine::new(
        config.latex_program.clone(),
        Duration::from_secs(config.compile_timeout_secs),
    );
    generate_with(deck, &oracle, &engine, config).await
}

/// Like [`generate`], but with caller-supplied oracle and engine.
///
/// Useful for wrapping the oracle (caching, rate limiting) or substituting
/// the LaTeX engine while still letting the library handle input resolution
/// and rasterisation.
pub async fn generate_with<O: SlideOracle, E: LatexEngine>(
    deck: &str,
    oracle: &O,
    engine: &E,
    config: &NotesConfig,
) -> Result<RunOutput, NotesError> {
    let resolved = input::resolve_input(deck, config.download_timeout_secs).await?;

    let rendered = render::render_slides(resolved.path(), config).await?;
    let mut slides = Vec::with_capacity(rendered.len());
    for (index, image) in &rendered {
        let slide = encode::encode_slide(*index, image)
            .map_err(|e| NotesError::Internal(format!("PNG encoding failed: {e}")))?;
        slides.push(slide);
    }
    // `resolved` must outlive rasterisation: dropping it deletes a downloaded
    // temp file.
    drop(resolved);

    generate_from_slides(slides, oracle, engine, config).await
}

/// Run the classification, overlap, compile, and merge phases over
/// already-rasterised slides.
///
/// The injectable `oracle` and `engine` are the two external effects of the
/// run; everything in between is deterministic.
pub async fn generate_from_slides<O: SlideOracle, E: LatexEngine>(
    slides: Vec<SlideImage>,
    oracle: &O,
    engine: &E,
    config: &NotesConfig,
) -> Result<RunOutput, NotesError> {
    if config.theme.trim().is_empty() {
        return Err(NotesError::InvalidConfig("Theme must not be empty".into()));
    }

    let run_start = Instant::now();
    let total_slides = slides.len();
    let theme_dir = config.theme_dir();

    info!(
        theme = %config.theme,
        total_slides,
        output = %theme_dir.display(),
        "starting notes run"
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(total_slides);
    }

    // ── Phase 1: classify, resolve overlaps, format, write ───────────────
    let classify_start = Instant::now();
    let mut resolver = OverlapResolver::new();
    let mut records: Vec<SlideRecord> = Vec::new();
    let mut skipped: Vec<usize> = Vec::new();

    for slide in &slides {
        let usage_before = oracle.usage();
        let verdict = oracle.classify(slide, &config.theme).await?;
        let relevant = matches!(verdict, SlideVerdict::Relevant { .. });
        if let Some(ref cb) = config.progress_callback {
            cb.on_slide_classified(slide.index, total_slides, relevant);
        }

        let description = match verdict {
            SlideVerdict::Irrelevant => {
                debug!(slide = slide.index, "skipped: no relevant content");
                skipped.push(slide.index);
                continue;
            }
            SlideVerdict::Relevant { description } => description,
        };

        let resolution = resolver.resolve(oracle, slide.index, &description).await?;
        if resolution.overlap_detected() {
            if let Some(record) = resolver.overlaps().last() {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_overlap(record.previous_index, record.current_index);
                }
            }
        }

        let formatted = oracle.format_latex(&resolution.description).await?;
        let body = postprocess::clean_latex(&formatted);
        let (tex_path, txt_path) =
            assemble::write_documents(&theme_dir, slide.index, &config.theme, &body).await?;
        if let Some(ref cb) = config.progress_callback {
            cb.on_slide_written(slide.index, total_slides, body.len());
        }

        // The run is sequential, so the usage delta since the classify call
        // is exactly this slide's consumption.
        let usage_after = oracle.usage();
        records.push(SlideRecord {
            index: slide.index,
            body,
            tex_path,
            txt_path,
            pdf_path: None,
            error: None,
            input_tokens: usage_after.input_tokens - usage_before.input_tokens,
            output_tokens: usage_after.output_tokens - usage_before.output_tokens,
        });
    }

    let overlaps = resolver.into_overlaps();
    let classify_duration = classify_start.elapsed();
    info!(
        rendered = records.len(),
        skipped = ?skipped,
        overlaps = overlaps.len(),
        "classification complete in {:.1}s",
        classify_duration.as_secs_f64()
    );

    // ── Phase 2: compile each document ───────────────────────────────────
    let compile_start = Instant::now();
    let mut timed_out: Vec<usize> = Vec::new();

    for record in &mut records {
        match engine.compile(&record.tex_path, &theme_dir).await {
            Ok(pdf_path) => {
                debug!(slide = record.index, "compiled {}", pdf_path.display());
                record.pdf_path = Some(pdf_path);
            }
            Err(err) => {
                let slide_err = SlideError::from_compile(record.index, err);
                warn!(slide = record.index, "{slide_err}");
                if slide_err.is_timeout() {
                    timed_out.push(record.index);
                }
                record.error = Some(slide_err);
            }
        }
        if let Some(ref cb) = config.progress_callback {
            cb.on_compile_done(record.index, total_slides, record.compiled());
        }
    }

    let compile_duration = compile_start.elapsed();
    let failed_compiles = records.iter().filter(|r| !r.compiled()).count();
    if !timed_out.is_empty() {
        warn!(slides = ?timed_out, "compilations killed at the timeout");
    }

    // ── Phase 3: merge the compiled PDFs ─────────────────────────────────
    // The merge list comes from a directory scan, not the records: the scan
    // orders by parsed slide index and skips a booklet left over from a
    // previous run.
    let any_compiled = records.iter().any(|r| r.compiled());

    let merged_pdf = if !any_compiled {
        warn!("no slide compiled; skipping merge");
        None
    } else {
        let output = theme_dir.join(format!("Notes_{}.pdf", config.theme));
        let target = output.clone();
        let scan_dir = theme_dir.clone();
        let pages = tokio::task::spawn_blocking(move || {
            let inputs = merge::collect_slide_pdfs(&scan_dir)?;
            merge::merge_slide_pdfs(&inputs, &target)
        })
        .await
        .map_err(|e| NotesError::Internal(format!("Merge task panicked: {e}")))??;
        info!(pages, "merged booklet at {}", output.display());
        Some(output)
    };

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(records.len(), skipped.len(), failed_compiles);
    }

    let stats = RunStats {
        total_slides,
        rendered_slides: records.len(),
        skipped_slides: skipped.len(),
        overlap_count: overlaps.len(),
        compiled_slides: records.iter().filter(|r| r.compiled()).count(),
        failed_compiles,
        timed_out_slides: timed_out.len(),
        usage: oracle.usage(),
        classify_duration_ms: classify_duration.as_millis() as u64,
        compile_duration_ms: compile_duration.as_millis() as u64,
        total_duration_ms: run_start.elapsed().as_millis() as u64,
    };

    info!(
        rendered = stats.rendered_slides,
        skipped = stats.skipped_slides,
        compiled = stats.compiled_slides,
        failed = stats.failed_compiles,
        "run complete in {:.1}s",
        run_start.elapsed().as_secs_f64()
    );

    Ok(RunOutput {
        theme: config.theme.clone(),
        slides: records,
        skipped,
        overlaps,
        timed_out,
        merged_pdf,
        stats,
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Instantiate a named provider with the given model.
fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, NotesError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        NotesError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. Pre-built provider (`config.provider`) — used as-is.
/// 2. Named provider + model (`config.provider_name`) — instantiated via
///    [`ProviderFactory::create_llm_provider`], which reads the matching API
///    key (`OPENAI_API_KEY`, etc.) from the environment.
/// 3. Environment pair (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`) —
///    honoured before auto-detection so an explicit model choice wins even
///    when several API keys are present.
/// 4. Full auto-detection (`ProviderFactory::from_env`), with OpenAI
///    preferred when its key is set.
fn resolve_provider(config: &NotesConfig) -> Result<Arc<dyn LLMProvider>, NotesError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_vision_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| NotesError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
