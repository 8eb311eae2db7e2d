//! Output types: per-slide records, the overlap log, and run statistics.
//!
//! Everything here is serialisable so the CLI can emit the whole run report
//! as JSON (`--json`) and so callers can persist reports for later diffing.

use crate::error::SlideError;
use crate::oracle::OracleUsage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One detected overlap between two consecutive relevant slides.
///
/// Append-only: records are never removed or rewritten once logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapRecord {
    /// Index of the earlier relevant slide (the comparison baseline).
    pub previous_index: usize,
    /// Index of the slide whose rendered output was trimmed.
    pub current_index: usize,
    /// The oracle's summary of the overlapping content.
    pub summary: String,
}

/// Everything produced for one rendered (non-skipped) slide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideRecord {
    /// 1-based slide index.
    pub index: usize,
    /// The cleaned LaTeX body (between `\begin{document}` and `\end{document}`).
    pub body: String,
    /// Path of the written `document_<index>.tex`.
    pub tex_path: PathBuf,
    /// Path of the written `document_<index>.txt` body copy.
    pub txt_path: PathBuf,
    /// Path of the compiled PDF, once compilation succeeded.
    pub pdf_path: Option<PathBuf>,
    /// Compilation failure, if any. `Some` implies `pdf_path` is `None`.
    pub error: Option<SlideError>,
    /// Oracle input tokens attributed to this slide's calls.
    pub input_tokens: u64,
    /// Oracle output tokens attributed to this slide's calls.
    pub output_tokens: u64,
}

impl SlideRecord {
    /// True when this slide produced a PDF and will be part of the merge.
    pub fn compiled(&self) -> bool {
        self.pdf_path.is_some()
    }
}

/// Statistics for a completed run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Slides in the deck (skipped + rendered).
    pub total_slides: usize,
    /// Slides classified relevant and written as documents.
    pub rendered_slides: usize,
    /// Slides classified irrelevant.
    pub skipped_slides: usize,
    /// Overlap events logged.
    pub overlap_count: usize,
    /// Rendered slides whose document compiled to a PDF.
    pub compiled_slides: usize,
    /// Rendered slides whose compilation failed or timed out.
    pub failed_compiles: usize,
    /// Failed compiles that were timeouts specifically.
    pub timed_out_slides: usize,
    /// Oracle token usage over the whole run.
    pub usage: OracleUsage,
    /// Wall-clock time spent classifying, resolving, and formatting.
    pub classify_duration_ms: u64,
    /// Wall-clock time spent compiling documents.
    pub compile_duration_ms: u64,
    /// Total run duration.
    pub total_duration_ms: u64,
}

/// The complete result of one run.
///
/// Invariant: `skipped` and the indices of `slides` are disjoint and together
/// cover `1..=stats.total_slides` exactly once each — every slide is either
/// skipped or rendered, never both, never neither.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    /// The theme this run was generated for.
    pub theme: String,
    /// One record per rendered slide, in ascending index order.
    pub slides: Vec<SlideRecord>,
    /// Indices of slides classified irrelevant, in ascending order.
    pub skipped: Vec<usize>,
    /// Overlaps found, in detection order.
    pub overlaps: Vec<OverlapRecord>,
    /// Indices whose compilation timed out (subset of the failed records).
    pub timed_out: Vec<usize>,
    /// The merged `Notes_<theme>.pdf`, when at least one slide compiled.
    pub merged_pdf: Option<PathBuf>,
    pub stats: RunStats,
}

impl RunOutput {
    /// Indices of rendered slides, in ascending order.
    pub fn rendered_indices(&self) -> Vec<usize> {
        self.slides.iter().map(|s| s.index).collect()
    }

    /// Indices of slides that compiled and entered the merge.
    pub fn compiled_indices(&self) -> Vec<usize> {
        self.slides
            .iter()
            .filter(|s| s.compiled())
            .map(|s| s.index)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: usize, compiled: bool) -> SlideRecord {
        SlideRecord {
            index,
            body: String::new(),
            tex_path: PathBuf::from(format!("document_{index}.tex")),
            txt_path: PathBuf::from(format!("document_{index}.txt")),
            pdf_path: compiled.then(|| PathBuf::from(format!("document_{index}.pdf"))),
            error: None,
            input_tokens: 0,
            output_tokens: 0,
        }
    }

    #[test]
    fn rendered_and_compiled_indices() {
        let output = RunOutput {
            theme: "T".into(),
            slides: vec![record(2, true), record(3, false), record(4, true)],
            skipped: vec![1],
            overlaps: vec![],
            timed_out: vec![],
            merged_pdf: None,
            stats: RunStats::default(),
        };
        assert_eq!(output.rendered_indices(), vec![2, 3, 4]);
        assert_eq!(output.compiled_indices(), vec![2, 4]);
    }

    #[test]
    fn run_output_round_trips_through_json() {
        let output = RunOutput {
            theme: "OPTICS".into(),
            slides: vec![record(1, true)],
            skipped: vec![],
            overlaps: vec![OverlapRecord {
                previous_index: 1,
                current_index: 2,
                summary: "shared definition".into(),
            }],
            timed_out: vec![],
            merged_pdf: Some(PathBuf::from("Notes_OPTICS.pdf")),
            stats: RunStats::default(),
        };
        let json = serde_json::to_string(&output).unwrap();
        let back: RunOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(back.theme, "OPTICS");
        assert_eq!(back.overlaps.len(), 1);
        assert_eq!(back.merged_pdf, Some(PathBuf::from("Notes_OPTICS.pdf")));
    }
}
