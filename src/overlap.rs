//! Overlap resolution across the slide sequence — the core of the pipeline.
//!
//! Consecutive lecture slides frequently repeat each other (incremental
//! bullet reveals, recap slides). The resolver asks the oracle whether the
//! current slide's description substantially overlaps the previous kept
//! one and, if so, has the overlapping portion edited out before the slide
//! is rendered.
//!
//! ## The compare-raw / render-trimmed asymmetry
//!
//! After an overlap edit, the comparison baseline for the *next* slide is set
//! to the **original unedited** description of the current slide, while the
//! *rendered* output for the current slide is the trimmed version. Compare
//! against raw, render trimmed. Without this, a run of N mutually-overlapping
//! slides would shrink the baseline at every step: slide 3 would be compared
//! against an already-trimmed slide 2, miss the repetition that slide 2 shared
//! with slide 1, and re-render it. The baseline must always be the fullest
//! available prior content.
//!
//! Irrelevant slides never reach the resolver, so the baseline is always the
//! last *relevant* slide's description regardless of how many skipped slides
//! intervened.

use crate::error::NotesError;
use crate::oracle::{Comparison, SlideOracle};
use crate::output::OverlapRecord;
use tracing::{debug, info};

/// The sequential comparison state threaded through a run.
///
/// Holds the previous relevant slide's index and **raw** (pre-edit)
/// description. There is deliberately no other state: each decision depends
/// only on the immediately preceding kept description, which is why slides
/// must be resolved in strictly increasing index order.
#[derive(Debug, Default)]
pub struct OverlapResolver {
    baseline: Option<Baseline>,
    log: Vec<OverlapRecord>,
}

#[derive(Debug)]
struct Baseline {
    index: usize,
    description: String,
}

/// Outcome of resolving one relevant slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The description to render: trimmed if an overlap was found, otherwise
    /// the input unchanged.
    pub description: String,
    /// Summary of the overlapping content, when one was found.
    pub overlap: Option<String>,
}

impl Resolution {
    pub fn overlap_detected(&self) -> bool {
        self.overlap.is_some()
    }
}

impl OverlapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the next relevant slide, in index order.
    ///
    /// * First relevant slide: returned unchanged, becomes the baseline.
    /// * Oracle says pass: returned unchanged, becomes the baseline.
    /// * Oracle says overlap: the oracle edits the overlap out; the edited
    ///   text is returned for rendering, the overlap is appended to the log,
    ///   and the **unedited** input becomes the baseline.
    pub async fn resolve<O: SlideOracle>(
        &mut self,
        oracle: &O,
        index: usize,
        description: &str,
    ) -> Result<Resolution, NotesError> {
        let Some(previous) = self.baseline.as_ref() else {
            debug!(slide = index, "first relevant slide, nothing to compare");
            self.set_baseline(index, description);
            return Ok(Resolution {
                description: description.to_string(),
                overlap: None,
            });
        };

        debug!(
            previous = previous.index,
            current = index,
            "comparing consecutive relevant slides"
        );
        let comparison = oracle.compare(&previous.description, description).await?;

        match comparison {
            Comparison::Pass => {
                debug!(slide = index, "no overlap");
                self.set_baseline(index, description);
                Ok(Resolution {
                    description: description.to_string(),
                    overlap: None,
                })
            }
            Comparison::Overlap { summary } => {
                info!(
                    previous = previous.index,
                    current = index,
                    "overlap detected, trimming"
                );
                let edited = oracle.remove_overlap(description, &summary).await?;
                self.log.push(OverlapRecord {
                    previous_index: previous.index,
                    current_index: index,
                    summary: summary.clone(),
                });
                // Baseline keeps the fullest prior content: the raw input,
                // not the trimmed text we are about to render.
                self.set_baseline(index, description);
                Ok(Resolution {
                    description: edited,
                    overlap: Some(summary),
                })
            }
        }
    }

    fn set_baseline(&mut self, index: usize, description: &str) {
        self.baseline = Some(Baseline {
            index,
            description: description.to_string(),
        });
    }

    /// The raw description the next slide will be compared against.
    pub fn baseline(&self) -> Option<&str> {
        self.baseline.as_ref().map(|b| b.description.as_str())
    }

    /// Overlaps found so far, in detection order.
    pub fn overlaps(&self) -> &[OverlapRecord] {
        &self.log
    }

    /// Consume the resolver, yielding the overlap log.
    pub fn into_overlaps(self) -> Vec<OverlapRecord> {
        self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{SlideImage, SlideVerdict};

    /// Scripted oracle: flags an overlap whenever the current description
    /// contains the previous one, and edits by stripping that prefix.
    struct SubstringOracle;

    impl SlideOracle for SubstringOracle {
        async fn classify(
            &self,
            _slide: &SlideImage,
            _theme: &str,
        ) -> Result<SlideVerdict, NotesError> {
            unreachable!("resolver tests never classify")
        }

        async fn compare(&self, previous: &str, current: &str) -> Result<Comparison, NotesError> {
            if current.contains(previous) {
                Ok(Comparison::Overlap {
                    summary: previous.to_string(),
                })
            } else {
                Ok(Comparison::Pass)
            }
        }

        async fn remove_overlap(
            &self,
            description: &str,
            overlap: &str,
        ) -> Result<String, NotesError> {
            Ok(description.replace(overlap, "").trim().to_string())
        }

        async fn format_latex(&self, _description: &str) -> Result<String, NotesError> {
            unreachable!("resolver tests never format")
        }
    }

    #[tokio::test]
    async fn first_relevant_slide_passes_through() {
        let mut resolver = OverlapResolver::new();
        let r = resolver
            .resolve(&SubstringOracle, 1, "contact angles")
            .await
            .unwrap();
        assert_eq!(r.description, "contact angles");
        assert!(!r.overlap_detected());
        assert_eq!(resolver.baseline(), Some("contact angles"));
        assert!(resolver.overlaps().is_empty());
    }

    #[tokio::test]
    async fn pass_updates_baseline_to_current() {
        let mut resolver = OverlapResolver::new();
        resolver.resolve(&SubstringOracle, 1, "alpha").await.unwrap();
        let r = resolver.resolve(&SubstringOracle, 2, "beta").await.unwrap();
        assert!(!r.overlap_detected());
        assert_eq!(resolver.baseline(), Some("beta"));
    }

    #[tokio::test]
    async fn overlap_renders_trimmed_but_baselines_raw() {
        let mut resolver = OverlapResolver::new();
        resolver.resolve(&SubstringOracle, 1, "alpha").await.unwrap();

        // Slide 2 repeats slide 1 and adds new material.
        let r = resolver
            .resolve(&SubstringOracle, 2, "alpha beta")
            .await
            .unwrap();
        assert!(r.overlap_detected());
        assert_eq!(r.description, "beta");
        // Baseline is the raw slide-2 text, not the trimmed render.
        assert_eq!(resolver.baseline(), Some("alpha beta"));

        let log = resolver.overlaps();
        assert_eq!(log.len(), 1);
        assert_eq!((log[0].previous_index, log[0].current_index), (1, 2));
    }

    #[tokio::test]
    async fn third_slide_is_compared_against_raw_second() {
        let mut resolver = OverlapResolver::new();
        resolver.resolve(&SubstringOracle, 1, "alpha").await.unwrap();
        resolver
            .resolve(&SubstringOracle, 2, "alpha beta")
            .await
            .unwrap();

        // "alpha beta gamma" contains the raw slide-2 text "alpha beta".
        // Against the *trimmed* slide-2 text ("beta") the edit would leave
        // "alpha gamma" and re-render the alpha repetition.
        let r = resolver
            .resolve(&SubstringOracle, 3, "alpha beta gamma")
            .await
            .unwrap();
        assert!(r.overlap_detected());
        assert_eq!(r.description, "gamma");
        assert_eq!(resolver.baseline(), Some("alpha beta gamma"));

        let pairs: Vec<_> = resolver
            .overlaps()
            .iter()
            .map(|o| (o.previous_index, o.current_index))
            .collect();
        assert_eq!(pairs, vec![(1, 2), (2, 3)]);
    }

    #[tokio::test]
    async fn record_pairs_skip_over_unresolved_indices() {
        // Slide 2 never reaches the resolver (classified irrelevant), so
        // slide 3 pairs with slide 1 in the log.
        let mut resolver = OverlapResolver::new();
        resolver.resolve(&SubstringOracle, 1, "alpha").await.unwrap();
        let r = resolver
            .resolve(&SubstringOracle, 3, "alpha delta")
            .await
            .unwrap();
        assert!(r.overlap_detected());
        let log = resolver.overlaps();
        assert_eq!((log[0].previous_index, log[0].current_index), (1, 3));
    }
}
