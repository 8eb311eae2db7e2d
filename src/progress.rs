//! Progress-callback trait for per-slide run events.
//!
//! Inject an [`Arc<dyn NotesProgressCallback>`] via
//! [`crate::config::NotesConfigBuilder::progress_callback`] to receive
//! real-time events as the pipeline works through the deck.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a channel, a log, or a terminal progress bar without the
//! library knowing how the host application communicates. The trait is
//! `Send + Sync` so the same callback can observe the blocking rasterisation
//! task and the async compile loop.

use std::sync::Arc;

/// Called by the pipeline as it processes each slide.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Events arrive in slide-index order — the pipeline is
/// strictly sequential.
pub trait NotesProgressCallback: Send + Sync {
    /// Called once after rasterisation, before any slide is classified.
    fn on_run_start(&self, total_slides: usize) {
        let _ = total_slides;
    }

    /// Called after the relevance verdict for a slide.
    fn on_slide_classified(&self, index: usize, total_slides: usize, relevant: bool) {
        let _ = (index, total_slides, relevant);
    }

    /// Called when an overlap between two slides is detected and trimmed.
    fn on_overlap(&self, previous_index: usize, current_index: usize) {
        let _ = (previous_index, current_index);
    }

    /// Called after a slide's `.tex`/`.txt` artifacts are written.
    fn on_slide_written(&self, index: usize, total_slides: usize, body_len: usize) {
        let _ = (index, total_slides, body_len);
    }

    /// Called after a compilation attempt for a slide.
    fn on_compile_done(&self, index: usize, total_slides: usize, ok: bool) {
        let _ = (index, total_slides, ok);
    }

    /// Called once after the merge (or after the compile loop when nothing
    /// compiled).
    fn on_run_complete(&self, rendered: usize, skipped: usize, failed_compiles: usize) {
        let _ = (rendered, skipped, failed_compiles);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl NotesProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::NotesConfig`].
pub type ProgressCallback = Arc<dyn NotesProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        classified: AtomicUsize,
        overlaps: AtomicUsize,
        compiles: AtomicUsize,
    }

    impl NotesProgressCallback for TrackingCallback {
        fn on_slide_classified(&self, _index: usize, _total: usize, _relevant: bool) {
            self.classified.fetch_add(1, Ordering::SeqCst);
        }

        fn on_overlap(&self, _previous: usize, _current: usize) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }

        fn on_compile_done(&self, _index: usize, _total: usize, _ok: bool) {
            self.compiles.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(4);
        cb.on_slide_classified(1, 4, false);
        cb.on_overlap(2, 3);
        cb.on_slide_written(2, 4, 512);
        cb.on_compile_done(2, 4, true);
        cb.on_run_complete(3, 1, 0);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let cb = TrackingCallback {
            classified: AtomicUsize::new(0),
            overlaps: AtomicUsize::new(0),
            compiles: AtomicUsize::new(0),
        };
        cb.on_slide_classified(1, 3, false);
        cb.on_slide_classified(2, 3, true);
        cb.on_overlap(2, 3);
        cb.on_compile_done(2, 3, true);
        assert_eq!(cb.classified.load(Ordering::SeqCst), 2);
        assert_eq!(cb.overlaps.load(Ordering::SeqCst), 1);
        assert_eq!(cb.compiles.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_run_start(10);
        cb.on_run_complete(8, 2, 0);
    }
}
