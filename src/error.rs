//! Error types for the slidenotes library.
//!
//! Three distinct error types reflect three distinct failure modes:
//!
//! * [`NotesError`] — **Fatal**: the run cannot proceed at all (bad deck file,
//!   wrong password, provider not configured, oracle transport failure during
//!   the classification loop). Returned as `Err(NotesError)` from the
//!   top-level `generate*` functions.
//!
//! * [`CompileError`] — raised by a [`crate::pipeline::compile::LatexEngine`]
//!   for a single document. Never propagated upward as-is; the run loop maps
//!   it into a [`SlideError`] carrying the slide index.
//!
//! * [`SlideError`] — **Non-fatal**: one slide's compilation failed (bad
//!   LaTeX, engine timeout, missing file) but all other slides are fine.
//!   Stored inside [`crate::output::SlideRecord`] so callers can inspect
//!   partial success; the failed slide is simply excluded from the merge.
//!
//! Oracle failures during classification are deliberately fatal: overlap
//! resolution is sequential and a hole in the middle of the slide sequence
//! would silently change every comparison after it.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the slidenotes library.
///
/// Per-slide compilation failures use [`SlideError`] and are stored in
/// [`crate::output::SlideRecord`] rather than propagated here.
#[derive(Debug, Error)]
pub enum NotesError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Slide deck was not found at the given path.
    #[error("Slide deck not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the deck.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("Slide deck '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// Deck requires a password but none was provided.
    #[error("Slide deck '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for slide deck '{path}'")]
    WrongPassword { path: PathBuf },

    /// The deck rasterised to zero slides.
    #[error("Slide deck '{path}' contains no pages")]
    EmptyDeck { path: PathBuf },

    /// pdfium-render returned an error for a specific slide.
    #[error("Rasterisation failed for slide {slide}: {detail}")]
    RasterisationFailed { slide: usize, detail: String },

    // ── Oracle errors ─────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// A remote oracle call (classify / compare / edit / format) failed.
    ///
    /// Fatal on purpose: the classification loop has no per-slide isolation
    /// because overlap resolution depends on every preceding relevant slide.
    #[error("Oracle {call} call failed: {message}")]
    Oracle { call: String, message: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output artifact.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Merging the per-slide PDFs failed.
    #[error("Failed to merge slide PDFs: {detail}")]
    MergeFailed { detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A failure reported by a LaTeX engine for one document.
///
/// The engine does not know which slide it is compiling; the run loop attaches
/// the index when it converts this into a [`SlideError`].
#[derive(Debug, Error)]
pub enum CompileError {
    /// The `.tex` input (or the output directory) does not exist.
    #[error("missing file: '{path}'")]
    MissingFile { path: PathBuf },

    /// The engine binary could not be spawned.
    #[error("LaTeX engine '{program}' could not be started: {detail}")]
    EngineNotFound { program: String, detail: String },

    /// The engine ran past the configured wall-clock budget and was killed.
    #[error("compilation timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The engine exited non-zero. `log` holds the tail of stdout+stderr.
    #[error("engine exited with status {status:?}:\n{log}")]
    Failed { status: Option<i32>, log: String },

    /// I/O error while driving the subprocess.
    #[error("I/O error during compilation: {0}")]
    Io(#[from] std::io::Error),
}

/// A non-fatal error for a single slide's compilation.
///
/// Stored on [`crate::output::SlideRecord`] when the slide's document could
/// not be turned into a PDF. The slide keeps its `.tex`/`.txt` artifacts and
/// is excluded from the final merge; the overall run continues.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum SlideError {
    /// The LaTeX engine exited non-zero for this slide.
    #[error("Slide {index}: compilation failed: {detail}")]
    CompileFailed { index: usize, detail: String },

    /// The LaTeX engine timed out for this slide.
    #[error("Slide {index}: compilation timed out after {secs}s")]
    CompileTimeout { index: usize, secs: u64 },

    /// An expected file was missing when compilation started.
    #[error("Slide {index}: missing file '{path}'")]
    MissingFile { index: usize, path: PathBuf },
}

impl SlideError {
    /// Attach a slide index to an engine-level [`CompileError`].
    pub fn from_compile(index: usize, err: CompileError) -> Self {
        match err {
            CompileError::MissingFile { path } => SlideError::MissingFile { index, path },
            CompileError::Timeout { secs } => SlideError::CompileTimeout { index, secs },
            other => SlideError::CompileFailed {
                index,
                detail: other.to_string(),
            },
        }
    }

    /// The slide this error belongs to.
    pub fn index(&self) -> usize {
        match self {
            SlideError::CompileFailed { index, .. }
            | SlideError::CompileTimeout { index, .. }
            | SlideError::MissingFile { index, .. } => *index,
        }
    }

    /// True when the failure was a timeout (reported separately at run end).
    pub fn is_timeout(&self) -> bool {
        matches!(self, SlideError::CompileTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oracle_error_display() {
        let e = NotesError::Oracle {
            call: "compare".into(),
            message: "connection reset".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("compare"), "got: {msg}");
        assert!(msg.contains("connection reset"));
    }

    #[test]
    fn compile_timeout_maps_to_slide_timeout() {
        let e = SlideError::from_compile(3, CompileError::Timeout { secs: 120 });
        assert!(e.is_timeout());
        assert_eq!(e.index(), 3);
        assert!(e.to_string().contains("120s"));
    }

    #[test]
    fn missing_file_keeps_path() {
        let e = SlideError::from_compile(
            5,
            CompileError::MissingFile {
                path: PathBuf::from("/tmp/document_5.tex"),
            },
        );
        match &e {
            SlideError::MissingFile { index, path } => {
                assert_eq!(*index, 5);
                assert!(path.ends_with("document_5.tex"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn engine_failure_maps_to_compile_failed() {
        let e = SlideError::from_compile(
            2,
            CompileError::Failed {
                status: Some(1),
                log: "! Undefined control sequence.".into(),
            },
        );
        assert!(!e.is_timeout());
        assert!(e.to_string().contains("Undefined control sequence"));
    }
}
