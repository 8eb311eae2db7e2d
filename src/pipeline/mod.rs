//! Pipeline stages for slide-deck-to-notes generation.
//!
//! Each submodule implements exactly one transformation step. Keeping stages
//! separate makes each independently testable and lets us swap
//! implementations (e.g. a different LaTeX engine) without touching other
//! stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ (oracle/overlap) ──▶ postprocess ──▶ assemble ──▶ compile ──▶ merge
//! (URL/path) (pdfium)  (base64)     classify+resolve     (cleanup)      (.tex/.txt)  (xelatex)   (lopdf)
//! ```
//!
//! 1. [`input`]       — canonicalise the user-supplied path or URL to a local file
//! 2. [`render`]      — rasterise every slide; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`encode`]      — PNG-encode and base64-wrap each `DynamicImage` for the
//!    multimodal API request body
//! 4. [`postprocess`] — deterministic LaTeX cleanup rules applied to the
//!    oracle's formatted output (body extraction, escaping, graphics removal)
//! 5. [`assemble`]    — wrap the body in the fixed XeLaTeX preamble and write
//!    the durable `.tex`/`.txt` artifacts
//! 6. [`compile`]     — drive the external LaTeX engine subprocess with a
//!    bounded timeout, behind the [`compile::LatexEngine`] seam
//! 7. [`merge`]       — concatenate the per-slide PDFs in ascending index
//!    order into the final document

pub mod assemble;
pub mod compile;
pub mod encode;
pub mod input;
pub mod merge;
pub mod postprocess;
pub mod render;
