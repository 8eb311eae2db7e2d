//! Document assembly: wrap a body in the fixed XeLaTeX preamble and write
//! the durable per-slide artifacts.
//!
//! The preamble is deliberately static: a known-good package set for notes
//! that mix prose, mathematics, units, and chemical notation. The oracle only
//! ever produces the body, so a compile failure is always attributable to the
//! body text, never to preamble drift between slides.
//!
//! Two files are written per slide under the per-theme directory, keyed by
//! index: `document_<index>.tex` (the full compilable document) and
//! `document_<index>.txt` (the bare body, convenient for diffing runs and for
//! re-formatting without re-querying the oracle).

use crate::error::NotesError;
use crate::pipeline::postprocess;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Fixed XeLaTeX preamble. `{title}` is substituted before writing.
const PREAMBLE: &str = r"\documentclass[12pt]{article}

% Fonts (XeTeX)
\usepackage{lmodern}
\usepackage{fontspec}

% Mathematics
\usepackage{amsmath}
\usepackage{amssymb}
\usepackage{amsfonts}
\usepackage{mathtools}
\usepackage{bm}
\usepackage{physics}
\usepackage{cancel}
\usepackage{braket}
\usepackage{xfrac}

% Chemical notation
\usepackage{chemformula}
\usepackage[version=4]{mhchem}

% Units and scientific notation
\usepackage{siunitx}
\AtBeginDocument{\RenewCommandCopy\qty\SI}

% Greek letters and general symbols
\usepackage{upgreek}
\usepackage{textgreek}
\usepackage{gensymb}

% Typography
\usepackage{xspace}
\usepackage{microtype}

% Unicode characters in math, STIX Two faces
\usepackage{unicode-math}
\setmainfont{STIX Two Text}
\setmathfont{STIX Two Math}
";

/// Build the full compilable document for one slide.
///
/// `body` is the cleaned `\begin{document}` … `\end{document}` window from
/// [`postprocess::clean_latex`]; the preamble and title block go in front of
/// it. The theme is escaped for the title position since it is free text.
pub fn latex_document(body: &str, index: usize, theme: &str) -> String {
    let title = format!(
        "Summary and Explanation of Slide {} on {}",
        index,
        postprocess::escape_stray_reserved(theme)
    );
    format!(
        "{PREAMBLE}\n\\title{{{title}}}\n\\author{{}}\n\\date{{}}\n\n{body}"
    )
}

/// File stem for a slide's artifacts: `document_<index>`.
pub fn document_stem(index: usize) -> String {
    format!("document_{index}")
}

/// Write `document_<index>.tex` and `document_<index>.txt` under `theme_dir`.
///
/// Returns the `.tex` and `.txt` paths. The directory is created if needed;
/// existing files from a previous run are overwritten.
pub async fn write_documents(
    theme_dir: &Path,
    index: usize,
    theme: &str,
    body: &str,
) -> Result<(PathBuf, PathBuf), NotesError> {
    tokio::fs::create_dir_all(theme_dir)
        .await
        .map_err(|e| NotesError::OutputWriteFailed {
            path: theme_dir.to_path_buf(),
            source: e,
        })?;

    let stem = document_stem(index);
    let tex_path = theme_dir.join(format!("{stem}.tex"));
    let txt_path = theme_dir.join(format!("{stem}.txt"));

    let document = latex_document(body, index, theme);
    tokio::fs::write(&tex_path, document)
        .await
        .map_err(|e| NotesError::OutputWriteFailed {
            path: tex_path.clone(),
            source: e,
        })?;

    tokio::fs::write(&txt_path, body)
        .await
        .map_err(|e| NotesError::OutputWriteFailed {
            path: txt_path.clone(),
            source: e,
        })?;

    debug!("Wrote {} and {}", tex_path.display(), txt_path.display());
    Ok((tex_path, txt_path))
}
