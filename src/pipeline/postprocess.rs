//! Post-processing: deterministic cleanup of oracle-formatted LaTeX.
//!
//! ## Why is post-processing necessary?
//!
//! Even a well-prompted model occasionally produces output that is
//! *semantically correct* but will not survive a LaTeX compiler:
//!
//! - Explanatory prose or a stray preamble before `\begin{document}` despite
//!   the prompt saying to start there
//! - Wrapping the whole answer in ` ```latex ... ``` ` fences
//! - An `\includegraphics` of a file that does not exist
//! - Unescaped `%`, `#`, `_`, or `&` in literal text, which silently comments
//!   out the rest of a line or aborts the compile
//!
//! This module applies cheap, deterministic rules that fix those quirks
//! without touching content. Keeping them here rather than in the prompt
//! means the prompt stays focused on *what to write*, not on formatting
//! edge-cases. Each rule is independently testable and the whole pass is
//! idempotent.
//!
//! ## Rule Order
//!
//! Fences are stripped before the document-body window is cut so the window
//! search sees clean input; escaping runs last-but-one so it operates on the
//! final literal text; the final-newline pass closes.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all post-processing rules to the raw formatted output.
///
/// Rules (applied in order):
/// 1. Strip outer markdown fences (models sometimes disobey the prompt)
/// 2. Retain only the `\begin{document}` … `\end{document}` window,
///    inclusive (defends against prepended preamble or commentary)
/// 3. Normalise line endings (CRLF → LF)
/// 4. Remove external-graphics commands (`\includegraphics`, `\graphicspath`)
/// 5. Insert `\maketitle` after `\begin{document}` when the model forgot it
/// 6. Escape stray reserved characters (`#`, `%`, `&`, `_`) in literal text
/// 7. Trim trailing whitespace per line and collapse runs of blank lines
/// 8. Ensure the body ends with exactly one newline
pub fn clean_latex(input: &str) -> String {
    let s = strip_markdown_fences(input);
    let s = extract_document_body(&s);
    let s = normalise_line_endings(&s);
    let s = strip_graphics(&s);
    let s = ensure_maketitle(&s);
    let s = escape_stray_reserved(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    ensure_final_newline(&s)
}

// ── Rule 1: Strip outer markdown fences ──────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:latex|tex)?\n(.*)\n```\s*$").unwrap());

fn strip_markdown_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 2: Retain only the document-body window ─────────────────────────────

const BODY_START: &str = "\\begin{document}";
const BODY_END: &str = "\\end{document}";

/// Cut the text down to `\begin{document}` … `\end{document}` inclusive.
///
/// Models sometimes prepend a preamble or commentary despite rule 10 of the
/// formatting prompt. If either marker is missing the input is returned
/// unchanged — a later compile failure is more diagnosable than silently
/// rendering an empty document.
fn extract_document_body(input: &str) -> String {
    match (input.find(BODY_START), input.rfind(BODY_END)) {
        (Some(start), Some(end)) if end >= start => {
            input[start..end + BODY_END.len()].to_string()
        }
        _ => input.to_string(),
    }
}

// ── Rule 3: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 4: Remove external-graphics commands ────────────────────────────────

static RE_GRAPHICS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^.*\\(?:includegraphics|graphicspath).*\n?").unwrap());

fn strip_graphics(input: &str) -> String {
    RE_GRAPHICS.replace_all(input, "").to_string()
}

// ── Rule 5: Ensure \maketitle is present ─────────────────────────────────────

fn ensure_maketitle(input: &str) -> String {
    if input.contains("\\maketitle") {
        return input.to_string();
    }
    match input.find(BODY_START) {
        Some(pos) => {
            let insert_at = pos + BODY_START.len();
            format!(
                "{}\n\n\\maketitle{}",
                &input[..insert_at],
                &input[insert_at..]
            )
        }
        None => input.to_string(),
    }
}

// ── Rule 6: Escape stray reserved characters ─────────────────────────────────

/// Escape unescaped `#`, `%`, `&`, and `_` in literal text.
///
/// A character scan rather than a regex: whether a character is escaped
/// depends on the parity of preceding backslashes, and `_` is legitimate
/// inside math, so the scan tracks both. Math mode opens and closes on `$`
/// and on the `\[`/`\]` and `\(`/`\)` delimiter pairs (the backslash-parity
/// check keeps `\\[2pt]` out of it). `%` is escaped even inside math — it
/// starts a comment in any TeX mode. `&` and `_` inside math are left alone
/// (alignment and subscripts). The fixed grammar contains no tabular
/// environments, so a literal `&` outside math is always text.
pub(crate) fn escape_stray_reserved(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 16);
    let mut in_math = false;
    let mut prev_backslash = false;

    for ch in input.chars() {
        if ch == '\\' {
            out.push(ch);
            prev_backslash = !prev_backslash;
            continue;
        }
        match ch {
            '$' if !prev_backslash => {
                in_math = !in_math;
                out.push(ch);
            }
            '[' | '(' if prev_backslash => {
                in_math = true;
                out.push(ch);
            }
            ']' | ')' if prev_backslash => {
                in_math = false;
                out.push(ch);
            }
            '%' if !prev_backslash => {
                out.push('\\');
                out.push(ch);
            }
            '#' | '&' | '_' if !prev_backslash && !in_math => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
        prev_backslash = false;
    }

    out
}

// ── Rule 7: Trim trailing whitespace / collapse blank lines ──────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}

// ── Rule 8: Ensure file ends with single newline ─────────────────────────────

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = "\\begin{document}\n\n\\maketitle\n\n\\section*{Summary}\n\nSurface tension holds droplets together.\n\n\\end{document}";

    #[test]
    fn well_formed_body_survives_unchanged_modulo_newline() {
        let cleaned = clean_latex(WELL_FORMED);
        assert_eq!(cleaned, format!("{WELL_FORMED}\n"));
    }

    #[test]
    fn cleaning_is_idempotent() {
        let noisy = "Sure! Here is your document:\n\\begin{document}\n\\section*{Summary}\n50% of samples & 3_of_4 runs\n\\end{document}\nHope this helps!";
        let once = clean_latex(noisy);
        let twice = clean_latex(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn preamble_chatter_is_cut_at_the_markers() {
        let noisy = "\\documentclass{article}\n\\begin{document}\n\\maketitle\nbody\n\\end{document}\ntrailing chatter";
        let cleaned = clean_latex(noisy);
        assert!(cleaned.starts_with("\\begin{document}"));
        assert!(cleaned.trim_end().ends_with("\\end{document}"));
        assert!(!cleaned.contains("documentclass"));
        assert!(!cleaned.contains("chatter"));
    }

    #[test]
    fn missing_markers_leave_input_unchanged() {
        let s = clean_latex("just some text");
        assert_eq!(s, "just some text\n");
    }

    #[test]
    fn markdown_fences_are_stripped() {
        let fenced = "```latex\n\\begin{document}\n\\maketitle\nbody\n\\end{document}\n```";
        let cleaned = clean_latex(fenced);
        assert!(cleaned.starts_with("\\begin{document}"));
        assert!(!cleaned.contains("```"));
    }

    #[test]
    fn graphics_commands_are_removed() {
        let body = "\\begin{document}\n\\maketitle\ntext\n\\includegraphics[width=\\textwidth]{figure1.png}\nmore text\n\\end{document}";
        let cleaned = clean_latex(body);
        assert!(!cleaned.contains("includegraphics"));
        assert!(cleaned.contains("more text"));
    }

    #[test]
    fn reserved_characters_are_escaped() {
        let body = "\\begin{document}\n\\maketitle\n50% of samples contain #3 & the mean_value\n\\end{document}";
        let cleaned = clean_latex(body);
        assert!(cleaned.contains("50\\% of samples contain \\#3 \\& the mean\\_value"));
    }

    #[test]
    fn already_escaped_characters_are_not_doubled() {
        let body = "\\begin{document}\n\\maketitle\n50\\% and \\_underscore\\& done\n\\end{document}";
        let cleaned = clean_latex(body);
        assert!(cleaned.contains("50\\% and \\_underscore\\& done"));
        assert!(!cleaned.contains("\\\\%"));
    }

    #[test]
    fn underscores_inside_math_are_preserved() {
        let body = "\\begin{document}\n\\maketitle\n$x_1 + y_2$ but a_literal\n\\end{document}";
        let cleaned = clean_latex(body);
        assert!(cleaned.contains("$x_1 + y_2$"));
        assert!(cleaned.contains("a\\_literal"));
    }

    #[test]
    fn subscripts_inside_display_math_are_preserved() {
        let body = "\\begin{document}\n\\maketitle\n\\[ E_k = \\frac{1}{2} m v_x^2 \\]\nbut a_literal\n\\end{document}";
        let cleaned = clean_latex(body);
        assert!(cleaned.contains("\\[ E_k = \\frac{1}{2} m v_x^2 \\]"));
        assert!(cleaned.contains("a\\_literal"));
    }

    #[test]
    fn subscripts_inside_inline_paren_math_are_preserved() {
        let body = "\\begin{document}\n\\maketitle\n\\( x_1 + y_2 \\) then a_literal\n\\end{document}";
        let cleaned = clean_latex(body);
        assert!(cleaned.contains("\\( x_1 + y_2 \\)"));
        assert!(cleaned.contains("a\\_literal"));
    }

    #[test]
    fn line_break_optional_argument_does_not_open_math() {
        // `\\[2pt]` is a line break with a dimension, not a math delimiter.
        let body = "\\begin{document}\n\\maketitle\nfirst \\\\[2pt] the mean_value\n\\end{document}";
        let cleaned = clean_latex(body);
        assert!(cleaned.contains("mean\\_value"));
    }

    #[test]
    fn percent_inside_math_is_still_escaped() {
        let body = "\\begin{document}\n\\maketitle\n$50% error$\n\\end{document}";
        let cleaned = clean_latex(body);
        assert!(cleaned.contains("$50\\% error$"));
    }

    #[test]
    fn maketitle_is_inserted_when_missing() {
        let body = "\\begin{document}\n\\section*{Summary}\ntext\n\\end{document}";
        let cleaned = clean_latex(body);
        assert!(cleaned.contains("\\maketitle"));
        let maketitle_pos = cleaned.find("\\maketitle").unwrap();
        let section_pos = cleaned.find("\\section").unwrap();
        assert!(maketitle_pos < section_pos);
    }

    #[test]
    fn crlf_is_normalised() {
        let body = "\\begin{document}\r\n\\maketitle\r\nbody\r\n\\end{document}";
        let cleaned = clean_latex(body);
        assert!(!cleaned.contains('\r'));
    }
}
