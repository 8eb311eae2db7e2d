//! Prompts for the four oracle calls: classify, compare, edit, format.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — the sentinel strings the remote service
//!    embeds in its replies are defined once, next to the instructions that
//!    ask for them, and re-used by the parser in [`crate::oracle`].
//!
//! 2. **Testability** — unit tests can inspect prompts directly without
//!    spinning up a real model, making prompt regressions easy to catch.

/// Sentinel the classifier returns for slides with nothing worth explaining.
pub const SENTINEL_IRRELEVANT: &str = "NO RELEVANT INFORMATION";

/// Sentinel the comparator returns when more than half the content overlaps.
pub const SENTINEL_OVERLAP: &str = "OVERLAP IN CONTENT";

/// Sentinel the comparator returns when the two descriptions are distinct.
pub const SENTINEL_PASS: &str = "PASS";

/// System prompt for the slide-relevance classification call.
pub const CLASSIFY_SYSTEM_PROMPT: &str = "You are a tutor chatbot helping university students understand PDF slides from their lecturer.";

/// User-message text accompanying the slide image in the classification call.
pub fn classify_request(theme: &str) -> String {
    format!(
        r#"The theme of the slidecast is {theme}.

First, decide whether the slide contains RELEVANT INFORMATION WORTH EXPLAINING.
If the slide has TOO LITTLE RELEVANT INFORMATION (e.g. title slides, video thumbnails, illustrations carrying minimal information), return ONLY the message "{SENTINEL_IRRELEVANT}".
If the slide is RELEVANT to the theme (e.g. practical examples of the theme, statistics, relevant explanations), produce an output following these instructions:

1. Provide a SHORT and CONCISE summary of the slide content.
2. Explain the CONCEPTS, TERMS, DIAGRAMS, GRAPHS, and DATA that are relevant to the theme.
3. If needed, include a NOTES section for additional information.

Follow the instructions exactly."#
    )
}

/// System prompt for the consecutive-slide overlap comparison call.
pub const COMPARE_SYSTEM_PROMPT: &str =
    "You are a bot designed to compare the content of messages.";

/// User message asking for the binary overlap verdict on two descriptions.
pub fn compare_request(previous: &str, current: &str) -> String {
    format!(
        r#"Follow these instructions to evaluate the two messages:

1. Read both messages carefully.
2. Decide whether the content of the two messages overlaps.
3. If more than half of the content overlaps, return the message "{SENTINEL_OVERLAP}" and PROVIDE A SUMMARY of the overlapping content.
4. Otherwise, return the message "{SENTINEL_PASS}".

Here is the first message:"
{previous}
"

Here is the second message:"
{current}
"

Follow the instructions exactly."#
    )
}

/// System prompt for the overlap-removal edit call.
pub const EDIT_SYSTEM_PROMPT: &str = "You are a bot designed to edit the content of messages.";

/// User message asking for the overlap to be edited out of a description.
pub fn edit_request(description: &str, overlap: &str) -> String {
    format!(
        r#"Follow these instructions to edit the message:

1. Read the message and the overlapping content carefully.
2. Remove the overlapping content from the message.
3. Ensure the message remains coherent and makes sense.

Here is the message:"
{description}
"

Here is the overlapping content:"
{overlap}
"

Follow the instructions exactly."#
    )
}

/// System prompt for the LaTeX formatting call.
pub const FORMAT_SYSTEM_PROMPT: &str =
    "You are a bot designed to help structure and create LaTeX notes from unstructured text.";

/// User message asking for a slide description to be cast into the fixed
/// LaTeX grammar: Summary section, Explanations section with newline-separated
/// first-level entries and itemized deeper levels, optional Notes section.
pub fn format_request(description: &str) -> String {
    format!(
        r#"Follow these rules to create a LaTeX document from the given text:

1. Format the output in XeLaTeX-parsable syntax, with proper use of sections, subsections, and formatting commands.
2. The output must be DIRECTLY parsable by a LaTeX compiler.
3. Do NOT include external graphics (e.g. \includegraphics of another file) in the output.
4. Use \textbf{{}} for bold and \textit{{}} for italics, choosing where to apply them from context.
5. ESCAPE characters that are reserved in LaTeX, such as #, $, %, ^, &, _, ~, and \.
6. ONLY the section and subsection titles are fixed. The rest is VARIABLE and may change with the number of points, their hierarchy, and their structure.
7. First-level points under subsections are NOT list items and are NOT separated by empty lines; separate them ONLY with newlines (\\) as in the example.
8. Second and deeper level points use list format, as in the example.
9. Leave NO empty line after a list, as in the example.
10. Do NOT include the preamble. START FROM \begin{{document}} and END AT \end{{document}}.
11. ALWAYS include \maketitle after \begin{{document}}.

Use the following LaTeX example as a reference, not as a hard template:

\begin{{document}}

\maketitle

\section*{{Summary}}

[text]

\section*{{Explanations}}

\subsection*{{Concepts and Terms}}

[text]: [text]\\
[text]: [text]

\subsection*{{Diagrams and Data}}

\textbf{{[text]}}
    \begin{{itemize}}
        \item [text]
        \item [text]
    \end{{itemize}}

\subsection*{{Notes:}}

- [text]\\
- [text]

\end{{document}}

Here is the unstructured text:

{description}

Follow the instructions exactly."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_request_embeds_theme_and_sentinel() {
        let p = classify_request("SURFACE WETTING");
        assert!(p.contains("SURFACE WETTING"));
        assert!(p.contains(SENTINEL_IRRELEVANT));
    }

    #[test]
    fn compare_request_embeds_both_messages() {
        let p = compare_request("first text", "second text");
        assert!(p.contains("first text"));
        assert!(p.contains("second text"));
        assert!(p.contains(SENTINEL_OVERLAP));
        assert!(p.contains(SENTINEL_PASS));
    }

    #[test]
    fn format_request_pins_the_grammar_markers() {
        let p = format_request("some description");
        assert!(p.contains("\\begin{document}"));
        assert!(p.contains("\\end{document}"));
        assert!(p.contains("\\maketitle"));
        assert!(p.contains("\\section*{Summary}"));
        assert!(p.contains("some description"));
    }
}
