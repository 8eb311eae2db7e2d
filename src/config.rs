//! Configuration for a notes-generation run.
//!
//! All run behaviour is controlled through [`NotesConfig`], built via its
//! [`NotesConfigBuilder`]. Keeping every knob in one struct makes it trivial
//! to share configs, log them, and diff two runs to understand why their
//! outputs differ.
//!
//! # Design choice: builder over constructor
//! A dozen-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::error::NotesError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for one slide-deck-to-notes run.
///
/// Built via [`NotesConfig::builder()`]. The theme is the only field without
/// a usable default: it focuses the relevance judgment and names the output
/// directory, so [`NotesConfigBuilder::build`] rejects an empty theme.
///
/// # Example
/// ```rust
/// use slidenotes::NotesConfig;
///
/// let config = NotesConfig::builder()
///     .theme("SURFACE WETTING")
///     .output_root("./notes")
///     .compile_timeout_secs(120)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct NotesConfig {
    /// Free-text label describing the subject of the deck.
    ///
    /// Sent to the vision model to focus the relevance judgment, embedded in
    /// each document title, and used to name the per-theme output directory
    /// and the final `Notes_<theme>.pdf`.
    pub theme: String,

    /// Root directory for all output artifacts. Default: `./notes`.
    ///
    /// Artifacts land in `<output_root>/<theme>/`: one `document_<i>.tex`,
    /// `document_<i>.txt`, and `document_<i>.pdf` per rendered slide, plus
    /// the merged `Notes_<theme>.pdf`.
    pub output_root: PathBuf,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 2000.
    ///
    /// A safety cap on rasterisation: a large slide could otherwise produce a
    /// multi-gigapixel bitmap and exhaust memory. Either dimension is capped,
    /// the other scales proportionally. 2000 px also sits in the sweet spot
    /// for GPT-4-class vision tiling.
    pub max_rendered_pixels: u32,

    /// LLM model identifier, e.g. "gpt-4o". If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, uses `ProviderFactory::from_env()`.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for oracle completions. Default: 0.2.
    ///
    /// Low temperature keeps the relevance and overlap verdicts stable and
    /// the LaTeX output faithful to the slide content. The oracle contract is
    /// still non-deterministic; this only narrows the variance.
    pub temperature: f32,

    /// Maximum tokens the oracle may generate per call. Default: 1024.
    ///
    /// A slide description rarely exceeds 900 tokens; the formatted LaTeX body
    /// can run slightly longer. Setting this too low truncates the body
    /// mid-environment and the document will not compile.
    pub max_tokens: usize,

    /// PDF user password for encrypted decks.
    pub password: Option<String>,

    /// LaTeX engine binary invoked per document. Default: "xelatex".
    ///
    /// The fixed preamble uses `fontspec` and `unicode-math`, so the engine
    /// must be XeTeX- or LuaTeX-based.
    pub latex_program: String,

    /// Wall-clock budget per compilation in seconds. Default: 120.
    ///
    /// A document that makes the engine loop (usually a malformed body the
    /// post-processor could not repair) is killed at this deadline, recorded
    /// as timed out, and excluded from the merge. The rest of the run is
    /// unaffected.
    pub compile_timeout_secs: u64,

    /// Download timeout for URL deck inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional per-slide progress callback (drives the CLI progress bar).
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            theme: String::new(),
            output_root: PathBuf::from("notes"),
            max_rendered_pixels: 2000,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.2,
            max_tokens: 1024,
            password: None,
            latex_program: "xelatex".to_string(),
            compile_timeout_secs: 120,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for NotesConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotesConfig")
            .field("theme", &self.theme)
            .field("output_root", &self.output_root)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("latex_program", &self.latex_program)
            .field("compile_timeout_secs", &self.compile_timeout_secs)
            .finish()
    }
}

impl NotesConfig {
    /// Create a new builder for `NotesConfig`.
    pub fn builder() -> NotesConfigBuilder {
        NotesConfigBuilder {
            config: Self::default(),
        }
    }

    /// The per-theme directory all artifacts for this run land in.
    pub fn theme_dir(&self) -> PathBuf {
        self.output_root.join(&self.theme)
    }
}

/// Builder for [`NotesConfig`].
#[derive(Debug)]
pub struct NotesConfigBuilder {
    config: NotesConfig,
}

impl NotesConfigBuilder {
    pub fn theme(mut self, theme: impl Into<String>) -> Self {
        self.config.theme = theme.into();
        self
    }

    pub fn output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.output_root = root.into();
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn latex_program(mut self, program: impl Into<String>) -> Self {
        self.config.latex_program = program.into();
        self
    }

    pub fn compile_timeout_secs(mut self, secs: u64) -> Self {
        self.config.compile_timeout_secs = secs.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<NotesConfig, NotesError> {
        let c = &self.config;
        if c.theme.trim().is_empty() {
            return Err(NotesError::InvalidConfig(
                "Theme must not be empty".into(),
            ));
        }
        // Path separators in the theme would scatter artifacts across
        // directories and break the merged-output filename.
        if c.theme.contains('/') || c.theme.contains('\\') {
            return Err(NotesError::InvalidConfig(format!(
                "Theme must not contain path separators, got '{}'",
                c.theme
            )));
        }
        if c.latex_program.trim().is_empty() {
            return Err(NotesError::InvalidConfig(
                "LaTeX engine program must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let config = NotesConfig::builder().theme("PHOTOSYNTHESIS").build().unwrap();
        assert_eq!(config.latex_program, "xelatex");
        assert_eq!(config.compile_timeout_secs, 120);
        assert_eq!(config.max_rendered_pixels, 2000);
        assert_eq!(config.output_root, PathBuf::from("notes"));
    }

    #[test]
    fn empty_theme_rejected() {
        let err = NotesConfig::builder().theme("  ").build().unwrap_err();
        assert!(err.to_string().contains("Theme"));
    }

    #[test]
    fn theme_with_separator_rejected() {
        assert!(NotesConfig::builder().theme("a/b").build().is_err());
    }

    #[test]
    fn clamps_apply() {
        let config = NotesConfig::builder()
            .theme("T")
            .temperature(9.0)
            .max_rendered_pixels(10)
            .compile_timeout_secs(0)
            .build()
            .unwrap();
        assert_eq!(config.temperature, 2.0);
        assert_eq!(config.max_rendered_pixels, 100);
        assert_eq!(config.compile_timeout_secs, 1);
    }

    #[test]
    fn theme_dir_joins_root_and_theme() {
        let config = NotesConfig::builder()
            .theme("OPTICS")
            .output_root("/tmp/out")
            .build()
            .unwrap();
        assert_eq!(config.theme_dir(), PathBuf::from("/tmp/out/OPTICS"));
    }
}
