//! The oracle boundary: tagged verdicts over a free-text remote protocol.
//!
//! The remote classification service answers in free-form text with embedded
//! sentinel strings (`"NO RELEVANT INFORMATION"`, `"OVERLAP IN CONTENT"`,
//! `"PASS"`). That control-in-band protocol is fragile, so it is confined to
//! this one adapter: everything past [`SlideOracle`] works with the tagged
//! types [`SlideVerdict`] and [`Comparison`] and never matches on strings.
//!
//! The oracle's judgments are **not** assumed deterministic — re-running the
//! same input may yield a different verdict. Tests therefore use scripted
//! mock implementations of [`SlideOracle`] rather than replaying transcripts.

use crate::config::NotesConfig;
use crate::error::NotesError;
use crate::prompts;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// One rasterised slide, ready for classification.
#[derive(Clone)]
pub struct SlideImage {
    /// 1-based slide index, contiguous over the deck.
    pub index: usize,
    /// Base64 PNG payload for the vision API.
    pub image: ImageData,
}

/// Relevance verdict for one slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlideVerdict {
    /// The slide carries content worth summarising.
    Relevant { description: String },
    /// Title slide, video thumbnail, bare illustration — skip it.
    Irrelevant,
}

/// Overlap verdict for two consecutive relevant slides' descriptions.
///
/// The threshold ("more than half the content") is a single boolean judgment
/// made by the oracle; there is no numeric score to tune and the resolver
/// never second-guesses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    /// The descriptions are sufficiently distinct.
    Pass,
    /// More than half the content overlaps; `summary` describes the overlap.
    Overlap { summary: String },
}

/// Cumulative token usage across all oracle calls in a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OracleUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// The four judgments the pipeline delegates to the remote service.
///
/// Mockable seam: integration tests drive the whole pipeline with a scripted
/// implementation and never touch the network.
pub trait SlideOracle: Send + Sync {
    /// Judge one slide image against the theme.
    fn classify(
        &self,
        slide: &SlideImage,
        theme: &str,
    ) -> impl Future<Output = Result<SlideVerdict, NotesError>> + Send;

    /// Compare the previous kept description against the current one.
    fn compare(
        &self,
        previous: &str,
        current: &str,
    ) -> impl Future<Output = Result<Comparison, NotesError>> + Send;

    /// Edit the overlapping content out of `description`.
    fn remove_overlap(
        &self,
        description: &str,
        overlap: &str,
    ) -> impl Future<Output = Result<String, NotesError>> + Send;

    /// Cast a description into the fixed LaTeX grammar.
    fn format_latex(
        &self,
        description: &str,
    ) -> impl Future<Output = Result<String, NotesError>> + Send;

    /// Token usage accumulated so far. Mocks keep the default zero report.
    fn usage(&self) -> OracleUsage {
        OracleUsage::default()
    }
}

/// Parse a raw classifier reply into a [`SlideVerdict`].
///
/// The sentinel may arrive embedded in otherwise free-form text, so this is a
/// containment check, not an equality check.
pub(crate) fn parse_verdict(content: &str) -> SlideVerdict {
    if content.contains(prompts::SENTINEL_IRRELEVANT) {
        SlideVerdict::Irrelevant
    } else {
        SlideVerdict::Relevant {
            description: content.trim().to_string(),
        }
    }
}

/// Parse a raw comparator reply into a [`Comparison`].
///
/// Anything that does not carry the overlap sentinel counts as a pass — the
/// model sometimes paraphrases "PASS" rather than emitting it verbatim.
pub(crate) fn parse_comparison(content: &str) -> Comparison {
    if content.contains(prompts::SENTINEL_OVERLAP) {
        Comparison::Overlap {
            summary: content.trim().to_string(),
        }
    } else {
        Comparison::Pass
    }
}

/// Production [`SlideOracle`] backed by an [`LLMProvider`].
///
/// One outbound network call per method invocation; no local retry (callers
/// rely on whatever retry the provider SDK itself performs). Token usage is
/// accumulated across calls and exposed via [`SlideOracle::usage`].
pub struct LlmOracle {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
}

impl LlmOracle {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &NotesConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            input_tokens: AtomicU64::new(0),
            output_tokens: AtomicU64::new(0),
        }
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }

    /// Run one chat completion, record usage, and return the raw content.
    async fn chat(&self, call: &str, messages: Vec<ChatMessage>) -> Result<String, NotesError> {
        let options = self.options();
        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| NotesError::Oracle {
                call: call.to_string(),
                message: e.to_string(),
            })?;

        self.input_tokens
            .fetch_add(response.prompt_tokens as u64, Ordering::Relaxed);
        self.output_tokens
            .fetch_add(response.completion_tokens as u64, Ordering::Relaxed);
        debug!(
            call,
            prompt_tokens = response.prompt_tokens,
            completion_tokens = response.completion_tokens,
            "oracle call complete"
        );

        Ok(response.content)
    }
}

impl SlideOracle for LlmOracle {
    async fn classify(
        &self,
        slide: &SlideImage,
        theme: &str,
    ) -> Result<SlideVerdict, NotesError> {
        let messages = vec![
            ChatMessage::system(prompts::CLASSIFY_SYSTEM_PROMPT),
            ChatMessage::user_with_images(
                prompts::classify_request(theme),
                vec![slide.image.clone()],
            ),
        ];
        let content = self.chat("classify", messages).await?;
        Ok(parse_verdict(&content))
    }

    async fn compare(&self, previous: &str, current: &str) -> Result<Comparison, NotesError> {
        let messages = vec![
            ChatMessage::system(prompts::COMPARE_SYSTEM_PROMPT),
            ChatMessage::user(prompts::compare_request(previous, current)),
        ];
        let content = self.chat("compare", messages).await?;
        Ok(parse_comparison(&content))
    }

    async fn remove_overlap(
        &self,
        description: &str,
        overlap: &str,
    ) -> Result<String, NotesError> {
        let messages = vec![
            ChatMessage::system(prompts::EDIT_SYSTEM_PROMPT),
            ChatMessage::user(prompts::edit_request(description, overlap)),
        ];
        self.chat("edit", messages).await
    }

    async fn format_latex(&self, description: &str) -> Result<String, NotesError> {
        let messages = vec![
            ChatMessage::system(prompts::FORMAT_SYSTEM_PROMPT),
            ChatMessage::user(prompts::format_request(description)),
        ];
        self.chat("format", messages).await
    }

    fn usage(&self) -> OracleUsage {
        OracleUsage {
            input_tokens: self.input_tokens.load(Ordering::Relaxed),
            output_tokens: self.output_tokens.load(Ordering::Relaxed),
        }
    }
}
