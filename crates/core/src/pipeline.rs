//! The end-to-end conversion pipeline.
//!
//! A [`Converter`] runs one request through fetch, extraction, rendering and
//! assembly. It holds only immutable configuration, so a single instance can
//! be shared by any number of concurrent requests.
//!
//! # Example
//!
//! ```rust
//! use pagedown_core::{ConversionOptions, Converter};
//!
//! let converter = Converter::new();
//! let options = ConversionOptions { include_metadata: false, ..Default::default() };
//! let result = converter.convert_html("<article><h1>Hi</h1><p>World</p></article>", None, &options).unwrap();
//! assert_eq!(result.markdown, "# Hi\n\nWorld");
//! ```

use serde::{Deserialize, Serialize};
use url::Url;

use crate::assemble::assemble;
use crate::dom::{DomNode, Document};
use crate::error::FailureKind;
use crate::extract::{ExtractConfig, extract};
use crate::fetch::FetchConfig;
use crate::markdown::{ConversionOptions, render_markdown};
use crate::metadata::Metadata;
use crate::{PagedownError, Result};

/// Final output of a conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    /// The assembled Markdown document
    pub markdown: String,
    /// Metadata of the source page
    pub metadata: Metadata,
}

/// Where a request is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Fetching,
    Extracting,
    Rendering,
    Assembling,
    Done,
    Failed(FailureKind),
}

impl Stage {
    fn rank(self) -> u8 {
        match self {
            Stage::Idle => 0,
            Stage::Fetching => 1,
            Stage::Extracting => 2,
            Stage::Rendering => 3,
            Stage::Assembling => 4,
            Stage::Done | Stage::Failed(_) => 5,
        }
    }

    /// True for `Done` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Failed(_))
    }
}

/// Records the stages a request passes through.
///
/// Transitions only move forward; a stage may be skipped (HTML input never
/// fetches) but never revisited.
#[derive(Debug, Clone)]
pub struct StageTracker {
    history: Vec<Stage>,
}

impl StageTracker {
    pub fn new() -> Self {
        Self { history: vec![Stage::Idle] }
    }

    /// The current stage.
    pub fn current(&self) -> Stage {
        self.history.last().copied().unwrap_or(Stage::Idle)
    }

    /// Every stage entered so far, starting with `Idle`.
    pub fn history(&self) -> &[Stage] {
        &self.history
    }

    /// Moves to `next`; backward moves and moves out of a terminal stage
    /// are ignored.
    pub fn advance(&mut self, next: Stage) {
        let current = self.current();
        if current.is_terminal() || next.rank() <= current.rank() {
            tracing::warn!(?current, ?next, "ignored out-of-order stage transition");
            return;
        }

        tracing::debug!(from = ?current, to = ?next, "stage transition");
        self.history.push(next);
    }

    /// Moves to `Failed` with the error's failure kind and hands the error
    /// back.
    pub fn fail(&mut self, err: PagedownError) -> PagedownError {
        tracing::debug!(error = %err, "conversion failed");
        self.advance(Stage::Failed(err.failure_kind()));
        err
    }
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetch and extraction settings for a [`Converter`].
#[derive(Debug, Clone, Default)]
pub struct ConverterConfig {
    pub fetch: FetchConfig,
    pub extract: ExtractConfig,
}

impl ConverterConfig {
    /// Creates a new builder for ConverterConfig.
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder::new()
    }
}

/// Builder for ConverterConfig.
///
/// # Example
///
/// ```rust
/// use pagedown_core::ConverterConfig;
///
/// let config = ConverterConfig::builder()
///     .timeout_ms(5_000)
///     .max_bytes(1024 * 1024)
///     .char_threshold(250)
///     .build();
/// assert_eq!(config.fetch.timeout_ms, 5_000);
/// ```
pub struct ConverterConfigBuilder {
    config: ConverterConfig,
}

impl ConverterConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self { config: ConverterConfig::default() }
    }

    /// Sets the fetch timeout in milliseconds.
    pub fn timeout_ms(mut self, value: u64) -> Self {
        self.config.fetch.timeout_ms = value;
        self
    }

    /// Sets the response body cap in bytes.
    pub fn max_bytes(mut self, value: usize) -> Self {
        self.config.fetch.max_bytes = value;
        self
    }

    /// Sets the User-Agent header.
    pub fn user_agent(mut self, value: impl Into<String>) -> Self {
        self.config.fetch.user_agent = value.into();
        self
    }

    /// Sets the text length an extraction attempt must reach.
    pub fn char_threshold(mut self, value: usize) -> Self {
        self.config.extract.char_threshold = value;
        self
    }

    /// Sets the minimum text length of a successful extraction.
    pub fn min_content_length(mut self, value: usize) -> Self {
        self.config.extract.min_content_length = value;
        self
    }

    /// Sets whether all class attributes survive cleaning.
    pub fn keep_classes(mut self, value: bool) -> Self {
        self.config.extract.keep_classes = value;
        self
    }

    /// Builds the config.
    pub fn build(self) -> ConverterConfig {
        self.config
    }
}

impl Default for ConverterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs conversions with a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct Converter {
    config: ConverterConfig,
}

impl Converter {
    /// Creates a converter with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a converter with a custom configuration.
    pub fn with_config(config: ConverterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Fetches `url` and converts the page.
    ///
    /// # Errors
    ///
    /// Any fetch error (see [`crate::fetch::fetch_url`]) or
    /// [`PagedownError::ExtractionFailed`]. No later stage runs after a
    /// failed fetch.
    #[cfg(feature = "fetch")]
    pub async fn convert_url(&self, url: &str, options: &ConversionOptions) -> Result<ConversionResult> {
        let mut tracker = StageTracker::new();
        self.convert_url_tracked(url, options, &mut tracker).await
    }

    /// [`Converter::convert_url`], recording stages in `tracker`.
    #[cfg(feature = "fetch")]
    pub async fn convert_url_tracked(
        &self, url: &str, options: &ConversionOptions, tracker: &mut StageTracker,
    ) -> Result<ConversionResult> {
        tracker.advance(Stage::Fetching);
        let html = match crate::fetch::fetch_url(url, &self.config.fetch).await {
            Ok(html) => html,
            Err(err) => return Err(tracker.fail(err)),
        };

        self.convert_html_tracked(&html, Some(url), options, tracker)
    }

    /// Converts already-fetched HTML. `url`, when given, resolves relative
    /// links and is reported as the original URL.
    ///
    /// # Errors
    ///
    /// [`PagedownError::InvalidInput`] for an unparseable `url`,
    /// [`PagedownError::ExtractionFailed`] when no readable content is found.
    pub fn convert_html(&self, html: &str, url: Option<&str>, options: &ConversionOptions) -> Result<ConversionResult> {
        let mut tracker = StageTracker::new();
        self.convert_html_tracked(html, url, options, &mut tracker)
    }

    /// [`Converter::convert_html`], recording stages in `tracker`.
    pub fn convert_html_tracked(
        &self, html: &str, url: Option<&str>, options: &ConversionOptions, tracker: &mut StageTracker,
    ) -> Result<ConversionResult> {
        match self.run(html, url, options, tracker) {
            Ok(result) => {
                tracker.advance(Stage::Done);
                Ok(result)
            }
            Err(err) => Err(tracker.fail(err)),
        }
    }

    fn run(
        &self, html: &str, url: Option<&str>, options: &ConversionOptions, tracker: &mut StageTracker,
    ) -> Result<ConversionResult> {
        let base_url = url
            .map(|u| Url::parse(u.trim()).map_err(|e| PagedownError::InvalidInput(format!("{u}: {e}"))))
            .transpose()?;

        tracker.advance(Stage::Extracting);
        let doc = Document::parse(html, base_url.as_ref());
        let extraction = extract(&doc, &self.config.extract)?;
        let metadata = extraction.metadata;
        let has_text = extraction.content.text_length() > 0;

        tracker.advance(Stage::Rendering);
        let body = render_markdown(&DomNode::Element(extraction.content), options);
        if body.is_empty() && has_text {
            return Err(PagedownError::Render("content rendered to an empty document".to_string()));
        }
        tracing::debug!(bytes = body.len(), "rendered markdown");

        tracker.advance(Stage::Assembling);
        let markdown = assemble(&body, &metadata, url.map(str::trim), options.include_metadata);

        Ok(ConversionResult { markdown, metadata })
    }
}
