//! Turn web pages into clean Markdown.
//!
//! The pipeline fetches a page ([`fetch`]), parses it into an owned tree
//! ([`dom`]), isolates the main content with a readability-style scorer
//! ([`extract`]), renders it with an ordered rule set ([`markdown`]) and
//! prepends an optional metadata header ([`assemble`]). [`Converter`] runs
//! the whole sequence.

pub mod assemble;
pub mod dom;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod markdown;
pub mod metadata;
pub mod pipeline;
pub mod postprocess;
pub mod preprocess;
pub mod scoring;

pub use assemble::assemble;
pub use dom::{Document, DomNode, Element};
pub use error::{ErrorKind, FailureKind, PagedownError, Result};
pub use extract::{ExtractConfig, Extraction, extract};
#[cfg(feature = "fetch")]
pub use fetch::fetch_url;
pub use fetch::{FetchConfig, validate_url};
pub use markdown::{
    BulletListMarker, CodeBlockStyle, ConversionOptions, EmDelimiter, HeadingStyle, MarkdownRenderer, Rule,
    StrongDelimiter, render_markdown,
};
pub use metadata::Metadata;
pub use pipeline::{ConversionResult, Converter, ConverterConfig, ConverterConfigBuilder, Stage, StageTracker};
#[doc(hidden)]
pub use postprocess::PostprocessConfig;
#[doc(hidden)]
pub use preprocess::PreprocessConfig;
#[doc(hidden)]
pub use scoring::{base_tag_score, class_id_weight, content_score, link_density};
