//! Error types for Pagedown operations.
//!
//! This module defines the main error type [`PagedownError`] which represents
//! every way a conversion can fail, and [`ErrorKind`], the coarse
//! classification callers use to decide between "your input is the problem",
//! "the page could not be processed" and "the service failed".
//!
//! # Example
//!
//! ```rust
//! use pagedown_core::{ErrorKind, PagedownError};
//!
//! let err = PagedownError::InvalidInput("ftp://example.com".to_string());
//! assert_eq!(err.kind(), ErrorKind::Input);
//! ```

use thiserror::Error;

/// Main error type for conversion operations.
///
/// Every pipeline stage surfaces failures as a single variant of this enum.
/// No stage attempts recovery or returns partial output.
#[derive(Error, Debug)]
pub enum PagedownError {
    /// Malformed or disallowed URL.
    ///
    /// Returned before any network activity when the URL cannot be parsed or
    /// uses a scheme other than `http`/`https`.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Connection, DNS or transport failure from reqwest.
    #[cfg(feature = "fetch")]
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The fetch exceeded its wall-clock budget.
    #[error("Request timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// The response body exceeds the configured size cap.
    ///
    /// `received` is the declared `Content-Length` when the check happened
    /// before download, otherwise the number of bytes read when streaming
    /// was cut off.
    #[error("Response too large: {received} bytes exceeds the {limit} byte limit")]
    TooLarge { limit: usize, received: u64 },

    /// Non-2xx HTTP response.
    #[error("HTTP request failed with status {code}")]
    HttpStatus { code: u16 },

    /// No candidate subtree met the content threshold.
    #[error("Could not extract readable content ({length} characters, minimum {threshold})")]
    ExtractionFailed { length: usize, threshold: usize },

    /// Rendering produced no output for a reachable node.
    ///
    /// Unreachable while the rule set keeps its catch-all; seeing this is an
    /// implementation bug.
    #[error("Markdown rendering failed: {0}")]
    Render(String),
}

/// Coarse classification of a [`PagedownError`] for user-facing feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller's input (URL) is the problem.
    Input,
    /// The page could not be fetched or processed.
    Unprocessable,
    /// The service itself failed.
    Internal,
}

/// Which failure ended a conversion, without the error's payload.
///
/// Finer than [`ErrorKind`]; carried by the pipeline's `Failed` stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Input,
    Network,
    Timeout,
    TooLarge,
    HttpStatus(u16),
    ExtractionFailed,
    Render,
}

impl FailureKind {
    /// The coarse classification for this failure.
    pub fn error_kind(self) -> ErrorKind {
        match self {
            FailureKind::Input => ErrorKind::Input,
            FailureKind::Network
            | FailureKind::Timeout
            | FailureKind::TooLarge
            | FailureKind::HttpStatus(_)
            | FailureKind::ExtractionFailed => ErrorKind::Unprocessable,
            FailureKind::Render => ErrorKind::Internal,
        }
    }
}

impl PagedownError {
    /// The specific failure this error represents.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            PagedownError::InvalidInput(_) => FailureKind::Input,
            #[cfg(feature = "fetch")]
            PagedownError::Network(_) => FailureKind::Network,
            PagedownError::Timeout { .. } => FailureKind::Timeout,
            PagedownError::TooLarge { .. } => FailureKind::TooLarge,
            PagedownError::HttpStatus { code } => FailureKind::HttpStatus(*code),
            PagedownError::ExtractionFailed { .. } => FailureKind::ExtractionFailed,
            PagedownError::Render(_) => FailureKind::Render,
        }
    }

    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        self.failure_kind().error_kind()
    }

    /// Short message suitable for showing to an end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            PagedownError::InvalidInput(_) => "Please enter a valid URL",
            #[cfg(feature = "fetch")]
            PagedownError::Network(_) => "Failed to fetch the webpage",
            PagedownError::HttpStatus { .. } => "Failed to fetch the webpage",
            PagedownError::Timeout { .. } => "Request timed out",
            PagedownError::TooLarge { .. } => "Content is too large to process",
            PagedownError::ExtractionFailed { .. } => "Could not extract readable content from the page",
            PagedownError::Render(_) => "An unexpected error occurred",
        }
    }
}

/// Result type alias for PagedownError.
pub type Result<T> = std::result::Result<T, PagedownError>;
