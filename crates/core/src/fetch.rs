//! Content fetching from HTTP/HTTPS URLs.
//!
//! The fetcher enforces three limits before anything downstream runs: only
//! `http`/`https` URLs are accepted, the whole request (headers and body) is
//! bounded by a wall-clock timeout, and the body is capped in size, checked
//! against `Content-Length` up front and again while streaming.

use url::Url;

use crate::{PagedownError, Result};

/// Default wall-clock budget for a fetch.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default body size cap (10 MiB).
pub const DEFAULT_MAX_BYTES: usize = 10 * 1024 * 1024;

/// HTTP client configuration for fetching web pages.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Wall-clock timeout for the whole request in milliseconds.
    pub timeout_ms: u64,
    /// Maximum accepted body size in bytes.
    pub max_bytes: usize,
    /// Custom User-Agent string.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_bytes: DEFAULT_MAX_BYTES,
            user_agent: format!("Mozilla/5.0 (compatible; pagedown/{})", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Parses `url` and checks that it is an absolute `http`/`https` URL.
///
/// Runs before any network call so disallowed input fails fast.
pub fn validate_url(url: &str) -> Result<Url> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(PagedownError::InvalidInput("URL is required".to_string()));
    }

    let parsed = Url::parse(trimmed).map_err(|e| PagedownError::InvalidInput(format!("{trimmed}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(PagedownError::InvalidInput(format!(
                "URL must use HTTP or HTTPS protocol, got {other}:"
            )));
        }
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(PagedownError::InvalidInput(format!("{trimmed}: missing host")));
    }

    Ok(parsed)
}

/// Fetches HTML content from a URL.
///
/// Performs one HTTP GET. Redirects are followed by reqwest's default
/// policy. On timeout the in-flight request future is dropped, which cancels
/// the connection.
///
/// # Errors
///
/// - [`PagedownError::InvalidInput`] for non-http(s) or malformed URLs
/// - [`PagedownError::Timeout`] when `timeout_ms` elapses
/// - [`PagedownError::TooLarge`] when the body exceeds `max_bytes`
/// - [`PagedownError::HttpStatus`] for non-2xx responses
/// - [`PagedownError::Network`] for connection and DNS failures
#[cfg(feature = "fetch")]
pub async fn fetch_url(url: &str, config: &FetchConfig) -> Result<String> {
    use std::time::Duration;

    let parsed = validate_url(url)?;

    let client = reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .build()?;

    tracing::debug!(url = %parsed, timeout_ms = config.timeout_ms, max_bytes = config.max_bytes, "fetching");

    let budget = Duration::from_millis(config.timeout_ms);
    match tokio::time::timeout(budget, download(&client, parsed, config)).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout_ms = config.timeout_ms, "fetch timed out");
            Err(PagedownError::Timeout { timeout_ms: config.timeout_ms })
        }
    }
}

#[cfg(feature = "fetch")]
async fn download(client: &reqwest::Client, url: Url, config: &FetchConfig) -> Result<String> {
    use futures_util::StreamExt;
    use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL};

    let response = client
        .get(url)
        .header(ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
        .header(ACCEPT_LANGUAGE, "en-US,en;q=0.5")
        .header(CACHE_CONTROL, "no-cache")
        .send()
        .await
        .map_err(|e| map_transport_error(e, config))?;

    let status = response.status();
    if !status.is_success() {
        tracing::debug!(status = status.as_u16(), "non-success status");
        return Err(PagedownError::HttpStatus { code: status.as_u16() });
    }

    let limit = config.max_bytes;
    if let Some(declared) = response.content_length()
        && declared > limit as u64
    {
        tracing::debug!(declared, limit, "declared length over cap");
        return Err(PagedownError::TooLarge { limit, received: declared });
    }

    let initial = response.content_length().map_or(0, |len| len as usize).min(limit);
    let mut body: Vec<u8> = Vec::with_capacity(initial);
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| map_transport_error(e, config))?;
        let received = body.len() + chunk.len();
        if received > limit {
            tracing::debug!(received, limit, "body exceeded cap while streaming");
            return Err(PagedownError::TooLarge { limit, received: received as u64 });
        }
        body.extend_from_slice(&chunk);
    }

    tracing::debug!(bytes = body.len(), "fetched body");

    Ok(String::from_utf8_lossy(&body).into_owned())
}

#[cfg(feature = "fetch")]
fn map_transport_error(err: reqwest::Error, config: &FetchConfig) -> PagedownError {
    if err.is_timeout() {
        PagedownError::Timeout { timeout_ms: config.timeout_ms }
    } else {
        PagedownError::Network(err)
    }
}
