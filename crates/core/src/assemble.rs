//! Final document assembly.
//!
//! Combines rendered body Markdown with an optional header built from
//! [`Metadata`]: a title heading, a short field block, a rule and the excerpt
//! as a blockquote.

use crate::metadata::Metadata;

/// Characters read per minute for the reading-time estimate.
pub const READING_CHARS_PER_MINUTE: usize = 400;

/// Builds the final Markdown document.
///
/// Without metadata the body is returned with its leading and trailing blank
/// lines removed and nothing else touched. With metadata a header precedes
/// the body; only present fields appear in it. `source_url` falls back to
/// `metadata.url` for the `Original URL` line.
pub fn assemble(markdown: &str, metadata: &Metadata, source_url: Option<&str>, include_metadata: bool) -> String {
    let body = trim_blank_lines(markdown);
    if !include_metadata {
        return body.to_string();
    }

    let mut parts: Vec<String> = Vec::new();

    if let Some(title) = metadata.title.as_deref().filter(|t| !t.trim().is_empty()) {
        parts.push(format!("# {}", title.trim()));
    }

    let fields = header_fields(metadata, source_url);
    if !fields.is_empty() {
        parts.push(fields.join("  \n"));
        parts.push("---".to_string());
    }

    if let Some(excerpt) = metadata.excerpt.as_deref().filter(|e| !e.trim().is_empty()) {
        let quoted: Vec<String> = excerpt.trim().lines().map(|line| format!("> {}", line.trim())).collect();
        parts.push(quoted.join("\n"));
    }

    if !body.is_empty() {
        parts.push(body.to_string());
    }

    parts.join("\n\n")
}

/// Estimated reading time in whole minutes, rounded up.
pub fn reading_time_minutes(length: usize) -> usize {
    length.div_ceil(READING_CHARS_PER_MINUTE)
}

fn header_fields(metadata: &Metadata, source_url: Option<&str>) -> Vec<String> {
    let mut fields = Vec::new();

    if let Some(byline) = present(&metadata.byline) {
        fields.push(format!("**Author:** {byline}"));
    }
    if let Some(site) = present(&metadata.site_name) {
        fields.push(format!("**Source:** {site}"));
    }
    if let Some(url) = source_url.map(str::trim).filter(|u| !u.is_empty()).or_else(|| present(&metadata.url)) {
        fields.push(format!("**Original URL:** {url}"));
    }
    if let Some(length) = metadata.length.filter(|&l| l > 0) {
        fields.push(format!("**Reading time:** ~{} min", reading_time_minutes(length)));
    }

    fields
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Removes whole blank lines from both ends, keeping indentation of the
/// first content line.
fn trim_blank_lines(markdown: &str) -> &str {
    let start = markdown
        .char_indices()
        .find(|&(_, c)| !c.is_whitespace())
        .map(|(i, _)| markdown[..i].rfind('\n').map_or(0, |nl| nl + 1))
        .unwrap_or(markdown.len());
    markdown[start..].trim_end()
}
