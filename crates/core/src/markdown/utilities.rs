//! Text helpers for Markdown output.

use std::sync::LazyLock;

use regex::Regex;

static ORDERED_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.(\s|$)").expect("ORDERED_MARKER regex should compile"));

static HEADING_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,6}(\s|$)").expect("HEADING_MARKER regex should compile"));

/// Collapse whitespace runs to a single space
pub fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_whitespace = false;

    for c in s.chars() {
        if c.is_whitespace() {
            if !prev_was_whitespace {
                result.push(' ');
                prev_was_whitespace = true;
            }
        } else {
            result.push(c);
            prev_was_whitespace = false;
        }
    }

    result
}

/// Escape Markdown syntax characters in a text node.
///
/// `\ * _ [ ]` and backticks are always escaped. When the text starts a
/// line, leading block markers (`#`, `>`, `-`, `+`, `1.`) are escaped too.
pub fn escape_text(text: &str, at_line_start: bool) -> String {
    let mut result = String::with_capacity(text.len() + 8);

    for c in text.chars() {
        match c {
            '\\' | '*' | '_' | '[' | ']' | '`' => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
    }

    if at_line_start { escape_line_start(&result) } else { result }
}

fn escape_line_start(text: &str) -> String {
    if HEADING_MARKER.is_match(text) || text.starts_with('>') || text.starts_with('-') {
        return format!("\\{text}");
    }

    if text.starts_with("+ ") || text == "+" {
        return format!("\\{text}");
    }

    ORDERED_MARKER.replace(text, "$1\\.$2").into_owned()
}

/// Length of the longest run of `ch` in `s`.
pub fn longest_run(s: &str, ch: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in s.chars() {
        if c == ch {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Clean an attribute value (trim and handle empty)
pub fn clean_attribute(value: Option<&str>) -> String {
    value.map(collapse_whitespace).map(|v| v.trim().to_string()).unwrap_or_default()
}

/// Wraps inline content in delimiters, moving flanking whitespace outside
/// them so `<em> a </em>` becomes ` *a* ` rather than `* a *`.
pub fn wrap_inline(content: &str, open: &str, close: &str) -> String {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return if content.is_empty() { String::new() } else { " ".to_string() };
    }

    let leading = if content.starts_with(char::is_whitespace) { " " } else { "" };
    let trailing = if content.ends_with(char::is_whitespace) { " " } else { "" };
    format!("{leading}{open}{trimmed}{close}{trailing}")
}

/// Wraps rendered block content in blank-line separators.
pub fn block(content: &str) -> String {
    format!("\n\n{content}\n\n")
}

/// Appends a rendered piece to `out`, merging the newline runs at the seam.
///
/// The seam gets the larger of the two runs, capped at two (one blank
/// line). Doubled spaces across inline seams collapse to one.
pub fn append_output(out: &mut String, piece: &str) {
    if piece.is_empty() {
        return;
    }

    let body = piece.trim_start_matches('\n');
    let leading = piece.len() - body.len();
    let kept = out.trim_end_matches('\n').len();
    let trailing = out.len() - kept;

    if leading == 0 && trailing == 0 {
        if out.ends_with(' ') {
            out.push_str(body.trim_start_matches(' '));
        } else {
            out.push_str(body);
        }
        return;
    }

    out.truncate(kept);
    let without_spaces = out.trim_end_matches(' ').len();
    out.truncate(without_spaces);

    for _ in 0..leading.max(trailing).min(2) {
        out.push('\n');
    }
    out.push_str(body);
}

/// Final cleanup of rendered Markdown.
///
/// Outside fenced code blocks, trailing whitespace is trimmed per line and
/// runs of blank lines collapse to one. Fenced code is left untouched.
/// Leading and trailing blank lines are removed.
pub fn normalize_output(markdown: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut fence: Option<(char, usize)> = None;
    let mut blank_run = 0;

    for line in markdown.split('\n') {
        if let Some((ch, len)) = fence {
            lines.push(line);
            if is_closing_fence(line, ch, len) {
                fence = None;
            }
            continue;
        }

        let line = line.trim_end();
        if let Some(open) = opening_fence(line) {
            fence = Some(open);
            blank_run = 0;
            lines.push(line);
            continue;
        }

        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        lines.push(line);
    }

    lines.join("\n").trim_start_matches('\n').trim_end().to_string()
}

fn opening_fence(line: &str) -> Option<(char, usize)> {
    let trimmed = line.trim_start();
    let ch = trimmed.chars().next().filter(|c| matches!(c, '`' | '~'))?;
    let len = trimmed.chars().take_while(|&c| c == ch).count();
    (len >= 3).then_some((ch, len))
}

fn is_closing_fence(line: &str, ch: char, len: usize) -> bool {
    let trimmed = line.trim();
    trimmed.chars().count() >= len && trimmed.chars().all(|c| c == ch)
}
