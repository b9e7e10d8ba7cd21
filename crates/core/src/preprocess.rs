//! Tree cleanup before scoring.
//!
//! Works on an owned copy of the document body. Non-content elements and
//! class/id marked navigation chrome are removed outright; secondary content
//! such as comments and sidebars is removed only when the attempt asks for it.
//! `div`s holding only phrasing content are turned into paragraphs so their
//! text gets scored.

use std::sync::LazyLock;

use regex::Regex;

use crate::dom::{DomNode, Element, is_block_tag};

/// Elements that never carry article content.
const REMOVED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "iframe", "svg", "canvas", "object", "embed", "nav", "footer",
    "aside", "input", "button", "select", "textarea", "link", "meta",
];

/// ARIA roles that mark navigation chrome.
const UNLIKELY_ROLES: &[&str] = &["menu", "menubar", "complementary", "navigation", "alert", "alertdialog", "dialog"];

/// Tags never removed by the unlikely-candidate pass.
const PROTECTED_TAGS: &[&str] = &[
    "html", "body", "article", "main", "table", "tbody", "thead", "tr", "td", "th", "a", "code", "pre",
];

static CHROME_CANDIDATES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)-ad-|\bads?\b|ad-break|agegate|banner|breadcrumbs|cookie|footer|gdpr|menu|navbar|\bnav\b|pagination|pager|popup|shoutbox|skyscraper|sponsor|yom-remote",
    )
    .expect("CHROME_CANDIDATES regex should compile")
});

static UNLIKELY_CANDIDATES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)ai2html|combx|comment|community|cover-wrap|disqus|extra|header|legends|related|remark|replies|rss|sidebar|social|supplemental",
    )
    .expect("UNLIKELY_CANDIDATES regex should compile")
});

static MAYBE_CANDIDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)and|article|body|column|content|main|shadow").expect("MAYBE_CANDIDATE regex should compile")
});

static HIDDEN_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)display\s*:\s*none|visibility\s*:\s*hidden").expect("HIDDEN_STYLE regex should compile")
});

/// Per-attempt preprocessing flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreprocessConfig {
    /// Also remove elements whose class/id looks like secondary content
    /// (comments, sidebars, related links). Navigation, footer and ad chrome
    /// is removed regardless.
    pub strip_unlikely: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self { strip_unlikely: true }
    }
}

/// Cleans `root` in place.
pub fn preprocess(root: &mut Element, config: &PreprocessConfig) {
    clean(root, config);
}

fn clean(el: &mut Element, config: &PreprocessConfig) {
    el.children.retain(|child| match child {
        DomNode::Comment(_) => false,
        DomNode::Element(child) => keep_element(child, config),
        DomNode::Text(_) | DomNode::Document(_) => true,
    });

    for child in el.children.iter_mut() {
        if let DomNode::Element(child) = child {
            clean(child, config);
        }
    }

    if el.tag == "div" {
        normalize_div(el);
    }
}

fn keep_element(el: &Element, config: &PreprocessConfig) -> bool {
    if REMOVED_TAGS.contains(&el.tag.as_str()) || is_hidden(el) || is_chrome(el) {
        return false;
    }

    !(config.strip_unlikely && is_unlikely_candidate(el))
}

/// True for elements hidden from readers.
pub fn is_hidden(el: &Element) -> bool {
    el.attrs.contains_key("hidden")
        || el.attr("aria-hidden").is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
        || el.attr("style").is_some_and(|style| HIDDEN_STYLE.is_match(style))
}

/// True if the element's class/id or role marks it as navigation, footer or
/// ad chrome. Removed in every attempt.
pub fn is_chrome(el: &Element) -> bool {
    if PROTECTED_TAGS.contains(&el.tag.as_str()) {
        return false;
    }

    if el.attr("role").is_some_and(|role| UNLIKELY_ROLES.contains(&role.trim().to_ascii_lowercase().as_str())) {
        return true;
    }

    let match_string = el.match_string();
    CHROME_CANDIDATES.is_match(&match_string) && !MAYBE_CANDIDATE.is_match(&match_string)
}

/// True if the element's class/id marks it as secondary content.
pub fn is_unlikely_candidate(el: &Element) -> bool {
    if PROTECTED_TAGS.contains(&el.tag.as_str()) {
        return false;
    }

    let match_string = el.match_string();
    UNLIKELY_CANDIDATES.is_match(&match_string) && !MAYBE_CANDIDATE.is_match(&match_string)
}

/// Retags phrasing-only divs as `p`, and wraps loose phrasing runs of mixed
/// divs in `p` elements.
fn normalize_div(el: &mut Element) {
    let has_block_child = el.element_children().any(|child| is_block_tag(&child.tag));

    if !has_block_child {
        if !el.text_content().trim().is_empty() {
            el.tag = "p".to_string();
        }
        return;
    }

    let mut children = Vec::with_capacity(el.children.len());
    let mut run: Vec<DomNode> = Vec::new();

    for child in el.children.drain(..) {
        let is_phrasing = match &child {
            DomNode::Element(child_el) => !is_block_tag(&child_el.tag),
            _ => true,
        };

        if is_phrasing {
            run.push(child);
        } else {
            flush_run(&mut run, &mut children);
            children.push(child);
        }
    }
    flush_run(&mut run, &mut children);

    el.children = children;
}

fn flush_run(run: &mut Vec<DomNode>, out: &mut Vec<DomNode>) {
    if run.is_empty() {
        return;
    }

    let has_content = run.iter().any(|node| match node {
        DomNode::Text(text) => !text.trim().is_empty(),
        DomNode::Element(_) => true,
        _ => false,
    });

    if has_content {
        let mut p = Element::new("p");
        p.children = std::mem::take(run);
        out.push(DomNode::Element(p));
    } else {
        out.append(run);
    }
}
