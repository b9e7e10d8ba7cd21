//! Content scoring heuristics.
//!
//! All functions here are pure functions of an element's tag, attributes and
//! text. The weights are fixed constants; identical trees always score
//! identically.

use std::sync::LazyLock;

use regex::Regex;

use crate::dom::{Element, normalize_whitespace};

/// Weight added for class/id names that suggest content.
pub const POSITIVE_WEIGHT: f64 = 25.0;

/// Weight added for class/id names that suggest boilerplate.
pub const NEGATIVE_WEIGHT: f64 = -25.0;

/// Minimum text length for a block to contribute a content score.
pub const MIN_SCORABLE_LENGTH: usize = 25;

/// Characters per content-score point.
pub const CHARS_PER_POINT: usize = 100;

/// Cap on points from text length, and separately from commas.
pub const MAX_DENSITY_POINTS: f64 = 3.0;

/// Tags whose own text is scored and propagated to ancestors.
pub const SCORABLE_TAGS: &[&str] = &["p", "pre", "td", "section", "h2", "h3", "h4", "h5", "h6"];

static POSITIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)article|body|content|entry|hentry|h-entry|main|page|pagination|post|text|blog|story|tweet")
        .expect("POSITIVE regex should compile")
});

static NEGATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)-ad-|hidden|^hid$| hid$| hid |^hid |banner|combx|comment|com-|contact|foot|footer|footnote|gdpr|masthead|media|meta|outbrain|promo|related|scroll|share|shoutbox|sidebar|skyscraper|sponsor|shopping|tags|widget",
    )
    .expect("NEGATIVE regex should compile")
});

/// Calculate the base score for an element based on its tag name
///
/// - ARTICLE: +10
/// - SECTION: +8
/// - DIV: +5
/// - PRE, TD, BLOCKQUOTE: +3
/// - FORM, ADDRESS, lists: -3
/// - H1-H6, TH, HEADER: -5
pub fn base_tag_score(element: &Element) -> f64 {
    match element.tag.as_str() {
        "article" => 10.0,
        "section" => 8.0,
        "div" => 5.0,
        "pre" | "td" | "blockquote" => 3.0,
        "form" | "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" | "header" => -5.0,
        _ => 0.0,
    }
}

/// Class/id weight: positive when the names suggest content, negative when
/// they suggest boilerplate and nothing positive.
pub fn class_id_weight(element: &Element) -> f64 {
    let match_string = element.match_string();
    if match_string.trim().is_empty() {
        return 0.0;
    }

    if POSITIVE.is_match(&match_string) {
        POSITIVE_WEIGHT
    } else if NEGATIVE.is_match(&match_string) {
        NEGATIVE_WEIGHT
    } else {
        0.0
    }
}

/// Content score of a scorable block.
///
/// `1 + min(commas, 3) + min(len / 100, 3)`; `None` for tags that are not
/// scored or text shorter than [`MIN_SCORABLE_LENGTH`].
pub fn content_score(element: &Element) -> Option<f64> {
    if !SCORABLE_TAGS.contains(&element.tag.as_str()) {
        return None;
    }

    let text = normalize_whitespace(&element.text_content());
    let length = text.chars().count();
    if length < MIN_SCORABLE_LENGTH {
        return None;
    }

    let commas = text.chars().filter(|c| matches!(c, ',' | '，')).count() as f64;
    let length_points = (length / CHARS_PER_POINT) as f64;

    Some(1.0 + commas.min(MAX_DENSITY_POINTS) + length_points.min(MAX_DENSITY_POINTS))
}

/// Ratio of link text to all text, from 0.0 (no links) to 1.0.
///
/// Fragment-only links count for 30 % of their length, since in-page
/// anchors are common inside real content.
pub fn link_density(element: &Element) -> f64 {
    let text_length = normalize_whitespace(&element.text_content()).chars().count();
    if text_length == 0 {
        return 0.0;
    }

    let link_length: f64 = element
        .descendants()
        .filter(|el| el.tag == "a")
        .map(|link| {
            let length = normalize_whitespace(&link.text_content()).chars().count() as f64;
            let is_fragment = link.attr("href").is_some_and(|href| href.starts_with('#'));
            if is_fragment { length * 0.3 } else { length }
        })
        .sum();

    (link_length / text_length as f64).min(1.0)
}

/// Initial score of an element first seen as a candidate.
pub fn initial_score(element: &Element, weight_classes: bool) -> f64 {
    let weight = if weight_classes { class_id_weight(element) } else { 0.0 };
    base_tag_score(element) + weight
}
