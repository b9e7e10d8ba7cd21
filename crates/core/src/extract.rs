//! Main-content extraction.
//!
//! Scores candidate containers, picks the best one, merges related siblings
//! and cleans the result. Extraction runs as a series of attempts with
//! progressively relaxed flags; see [`extract`].

use std::collections::BTreeMap;

use crate::dom::{Document, DomNode, Element};
use crate::metadata::Metadata;
use crate::postprocess::{PostprocessConfig, postprocess};
use crate::preprocess::{PreprocessConfig, preprocess};
use crate::scoring::{content_score, initial_score, link_density};
use crate::{PagedownError, Result};

/// Number of ancestors a block's score propagates to.
const PROPAGATION_LEVELS: usize = 3;

/// Score multiplier applied per ancestor level.
const PROPAGATION_DECAY: f64 = 0.5;

/// Siblings scoring at least this fraction of the top score are merged.
const SIBLING_THRESHOLD: f64 = 0.2;

/// Floor for the sibling merge threshold.
const MIN_SIBLING_SCORE: f64 = 10.0;

/// Containers that are always candidates, even without scored children.
const ALWAYS_CANDIDATE_TAGS: &[&str] = &["article", "main", "section"];

/// Configuration for content extraction
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Text length an attempt must reach to be accepted outright
    pub char_threshold: usize,
    /// Minimum text length of the final result; shorter fails extraction
    pub min_content_length: usize,
    /// Keep all class attributes in the output
    pub keep_classes: bool,
    /// Class names kept when `keep_classes` is off
    pub classes_to_preserve: Vec<String>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            char_threshold: 500,
            min_content_length: 1,
            keep_classes: false,
            classes_to_preserve: vec!["highlight".to_string(), "code".to_string()],
        }
    }
}

/// Per-attempt extraction flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptFlags {
    pub strip_unlikely: bool,
    pub weight_classes: bool,
    pub clean_conditionally: bool,
}

/// Attempts in order: everything on, then each flag turned off in turn.
pub const ATTEMPTS: [AttemptFlags; 4] = [
    AttemptFlags { strip_unlikely: true, weight_classes: true, clean_conditionally: true },
    AttemptFlags { strip_unlikely: false, weight_classes: true, clean_conditionally: true },
    AttemptFlags { strip_unlikely: false, weight_classes: false, clean_conditionally: true },
    AttemptFlags { strip_unlikely: false, weight_classes: false, clean_conditionally: false },
];

/// A scored container, addressed by its child-index path from the scoring
/// root.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub path: Vec<usize>,
    pub score: f64,
}

/// The result of content extraction
#[derive(Debug, Clone)]
pub struct Extraction {
    /// The cleaned main content subtree
    pub content: Element,
    /// Document metadata, completed from the content
    pub metadata: Metadata,
}

/// Extracts the main content of `doc`.
///
/// Each attempt works on a fresh copy of the body. The first attempt whose
/// text length reaches `char_threshold` wins; if none does, the longest
/// result is used.
///
/// # Errors
///
/// [`PagedownError::ExtractionFailed`] when the chosen content is shorter
/// than `min_content_length` characters.
pub fn extract(doc: &Document, config: &ExtractConfig) -> Result<Extraction> {
    let Some(body) = doc.body().or_else(|| doc.html_element()) else {
        return Err(PagedownError::ExtractionFailed { length: 0, threshold: config.min_content_length });
    };

    let mut best: Option<(Element, usize)> = None;

    for (attempt, flags) in ATTEMPTS.iter().enumerate() {
        let content = run_attempt(body, flags, config);
        let length = content.text_length();

        tracing::debug!(attempt, ?flags, length, "extraction attempt");

        if length >= config.char_threshold {
            best = Some((content, length));
            break;
        }

        if best.as_ref().is_none_or(|(_, best_length)| length > *best_length) {
            best = Some((content, length));
        }
    }

    let Some((content, length)) = best else {
        return Err(PagedownError::ExtractionFailed { length: 0, threshold: config.min_content_length });
    };

    if length < config.min_content_length {
        tracing::debug!(length, threshold = config.min_content_length, "no readable content");
        return Err(PagedownError::ExtractionFailed { length, threshold: config.min_content_length });
    }

    let mut metadata = doc.extract_metadata();
    metadata.complete_from_content(&content);

    Ok(Extraction { content, metadata })
}

fn run_attempt(body: &Element, flags: &AttemptFlags, config: &ExtractConfig) -> Element {
    let mut root = body.clone();
    preprocess(&mut root, &PreprocessConfig { strip_unlikely: flags.strip_unlikely });

    let candidates = score_candidates(&root, flags.weight_classes);
    let mut content = select_content(&root, &candidates);

    postprocess(
        &mut content,
        &PostprocessConfig {
            clean_conditionally: flags.clean_conditionally,
            keep_classes: config.keep_classes,
            classes_to_preserve: config.classes_to_preserve.clone(),
        },
    );

    content
}

/// Scores every candidate container under `root`.
///
/// Returned in document order. Scores are final: accumulated content score
/// scaled by `1 - link density`.
pub fn score_candidates(root: &Element, weight_classes: bool) -> Vec<Candidate> {
    let mut scored = Vec::new();
    let mut always = Vec::new();
    collect_scorable(root, &mut Vec::new(), &mut scored, &mut always);

    let mut accumulated: BTreeMap<Vec<usize>, f64> = BTreeMap::new();

    for path in always {
        if let Some(el) = element_at(root, &path) {
            accumulated.entry(path).or_insert_with(|| initial_score(el, weight_classes));
        }
    }

    for (path, score) in scored {
        let mut factor = 1.0;
        for level in 1..=PROPAGATION_LEVELS.min(path.len()) {
            let ancestor_path = &path[..path.len() - level];
            let Some(ancestor) = element_at(root, ancestor_path) else {
                break;
            };

            let entry = accumulated
                .entry(ancestor_path.to_vec())
                .or_insert_with(|| initial_score(ancestor, weight_classes));
            *entry += score * factor;
            factor *= PROPAGATION_DECAY;
        }
    }

    accumulated
        .into_iter()
        .filter_map(|(path, score)| {
            let density = link_density(element_at(root, &path)?);
            Some(Candidate { path, score: score * (1.0 - density) })
        })
        .collect()
}

fn collect_scorable(
    el: &Element, path: &mut Vec<usize>, scored: &mut Vec<(Vec<usize>, f64)>, always: &mut Vec<Vec<usize>>,
) {
    for (index, child) in el.children.iter().enumerate() {
        let DomNode::Element(child) = child else {
            continue;
        };

        path.push(index);

        if ALWAYS_CANDIDATE_TAGS.contains(&child.tag.as_str()) {
            always.push(path.clone());
        }
        if let Some(score) = content_score(child) {
            scored.push((path.clone(), score));
        }

        collect_scorable(child, path, scored, always);
        path.pop();
    }
}

/// Looks up the element at a child-index path; the empty path is `root`.
pub fn element_at<'a>(root: &'a Element, path: &[usize]) -> Option<&'a Element> {
    path.iter()
        .try_fold(root, |el, &index| el.children.get(index).and_then(DomNode::as_element))
}

/// Highest scoring candidate; ties go to the earlier one in document order.
pub fn top_candidate(candidates: &[Candidate]) -> Option<&Candidate> {
    candidates.iter().fold(None, |best: Option<&Candidate>, candidate| match best {
        Some(current) if current.score >= candidate.score => Some(current),
        _ => Some(candidate),
    })
}

/// Builds the content subtree from the top candidate and qualifying
/// siblings. Falls back to the whole root without candidates.
fn select_content(root: &Element, candidates: &[Candidate]) -> Element {
    let Some(top) = top_candidate(candidates) else {
        tracing::debug!("no candidates, using the whole body");
        return root.clone();
    };

    let Some(top_element) = element_at(root, &top.path) else {
        return root.clone();
    };

    tracing::debug!(tag = %top_element.tag, score = top.score, candidates = candidates.len(), "top candidate");

    let Some((&top_index, parent_path)) = top.path.split_last() else {
        return top_element.clone();
    };
    let Some(parent) = element_at(root, parent_path) else {
        return top_element.clone();
    };

    let scores: BTreeMap<&[usize], f64> = candidates.iter().map(|c| (c.path.as_slice(), c.score)).collect();
    let threshold = (top.score * SIBLING_THRESHOLD).max(MIN_SIBLING_SCORE);
    let top_class = top_element.attr("class").filter(|c| !c.trim().is_empty());

    let mut included: Vec<&Element> = Vec::new();
    for (index, child) in parent.children.iter().enumerate() {
        let DomNode::Element(sibling) = child else {
            continue;
        };

        if index == top_index {
            included.push(sibling);
            continue;
        }

        let mut sibling_path = parent_path.to_vec();
        sibling_path.push(index);

        let bonus = match top_class {
            Some(class) if sibling.attr("class") == Some(class) => top.score * SIBLING_THRESHOLD,
            _ => 0.0,
        };

        let qualifies = match scores.get(sibling_path.as_slice()) {
            Some(score) if score + bonus >= threshold => true,
            _ => sibling.tag == "p" && is_related_paragraph(sibling),
        };

        if qualifies {
            tracing::trace!(tag = %sibling.tag, index, "merging sibling");
            included.push(sibling);
        }
    }

    if included.len() == 1 {
        return top_element.clone();
    }

    let mut wrapper = Element::new("div");
    wrapper.children = included.into_iter().cloned().map(DomNode::Element).collect();
    wrapper
}

/// Paragraph siblings worth keeping: long with few links, or short, link
/// free and ending a sentence.
fn is_related_paragraph(p: &Element) -> bool {
    let length = p.text_length();
    let density = link_density(p);
    let text = p.text_content();
    let text = text.trim();

    if length > 80 {
        density < 0.25
    } else {
        length > 0 && density == 0.0 && (text.ends_with('.') || text.contains(". "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph(words: usize) -> String {
        format!("<p>{}</p>", "Lorem ipsum dolor sit amet, consectetur adipiscing elit. ".repeat(words))
    }

    fn body(html: &str) -> Element {
        Document::parse(html, None).body().cloned().unwrap()
    }

    #[test]
    fn test_extract_config_default() {
        let config = ExtractConfig::default();
        assert_eq!(config.char_threshold, 500);
        assert_eq!(config.min_content_length, 1);
        assert!(!config.keep_classes);
    }

    #[test]
    fn test_element_at() {
        let root = body("<div><p>a</p><p>b</p></div>");
        let div_index = root.children.iter().position(|c| c.as_element().is_some()).unwrap();
        let div = element_at(&root, &[div_index]).unwrap();
        assert_eq!(div.tag, "div");
        assert_eq!(element_at(&root, &[]).unwrap().tag, "body");
        assert!(element_at(&root, &[99]).is_none());
    }

    #[test]
    fn test_score_propagation_decays() {
        let root = body(&format!("<div><div><div>{}</div></div></div>", paragraph(2)));
        let candidates = score_candidates(&root, false);

        let p_score = content_score(root.find_first(|e| e.tag == "p").unwrap()).unwrap();
        let depth = |c: &Candidate| c.path.len();

        let parent = candidates.iter().find(|c| depth(c) == 3).unwrap();
        let grandparent = candidates.iter().find(|c| depth(c) == 2).unwrap();
        let great = candidates.iter().find(|c| depth(c) == 1).unwrap();

        assert!((parent.score - (5.0 + p_score)).abs() < 1e-9);
        assert!((grandparent.score - (5.0 + p_score * 0.5)).abs() < 1e-9);
        assert!((great.score - (5.0 + p_score * 0.25)).abs() < 1e-9);
        assert!(candidates.iter().all(|c| !c.path.is_empty()));
    }

    #[test]
    fn test_short_text_contributes_nothing() {
        let root = body("<div><p>tiny</p></div>");
        assert!(score_candidates(&root, true).is_empty());
    }

    #[test]
    fn test_article_is_always_candidate() {
        let root = body("<article><h1>Hi</h1><p>World</p></article>");
        let candidates = score_candidates(&root, true);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].score, 10.0);
    }

    #[test]
    fn test_top_candidate_ties_go_to_first() {
        let candidates = vec![
            Candidate { path: vec![0], score: 5.0 },
            Candidate { path: vec![1], score: 5.0 },
            Candidate { path: vec![2], score: 4.0 },
        ];
        assert_eq!(top_candidate(&candidates).unwrap().path, vec![0]);
        assert!(top_candidate(&[]).is_none());
    }

    #[test]
    fn test_selects_content_over_sidebar() {
        let html = format!(
            r#"<div class="sidebar"><p>{}</p></div><div class="post-body">{}{}{}</div>"#,
            "Sidebar words, here and there.",
            paragraph(4),
            paragraph(4),
            paragraph(4)
        );
        let extraction = extract(&Document::parse(&html, None), &ExtractConfig::default()).unwrap();
        let text = extraction.content.text_content();
        assert!(text.contains("Lorem ipsum"));
        assert!(!text.contains("Sidebar words"));
    }

    #[test]
    fn test_merges_related_siblings() {
        let html = format!(
            r#"<div id="wrap"><div class="entry">{}{}</div><div class="entry">{}{}</div></div>"#,
            paragraph(3),
            paragraph(3),
            paragraph(3),
            paragraph(3)
        );
        let doc = Document::parse(&html, None);
        let extraction = extract(&doc, &ExtractConfig::default()).unwrap();
        let paragraphs = extraction.content.find_all(|e| e.tag == "p");
        assert_eq!(paragraphs.len(), 4);
    }

    #[test]
    fn test_extraction_fails_on_boilerplate_only() {
        let html = r#"<nav><a href="/">Home</a><a href="/about">About</a></nav><footer>Copyright 2024</footer>"#;
        let result = extract(&Document::parse(html, None), &ExtractConfig::default());
        assert!(matches!(result, Err(PagedownError::ExtractionFailed { length: 0, .. })));
    }

    #[test]
    fn test_class_marked_chrome_fails_in_every_attempt() {
        let html = r#"<div class="menu"><a href="/">Home</a><a href="/blog">Blog</a></div>
            <div id="footer"><p>Copyright 2024 Example Corp. All rights reserved.</p></div>"#;
        let result = extract(&Document::parse(html, None), &ExtractConfig::default());
        assert!(matches!(result, Err(PagedownError::ExtractionFailed { length: 0, .. })));
    }

    #[test]
    fn test_empty_document_error() {
        let result = extract(&Document::parse("", None), &ExtractConfig::default());
        assert!(matches!(result, Err(PagedownError::ExtractionFailed { .. })));
    }

    #[test]
    fn test_short_article_uses_longest_attempt() {
        let doc = Document::parse("<article><h1>Hi</h1><p>World</p></article>", None);
        let extraction = extract(&doc, &ExtractConfig::default()).unwrap();
        assert_eq!(extraction.content.tag, "article");
        assert_eq!(extraction.metadata.length, Some("HiWorld".len()));
    }

    #[test]
    fn test_min_content_length_enforced() {
        let doc = Document::parse("<article><p>Short text</p></article>", None);
        let config = ExtractConfig { min_content_length: 100, ..Default::default() };
        let result = extract(&doc, &config);
        assert!(matches!(result, Err(PagedownError::ExtractionFailed { length: 10, threshold: 100 })));
    }

    #[test]
    fn test_relaxed_attempt_recovers_unlikely_content() {
        let html = format!(r#"<div class="comments-area">{}{}</div>"#, paragraph(6), paragraph(6));
        let extraction = extract(&Document::parse(&html, None), &ExtractConfig::default()).unwrap();
        assert!(extraction.content.text_length() >= 500);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let html = format!("<div>{}</div><div>{}</div>", paragraph(3), paragraph(3));
        let doc = Document::parse(&html, None);
        let first = extract(&doc, &ExtractConfig::default()).unwrap();
        let second = extract(&doc, &ExtractConfig::default()).unwrap();
        assert_eq!(first.content, second.content);
    }
}
