//! Cleanup of the selected content subtree.
//!
//! Runs after candidate selection on the owned content element. The root
//! passed in is never removed, only its descendants.

use crate::dom::{DomNode, Element};
use crate::scoring::{class_id_weight, link_density};

/// Attributes dropped everywhere: inline styling and legacy layout hints.
const PRESENTATIONAL_ATTRIBUTES: &[&str] = &[
    "style", "align", "background", "bgcolor", "border", "cellpadding", "cellspacing", "frame", "hspace",
    "rules", "valign", "vspace", "color", "face", "size",
];

/// Size attributes dropped from layout elements only; media keep theirs.
const SIZE_ATTRIBUTES: &[&str] = &["width", "height"];
const SIZED_LAYOUT_TAGS: &[&str] = &["table", "th", "td", "hr", "pre"];

/// Containers removed when empty.
const WRAPPER_TAGS: &[&str] = &["div", "section", "article", "main", "header", "p", "span", "figure", "font"];

/// Elements that count as content without any text.
const MEDIA_TAGS: &[&str] = &["img", "picture", "video", "audio", "iframe", "math", "table", "hr", "pre"];

/// Blocks eligible for conditional cleaning.
const CONDITIONAL_TAGS: &[&str] = &["div", "section", "ul", "ol", "table"];

/// Link density above which a conditional block is dropped.
const MAX_LINK_DENSITY: f64 = 0.5;

/// Configuration for content post-processing
#[derive(Debug, Clone)]
pub struct PostprocessConfig {
    /// Remove link-heavy or negatively weighted blocks
    pub clean_conditionally: bool,
    /// Keep every class attribute as-is
    pub keep_classes: bool,
    /// Class names kept when `keep_classes` is off
    pub classes_to_preserve: Vec<String>,
}

impl Default for PostprocessConfig {
    fn default() -> Self {
        Self {
            clean_conditionally: true,
            keep_classes: false,
            classes_to_preserve: vec!["highlight".to_string(), "code".to_string()],
        }
    }
}

/// Cleans `root` in place.
pub fn postprocess(root: &mut Element, config: &PostprocessConfig) {
    if config.clean_conditionally {
        clean_conditionally(root);
    }

    clean_attributes(root, config);

    remove_empty_wrappers(root);
    collapse_nesting(root);
}

fn clean_attributes(el: &mut Element, config: &PostprocessConfig) {
    let sized_layout = SIZED_LAYOUT_TAGS.contains(&el.tag.as_str());
    el.attrs.retain(|name, _| {
        !(PRESENTATIONAL_ATTRIBUTES.contains(&name.as_str())
            || name.starts_with("on")
            || (sized_layout && SIZE_ATTRIBUTES.contains(&name.as_str())))
    });

    if !config.keep_classes
        && let Some(class) = el.attrs.get("class")
    {
        let kept = class
            .split_whitespace()
            .filter(|name| is_preserved_class(name, &config.classes_to_preserve))
            .collect::<Vec<_>>()
            .join(" ");

        if kept.is_empty() {
            el.attrs.shift_remove("class");
        } else {
            el.attrs.insert("class".to_string(), kept);
        }
    }

    for child in el.children.iter_mut() {
        if let DomNode::Element(child) = child {
            clean_attributes(child, config);
        }
    }
}

/// True for classes that survive class stripping: the configured list plus
/// any `language-*` or `lang-*` class used for code highlighting.
pub fn is_preserved_class(name: &str, preserve: &[String]) -> bool {
    name.starts_with("language-") || name.starts_with("lang-") || preserve.iter().any(|p| p == name)
}

fn clean_conditionally(el: &mut Element) {
    el.children.retain(|child| match child {
        DomNode::Element(child) => !should_remove_conditionally(child),
        _ => true,
    });

    for child in el.children.iter_mut() {
        if let DomNode::Element(child) = child {
            clean_conditionally(child);
        }
    }
}

fn should_remove_conditionally(el: &Element) -> bool {
    if !CONDITIONAL_TAGS.contains(&el.tag.as_str()) || el.contains_tag(&["pre", "code"]) {
        return false;
    }

    let weight = class_id_weight(el);
    if weight < 0.0 {
        tracing::trace!(tag = %el.tag, weight, "dropping negatively weighted block");
        return true;
    }

    let density = link_density(el);
    if density > MAX_LINK_DENSITY {
        tracing::trace!(tag = %el.tag, density, "dropping link-heavy block");
        return true;
    }

    false
}

fn remove_empty_wrappers(el: &mut Element) {
    for child in el.children.iter_mut() {
        if let DomNode::Element(child) = child {
            remove_empty_wrappers(child);
        }
    }

    el.children.retain(|child| match child {
        DomNode::Element(child) => !is_empty_wrapper(child),
        _ => true,
    });
}

fn is_empty_wrapper(el: &Element) -> bool {
    WRAPPER_TAGS.contains(&el.tag.as_str())
        && el.text_content().trim().is_empty()
        && !el.contains_tag(MEDIA_TAGS)
}

fn collapse_nesting(el: &mut Element) {
    while let Some(inner) = single_nested_container(el) {
        *el = inner;
    }

    for child in el.children.iter_mut() {
        if let DomNode::Element(child) = child {
            collapse_nesting(child);
        }
    }
}

/// Takes the only child of a `div`/`section` when that child is itself a
/// container and nothing else but whitespace sits beside it.
fn single_nested_container(el: &mut Element) -> Option<Element> {
    if !matches!(el.tag.as_str(), "div" | "section") {
        return None;
    }

    let mut elements = el.children.iter().filter(|c| !c.is_blank_text());
    let only = elements.next()?;
    if elements.next().is_some() {
        return None;
    }

    match only {
        DomNode::Element(child) if matches!(child.tag.as_str(), "div" | "section" | "article") => {}
        _ => return None,
    }

    let position = el.children.iter().position(|c| !c.is_blank_text())?;
    match el.children.swap_remove(position) {
        DomNode::Element(child) => Some(child),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn body_of(html: &str) -> Element {
        Document::parse(html, None).body().cloned().unwrap()
    }

    fn run(html: &str, config: &PostprocessConfig) -> Element {
        let mut body = body_of(html);
        postprocess(&mut body, config);
        body
    }

    #[test]
    fn test_postprocess_config_default() {
        let config = PostprocessConfig::default();
        assert!(config.clean_conditionally);
        assert!(!config.keep_classes);
        assert_eq!(config.classes_to_preserve, vec!["highlight", "code"]);
    }

    #[test]
    fn test_strips_style_and_presentational_attributes() {
        let body = run(
            r#"<p style="color:red" align="center" onclick="x()" id="keep">Text</p><img src="a.png" width="10">"#,
            &PostprocessConfig::default(),
        );
        let p = body.find_first(|e| e.tag == "p").unwrap();
        assert_eq!(p.attr("style"), None);
        assert_eq!(p.attr("align"), None);
        assert_eq!(p.attr("onclick"), None);
        assert_eq!(p.attr("id"), Some("keep"));

        let img = body.find_first(|e| e.tag == "img").unwrap();
        assert_eq!(img.attr("width"), Some("10"));
    }

    #[test]
    fn test_strips_classes_except_preserved() {
        let body = run(
            r#"<pre class="highlight fancy"><code class="language-rust big">fn main() {}</code></pre><p class="lead">x</p>"#,
            &PostprocessConfig::default(),
        );
        assert_eq!(body.find_first(|e| e.tag == "pre").unwrap().attr("class"), Some("highlight"));
        assert_eq!(body.find_first(|e| e.tag == "code").unwrap().attr("class"), Some("language-rust"));
        assert_eq!(body.find_first(|e| e.tag == "p").unwrap().attr("class"), None);
    }

    #[test]
    fn test_keep_classes() {
        let config = PostprocessConfig { keep_classes: true, ..Default::default() };
        let body = run(r#"<p class="lead intro">x</p>"#, &config);
        assert_eq!(body.find_first(|e| e.tag == "p").unwrap().attr("class"), Some("lead intro"));
    }

    #[test]
    fn test_removes_empty_wrappers() {
        let body = run(
            r#"<div><div>  </div><p></p><span> </span><p><img src="a.png"></p><p>text</p></div>"#,
            &PostprocessConfig::default(),
        );
        let paragraphs = body.find_all(|e| e.tag == "p");
        assert_eq!(paragraphs.len(), 2);
        assert!(body.find_first(|e| e.tag == "span").is_none());
        assert!(body.find_first(|e| e.tag == "img").is_some());
    }

    #[test]
    fn test_collapses_nested_divs() {
        let mut root = Element::new("div").with_child(DomNode::Element(
            Element::new("div").with_child(DomNode::Element(
                Element::new("section").with_child(DomNode::Element(
                    Element::new("p").with_child(DomNode::text("content")),
                )),
            )),
        ));
        postprocess(&mut root, &PostprocessConfig::default());
        assert_eq!(root.tag, "section");
        assert_eq!(root.element_children().next().unwrap().tag, "p");
    }

    #[test]
    fn test_conditional_cleaning_removes_link_lists() {
        let body = run(
            r#"<div><p>Real paragraph with words.</p><ul><li><a href="/a">One</a></li><li><a href="/b">Two</a></li></ul></div>"#,
            &PostprocessConfig::default(),
        );
        assert!(body.find_first(|e| e.tag == "ul").is_none());
        assert!(body.text_content().contains("Real paragraph"));
    }

    #[test]
    fn test_conditional_cleaning_keeps_code() {
        let body = run(
            r#"<div class="share"><pre><code>let x = 1;</code></pre></div>"#,
            &PostprocessConfig::default(),
        );
        assert!(body.find_first(|e| e.tag == "pre").is_some());
    }

    #[test]
    fn test_conditional_cleaning_respects_flag() {
        let html = r#"<div class="share"><p>Share this</p></div><p>Body</p>"#;

        let strict = run(html, &PostprocessConfig::default());
        assert!(!strict.text_content().contains("Share this"));

        let relaxed = run(html, &PostprocessConfig { clean_conditionally: false, ..Default::default() });
        assert!(relaxed.text_content().contains("Share this"));
    }
}
