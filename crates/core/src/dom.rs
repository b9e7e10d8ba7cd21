//! HTML parsing into an owned DOM tree.
//!
//! This module provides the [`Document`], [`DomNode`] and [`Element`] types.
//! Markup is parsed with `scraper` (html5ever), which recovers from
//! unterminated tags, missing end tags and invalid nesting the way browsers
//! do, and the result is copied into a plain owned tree: children are
//! ordered under their parent and there are no back references, so the tree
//! can be cloned, pruned and shared read-only across threads.
//!
//! # Example
//!
//! ```rust
//! use pagedown_core::dom::Document;
//! use url::Url;
//!
//! let base = Url::parse("https://example.com/blog/").unwrap();
//! let doc = Document::parse(r#"<title>Test</title><a href="post">Post</a>"#, Some(&base));
//!
//! assert_eq!(doc.title(), Some("Test".to_string()));
//! let link = doc.find_first(|el| el.tag == "a").unwrap();
//! assert_eq!(link.attr("href"), Some("https://example.com/blog/post"));
//! ```

use indexmap::IndexMap;
use scraper::{ElementRef, Html, Node};
use url::Url;

/// Ordered attribute mapping of an element.
pub type Attributes = IndexMap<String, String>;

/// Elements nested deeper than this are flattened to their text.
///
/// Every later pass walks the tree recursively; the cap keeps stack use
/// bounded on pathological input.
pub const MAX_DEPTH: usize = 256;

/// Attributes holding URLs that are resolved against the base URL.
const URL_ATTRIBUTES: &[&str] = &["href", "src", "poster"];

/// Block-level HTML elements.
pub const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "center", "dd", "details", "dialog", "dir", "div",
    "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hgroup", "hr", "html", "li", "main", "menu", "nav", "ol", "p", "pre", "section", "summary",
    "table", "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

/// Void (self-closing) HTML elements.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track",
    "wbr",
];

/// A node of the owned DOM tree.
#[derive(Debug, Clone, PartialEq)]
pub enum DomNode {
    /// Document root; its children are the top-level nodes.
    Document(Vec<DomNode>),
    /// An element with tag, attributes and children.
    Element(Element),
    /// A text node with entities already decoded.
    Text(String),
    /// A comment node.
    Comment(String),
}

/// An HTML element.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    /// Lowercase tag name.
    pub tag: String,
    /// Attributes in source order.
    pub attrs: Attributes,
    /// Child nodes in source order.
    pub children: Vec<DomNode>,
}

impl DomNode {
    /// Creates a text node.
    pub fn text(text: impl Into<String>) -> Self {
        DomNode::Text(text.into())
    }

    /// Returns the element if this node is one.
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            DomNode::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Child nodes of documents and elements.
    pub fn children(&self) -> &[DomNode] {
        match self {
            DomNode::Document(children) => children,
            DomNode::Element(el) => &el.children,
            DomNode::Text(_) | DomNode::Comment(_) => &[],
        }
    }

    /// Concatenated text of this node and all descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            DomNode::Text(text) => out.push_str(text),
            DomNode::Comment(_) => {}
            DomNode::Document(children) => children.iter().for_each(|c| c.collect_text(out)),
            DomNode::Element(el) => el.children.iter().for_each(|c| c.collect_text(out)),
        }
    }

    /// True for text nodes containing only whitespace.
    pub fn is_blank_text(&self) -> bool {
        matches!(self, DomNode::Text(text) if text.trim().is_empty())
    }
}

impl Element {
    /// Creates an element with no attributes or children.
    pub fn new(tag: &str) -> Self {
        Self { tag: tag.to_ascii_lowercase(), attrs: Attributes::new(), children: Vec::new() }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    /// Builder-style child appender.
    pub fn with_child(mut self, child: DomNode) -> Self {
        self.children.push(child);
        self
    }

    /// Gets the value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// The `id` attribute, if present.
    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    /// Whitespace-separated class names.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_whitespace()
    }

    /// Checks for a class name.
    pub fn has_class(&self, name: &str) -> bool {
        self.classes().any(|c| c == name)
    }

    /// Class and id joined into one string, for pattern matching.
    pub fn match_string(&self) -> String {
        format!("{} {}", self.attr("class").unwrap_or_default(), self.id().unwrap_or_default())
    }

    /// True if this is a block-level element.
    pub fn is_block(&self) -> bool {
        is_block_tag(&self.tag)
    }

    /// True if this is a void element.
    pub fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(&self.tag.as_str())
    }

    /// Direct element children, skipping text and comments.
    pub fn element_children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(DomNode::as_element)
    }

    /// Concatenated text of all descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.children.iter().for_each(|c| c.collect_text(&mut out));
        out
    }

    /// Number of characters in the whitespace-normalized text.
    pub fn text_length(&self) -> usize {
        normalize_whitespace(&self.text_content()).chars().count()
    }

    /// All descendant elements in document (pre-)order, excluding `self`.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: self.children.iter().rev().collect() }
    }

    /// First descendant element matching the predicate.
    pub fn find_first<P>(&self, predicate: P) -> Option<&Element>
    where
        P: Fn(&Element) -> bool,
    {
        self.descendants().find(|el| predicate(el))
    }

    /// All descendant elements matching the predicate, in document order.
    pub fn find_all<P>(&self, predicate: P) -> Vec<&Element>
    where
        P: Fn(&Element) -> bool,
    {
        self.descendants().filter(|el| predicate(el)).collect()
    }

    /// True if any descendant has one of the given tags.
    pub fn contains_tag(&self, tags: &[&str]) -> bool {
        self.descendants().any(|el| tags.contains(&el.tag.as_str()))
    }

    /// Serializes this element to HTML.
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        write_element(self, &mut out);
        out
    }
}

/// Pre-order iterator over descendant elements.
pub struct Descendants<'a> {
    stack: Vec<&'a DomNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            self.stack.extend(node.children().iter().rev());
            if let DomNode::Element(el) = node {
                return Some(el);
            }
        }
        None
    }
}

/// A parsed HTML document owning its tree.
#[derive(Debug, Clone)]
pub struct Document {
    root: DomNode,
    base_url: Option<Url>,
}

impl Document {
    /// Parses HTML into an owned tree.
    ///
    /// Never fails: malformed markup produces a best-effort tree. When
    /// `base_url` is given, relative `href`/`src`/`poster` values are
    /// resolved to absolute URLs.
    pub fn parse(html: &str, base_url: Option<&Url>) -> Self {
        let parsed = Html::parse_document(html);
        let root_element = convert_element(parsed.root_element(), base_url, 0);

        tracing::trace!(bytes = html.len(), "parsed document");

        Self { root: DomNode::Document(vec![DomNode::Element(root_element)]), base_url: base_url.cloned() }
    }

    /// The document root node.
    pub fn root(&self) -> &DomNode {
        &self.root
    }

    /// Gets the base URL used to resolve links.
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// The `<html>` element.
    pub fn html_element(&self) -> Option<&Element> {
        self.root.children().iter().find_map(DomNode::as_element)
    }

    /// The `<body>` element.
    pub fn body(&self) -> Option<&Element> {
        self.html_element()?.element_children().find(|el| el.tag == "body")
    }

    /// All elements in document order.
    pub fn elements(&self) -> Descendants<'_> {
        Descendants { stack: self.root.children().iter().rev().collect() }
    }

    /// First element matching the predicate.
    pub fn find_first<P>(&self, predicate: P) -> Option<&Element>
    where
        P: Fn(&Element) -> bool,
    {
        self.elements().find(|el| predicate(el))
    }

    /// All elements matching the predicate.
    pub fn find_all<P>(&self, predicate: P) -> Vec<&Element>
    where
        P: Fn(&Element) -> bool,
    {
        self.elements().filter(|el| predicate(el)).collect()
    }

    /// Gets the title of the document.
    ///
    /// Returns the whitespace-normalized content of the first `<title>`, or
    /// `None` when missing or blank.
    pub fn title(&self) -> Option<String> {
        self.find_first(|el| el.tag == "title")
            .map(|el| normalize_whitespace(&el.text_content()))
            .filter(|t| !t.is_empty())
    }

    /// Content of a `<meta>` tag matched by `name` or `property`
    /// (case-insensitive). Blank values count as absent.
    pub fn meta_content(&self, key: &str) -> Option<String> {
        self.elements()
            .filter(|el| el.tag == "meta")
            .find(|el| {
                el.attr("name").is_some_and(|n| n.eq_ignore_ascii_case(key))
                    || el.attr("property").is_some_and(|p| p.eq_ignore_ascii_case(key))
            })
            .and_then(|el| el.attr("content"))
            .map(normalize_whitespace)
            .filter(|c| !c.is_empty())
    }

    /// The document language from `<html lang>`.
    pub fn lang(&self) -> Option<String> {
        self.html_element()
            .and_then(|el| el.attr("lang"))
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
    }

    /// Gets all text content from the document.
    pub fn text_content(&self) -> String {
        self.root.text_content()
    }
}

/// Convenience wrapper for [`Document::parse`].
pub fn parse(html: &str, base_url: Option<&Url>) -> Document {
    Document::parse(html, base_url)
}

/// True if `tag` is a block-level element name.
pub fn is_block_tag(tag: &str) -> bool {
    BLOCK_ELEMENTS.contains(&tag)
}

/// Collapses whitespace runs to single spaces and trims the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn convert_element(element: ElementRef<'_>, base_url: Option<&Url>, depth: usize) -> Element {
    let value = element.value();
    let tag = value.name().to_ascii_lowercase();

    let mut attrs = Attributes::new();
    for (name, raw) in value.attrs() {
        let name = name.to_ascii_lowercase();
        let resolved = match base_url {
            Some(base) if URL_ATTRIBUTES.contains(&name.as_str()) => resolve_url(base, raw),
            _ => raw.to_string(),
        };
        attrs.insert(name, resolved);
    }

    if depth >= MAX_DEPTH {
        let text: String = element.text().collect();
        return Element { tag, attrs, children: vec![DomNode::Text(text)] };
    }

    let mut children = Vec::new();
    for child in element.children() {
        match child.value() {
            Node::Text(text) => children.push(DomNode::Text(text.to_string())),
            Node::Comment(comment) => children.push(DomNode::Comment(comment.to_string())),
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    children.push(DomNode::Element(convert_element(child_element, base_url, depth + 1)));
                }
            }
            _ => {}
        }
    }

    Element { tag, attrs, children }
}

/// Resolves a possibly relative URL against `base`.
///
/// Fragment-only links and script/data URLs are returned unchanged, as is
/// anything `Url::join` rejects.
pub fn resolve_url(base: &Url, value: &str) -> String {
    let trimmed = value.trim();
    let lower = trimmed.to_ascii_lowercase();
    if trimmed.is_empty() || trimmed.starts_with('#') || lower.starts_with("javascript:") || lower.starts_with("data:")
    {
        return value.to_string();
    }

    match base.join(trimmed) {
        Ok(absolute) => absolute.to_string(),
        Err(_) => value.to_string(),
    }
}

fn write_html(node: &DomNode, out: &mut String) {
    match node {
        DomNode::Document(children) => children.iter().for_each(|c| write_html(c, out)),
        DomNode::Element(el) => write_element(el, out),
        DomNode::Text(text) => out.push_str(&escape_html(text, false)),
        DomNode::Comment(comment) => {
            out.push_str("<!--");
            out.push_str(comment);
            out.push_str("-->");
        }
    }
}

fn write_element(el: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&el.tag);
    for (name, value) in &el.attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape_html(value, true));
        out.push('"');
    }
    out.push('>');

    if el.is_void() {
        return;
    }

    el.children.iter().for_each(|c| write_html(c, out));
    out.push_str("</");
    out.push_str(&el.tag);
    out.push('>');
}

fn escape_html(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r##"
        <!DOCTYPE html>
        <html lang="en">
        <head>
            <meta charset="UTF-8">
            <meta property="og:title" content="  Open Graph Title ">
            <title>Test Page</title>
        </head>
        <body>
            <h1>Heading</h1>
            <p class="content lead">Paragraph 1</p>
            <p class="content">Paragraph 2</p>
            <a href="/about">Link</a>
            <img src="images/photo.jpg" alt="Photo">
            <a href="#section">Jump</a>
        </body>
        </html>
    "##;

    fn base() -> Url {
        Url::parse("https://example.com/blog/post").unwrap()
    }

    #[test]
    fn test_parse_document() {
        let doc = Document::parse(SAMPLE_HTML, None);
        assert_eq!(doc.title(), Some("Test Page".to_string()));
        assert_eq!(doc.lang(), Some("en".to_string()));
        assert!(doc.body().is_some());
    }

    #[test]
    fn test_find_elements() {
        let doc = Document::parse(SAMPLE_HTML, None);
        let paragraphs = doc.find_all(|el| el.tag == "p");

        assert_eq!(paragraphs.len(), 2);
        assert_eq!(paragraphs[0].text_content(), "Paragraph 1");
        assert_eq!(paragraphs[1].text_content(), "Paragraph 2");
        assert!(paragraphs[0].has_class("lead"));
        assert!(!paragraphs[1].has_class("lead"));
    }

    #[test]
    fn test_resolves_relative_urls() {
        let base = base();
        let doc = Document::parse(SAMPLE_HTML, Some(&base));

        let links = doc.find_all(|el| el.tag == "a");
        assert_eq!(links[0].attr("href"), Some("https://example.com/about"));
        assert_eq!(links[1].attr("href"), Some("#section"));

        let img = doc.find_first(|el| el.tag == "img").unwrap();
        assert_eq!(img.attr("src"), Some("https://example.com/blog/images/photo.jpg"));
    }

    #[test]
    fn test_keeps_urls_without_base() {
        let doc = Document::parse(SAMPLE_HTML, None);
        let link = doc.find_first(|el| el.tag == "a").unwrap();
        assert_eq!(link.attr("href"), Some("/about"));
    }

    #[test]
    fn test_resolve_url_special_cases() {
        let base = base();
        assert_eq!(resolve_url(&base, "javascript:void(0)"), "javascript:void(0)");
        assert_eq!(resolve_url(&base, "#top"), "#top");
        assert_eq!(resolve_url(&base, "https://other.org/x"), "https://other.org/x");
        assert_eq!(resolve_url(&base, "../up"), "https://example.com/up");
    }

    #[test]
    fn test_decodes_entities() {
        let doc = Document::parse("<p>Fish &amp; Chips &lt;3 &copy; &#8212;</p>", None);
        let p = doc.find_first(|el| el.tag == "p").unwrap();
        assert_eq!(p.text_content(), "Fish & Chips <3 © —");
    }

    #[test]
    fn test_malformed_markup_is_tolerated() {
        let html = "<div><p>Unclosed paragraph<p>Second<span>dangling</div><b><i>bad nesting</b></i>";
        let doc = Document::parse(html, None);
        let text = doc.text_content();
        assert!(text.contains("Unclosed paragraph"));
        assert!(text.contains("Second"));
        assert!(text.contains("bad nesting"));
        assert_eq!(doc.find_all(|el| el.tag == "p").len(), 2);
    }

    #[test]
    fn test_meta_content() {
        let doc = Document::parse(SAMPLE_HTML, None);
        assert_eq!(doc.meta_content("og:title"), Some("Open Graph Title".to_string()));
        assert_eq!(doc.meta_content("OG:TITLE"), Some("Open Graph Title".to_string()));
        assert_eq!(doc.meta_content("description"), None);
    }

    #[test]
    fn test_attribute_order_is_preserved() {
        let doc = Document::parse(r#"<a title="t" href="h" data-x="1">x</a>"#, None);
        let a = doc.find_first(|el| el.tag == "a").unwrap();
        let names: Vec<&str> = a.attrs.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["title", "href", "data-x"]);
    }

    #[test]
    fn test_descendants_preorder() {
        let doc = Document::parse("<div><section><p>a</p></section><p>b</p></div>", None);
        let div = doc.find_first(|el| el.tag == "div").unwrap();
        let tags: Vec<&str> = div.descendants().map(|el| el.tag.as_str()).collect();
        assert_eq!(tags, vec!["section", "p", "p"]);
    }

    #[test]
    fn test_deep_nesting_is_flattened() {
        let depth = MAX_DEPTH + 50;
        let html = format!("{}deep text{}", "<div>".repeat(depth), "</div>".repeat(depth));
        let doc = Document::parse(&html, None);
        assert!(doc.text_content().contains("deep text"));
    }

    #[test]
    fn test_to_html_round_trips_structure() {
        let doc = Document::parse(r#"<p class="x">a &amp; b<br>c</p>"#, None);
        let p = doc.find_first(|el| el.tag == "p").unwrap();
        assert_eq!(p.outer_html(), r#"<p class="x">a &amp; b<br>c</p>"#);
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \n\t b  c "), "a b c");
        assert_eq!(normalize_whitespace("   "), "");
    }
}
