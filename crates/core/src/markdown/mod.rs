//! Rule-based HTML to Markdown rendering.
//!
//! The renderer walks the content tree bottom-up: each element's children are
//! rendered first, then the first rule whose filter matches the element turns
//! that rendered content into the element's Markdown. Rules are checked in
//! order of filter specificity with a catch-all last, so every element has a
//! rule.
//!
//! The renderer holds no per-call state. [`ConversionOptions`] travel with
//! each call, and one renderer can be shared across threads.
//!
//! # Example
//!
//! ```rust
//! use pagedown_core::dom::Document;
//! use pagedown_core::markdown::{ConversionOptions, render_markdown};
//!
//! let doc = Document::parse("<h1>Hi</h1><p>Some <em>text</em></p>", None);
//! let markdown = render_markdown(doc.root(), &ConversionOptions::default());
//! assert_eq!(markdown, "# Hi\n\nSome *text*");
//! ```

mod options;
mod rule;
mod rules;
mod utilities;

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::LazyLock;

pub use options::{BulletListMarker, CodeBlockStyle, ConversionOptions, EmDelimiter, HeadingStyle, StrongDelimiter};
pub use rule::{Filter, PredicateFn, RenderContext, ReplacementFn, Rule};
pub use utilities::{escape_text, normalize_output};

use crate::dom::{DomNode, Element};
use utilities::{append_output, collapse_whitespace};

static DEFAULT_RENDERER: LazyLock<MarkdownRenderer> = LazyLock::new(MarkdownRenderer::new);

/// Renders a node with the shared default rule set.
pub fn render_markdown(node: &DomNode, options: &ConversionOptions) -> String {
    DEFAULT_RENDERER.render(node, options)
}

/// The shared default renderer.
pub fn default_renderer() -> &'static MarkdownRenderer {
    &DEFAULT_RENDERER
}

struct RuleEntry {
    rule: Rule,
    custom: bool,
}

/// An ordered, immutable-once-built rule set.
pub struct MarkdownRenderer {
    rules: Vec<RuleEntry>,
    fallback: Rule,
}

impl MarkdownRenderer {
    /// Create a renderer with the built-in rules
    pub fn new() -> Self {
        let mut renderer = Self { rules: Vec::new(), fallback: rules::fallback_rule() };
        renderer.rules = rules::builtin_rules().into_iter().map(|rule| RuleEntry { rule, custom: false }).collect();
        renderer.sort_rules();
        renderer
    }

    /// Add a custom rule
    ///
    /// Custom rules are checked before built-in rules of the same filter
    /// specificity, and in insertion order among themselves.
    pub fn add_rule(&mut self, rule: Rule) -> &mut Self {
        self.rules.push(RuleEntry { rule, custom: true });
        self.sort_rules();
        self
    }

    fn sort_rules(&mut self) {
        self.rules.sort_by_key(|entry| (Reverse(entry.rule.filter.specificity()), !entry.custom));
    }

    /// Rule for an element; the catch-all when nothing else matches.
    pub fn rule_for(&self, element: &Element, ctx: &RenderContext<'_>) -> &Rule {
        self.rules
            .iter()
            .map(|entry| &entry.rule)
            .find(|rule| rule.filter.matches(element, ctx))
            .unwrap_or(&self.fallback)
    }

    /// Render a node to Markdown.
    ///
    /// Deterministic: the same node and options always give the same
    /// output.
    pub fn render(&self, node: &DomNode, options: &ConversionOptions) -> String {
        let ctx = RenderContext::root(self, options);
        let raw = match node {
            DomNode::Document(children) => self.render_nodes(children, true, &ctx),
            DomNode::Element(element) => self.render_element(element, &ctx),
            DomNode::Text(text) => utilities::escape_text(collapse_whitespace(text).trim(), true),
            DomNode::Comment(_) => String::new(),
        };
        normalize_output(&raw)
    }

    fn render_element(&self, element: &Element, ctx: &RenderContext<'_>) -> String {
        let child_ctx = ctx.children_of(element);
        let content = self.render_nodes(&element.children, element.is_block(), &child_ctx);
        self.rule_for(element, ctx).replace(element, &content, ctx)
    }

    /// Renders a sibling list. `ctx` is the context shared by the siblings;
    /// `parent_is_block` decides whether text at the edges is trimmed.
    fn render_nodes(&self, nodes: &[DomNode], parent_is_block: bool, ctx: &RenderContext<'_>) -> String {
        let mut out = String::new();
        let mut tag_counts: HashMap<&str, usize> = HashMap::new();

        for (index, node) in nodes.iter().enumerate() {
            match node {
                DomNode::Text(text) => {
                    if ctx.in_pre {
                        out.push_str(text);
                        continue;
                    }

                    let at_start = edge_is_block(nodes[..index].iter().rev(), parent_is_block);
                    let at_end = edge_is_block(nodes[index + 1..].iter(), parent_is_block);

                    let mut collapsed = collapse_whitespace(text);
                    if at_start {
                        collapsed = collapsed.trim_start().to_string();
                    }
                    if at_end {
                        collapsed = collapsed.trim_end().to_string();
                    }
                    if collapsed.is_empty() {
                        continue;
                    }

                    let rendered =
                        if ctx.in_code { collapsed } else { utilities::escape_text(&collapsed, at_start) };
                    append_output(&mut out, &rendered);
                }
                DomNode::Element(element) => {
                    let count = tag_counts.entry(element.tag.as_str()).or_insert(0);
                    let element_ctx = RenderContext { sibling_index: *count, ..*ctx };
                    *count += 1;

                    append_output(&mut out, &self.render_element(element, &element_ctx));
                }
                DomNode::Document(children) => {
                    append_output(&mut out, &self.render_nodes(children, parent_is_block, ctx));
                }
                DomNode::Comment(_) => {}
            }
        }

        out
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// True when the nearest non-comment neighbour in `siblings` is a block
/// (or `br`), or when there is none and the parent is a block.
fn edge_is_block<'a>(mut siblings: impl Iterator<Item = &'a DomNode>, parent_is_block: bool) -> bool {
    match siblings.find(|node| !matches!(node, DomNode::Comment(_))) {
        Some(DomNode::Element(element)) => element.is_block() || element.tag == "br",
        Some(DomNode::Text(_)) => false,
        Some(DomNode::Document(_)) => true,
        Some(DomNode::Comment(_)) | None => parent_is_block,
    }
}
