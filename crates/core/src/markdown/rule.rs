//! Rule and Filter types for HTML conversion.

use crate::dom::Element;

use super::MarkdownRenderer;
use super::options::ConversionOptions;

/// Type alias for replacement functions
///
/// Receives the element, the already rendered Markdown of its children and
/// the element's render context.
pub type ReplacementFn = Box<dyn Fn(&Element, &str, &RenderContext<'_>) -> String + Send + Sync>;

/// Type alias for filter predicates
pub type PredicateFn = Box<dyn Fn(&Element, &RenderContext<'_>) -> bool + Send + Sync>;

/// A filter determines which elements a rule applies to
pub enum Filter {
    /// Match a single tag name
    TagName(String),
    /// Match any of multiple tag names
    TagNames(Vec<String>),
    /// Match a tag carrying a non-empty attribute
    TagWithAttribute { tag: String, attr: String },
    /// Match using a predicate function
    Predicate(PredicateFn),
    /// Match every element
    Any,
}

impl Filter {
    /// Create a filter for a single tag
    pub fn tag(name: &str) -> Self {
        Filter::TagName(name.to_lowercase())
    }

    /// Create a filter for multiple tags
    pub fn tags(names: &[&str]) -> Self {
        Filter::TagNames(names.iter().map(|s| s.to_lowercase()).collect())
    }

    /// Create a filter for a tag with an attribute present
    pub fn tag_with_attribute(tag: &str, attr: &str) -> Self {
        Filter::TagWithAttribute { tag: tag.to_lowercase(), attr: attr.to_lowercase() }
    }

    /// Create a filter with a predicate
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Element, &RenderContext<'_>) -> bool + Send + Sync + 'static,
    {
        Filter::Predicate(Box::new(f))
    }

    /// Check if this filter matches an element
    pub fn matches(&self, element: &Element, ctx: &RenderContext<'_>) -> bool {
        match self {
            Filter::TagName(t) => element.tag == *t,
            Filter::TagNames(tags) => tags.contains(&element.tag),
            Filter::TagWithAttribute { tag, attr } => {
                element.tag == *tag && element.attr(attr).is_some_and(|v| !v.trim().is_empty())
            }
            Filter::Predicate(f) => f(element, ctx),
            Filter::Any => true,
        }
    }

    /// Ordering tier: attribute and predicate filters are checked before
    /// tag filters, which are checked before catch-alls.
    pub fn specificity(&self) -> u8 {
        match self {
            Filter::TagWithAttribute { .. } | Filter::Predicate(_) => 2,
            Filter::TagName(_) | Filter::TagNames(_) => 1,
            Filter::Any => 0,
        }
    }
}

/// A rule defines how to convert a matched HTML element to Markdown
pub struct Rule {
    /// Filter to determine which elements this rule applies to
    pub filter: Filter,
    /// Replacement function that generates Markdown
    pub replacement: ReplacementFn,
}

impl Rule {
    /// Create a new rule
    pub fn new<F>(filter: Filter, replacement: F) -> Self
    where
        F: Fn(&Element, &str, &RenderContext<'_>) -> String + Send + Sync + 'static,
    {
        Self { filter, replacement: Box::new(replacement) }
    }

    /// Create a rule that matches a single tag
    pub fn for_tag<F>(tag: &str, replacement: F) -> Self
    where
        F: Fn(&Element, &str, &RenderContext<'_>) -> String + Send + Sync + 'static,
    {
        Self::new(Filter::tag(tag), replacement)
    }

    /// Create a rule that matches multiple tags
    pub fn for_tags<F>(tags: &[&str], replacement: F) -> Self
    where
        F: Fn(&Element, &str, &RenderContext<'_>) -> String + Send + Sync + 'static,
    {
        Self::new(Filter::tags(tags), replacement)
    }

    /// Apply this rule's replacement
    pub fn replace(&self, element: &Element, content: &str, ctx: &RenderContext<'_>) -> String {
        (self.replacement)(element, content, ctx)
    }
}

/// Where an element sits while it is being rendered.
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    pub(super) renderer: &'a MarkdownRenderer,
    /// Options for this conversion
    pub options: &'a ConversionOptions,
    /// The parent element, `None` at the render root
    pub parent: Option<&'a Element>,
    /// Index among preceding siblings with the same tag
    pub sibling_index: usize,
    /// Inside `code`/`pre`: text is not escaped
    pub in_code: bool,
    /// Inside `pre`: whitespace is preserved
    pub in_pre: bool,
}

impl<'a> RenderContext<'a> {
    pub(super) fn root(renderer: &'a MarkdownRenderer, options: &'a ConversionOptions) -> Self {
        Self { renderer, options, parent: None, sibling_index: 0, in_code: false, in_pre: false }
    }

    /// Context for the children of `element`.
    pub fn children_of<'b>(&self, element: &'b Element) -> RenderContext<'b>
    where
        'a: 'b,
    {
        RenderContext {
            renderer: self.renderer,
            options: self.options,
            parent: Some(element),
            sibling_index: 0,
            in_code: self.in_code || matches!(element.tag.as_str(), "code" | "pre" | "kbd" | "samp"),
            in_pre: self.in_pre || element.tag == "pre",
        }
    }

    /// Tag of the parent element.
    pub fn parent_tag(&self) -> Option<&str> {
        self.parent.map(|p| p.tag.as_str())
    }

    /// Renders the children of `element` without applying its own rule.
    pub fn render_content(&self, element: &Element) -> String {
        let ctx = self.children_of(element);
        self.renderer.render_nodes(&element.children, element.is_block(), &ctx)
    }
}
