//! Built-in conversion rules.

use url::Url;

use crate::dom::{Element, normalize_whitespace};

use super::options::{CodeBlockStyle, HeadingStyle};
use super::rule::{Filter, RenderContext, Rule};
use super::utilities::{block, clean_attribute, longest_run, wrap_inline};

/// Continuation indent for list item content.
const LIST_INDENT: &str = "    ";

/// Create all built-in rules
pub fn builtin_rules() -> Vec<Rule> {
    vec![
        paragraph_rule(),
        line_break_rule(),
        heading_rule(),
        blockquote_rule(),
        list_rule(),
        list_item_rule(),
        code_block_rule(),
        horizontal_rule(),
        link_rule(),
        image_rule(),
        emphasis_rule(),
        strong_rule(),
        strikethrough_rule(),
        inline_code_rule(),
        table_rule(),
        figcaption_rule(),
    ]
}

/// The catch-all: block elements become blank-line separated blocks, inline
/// elements contribute their content unchanged.
pub fn fallback_rule() -> Rule {
    Rule::new(Filter::Any, |element, content, _| {
        if element.is_block() { block(content) } else { content.to_string() }
    })
}

fn paragraph_rule() -> Rule {
    Rule::for_tag("p", |_, content, _| block(content.trim()))
}

fn line_break_rule() -> Rule {
    Rule::for_tag("br", |_, _, _| "\\\n".to_string())
}

fn heading_rule() -> Rule {
    Rule::for_tags(&["h1", "h2", "h3", "h4", "h5", "h6"], |element, content, ctx| {
        let level: usize = element.tag[1..].parse().unwrap_or(1);

        let content = content.lines().map(str::trim).filter(|l| !l.is_empty()).collect::<Vec<_>>().join(" ");
        if content.is_empty() {
            return String::new();
        }

        match ctx.options.heading_style {
            HeadingStyle::Setext if level <= 2 => {
                let underline = if level == 1 { "=" } else { "-" };
                block(&format!("{}\n{}", content, underline.repeat(content.chars().count())))
            }
            _ => block(&format!("{} {}", "#".repeat(level), content)),
        }
    })
}

fn blockquote_rule() -> Rule {
    Rule::for_tag("blockquote", |_, content, _| {
        let content = content.trim_matches('\n').trim_end();
        if content.trim().is_empty() {
            return String::new();
        }

        let quoted: Vec<String> = content
            .lines()
            .map(|line| if line.trim().is_empty() { ">".to_string() } else { format!("> {line}") })
            .collect();
        block(&quoted.join("\n"))
    })
}

fn list_rule() -> Rule {
    Rule::for_tags(&["ul", "ol"], |_, content, ctx| {
        let content = content.trim_matches('\n').trim_end();
        if content.is_empty() {
            return String::new();
        }

        if ctx.parent_tag() == Some("li") { format!("\n{content}\n") } else { block(content) }
    })
}

fn list_item_rule() -> Rule {
    Rule::for_tag("li", |_, content, ctx| {
        let prefix = match ctx.parent {
            Some(parent) if parent.tag == "ol" => {
                let start = parent.attr("start").and_then(|s| s.trim().parse::<usize>().ok()).unwrap_or(1);
                format!("{}. ", start + ctx.sibling_index)
            }
            _ => format!("{} ", ctx.options.bullet_list_marker.as_str()),
        };

        let content = content.trim().replace('\n', &format!("\n{LIST_INDENT}"));
        format!("{prefix}{content}\n")
    })
}

fn code_block_rule() -> Rule {
    Rule::for_tag("pre", |element, _, ctx| {
        let code_element = element
            .element_children()
            .find(|c| c.tag == "code")
            .filter(|_| element.children.iter().filter(|c| !c.is_blank_text()).count() == 1);
        let source = code_element.unwrap_or(element);

        let code = source.text_content();
        let code = code.trim_end_matches('\n');
        if code.trim().is_empty() {
            return String::new();
        }

        match ctx.options.code_block_style {
            CodeBlockStyle::Fenced => {
                let language = code_element.and_then(language_of).or_else(|| language_of(element)).unwrap_or("");
                let fence = "`".repeat(longest_run(code, '`').max(2) + 1);
                block(&format!("{fence}{language}\n{code}\n{fence}"))
            }
            CodeBlockStyle::Indented => {
                let indented: Vec<String> = code.lines().map(|line| format!("{LIST_INDENT}{line}")).collect();
                block(&indented.join("\n"))
            }
        }
    })
}

/// Language named by a `language-xxx` or `lang-xxx` class.
fn language_of(element: &Element) -> Option<&str> {
    element
        .classes()
        .find_map(|c| c.strip_prefix("language-").or_else(|| c.strip_prefix("lang-")))
        .filter(|lang| !lang.is_empty())
}

fn horizontal_rule() -> Rule {
    Rule::for_tag("hr", |_, _, _| block("---"))
}

fn link_rule() -> Rule {
    Rule::new(Filter::tag_with_attribute("a", "href"), |element, content, _| {
        let text = content.trim();
        if text.is_empty() {
            return String::new();
        }

        let href = clean_attribute(element.attr("href"));
        if is_bare_link(&normalize_whitespace(&element.text_content()), &href) {
            return wrap_inline(content, "", "");
        }

        let href = href.replace(' ', "%20").replace('(', "%28").replace(')', "%29");
        let title = match clean_attribute(element.attr("title")) {
            t if t.is_empty() => String::new(),
            t => format!(" \"{}\"", t.replace('"', "\\\"")),
        };

        wrap_inline(content, "[", &format!("]({href}{title})"))
    })
}

/// True when the link text is the target itself, allowing for the
/// normalisation applied when `href` was resolved.
fn is_bare_link(text: &str, href: &str) -> bool {
    text == href || Url::parse(text).is_ok_and(|url| url.as_str() == href)
}

fn image_rule() -> Rule {
    Rule::new(Filter::tag_with_attribute("img", "src"), |element, _, _| {
        let src = clean_attribute(element.attr("src")).replace(' ', "%20");
        let alt = clean_attribute(element.attr("alt")).replace('[', "\\[").replace(']', "\\]");
        let title = match clean_attribute(element.attr("title")) {
            t if t.is_empty() => String::new(),
            t => format!(" \"{}\"", t.replace('"', "\\\"")),
        };

        format!("![{alt}]({src}{title})")
    })
}

fn emphasis_rule() -> Rule {
    Rule::for_tags(&["em", "i", "cite", "dfn", "var"], |_, content, ctx| {
        let delimiter = ctx.options.em_delimiter.as_str();
        wrap_inline(content, delimiter, delimiter)
    })
}

fn strong_rule() -> Rule {
    Rule::for_tags(&["strong", "b"], |_, content, ctx| {
        let delimiter = ctx.options.strong_delimiter.as_str();
        wrap_inline(content, delimiter, delimiter)
    })
}

fn strikethrough_rule() -> Rule {
    Rule::for_tags(&["del", "s", "strike"], |_, content, _| wrap_inline(content, "~~", "~~"))
}

fn inline_code_rule() -> Rule {
    Rule::for_tags(&["code", "kbd", "samp", "tt"], |element, _, _| {
        let code = element.text_content().replace('\n', " ");
        if code.is_empty() {
            return String::new();
        }

        let delimiter = "`".repeat(longest_run(&code, '`') + 1);
        let padding = if code.starts_with('`') || code.ends_with('`') { " " } else { "" };
        format!("{delimiter}{padding}{code}{padding}{delimiter}")
    })
}

fn figcaption_rule() -> Rule {
    Rule::for_tag("figcaption", |_, content, ctx| {
        let delimiter = ctx.options.em_delimiter.as_str();
        let caption = content.trim();
        if caption.is_empty() { String::new() } else { block(&wrap_inline(caption, delimiter, delimiter)) }
    })
}

fn table_rule() -> Rule {
    Rule::for_tag("table", |element, content, ctx| {
        let rows: Vec<Vec<String>> = table_rows(element)
            .into_iter()
            .map(|row| {
                row.element_children()
                    .filter(|cell| matches!(cell.tag.as_str(), "th" | "td"))
                    .map(|cell| table_cell(ctx, cell))
                    .collect()
            })
            .filter(|cells: &Vec<String>| !cells.is_empty())
            .collect();

        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        if columns == 0 {
            return block(content.trim());
        }

        let mut lines = Vec::with_capacity(rows.len() + 2);
        if let Some(caption) = element.element_children().find(|c| c.tag == "caption") {
            let caption = normalize_whitespace(&ctx.render_content(caption));
            if !caption.is_empty() {
                lines.push(caption);
                lines.push(String::new());
            }
        }

        for (index, row) in rows.iter().enumerate() {
            let mut cells = row.clone();
            cells.resize(columns, String::new());
            lines.push(format!("| {} |", cells.join(" | ")));
            if index == 0 {
                lines.push(format!("| {} |", vec!["---"; columns].join(" | ")));
            }
        }

        block(&lines.join("\n"))
    })
}

/// Rows of a table in source order, looking through `thead`/`tbody`/`tfoot`
/// but not into nested tables.
fn table_rows(table: &Element) -> Vec<&Element> {
    let mut rows = Vec::new();
    for child in table.element_children() {
        match child.tag.as_str() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => rows.extend(child.element_children().filter(|c| c.tag == "tr")),
            _ => {}
        }
    }
    rows
}

fn table_cell(ctx: &RenderContext<'_>, cell: &Element) -> String {
    normalize_whitespace(&ctx.render_content(cell)).replace('|', "\\|")
}
