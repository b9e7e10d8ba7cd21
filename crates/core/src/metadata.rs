use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dom::{Document, Element, normalize_whitespace};

/// Minimum length of a paragraph used as the excerpt fallback.
const MIN_EXCERPT_PARAGRAPH: usize = 50;

/// Excerpts are cut to this many characters.
const MAX_EXCERPT_CHARS: usize = 300;

/// Bylines longer than this are treated as prose, not a name.
const MAX_BYLINE_CHARS: usize = 100;

/// Title separators, checked in order, whose tail is usually the site name.
const TITLE_SEPARATORS: &[&str] = &[" | ", " - ", " – ", " — ", " » ", " :: ", " / "];

static BYLINE_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)byline|author|writtenby|p-author").expect("BYLINE_CLASS regex should compile"));

/// Represents all extracted metadata from a document
///
/// Absent values are `None`, never empty strings. Serialized in camelCase
/// with absent fields omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    /// Character count of the extracted content's normalized text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    /// Source URL of the page, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

impl Metadata {
    /// Fills the content-derived fields: `length`, and `excerpt` from the
    /// first substantial paragraph when no meta description was found.
    pub fn complete_from_content(&mut self, content: &Element) {
        self.length = Some(content.text_length());

        if self.excerpt.is_none() {
            self.excerpt = first_paragraph_excerpt(content);
        }
    }
}

impl Document {
    /// Extract all document-level metadata at once.
    ///
    /// Reads the unmodified document; `length` and the paragraph excerpt
    /// fallback need the extracted content and are filled in later by
    /// [`Metadata::complete_from_content`].
    pub fn extract_metadata(&self) -> Metadata {
        let json_ld = self.json_ld();

        Metadata {
            title: self.extract_title(json_ld.as_ref()),
            byline: self.extract_byline(json_ld.as_ref()),
            site_name: self.extract_site_name(json_ld.as_ref()),
            excerpt: self.extract_excerpt(json_ld.as_ref()),
            length: None,
            url: self.base_url().map(ToString::to_string),
            published_time: self.extract_published_time(json_ld.as_ref()),
            lang: self.lang(),
        }
    }

    /// Extract title with priority fallback:
    /// 1. JSON-LD `headline`
    /// 2. Open Graph `og:title`
    /// 3. Twitter `twitter:title`
    /// 4. `<title>` element, without a trailing site name
    /// 5. First `<h1>` element
    pub fn extract_title(&self, json_ld: Option<&Value>) -> Option<String> {
        if let Some(headline) = json_ld.and_then(|ld| json_string(ld, "headline")) {
            return Some(headline);
        }

        if let Some(title) = self.meta_content("og:title") {
            return Some(title);
        }

        if let Some(title) = self.meta_content("twitter:title") {
            return Some(title);
        }

        if let Some(title) = self.title() {
            return Some(clean_title(&title));
        }

        self.first_text(|el| el.tag == "h1")
    }

    /// Extract byline with priority fallback:
    /// 1. JSON-LD `author` (string, object or array)
    /// 2. Meta `author` / `article:author` / `DC.creator`
    /// 3. `rel="author"` link text
    /// 4. Short element whose class/id mentions byline or author
    pub fn extract_byline(&self, json_ld: Option<&Value>) -> Option<String> {
        if let Some(author) = json_ld.and_then(|ld| ld.get("author")).and_then(author_name) {
            return Some(author);
        }

        for key in ["author", "article:author", "DC.creator"] {
            if let Some(author) = self.meta_content(key) {
                return Some(author);
            }
        }

        if let Some(author) = self.first_text(|el| el.attr("rel") == Some("author")) {
            return Some(author);
        }

        self.find_all(|el| el.tag != "meta" && el.tag != "body" && BYLINE_CLASS.is_match(&el.match_string()))
            .into_iter()
            .map(|el| normalize_whitespace(&el.text_content()))
            .find(|text| !text.is_empty() && text.chars().count() < MAX_BYLINE_CHARS)
    }

    /// Extract site name with priority fallback:
    /// 1. JSON-LD `publisher.name`
    /// 2. Open Graph `og:site_name`
    /// 3. Meta `application-name`
    /// 4. Host of the base URL
    pub fn extract_site_name(&self, json_ld: Option<&Value>) -> Option<String> {
        if let Some(name) = json_ld.and_then(|ld| ld.get("publisher")).and_then(|p| json_string(p, "name")) {
            return Some(name);
        }

        if let Some(site) = self.meta_content("og:site_name") {
            return Some(site);
        }

        if let Some(site) = self.meta_content("application-name") {
            return Some(site);
        }

        self.base_url()
            .and_then(|url| url.host_str())
            .map(|host| host.trim_start_matches("www.").to_string())
            .filter(|host| !host.is_empty())
    }

    /// Extract excerpt from document metadata:
    /// 1. JSON-LD `description`
    /// 2. Open Graph `og:description`
    /// 3. Twitter `twitter:description`
    /// 4. Meta `description`
    pub fn extract_excerpt(&self, json_ld: Option<&Value>) -> Option<String> {
        if let Some(desc) = json_ld.and_then(|ld| json_string(ld, "description")) {
            return Some(desc);
        }

        ["og:description", "twitter:description", "description"]
            .into_iter()
            .find_map(|key| self.meta_content(key))
    }

    /// Extract publication date with priority fallback:
    /// 1. JSON-LD `datePublished`
    /// 2. Meta `article:published_time`
    /// 3. `<time datetime="">` element
    /// 4. Meta `date` / `DC.date`
    pub fn extract_published_time(&self, json_ld: Option<&Value>) -> Option<String> {
        if let Some(date) = json_ld.and_then(|ld| json_string(ld, "datePublished")) {
            return Some(date);
        }

        if let Some(date) = self.meta_content("article:published_time") {
            return Some(date);
        }

        if let Some(datetime) = self
            .find_first(|el| el.tag == "time" && el.attr("datetime").is_some_and(|d| !d.trim().is_empty()))
            .and_then(|el| el.attr("datetime"))
        {
            return Some(datetime.trim().to_string());
        }

        self.meta_content("date").or_else(|| self.meta_content("DC.date"))
    }

    /// The most article-like JSON-LD object in the document.
    ///
    /// Arrays and `@graph` containers are flattened; an object with a
    /// `headline` wins over the first object found.
    fn json_ld(&self) -> Option<Value> {
        let mut objects = Vec::new();

        for script in self.find_all(|el| {
            el.tag == "script"
                && el.attr("type").is_some_and(|t| t.trim().eq_ignore_ascii_case("application/ld+json"))
        }) {
            match serde_json::from_str::<Value>(script.text_content().trim()) {
                Ok(value) => flatten_json_ld(value, &mut objects),
                Err(err) => tracing::debug!(%err, "ignoring malformed JSON-LD"),
            }
        }

        let article = objects.iter().position(|obj| obj.get("headline").is_some());
        match article {
            Some(index) => Some(objects.swap_remove(index)),
            None => objects.into_iter().next(),
        }
    }

    fn first_text<P>(&self, predicate: P) -> Option<String>
    where
        P: Fn(&Element) -> bool,
    {
        self.find_all(predicate)
            .into_iter()
            .map(|el| normalize_whitespace(&el.text_content()))
            .find(|text| !text.is_empty())
    }
}

fn flatten_json_ld(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => items.into_iter().for_each(|item| flatten_json_ld(item, out)),
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                flatten_json_ld(graph, out);
            }
            if !map.is_empty() {
                out.push(Value::Object(map));
            }
        }
        _ => {}
    }
}

/// Non-blank string field of a JSON object, whitespace-normalized.
fn json_string(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(normalize_whitespace)
        .filter(|s| !s.is_empty())
}

/// Extract author name from a JSON-LD author field
/// Handles string, object and array formats
fn author_name(author: &Value) -> Option<String> {
    match author {
        Value::String(name) => Some(normalize_whitespace(name)).filter(|n| !n.is_empty()),
        Value::Object(_) => json_string(author, "name"),
        Value::Array(items) => items.iter().find_map(author_name),
        _ => None,
    }
}

/// Drops a trailing site name from a `<title>` value.
///
/// `"Deep Dive Into Parsers | Example Blog"` becomes `"Deep Dive Into
/// Parsers"`. The title is left alone when the remaining head would be a
/// single word.
pub fn clean_title(title: &str) -> String {
    for separator in TITLE_SEPARATORS {
        if let Some((head, _)) = title.rsplit_once(separator) {
            let head = head.trim();
            if head.split_whitespace().count() >= 2 {
                return head.to_string();
            }
            return title.to_string();
        }
    }
    title.to_string()
}

fn first_paragraph_excerpt(content: &Element) -> Option<String> {
    let candidates = std::iter::once(content).chain(content.descendants());
    candidates
        .filter(|el| el.tag == "p")
        .map(|p| normalize_whitespace(&p.text_content()))
        .find(|text| text.chars().count() >= MIN_EXCERPT_PARAGRAPH)
        .map(|text| truncate_chars(&text, MAX_EXCERPT_CHARS))
}

/// Cuts `text` to at most `max` characters on a char boundary.
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((index, _)) => text[..index].trim_end().to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    const HTML_WITH_META: &str = r#"
        <!DOCTYPE html>
        <html lang="en">
        <head>
            <meta charset="UTF-8">
            <title>Test Page Title | Example Site</title>
            <meta name="author" content="John Doe">
            <meta name="description" content="This is a test description">
            <meta property="og:site_name" content="Test Site">
            <meta property="article:published_time" content="2024-01-15T10:00:00Z">
        </head>
        <body>
            <h1>Main Heading</h1>
            <p>Content paragraph with enough text to be considered for excerpt extraction.</p>
        </body>
        </html>
    "#;

    const HTML_WITH_JSON_LD: &str = r#"
        <html>
        <head>
            <title>JSON-LD Test</title>
            <script type="application/ld+json">
            {
                "@context": "https://schema.org",
                "@type": "Article",
                "headline": "JSON-LD Article Title",
                "author": {"@type": "Person", "name": "Jane Smith"},
                "datePublished": "2024-02-20T14:30:00Z",
                "description": "JSON-LD description text",
                "publisher": {"@type": "Organization", "name": "JSON-LD Publisher"}
            }
            </script>
        </head>
        <body><p>Body</p></body>
        </html>
    "#;

    #[test]
    fn test_extract_title_from_json_ld() {
        let metadata = Document::parse(HTML_WITH_JSON_LD, None).extract_metadata();
        assert_eq!(metadata.title, Some("JSON-LD Article Title".to_string()));
    }

    #[test]
    fn test_extract_title_strips_site_suffix() {
        let metadata = Document::parse(HTML_WITH_META, None).extract_metadata();
        assert_eq!(metadata.title, Some("Test Page Title".to_string()));
    }

    #[test]
    fn test_extract_title_falls_back_to_h1() {
        let metadata = Document::parse("<body><h1> Only  Heading </h1></body>", None).extract_metadata();
        assert_eq!(metadata.title, Some("Only Heading".to_string()));
    }

    #[test]
    fn test_clean_title() {
        assert_eq!(clean_title("Deep Dive Into Parsers | Example Blog"), "Deep Dive Into Parsers");
        assert_eq!(clean_title("Home - Example"), "Home - Example");
        assert_eq!(clean_title("No separator here"), "No separator here");
    }

    #[test]
    fn test_extract_byline_from_json_ld() {
        let metadata = Document::parse(HTML_WITH_JSON_LD, None).extract_metadata();
        assert_eq!(metadata.byline, Some("Jane Smith".to_string()));
    }

    #[test]
    fn test_extract_byline_from_meta() {
        let metadata = Document::parse(HTML_WITH_META, None).extract_metadata();
        assert_eq!(metadata.byline, Some("John Doe".to_string()));
    }

    #[test]
    fn test_extract_byline_from_class() {
        let html = r#"<body><span class="byline">By Ada Lovelace</span><p>Text</p></body>"#;
        let metadata = Document::parse(html, None).extract_metadata();
        assert_eq!(metadata.byline, Some("By Ada Lovelace".to_string()));
    }

    #[test]
    fn test_extract_author_array_from_json_ld() {
        let html = r#"<script type="application/ld+json">
            {"@graph": [{"@type": "WebSite", "name": "Site"},
                        {"@type": "Article", "headline": "H", "author": [{"name": "First"}, {"name": "Second"}]}]}
            </script>"#;
        let metadata = Document::parse(html, None).extract_metadata();
        assert_eq!(metadata.title, Some("H".to_string()));
        assert_eq!(metadata.byline, Some("First".to_string()));
    }

    #[test]
    fn test_malformed_json_ld_is_ignored() {
        let html = r#"<head><script type="application/ld+json">{not json</script><title>Fallback Title</title></head>"#;
        let metadata = Document::parse(html, None).extract_metadata();
        assert_eq!(metadata.title, Some("Fallback Title".to_string()));
    }

    #[test]
    fn test_extract_site_name() {
        let metadata = Document::parse(HTML_WITH_JSON_LD, None).extract_metadata();
        assert_eq!(metadata.site_name, Some("JSON-LD Publisher".to_string()));

        let metadata = Document::parse(HTML_WITH_META, None).extract_metadata();
        assert_eq!(metadata.site_name, Some("Test Site".to_string()));
    }

    #[test]
    fn test_extract_site_name_falls_back_to_domain() {
        let base = Url::parse("https://www.example.org/post/1").unwrap();
        let metadata = Document::parse("<p>Text</p>", Some(&base)).extract_metadata();
        assert_eq!(metadata.site_name, Some("example.org".to_string()));
        assert_eq!(metadata.url, Some("https://www.example.org/post/1".to_string()));
    }

    #[test]
    fn test_extract_excerpt_from_meta() {
        let metadata = Document::parse(HTML_WITH_META, None).extract_metadata();
        assert_eq!(metadata.excerpt, Some("This is a test description".to_string()));

        let metadata = Document::parse(HTML_WITH_JSON_LD, None).extract_metadata();
        assert_eq!(metadata.excerpt, Some("JSON-LD description text".to_string()));
    }

    #[test]
    fn test_extract_published_time() {
        let metadata = Document::parse(HTML_WITH_JSON_LD, None).extract_metadata();
        assert_eq!(metadata.published_time, Some("2024-02-20T14:30:00Z".to_string()));

        let metadata = Document::parse(HTML_WITH_META, None).extract_metadata();
        assert_eq!(metadata.published_time, Some("2024-01-15T10:00:00Z".to_string()));

        let html = r#"<body><time datetime="2024-03-10">March 10</time></body>"#;
        let metadata = Document::parse(html, None).extract_metadata();
        assert_eq!(metadata.published_time, Some("2024-03-10".to_string()));
    }

    #[test]
    fn test_lang() {
        let metadata = Document::parse(HTML_WITH_META, None).extract_metadata();
        assert_eq!(metadata.lang, Some("en".to_string()));
    }

    #[test]
    fn test_missing_fields_are_none() {
        let metadata = Document::parse("<p>x</p>", None).extract_metadata();
        assert_eq!(metadata.title, None);
        assert_eq!(metadata.byline, None);
        assert_eq!(metadata.site_name, None);
        assert_eq!(metadata.excerpt, None);
        assert_eq!(metadata.length, None);
    }

    #[test]
    fn test_complete_from_content_excerpt_fallback() {
        let long = "word ".repeat(100);
        let html = format!("<div><p>short</p><p>{long}</p></div>");
        let doc = Document::parse(&html, None);
        let content = doc.find_first(|el| el.tag == "div").unwrap();

        let mut metadata = doc.extract_metadata();
        metadata.complete_from_content(content);

        let excerpt = metadata.excerpt.unwrap();
        assert!(excerpt.chars().count() <= MAX_EXCERPT_CHARS);
        assert!(excerpt.starts_with("word word"));
        assert_eq!(metadata.length, Some(content.text_length()));
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        assert_eq!(truncate_chars("short", 10), "short");
    }

    #[test]
    fn test_serializes_camel_case_without_absent_fields() {
        let metadata = Metadata {
            title: Some("T".to_string()),
            site_name: Some("S".to_string()),
            length: Some(42),
            ..Default::default()
        };
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json, serde_json::json!({"title": "T", "siteName": "S", "length": 42}));
    }
}
