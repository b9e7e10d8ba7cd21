//! Per-call rendering options.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Heading style options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingStyle {
    /// Use ATX-style headings (prefixed with #)
    #[default]
    Atx,
    /// Use setext-style headings (underlined with = or -) for levels 1 and 2
    Setext,
}

/// Marker for unordered list items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BulletListMarker {
    #[default]
    #[serde(rename = "-")]
    Dash,
    #[serde(rename = "*")]
    Asterisk,
    #[serde(rename = "+")]
    Plus,
}

/// Code block style options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeBlockStyle {
    /// Use indented code blocks (4 spaces)
    Indented,
    /// Use fenced code blocks (```)
    #[default]
    Fenced,
}

/// Emphasis delimiter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EmDelimiter {
    #[default]
    #[serde(rename = "*")]
    Asterisk,
    #[serde(rename = "_")]
    Underscore,
}

/// Strong delimiter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StrongDelimiter {
    #[default]
    #[serde(rename = "**")]
    Asterisks,
    #[serde(rename = "__")]
    Underscores,
}

/// Options for a single conversion.
///
/// Immutable per call; the renderer never stores them. Deserializes from the
/// camelCase JSON shape with every field optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversionOptions {
    /// Prepend title and metadata block to the output
    pub include_metadata: bool,
    pub heading_style: HeadingStyle,
    pub bullet_list_marker: BulletListMarker,
    pub code_block_style: CodeBlockStyle,
    pub em_delimiter: EmDelimiter,
    pub strong_delimiter: StrongDelimiter,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            include_metadata: true,
            heading_style: HeadingStyle::default(),
            bullet_list_marker: BulletListMarker::default(),
            code_block_style: CodeBlockStyle::default(),
            em_delimiter: EmDelimiter::default(),
            strong_delimiter: StrongDelimiter::default(),
        }
    }
}

impl BulletListMarker {
    pub fn as_str(&self) -> &'static str {
        match self {
            BulletListMarker::Dash => "-",
            BulletListMarker::Asterisk => "*",
            BulletListMarker::Plus => "+",
        }
    }
}

impl EmDelimiter {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmDelimiter::Asterisk => "*",
            EmDelimiter::Underscore => "_",
        }
    }
}

impl StrongDelimiter {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrongDelimiter::Asterisks => "**",
            StrongDelimiter::Underscores => "__",
        }
    }
}

impl FromStr for HeadingStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "atx" => Ok(HeadingStyle::Atx),
            "setext" => Ok(HeadingStyle::Setext),
            _ => Err(format!("Invalid heading style: {s}. Use 'atx' or 'setext'.")),
        }
    }
}

impl FromStr for BulletListMarker {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "-" | "dash" => Ok(BulletListMarker::Dash),
            "*" | "asterisk" => Ok(BulletListMarker::Asterisk),
            "+" | "plus" => Ok(BulletListMarker::Plus),
            _ => Err(format!("Invalid bullet marker: {s}. Use '-', '*' or '+'.")),
        }
    }
}

impl FromStr for CodeBlockStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fenced" => Ok(CodeBlockStyle::Fenced),
            "indented" => Ok(CodeBlockStyle::Indented),
            _ => Err(format!("Invalid code block style: {s}. Use 'fenced' or 'indented'.")),
        }
    }
}

impl FromStr for EmDelimiter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "*" => Ok(EmDelimiter::Asterisk),
            "_" => Ok(EmDelimiter::Underscore),
            _ => Err(format!("Invalid emphasis delimiter: {s}. Use '*' or '_'.")),
        }
    }
}

impl FromStr for StrongDelimiter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "**" => Ok(StrongDelimiter::Asterisks),
            "__" => Ok(StrongDelimiter::Underscores),
            _ => Err(format!("Invalid strong delimiter: {s}. Use '**' or '__'.")),
        }
    }
}

impl fmt::Display for HeadingStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeadingStyle::Atx => write!(f, "atx"),
            HeadingStyle::Setext => write!(f, "setext"),
        }
    }
}

impl fmt::Display for BulletListMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for CodeBlockStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeBlockStyle::Fenced => write!(f, "fenced"),
            CodeBlockStyle::Indented => write!(f, "indented"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ConversionOptions::default();
        assert!(options.include_metadata);
        assert_eq!(options.heading_style, HeadingStyle::Atx);
        assert_eq!(options.bullet_list_marker, BulletListMarker::Dash);
        assert_eq!(options.code_block_style, CodeBlockStyle::Fenced);
        assert_eq!(options.em_delimiter.as_str(), "*");
        assert_eq!(options.strong_delimiter.as_str(), "**");
    }

    #[test]
    fn test_deserialize_partial_json() {
        let options: ConversionOptions =
            serde_json::from_str(r#"{"headingStyle":"setext","bulletListMarker":"*"}"#).unwrap();
        assert_eq!(options.heading_style, HeadingStyle::Setext);
        assert_eq!(options.bullet_list_marker, BulletListMarker::Asterisk);
        assert!(options.include_metadata);
        assert_eq!(options.code_block_style, CodeBlockStyle::Fenced);
    }

    #[test]
    fn test_deserialize_rejects_unknown_values() {
        assert!(serde_json::from_str::<ConversionOptions>(r#"{"headingStyle":"fancy"}"#).is_err());
        assert!(serde_json::from_str::<ConversionOptions>(r#"{"bulletListMarker":"x"}"#).is_err());
    }

    #[test]
    fn test_serialize_spellings() {
        let options = ConversionOptions { code_block_style: CodeBlockStyle::Indented, ..Default::default() };
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["codeBlockStyle"], "indented");
        assert_eq!(json["bulletListMarker"], "-");
        assert_eq!(json["headingStyle"], "atx");
        assert_eq!(json["includeMetadata"], true);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("SETEXT".parse::<HeadingStyle>(), Ok(HeadingStyle::Setext));
        assert_eq!("+".parse::<BulletListMarker>(), Ok(BulletListMarker::Plus));
        assert_eq!("indented".parse::<CodeBlockStyle>(), Ok(CodeBlockStyle::Indented));
        assert_eq!("_".parse::<EmDelimiter>(), Ok(EmDelimiter::Underscore));
        assert_eq!("__".parse::<StrongDelimiter>(), Ok(StrongDelimiter::Underscores));
        assert!("bogus".parse::<HeadingStyle>().is_err());
    }
}
