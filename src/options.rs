//! Compiler configuration.
//!
//! `Options` is the configuration record hosts hand to [`crate::Compiler`]. It
//! deserializes from JSON with camelCase keys so the CLI can read it from a
//! `--config` file.

use crate::error::HamlError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Markup family; decides which doctypes exist and how empty tags close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Xhtml,
    Html4,
    Html5,
}

impl Format {
    pub const NAMES: &'static [&'static str] = &["xhtml", "html4", "html5"];

    pub fn parse(name: &str) -> Result<Self, HamlError> {
        match name.to_ascii_lowercase().as_str() {
            "xhtml" => Ok(Format::Xhtml),
            "html4" => Ok(Format::Html4),
            "html5" => Ok(Format::Html5),
            other => Err(HamlError::config(format!(
                "Invalid format ({}). Format option must be one of {}.",
                other,
                Self::NAMES.join(", ")
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Xhtml => "xhtml",
            Format::Html4 => "html4",
            Format::Html5 => "html5",
        }
    }

    pub fn is_xhtml(&self) -> bool {
        matches!(self, Format::Xhtml)
    }
}

/// Output style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    /// Output is nested according to the indent level in the source
    #[default]
    Nested,
    /// Every node on its own line, no indentation
    Expanded,
    /// Each root-level node and all of its content on one line
    Compact,
    /// All unnecessary whitespace removed
    Compressed,
}

impl Style {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "nested" => Some(Style::Nested),
            "expanded" => Some(Style::Expanded),
            "compact" => Some(Style::Compact),
            "compressed" => Some(Style::Compressed),
            _ => None,
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Style::Nested => "nested",
            Style::Expanded => "expanded",
            Style::Compact => "compact",
            Style::Compressed => "compressed",
        };
        f.write_str(name)
    }
}

/// Per-node debug switches, toggled in templates with `?#s`, `?#o` and `?#so`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DebugFlags {
    pub show_source: bool,
    pub show_output: bool,
}

impl DebugFlags {
    pub const NONE: u8 = 0;
    pub const SHOW_SOURCE: u8 = 1;
    pub const SHOW_OUTPUT: u8 = 2;
    pub const SHOW_ALL: u8 = 3;

    pub fn from_bits(bits: u8) -> Self {
        Self {
            show_source: bits & Self::SHOW_SOURCE != 0,
            show_output: bits & Self::SHOW_OUTPUT != 0,
        }
    }
}

/// Delimiters wrapped around every emitted code fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeDelimiters {
    pub open: String,
    pub close: String,
}

impl Default for CodeDelimiters {
    fn default() -> Self {
        Self {
            open: "<?php".to_string(),
            close: "?>".to_string(),
        }
    }
}

/// Configuration for compilation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Options {
    /// Markup family: xhtml, html4 or html5
    pub format: String,
    /// Explicit doctype used by a bare `!!!`
    pub doctype: Option<String>,
    /// `=` escapes markup-sensitive characters when set
    pub escape_output: bool,
    /// Code-output fragments render as empty strings when set
    pub suppress_eval: bool,
    /// Quote character wrapped around attribute values
    pub attr_wrapper: char,
    pub style: Style,
    /// Forces the compressed style and drops comments
    pub ugly: bool,
    /// Keep comments even in ugly mode
    pub preserve_comments: bool,
    /// Initial debug bitmask, see [`DebugFlags`]
    pub debug: u8,
    /// Directory searched for `<name>.filter` files before the built-in filters
    pub filter_path: Option<PathBuf>,
    pub code_delimiters: CodeDelimiters,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            format: "xhtml".to_string(),
            doctype: None,
            escape_output: false,
            suppress_eval: false,
            attr_wrapper: '"',
            style: Style::Nested,
            ugly: false,
            preserve_comments: false,
            debug: DebugFlags::NONE,
            filter_path: None,
            code_delimiters: CodeDelimiters::default(),
        }
    }
}

impl Options {
    /// Parse options from a JSON document
    pub fn from_json(json: &str) -> Result<Self, HamlError> {
        serde_json::from_str(json)
            .map_err(|e| HamlError::config(format!("Invalid options: {}", e)))
    }

    /// The style actually used at the start of a document
    pub fn effective_style(&self) -> Style {
        if self.ugly { Style::Compressed } else { self.style }
    }

    /// Whether comments are emitted at all
    pub fn emit_comments(&self) -> bool {
        !self.ugly || self.preserve_comments
    }

    /// Validate the record and resolve the markup family
    pub fn validate(&self) -> Result<Format, HamlError> {
        if self.attr_wrapper != '"' && self.attr_wrapper != '\'' {
            return Err(HamlError::config(format!(
                "Invalid attribute wrapper ({}). Use \" or '.",
                self.attr_wrapper
            )));
        }
        if self.debug > DebugFlags::SHOW_ALL {
            return Err(HamlError::config(format!(
                "Invalid debug setting ({}). Use 0 to 3.",
                self.debug
            )));
        }
        if self.code_delimiters.open.is_empty() || self.code_delimiters.close.is_empty() {
            return Err(HamlError::config("Code delimiters must not be empty."));
        }
        Format::parse(&self.format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert_eq!(options.validate().unwrap(), Format::Xhtml);
        assert_eq!(options.effective_style(), Style::Nested);
        assert!(options.emit_comments());
    }

    #[test]
    fn test_from_json_camel_case() {
        let options = Options::from_json(
            r#"{"format": "HTML5", "escapeOutput": true, "attrWrapper": "'", "style": "compact", "debug": 1}"#,
        )
        .unwrap();
        assert_eq!(options.validate().unwrap(), Format::Html5);
        assert!(options.escape_output);
        assert_eq!(options.attr_wrapper, '\'');
        assert_eq!(options.style, Style::Compact);
        assert!(DebugFlags::from_bits(options.debug).show_source);
    }

    #[test]
    fn test_unknown_format() {
        let options = Options {
            format: "wml".to_string(),
            ..Options::default()
        };
        let err = options.validate().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Config);
        assert!(err.message.contains("xhtml, html4, html5"));
    }

    #[test]
    fn test_ugly_forces_compressed() {
        let options = Options {
            ugly: true,
            ..Options::default()
        };
        assert_eq!(options.effective_style(), Style::Compressed);
        assert!(!options.emit_comments());
    }

    #[test]
    fn test_bad_wrapper() {
        let options = Options {
            attr_wrapper: '`',
            ..Options::default()
        };
        assert_eq!(options.validate().unwrap_err().kind, ErrorKind::Config);
    }
}
