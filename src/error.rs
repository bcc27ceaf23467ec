use std::fmt;
use std::sync::Arc;

/// Kind of compile error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No indent unit, mixed indent characters, or a level jump of more than one
    Indentation,
    /// A line that does not match any recognized line shape
    Grammar,
    /// Invalid configuration or doctype keyword
    Config,
    /// Unrecognized `?#` directive
    Directive,
    /// Unknown filter, failed load, or missing transform capability
    Filter,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Indentation => "Indentation error",
            ErrorKind::Grammar => "Syntax error",
            ErrorKind::Config => "Configuration error",
            ErrorKind::Directive => "Directive error",
            ErrorKind::Filter => "Filter error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an error happened. Line 0 means the error is not tied to a line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    /// 1-based line number
    pub line: usize,
    pub file: Arc<str>,
}

impl Location {
    pub fn new(line: usize, file: Arc<str>) -> Self {
        Self { line, file }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            return Ok(());
        }
        if self.file.is_empty() {
            write!(f, " (line {})", self.line)
        } else {
            write!(f, " ({}:{})", self.file, self.line)
        }
    }
}

/// Error raised while parsing or rendering a template
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}{location}")]
pub struct HamlError {
    pub kind: ErrorKind,
    pub message: String,
    pub location: Location,
    pub help: Option<String>,
}

impl HamlError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: Location::default(),
            help: None,
        }
    }

    pub fn indentation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Indentation, message)
    }

    pub fn grammar(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Grammar, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn directive(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Directive, message)
    }

    pub fn filter(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Filter, message)
    }

    /// Attach the offending line and source identifier
    pub fn at(mut self, line: usize, file: &Arc<str>) -> Self {
        self.location = Location::new(line, file.clone());
        self
    }

    /// Add help text
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn line(&self) -> usize {
        self.location.line
    }

    /// Render the error with source context
    pub fn render(&self, source: &str, filename: &str) -> String {
        self.render_inner(source, filename, false)
    }

    /// Render the error with ANSI color codes
    pub fn render_color(&self, source: &str, filename: &str) -> String {
        self.render_inner(source, filename, true)
    }

    fn render_inner(&self, source: &str, filename: &str, color: bool) -> String {
        let red = if color { "\x1b[1;31m" } else { "" };
        let dim = if color { "\x1b[2m" } else { "" };
        let cyan = if color { "\x1b[1;38;5;73m" } else { "" };
        let reset = if color { "\x1b[0m" } else { "" };

        let mut output = String::new();
        output.push('\n');

        if self.location.line > 0 {
            output.push_str(&format!(" {}file:{} {}:{}\n", dim, reset, filename, self.location.line));
        } else {
            output.push_str(&format!(" {}file:{} {}\n", dim, reset, filename));
        }

        output.push_str(&format!("{}error:{} {}: {}\n", red, reset, self.kind, self.message));

        if self.location.line > 0 {
            if let Some(source_line) = source.lines().nth(self.location.line - 1) {
                let width = format!("{}", self.location.line).len().max(2);
                let content = source_line.trim_start_matches([' ', '\t']);
                let lead = source_line.len() - content.len();
                let carets = "^".repeat(content.trim_end().chars().count().max(1));

                output.push_str(&format!("{}{:>width$} |{}\n", dim, "", reset, width = width));
                output.push_str(&format!(
                    "{}{:>width$} |{} {}\n",
                    dim, self.location.line, reset, source_line, width = width
                ));
                output.push_str(&format!(
                    "{}{:>width$} |{} {}{}{}{}\n",
                    dim, "", reset, " ".repeat(lead), red, carets, reset, width = width
                ));
            }
        }

        if let Some(ref help) = self.help {
            output.push('\n');
            for (i, help_line) in help.lines().enumerate() {
                if i == 0 {
                    output.push_str(&format!(" {}help:{} {}\n", cyan, reset, help_line));
                } else {
                    output.push_str(&format!("       {}\n", help_line));
                }
            }
        }

        output.push('\n');
        output
    }
}
