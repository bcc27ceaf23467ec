//! Indentation tracking.
//!
//! The first indented line of a document fixes the indent unit: its leading
//! character (space or tab) and, for spaces, the run length. Every other line
//! must be indented by whole multiples of that unit, using that character only.

use crate::error::HamlError;
use std::sync::Arc;

/// Indent character and how many of them make one level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndentUnit {
    pub ch: char,
    pub width: usize,
}

#[derive(Debug, Clone)]
pub struct IndentTracker {
    unit: Option<IndentUnit>,
    file: Arc<str>,
}

fn is_indent_char(c: char) -> bool {
    c == ' ' || c == '\t'
}

impl IndentTracker {
    /// Scan `lines` for the first indented, non-blank line and take its unit.
    pub fn detect<'a>(
        lines: impl IntoIterator<Item = &'a str>,
        file: Arc<str>,
    ) -> Result<Self, HamlError> {
        for (index, line) in lines.into_iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let Some(first) = line.chars().next().filter(|c| is_indent_char(*c)) else {
                continue;
            };

            let run = line.chars().take_while(|c| *c == first).count();
            if line.chars().nth(run).is_some_and(is_indent_char) {
                return Err(HamlError::indentation("Mixed indentation not allowed.")
                    .at(index + 1, &file)
                    .with_help("Indent with either spaces or tabs, not both."));
            }

            let width = if first == ' ' { run } else { 1 };
            tracing::debug!(?first, width, line = index + 1, "detected indent unit");
            return Ok(Self {
                unit: Some(IndentUnit { ch: first, width }),
                file,
            });
        }

        Ok(Self { unit: None, file })
    }

    pub fn unit(&self) -> Option<IndentUnit> {
        self.unit
    }

    /// Nesting depth expressed by `indent` on line `line`
    pub fn level(&self, indent: &str, line: usize) -> Result<usize, HamlError> {
        if indent.is_empty() {
            return Ok(0);
        }
        let Some(unit) = self.unit else {
            return Err(HamlError::indentation("Unable to determine indent character.")
                .at(line, &self.file));
        };

        if indent.chars().any(|c| c != unit.ch) {
            return Err(HamlError::indentation("Mixed indentation not allowed.")
                .at(line, &self.file)
                .with_help("Indent with either spaces or tabs, not both."));
        }

        let len = indent.chars().count();
        if len % unit.width != 0 {
            return Err(HamlError::indentation(format!(
                "Invalid indentation: {} spaces is not a multiple of {}.",
                len, unit.width
            ))
            .at(line, &self.file));
        }
        Ok(len / unit.width)
    }

    /// Whether a line at `next_level` is a child of a line at `parent_level`.
    ///
    /// Nesting deepens by exactly one level; anything deeper is an error.
    pub fn is_child(&self, parent_level: usize, next_level: usize, line: usize) -> Result<bool, HamlError> {
        if next_level == parent_level + 1 {
            Ok(true)
        } else if next_level <= parent_level {
            Ok(false)
        } else {
            Err(HamlError::indentation(format!(
                "Illegal indentation level ({}); indentation level can only increase by one.",
                next_level
            ))
            .at(line, &self.file))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn tracker(source: &str) -> Result<IndentTracker, HamlError> {
        IndentTracker::detect(source.lines(), Arc::from("test.haml"))
    }

    #[test]
    fn test_spaces() {
        let t = tracker("%div\n\n    %p\n").unwrap();
        assert_eq!(t.unit(), Some(IndentUnit { ch: ' ', width: 4 }));
        assert_eq!(t.level("        ", 3).unwrap(), 2);
    }

    #[test]
    fn test_tabs() {
        let t = tracker("%div\n\t%p\n").unwrap();
        assert_eq!(t.unit(), Some(IndentUnit { ch: '\t', width: 1 }));
        assert_eq!(t.level("\t\t", 3).unwrap(), 2);
    }

    #[test]
    fn test_blank_lines_do_not_set_unit() {
        let t = tracker("%div\n   \n  %p\n").unwrap();
        assert_eq!(t.unit(), Some(IndentUnit { ch: ' ', width: 2 }));
    }

    #[test]
    fn test_no_indented_lines() {
        let t = tracker("%p one\n%p two\n").unwrap();
        assert_eq!(t.unit(), None);
        assert_eq!(t.level("", 1).unwrap(), 0);
        assert_eq!(t.level("  ", 2).unwrap_err().kind, ErrorKind::Indentation);
    }

    #[test]
    fn test_mixed_in_first_indent() {
        let err = tracker("%div\n \t%p\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Indentation);
        assert_eq!(err.line(), 2);
    }

    #[test]
    fn test_mixed_later() {
        let t = tracker("%div\n  %p\n").unwrap();
        let err = t.level("\t", 5).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Indentation);
        assert_eq!(err.line(), 5);
    }

    #[test]
    fn test_uneven_width() {
        let t = tracker("%div\n  %p\n").unwrap();
        assert!(t.level("   ", 3).is_err());
    }

    #[test]
    fn test_is_child() {
        let t = tracker("%div\n  %p\n").unwrap();
        assert!(t.is_child(0, 1, 2).unwrap());
        assert!(!t.is_child(1, 1, 2).unwrap());
        assert!(!t.is_child(2, 0, 2).unwrap());
        let err = t.is_child(0, 2, 7).unwrap_err();
        assert_eq!(err.line(), 7);
    }
}
