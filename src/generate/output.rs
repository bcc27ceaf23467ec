//! Whitespace between rendered nodes.
//!
//! Rendering produces a flat list of [`Piece`]s per nesting depth; [`Output`]
//! joins them with the separator the node's output style asks for. Control
//! blocks contribute their open/close fragments as pieces at the depth of
//! their children, which makes them transparent to indentation.

use crate::options::Style;

/// Whitespace placed between two siblings at `depth`
pub fn sibling_separator(style: Style, depth: usize) -> String {
    match style {
        Style::Nested => format!("\n{}", "  ".repeat(depth)),
        Style::Expanded => "\n".to_string(),
        Style::Compact if depth == 0 => "\n".to_string(),
        Style::Compact | Style::Compressed => String::new(),
    }
}

/// Whitespace just inside an element: after the open tag (`depth` = child
/// depth) or before the close tag (`depth` = the element's own depth)
pub fn inner_separator(style: Style, depth: usize) -> String {
    match style {
        Style::Compact => String::new(),
        _ => sibling_separator(style, depth),
    }
}

/// Indent continuation lines of a multi-line block for nested output
pub fn indent_lines(text: &str, style: Style, depth: usize) -> String {
    if style != Style::Nested || depth == 0 {
        return text.to_string();
    }
    let indent = "  ".repeat(depth);
    text.split('\n')
        .enumerate()
        .map(|(i, line)| {
            if i == 0 || line.is_empty() {
                line.to_string()
            } else {
                format!("{}{}", indent, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One rendered node, or one fragment of a control block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    pub text: String,
    /// No whitespace on either side (`>`)
    pub trim_outer: bool,
    pub style: Style,
}

impl Piece {
    pub fn new(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            trim_outer: false,
            style,
        }
    }

    pub fn trimmed(mut self, trim_outer: bool) -> Self {
        self.trim_outer = trim_outer;
        self
    }
}

/// Ordered pieces at one depth
#[derive(Debug, Clone, Default)]
pub struct Output {
    pieces: Vec<Piece>,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a piece; empty pieces are dropped
    pub fn push(&mut self, piece: Piece) {
        if !piece.text.is_empty() {
            self.pieces.push(piece);
        }
    }

    pub fn insert(&mut self, index: usize, piece: Piece) {
        if !piece.text.is_empty() {
            self.pieces.insert(index, piece);
        }
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn first(&self) -> Option<&Piece> {
        self.pieces.first()
    }

    pub fn last(&self) -> Option<&Piece> {
        self.pieces.last()
    }

    /// Join every piece from `start` on with sibling separators at `depth`
    pub fn join_from(&self, start: usize, depth: usize) -> String {
        let mut out = String::new();
        let mut previous: Option<&Piece> = None;

        for piece in self.pieces.iter().skip(start) {
            if let Some(prev) = previous
                && !prev.trim_outer
                && !piece.trim_outer
            {
                out.push_str(&sibling_separator(piece.style, depth));
            }
            out.push_str(&piece.text);
            previous = Some(piece);
        }
        out
    }

    pub fn join(&self, depth: usize) -> String {
        self.join_from(0, depth)
    }

    /// Join with a fixed separator, ignoring styles
    pub fn join_with(&self, separator: &str) -> String {
        self.pieces
            .iter()
            .map(|piece| piece.text.as_str())
            .collect::<Vec<_>>()
            .join(separator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separators() {
        assert_eq!(sibling_separator(Style::Nested, 2), "\n    ");
        assert_eq!(sibling_separator(Style::Expanded, 2), "\n");
        assert_eq!(sibling_separator(Style::Compact, 0), "\n");
        assert_eq!(sibling_separator(Style::Compact, 1), "");
        assert_eq!(sibling_separator(Style::Compressed, 0), "");
        assert_eq!(inner_separator(Style::Compact, 0), "");
        assert_eq!(inner_separator(Style::Nested, 1), "\n  ");
    }

    #[test]
    fn test_join() {
        let mut out = Output::new();
        out.push(Piece::new("<a>", Style::Nested));
        out.push(Piece::new("", Style::Nested));
        out.push(Piece::new("<b>", Style::Nested));
        assert_eq!(out.len(), 2);
        assert_eq!(out.join(1), "<a>\n  <b>");
    }

    #[test]
    fn test_trim_outer() {
        let mut out = Output::new();
        out.push(Piece::new("a", Style::Nested));
        out.push(Piece::new("<b>", Style::Nested).trimmed(true));
        out.push(Piece::new("c", Style::Nested));
        assert_eq!(out.join(0), "a<b>c");
    }

    #[test]
    fn test_indent_lines() {
        assert_eq!(indent_lines("a\nb\n\nc", Style::Nested, 1), "a\n  b\n\n  c");
        assert_eq!(indent_lines("a\nb", Style::Expanded, 1), "a\nb");
    }
}
