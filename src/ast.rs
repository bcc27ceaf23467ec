use std::fmt;
use std::sync::Arc;

use crate::filters::Filter;
use crate::options::{DebugFlags, Format, Style};

// Re-export the line record so nodes can point back at the line they came from
pub use crate::parser::line::Line;

/// Root of a parsed template
#[derive(Debug, Clone)]
pub struct Document {
    pub format: Format,
    /// Style in effect at the end of the document
    pub style: Style,
    pub attr_wrapper: char,
    pub nodes: Vec<Node>,
    pub source: Arc<str>,
    pub file: Arc<str>,
}

/// Parse-time state recorded on every node
#[derive(Debug, Clone)]
pub struct NodeMeta {
    pub line: Arc<Line>,
    pub debug: DebugFlags,
    /// Output style active when the node was parsed
    pub style: Style,
}

/// Tree node
#[derive(Debug, Clone)]
pub enum Node {
    Element(ElementNode),
    CodeBlock(CodeBlockNode),
    Statement(StatementNode),
    Filter(FilterNode),
    Comment(CommentNode),
    Doctype(DoctypeNode),
    Text(TextNode),
}

impl Node {
    pub fn meta(&self) -> &NodeMeta {
        match self {
            Node::Element(n) => &n.meta,
            Node::CodeBlock(n) => &n.meta,
            Node::Statement(n) => &n.meta,
            Node::Filter(n) => &n.meta,
            Node::Comment(n) => &n.meta,
            Node::Doctype(n) => &n.meta,
            Node::Text(n) => &n.meta,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element(n) => &n.children,
            Node::CodeBlock(n) => &n.children,
            Node::Statement(n) => &n.children,
            Node::Comment(n) => &n.children,
            Node::Filter(_) | Node::Doctype(_) | Node::Text(_) => &[],
        }
    }
}

/// Piece of text that is either literal or a code-output fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Code {
        expr: String,
        /// Wrap in an html-escaping call
        escape: bool,
        /// Turn newlines into `&#x000A;`
        preserve: bool,
    },
}

impl Segment {
    pub fn code(expr: impl Into<String>, escape: bool) -> Self {
        Segment::Code {
            expr: expr.into(),
            escape,
            preserve: false,
        }
    }
}

/// `<` and `>` markers on an element line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WhitespaceControl {
    /// `<`: no whitespace just inside the tag
    pub inner: bool,
    /// `>`: no whitespace just outside the tag
    pub outer: bool,
}

/// Markup element
#[derive(Debug, Clone)]
pub struct ElementNode {
    pub tag: String,
    pub self_closing: bool,
    pub block: bool,
    pub attributes: AttributeMap,
    pub whitespace: WhitespaceControl,
    /// The only child is the content given on the element's own line
    pub inline_content: bool,
    pub children: Vec<Node>,
    pub meta: NodeMeta,
}

/// Control-flow block (`- if`, `- foreach`, `- do`, ...)
#[derive(Debug, Clone)]
pub struct CodeBlockNode {
    /// Opening code, e.g. `if ($x)` or `elseif ($y)`
    pub code: String,
    pub children: Vec<Node>,
    /// Next `else`/`elseif` branch chained onto this block
    pub alternative: Option<Box<CodeBlockNode>>,
    /// Loop condition emitted at block close for `do` blocks
    pub do_while: Option<String>,
    pub meta: NodeMeta,
}

impl CodeBlockNode {
    /// Number of branches including this one
    pub fn branch_count(&self) -> usize {
        1 + self.alternative.as_ref().map_or(0, |alt| alt.branch_count())
    }

    /// Append `branch` at the end of the chain. Fails when the chain already
    /// ends in a bare `else` or a `do` loop.
    pub fn push_alternative(&mut self, branch: CodeBlockNode) -> bool {
        match &mut self.alternative {
            Some(next) => next.push_alternative(branch),
            None if self.code == "else" || self.do_while.is_some() => false,
            None => {
                self.alternative = Some(Box::new(branch));
                true
            }
        }
    }
}

/// Plain code line (`- $x = 1`) or switch label (`- case 1`)
#[derive(Debug, Clone)]
pub struct StatementNode {
    pub code: String,
    pub label: bool,
    pub children: Vec<Node>,
    pub meta: NodeMeta,
}

/// Filter with its raw, unparsed body
pub struct FilterNode {
    pub name: String,
    pub filter: Arc<dyn Filter>,
    pub raw: String,
    pub meta: NodeMeta,
}

impl Clone for FilterNode {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            filter: Arc::clone(&self.filter),
            raw: self.raw.clone(),
            meta: self.meta.clone(),
        }
    }
}

impl fmt::Debug for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterNode")
            .field("name", &self.name)
            .field("raw", &self.raw)
            .field("meta", &self.meta)
            .finish()
    }
}

/// XML comment, optionally conditional (`/[if IE]`)
#[derive(Debug, Clone)]
pub struct CommentNode {
    pub text: String,
    pub conditional: Option<String>,
    pub children: Vec<Node>,
    pub meta: NodeMeta,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    Doctype(String),
    XmlProlog { encoding: String },
}

#[derive(Debug, Clone)]
pub struct DoctypeNode {
    pub declaration: Declaration,
    pub meta: NodeMeta,
}

/// Text content, possibly containing code-output fragments
#[derive(Debug, Clone)]
pub struct TextNode {
    pub segments: Vec<Segment>,
    pub meta: NodeMeta,
}

/// Resolved attribute value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    /// Quoted value after interpolation
    Text(Vec<Segment>),
    /// Unquoted value, rendered as a code-output fragment
    Code(String),
    /// Minimized attribute (`checked="checked"`)
    Boolean,
    /// Whole attribute list given as one function call, rendered in place
    Call(String),
}

/// Ordered attribute mapping. Re-inserting a key keeps its position and
/// replaces the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeMap {
    entries: Vec<(String, AttrValue)>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: AttrValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.entries.iter().find(|(key, _)| key == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<AttrValue> {
        let index = self.entries.iter().position(|(key, _)| key == name)?;
        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|(k, _)| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_map_keeps_first_position() {
        let mut attrs = AttributeMap::new();
        attrs.insert("a", AttrValue::Code("1".into()));
        attrs.insert("b", AttrValue::Boolean);
        attrs.insert("a", AttrValue::Code("2".into()));
        assert_eq!(attrs.keys(), vec!["a", "b"]);
        assert_eq!(attrs.get("a"), Some(&AttrValue::Code("2".into())));
    }

    #[test]
    fn test_attribute_map_remove() {
        let mut attrs = AttributeMap::new();
        attrs.insert("a", AttrValue::Code("1".into()));
        attrs.insert("b", AttrValue::Boolean);
        assert!(attrs.remove("a").is_some());
        assert!(attrs.remove("a").is_none());
        assert_eq!(attrs.len(), 1);
        assert!(!attrs.contains("a"));
    }
}
