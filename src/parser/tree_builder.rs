use super::attributes;
use super::indent::IndentTracker;
use super::line::{classify, strip_multiline, Token};
use crate::ast::*;
use crate::error::HamlError;
use crate::filters::FilterRegistry;
use crate::html;
use crate::interpolate::{interpolate, map_literals};
use crate::options::{DebugFlags, Format, Style};
use std::sync::Arc;

/// Keywords that open a control-flow block
const BLOCK_KEYWORDS: &[&str] = &["if", "foreach", "for", "switch", "do", "while"];

/// Keywords that continue the preceding block
const ELSE_KEYWORDS: &[&str] = &["else", "elseif"];

/// Keywords of switch labels
const LABEL_KEYWORDS: &[&str] = &["case", "default"];

/// Parser state that outlives a single line
#[derive(Debug, Clone)]
pub struct ParseSettings {
    pub format: Format,
    /// Declaration used by a bare `!!!`
    pub doctype: Option<String>,
    pub escape_output: bool,
    pub emit_comments: bool,
    pub style: Style,
    pub debug: DebugFlags,
}

/// Builds the node tree from source lines
pub struct TreeBuilder<'a> {
    lines: Vec<&'a str>,
    pos: usize,
    pending: Option<Line>,
    file: Arc<str>,
    indent: IndentTracker,
    filters: &'a mut FilterRegistry,
    settings: ParseSettings,
}

fn first_word(code: &str) -> &str {
    let end = code
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(code.len());
    &code[..end]
}

fn leading_width(text: &str) -> usize {
    text.chars().take_while(|c| *c == ' ' || *c == '\t').count()
}

impl<'a> TreeBuilder<'a> {
    pub fn new(
        source: &'a str,
        file: Arc<str>,
        filters: &'a mut FilterRegistry,
        settings: ParseSettings,
    ) -> Result<Self, HamlError> {
        let lines: Vec<&str> = source.lines().collect();
        let indent = IndentTracker::detect(lines.iter().copied(), file.clone())?;
        Ok(Self {
            lines,
            pos: 0,
            pending: None,
            file,
            indent,
            filters,
            settings,
        })
    }

    /// Style in effect after the last directive
    pub fn style(&self) -> Style {
        self.settings.style
    }

    pub fn build(&mut self) -> Result<Vec<Node>, HamlError> {
        self.parse_nodes(0)
    }

    fn meta(&self, line: &Arc<Line>) -> NodeMeta {
        NodeMeta {
            line: Arc::clone(line),
            debug: self.settings.debug,
            style: self.settings.style,
        }
    }

    /// Read the next non-blank logical line, joining multiline groups.
    fn read_line(&mut self) -> Result<Option<Line>, HamlError> {
        while self.pos < self.lines.len() && self.lines[self.pos].trim().is_empty() {
            self.pos += 1;
        }
        if self.pos >= self.lines.len() {
            return Ok(None);
        }

        let number = self.pos + 1;
        let mut line = classify(self.lines[self.pos], number, &self.file)?;
        self.pos += 1;

        if line.multiline {
            while let Some(body) = self
                .lines
                .get(self.pos)
                .and_then(|raw| strip_multiline(raw.trim_start()))
            {
                if !body.is_empty() {
                    if !line.content.is_empty() {
                        line.content.push(' ');
                    }
                    line.content.push_str(body);
                }
                self.pos += 1;
            }
        }

        line.level = self.indent.level(&line.indent, number)?;
        Ok(Some(line))
    }

    fn peek(&mut self) -> Result<Option<&Line>, HamlError> {
        if self.pending.is_none() {
            self.pending = self.read_line()?;
        }
        Ok(self.pending.as_ref())
    }

    fn advance(&mut self) -> Result<Option<Line>, HamlError> {
        match self.pending.take() {
            Some(line) => Ok(Some(line)),
            None => self.read_line(),
        }
    }

    fn peek_position(&mut self) -> Result<Option<(usize, usize)>, HamlError> {
        Ok(self.peek()?.map(|line| (line.level, line.number)))
    }

    /// Width in characters of `level` indent units
    fn indent_width(&self, level: usize) -> usize {
        self.indent.unit().map_or(0, |unit| unit.width * level)
    }

    /// Consume every raw line indented deeper than `level`, blank ones included.
    /// Trailing blank lines are left for the caller.
    fn take_deeper(&mut self, level: usize) -> Vec<&'a str> {
        let base = self.indent_width(level);
        let mut end = self.pos;

        let mut cursor = self.pos;
        while let Some(raw) = self.lines.get(cursor) {
            if raw.trim().is_empty() {
                cursor += 1;
                continue;
            }
            if leading_width(raw) <= base {
                break;
            }
            cursor += 1;
            end = cursor;
        }

        let taken = self.lines[self.pos..end].to_vec();
        self.pos = end;
        taken
    }

    fn parse_nodes(&mut self, level: usize) -> Result<Vec<Node>, HamlError> {
        let mut nodes = Vec::new();

        while let Some((next_level, number)) = self.peek_position()? {
            if next_level < level {
                break;
            }
            if next_level > level {
                return Err(HamlError::indentation(format!(
                    "Illegal indentation level ({}); expected level {}.",
                    next_level, level
                ))
                .at(number, &self.file));
            }

            let Some(line) = self.advance()? else { break };
            if let Some(node) = self.parse_line(line, &mut nodes)? {
                nodes.push(node);
            }
        }

        Ok(nodes)
    }

    fn parse_children(&mut self, level: usize) -> Result<Vec<Node>, HamlError> {
        let Some((next_level, number)) = self.peek_position()? else {
            return Ok(Vec::new());
        };
        if self.indent.is_child(level, next_level, number)? {
            self.parse_nodes(level + 1)
        } else {
            Ok(Vec::new())
        }
    }

    /// Fail if the next line is nested under `line`
    fn forbid_children(&mut self, line: &Line, what: &str) -> Result<(), HamlError> {
        match self.peek_position()? {
            Some((next_level, number)) if next_level > line.level => {
                Err(HamlError::grammar(format!("Illegal nesting: nesting within {} is illegal.", what))
                    .at(number, &self.file))
            }
            _ => Ok(()),
        }
    }

    fn parse_line(&mut self, line: Line, siblings: &mut Vec<Node>) -> Result<Option<Node>, HamlError> {
        if line.filter.is_some() {
            return self.parse_filter(line).map(Some);
        }
        if line.is_element() {
            return self.parse_element(line).map(Some);
        }

        match line.token {
            Some(Token::HamlComment) => {
                if line.has_content() {
                    self.forbid_children(&line, "a haml comment that already has content")?;
                } else {
                    self.take_deeper(line.level);
                }
                Ok(None)
            }
            Some(Token::XmlComment) => self.parse_comment(line),
            Some(Token::RunCode) => self.parse_code(line, siblings),
            Some(Token::Directive) => {
                self.parse_directive(&line)?;
                self.forbid_children(&line, "a directive")?;
                Ok(None)
            }
            Some(Token::Doctype) => self.parse_doctype(line).map(Some),
            _ => {
                let segments = self.content_segments(&line)?;
                let what = if line.token.is_some_and(|t| is_output(t)) {
                    "a code output line"
                } else {
                    "plain text"
                };
                self.forbid_children(&line, what)?;
                let meta = self.meta(&Arc::new(line));
                Ok(Some(Node::Text(TextNode { segments, meta })))
            }
        }
    }

    /// Segments for a line's content according to its token
    fn content_segments(&self, line: &Line) -> Result<Vec<Segment>, HamlError> {
        let content = line.content.as_str();
        let escape = self.settings.escape_output;

        if line.token.is_some_and(is_output) && content.is_empty() {
            return Err(HamlError::grammar("There is no code to evaluate.").at(line.number, &self.file));
        }

        let segments = match line.token {
            Some(Token::Output) => vec![Segment::code(content, escape)],
            Some(Token::EscapedOutput) => vec![Segment::code(content, true)],
            Some(Token::UnescapedOutput) => vec![Segment::code(content, false)],
            Some(Token::PreserveOutput) => vec![Segment::Code {
                expr: content.to_string(),
                escape,
                preserve: true,
            }],
            Some(Token::EscapedText) => map_literals(interpolate(content, true), |text| {
                html_escape::encode_text(text).into_owned()
            }),
            Some(Token::UnescapedText) => interpolate(content, false),
            _ => interpolate(content, escape),
        };
        Ok(segments)
    }

    fn parse_element(&mut self, line: Line) -> Result<Node, HamlError> {
        let tag = line.tag.clone().unwrap_or_else(|| "div".to_string());
        let attributes = attributes::resolve(&line, self.settings.escape_output)?;
        let self_closing = line.token == Some(Token::SelfClose) || html::is_void_element(&tag);

        let inline = if line.has_content() || line.token.is_some_and(is_output) {
            Some(self.content_segments(&line)?)
        } else {
            None
        };

        let line = Arc::new(line);
        let meta = self.meta(&line);
        let children = self.parse_children(line.level)?;

        if self_closing && (inline.is_some() || !children.is_empty()) {
            return Err(HamlError::grammar(format!(
                "Illegal nesting: self-closing tag <{}> can't have content.",
                tag
            ))
            .at(line.number, &self.file)
            .with_help("Void elements and tags ending in '/' are always rendered empty."));
        }
        if inline.is_some() && !children.is_empty() {
            return Err(HamlError::grammar(format!(
                "Illegal nesting: content can't be both given on the same line as %{} and nested within it.",
                tag
            ))
            .at(line.number, &self.file));
        }

        let inline_content = inline.is_some();
        let children = match inline {
            // Debug blocks wrap the element, not its inline text
            Some(segments) => vec![Node::Text(TextNode {
                segments,
                meta: NodeMeta {
                    debug: DebugFlags::default(),
                    ..meta.clone()
                },
            })],
            None => children,
        };

        Ok(Node::Element(ElementNode {
            block: html::is_block_element(&tag),
            tag,
            self_closing,
            attributes,
            whitespace: line.whitespace,
            inline_content,
            children,
            meta,
        }))
    }

    fn parse_code(&mut self, line: Line, siblings: &mut Vec<Node>) -> Result<Option<Node>, HamlError> {
        let code = line.content.trim().to_string();
        if code.is_empty() {
            return Err(HamlError::grammar("There is no code to run after '-'.").at(line.number, &self.file));
        }
        let keyword = first_word(&code);
        let line = Arc::new(line);
        let meta = self.meta(&line);

        if ELSE_KEYWORDS.contains(&keyword) {
            let children = self.parse_children(line.level)?;
            let branch = CodeBlockNode {
                code,
                children,
                alternative: None,
                do_while: None,
                meta,
            };
            self.attach_else(siblings, branch, &line)?;
            return Ok(None);
        }

        if BLOCK_KEYWORDS.contains(&keyword) {
            let do_while = if keyword == "do" {
                let condition = code["do".len()..].trim();
                let condition = condition
                    .strip_prefix("while")
                    .filter(|rest| rest.starts_with([' ', '(']))
                    .unwrap_or(condition)
                    .trim();
                if condition.is_empty() {
                    return Err(HamlError::grammar("A do block needs a loop condition.")
                        .at(line.number, &self.file)
                        .with_help("Write the condition on the same line: - do while ($i < 10)"));
                }
                Some(if condition.starts_with('(') && condition.ends_with(')') {
                    condition.to_string()
                } else {
                    format!("({})", condition)
                })
            } else {
                None
            };

            let children = self.parse_children(line.level)?;
            return Ok(Some(Node::CodeBlock(CodeBlockNode {
                code: if do_while.is_some() { "do".to_string() } else { code },
                children,
                alternative: None,
                do_while,
                meta,
            })));
        }

        let label = LABEL_KEYWORDS.contains(&keyword);
        let children = self.parse_children(line.level)?;
        Ok(Some(Node::Statement(StatementNode {
            code,
            label,
            children,
            meta,
        })))
    }

    /// Append `branch` to the alternative chain of the preceding `if` block
    fn attach_else(
        &self,
        siblings: &mut [Node],
        branch: CodeBlockNode,
        line: &Line,
    ) -> Result<(), HamlError> {
        let keyword = first_word(&branch.code).to_string();
        let attached = match siblings.last_mut() {
            Some(Node::CodeBlock(block)) if first_word(&block.code) == "if" => {
                block.push_alternative(branch)
            }
            _ => false,
        };

        if attached {
            Ok(())
        } else {
            Err(HamlError::grammar(format!("'{}' without a preceding if block.", keyword))
                .at(line.number, &self.file)
                .with_help("else and elseif must follow an if block at the same indentation."))
        }
    }

    fn parse_comment(&mut self, line: Line) -> Result<Option<Node>, HamlError> {
        let content = line.content.trim();
        let (conditional, text) = match content.strip_prefix('[').and_then(|rest| rest.split_once(']')) {
            Some((condition, rest)) => (Some(condition.trim().to_string()), rest.trim().to_string()),
            None => (None, content.to_string()),
        };

        let line = Arc::new(line);
        let meta = self.meta(&line);
        let children = self.parse_children(line.level)?;
        if !text.is_empty() && !children.is_empty() {
            return Err(HamlError::grammar(
                "Illegal nesting: nesting within a comment that already has content is illegal.",
            )
            .at(line.number, &self.file));
        }

        if !self.settings.emit_comments {
            tracing::warn!(line = line.number, "comment dropped in ugly mode");
            return Ok(None);
        }

        Ok(Some(Node::Comment(CommentNode {
            text,
            conditional,
            children,
            meta,
        })))
    }

    fn parse_directive(&mut self, line: &Line) -> Result<(), HamlError> {
        let content = line.content.trim();
        let name = first_word(content);
        let suffix = content[name.len()..].trim();

        let apply = |current: bool| -> Option<bool> {
            match suffix {
                "" => Some(current),
                "+" => Some(true),
                "-" => Some(false),
                "!" => Some(!current),
                _ => None,
            }
        };

        let debug = &mut self.settings.debug;
        let applied = match name {
            "s" => apply(debug.show_source).map(|v| debug.show_source = v),
            "o" => apply(debug.show_output).map(|v| debug.show_output = v),
            "so" | "os" => apply(debug.show_source)
                .zip(apply(debug.show_output))
                .map(|(source, output)| {
                    debug.show_source = source;
                    debug.show_output = output;
                }),
            _ => match Style::from_name(name) {
                Some(style) if suffix.is_empty() => {
                    tracing::debug!(%style, line = line.number, "style changed");
                    self.settings.style = style;
                    return Ok(());
                }
                _ => None,
            },
        };

        if applied.is_none() {
            return Err(HamlError::directive(format!("Invalid directive (?#{}).", content))
                .at(line.number, &self.file)
                .with_help("Use s, o or so with +, - or !, or a style name."));
        }
        tracing::debug!(directive = content, debug = ?self.settings.debug, "debug flags changed");
        Ok(())
    }

    fn parse_doctype(&mut self, line: Line) -> Result<Node, HamlError> {
        self.forbid_children(&line, "a doctype")?;
        let content = line.content.trim();
        let mut words = content.split_whitespace();
        let keyword = words.next().unwrap_or("");
        let format = self.settings.format;

        let declaration = match (keyword, &self.settings.doctype) {
            ("XML", _) => Declaration::XmlProlog {
                encoding: words.next().unwrap_or("utf-8").to_string(),
            },
            ("", Some(doctype)) => Declaration::Doctype(doctype.clone()),
            _ => match html::doctype(format, keyword) {
                Some(decl) => Declaration::Doctype(decl.to_string()),
                None => {
                    let keywords = html::doctype_keywords(format);
                    let allowed = if keywords.is_empty() {
                        "empty".to_string()
                    } else {
                        format!("empty or one of {}", keywords.join(", "))
                    };
                    return Err(HamlError::config(format!(
                        "Invalid doctype ({}). Doctype must be {} for the current format ({}).",
                        keyword,
                        allowed,
                        format.as_str()
                    ))
                    .at(line.number, &self.file));
                }
            },
        };

        let meta = self.meta(&Arc::new(line));
        Ok(Node::Doctype(DoctypeNode { declaration, meta }))
    }

    fn parse_filter(&mut self, line: Line) -> Result<Node, HamlError> {
        let name = line.filter.clone().unwrap_or_default();
        if line.has_content() {
            return Err(HamlError::grammar(format!("Content of filter :{} must be nested.", name))
                .at(line.number, &self.file));
        }
        let filter = self
            .filters
            .get(&name)
            .map_err(|e| e.at(line.number, &self.file))?;

        let base = self.indent_width(line.level + 1);
        let raw = self
            .take_deeper(line.level)
            .into_iter()
            .map(|text| {
                let cut = text
                    .char_indices()
                    .take_while(|(i, c)| *i < base && (*c == ' ' || *c == '\t'))
                    .count();
                &text[cut..]
            })
            .collect::<Vec<_>>()
            .join("\n");

        let meta = self.meta(&Arc::new(line));
        Ok(Node::Filter(FilterNode {
            name,
            filter,
            raw,
            meta,
        }))
    }
}

fn is_output(token: Token) -> bool {
    matches!(
        token,
        Token::Output | Token::EscapedOutput | Token::UnescapedOutput | Token::PreserveOutput
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn settings() -> ParseSettings {
        ParseSettings {
            format: Format::Xhtml,
            doctype: None,
            escape_output: false,
            emit_comments: true,
            style: Style::Nested,
            debug: DebugFlags::default(),
        }
    }

    fn build(source: &str) -> Result<Vec<Node>, HamlError> {
        let mut filters = FilterRegistry::default();
        let mut builder = TreeBuilder::new(source, Arc::from("test.haml"), &mut filters, settings())?;
        builder.build()
    }

    #[test]
    fn test_nesting() {
        let nodes = build("%div\n  %p one\n  %p two\n%span").unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].children().len(), 2);
        let Node::Element(p) = &nodes[0].children()[0] else {
            panic!("expected element");
        };
        assert!(p.inline_content);
        assert_eq!(p.meta.line.number, 2);
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let nodes = build("%div\n\n  %p one\n\n\n%span").unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].meta().line.number, 6);
    }

    #[test]
    fn test_level_jump() {
        let err = build("%div\n  %p\n      %b").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Indentation);
        assert_eq!(err.line(), 3);
    }

    #[test]
    fn test_else_chain() {
        let nodes = build("- if ($a)\n  a\n- elseif ($b)\n  b\n- else\n  c\n%p").unwrap();
        assert_eq!(nodes.len(), 2);
        let Node::CodeBlock(block) = &nodes[0] else {
            panic!("expected code block");
        };
        assert_eq!(block.branch_count(), 3);
        assert_eq!(block.alternative.as_ref().unwrap().code, "elseif ($b)");
    }

    #[test]
    fn test_stray_else() {
        let err = build("%p\n- else\n  x").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Grammar);
        assert_eq!(err.line(), 2);
    }

    #[test]
    fn test_do_while() {
        let nodes = build("- do while ($i < 3)\n  = $i++").unwrap();
        let Node::CodeBlock(block) = &nodes[0] else {
            panic!("expected code block");
        };
        assert_eq!(block.do_while.as_deref(), Some("($i < 3)"));
        assert!(build("- do\n  x").is_err());
    }

    #[test]
    fn test_switch_labels() {
        let nodes = build("- switch ($x)\n  - case 1\n    one\n  - default\n    other").unwrap();
        let children = nodes[0].children();
        assert_eq!(children.len(), 2);
        let Node::Statement(case) = &children[0] else {
            panic!("expected statement");
        };
        assert!(case.label);
        assert_eq!(case.children.len(), 1);
    }

    #[test]
    fn test_haml_comment_eats_children() {
        let nodes = build("-#\n  %p gone\n\n    deeper\n%p kept").unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].meta().line.number, 5);
    }

    #[test]
    fn test_haml_comment_with_content_keeps_siblings() {
        let nodes = build("-# note\n%p kept").unwrap();
        assert_eq!(nodes.len(), 1);

        let err = build("-# note\n  %p nested").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Grammar);
        assert_eq!(err.line(), 2);
        assert!(err.message.contains("haml comment"));
    }

    #[test]
    fn test_filter_body_is_raw() {
        let nodes = build("%div\n  :plain\n    <b>%p</b>\n\n      indented\n  %p after").unwrap();
        let children = nodes[0].children();
        assert_eq!(children.len(), 2);
        let Node::Filter(filter) = &children[0] else {
            panic!("expected filter");
        };
        assert_eq!(filter.raw, "<b>%p</b>\n\n  indented");
    }

    #[test]
    fn test_unknown_filter() {
        let err = build("%div\n  :sass\n    x").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Filter);
        assert_eq!(err.line(), 2);
    }

    #[test]
    fn test_text_cannot_nest() {
        let err = build("hello\n  %p").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Grammar);
        assert_eq!(err.line(), 2);
    }

    #[test]
    fn test_void_with_content() {
        assert!(build("%br text").is_err());
        assert!(build("%img\n  %p").is_err());
        assert!(build("%br").is_ok());
    }

    #[test]
    fn test_multiline() {
        let nodes = build("%p one |\n  two |\n  three |\n%p after").unwrap();
        assert_eq!(nodes.len(), 2);
        let Node::Element(p) = &nodes[0] else {
            panic!("expected element");
        };
        let Node::Text(text) = &p.children[0] else {
            panic!("expected text");
        };
        assert_eq!(text.segments, vec![Segment::Literal("one two three".into())]);
        assert_eq!(nodes[1].meta().line.number, 4);
    }

    #[test]
    fn test_directives() {
        let nodes = build("?#s+\n%p a\n?#s-\n%p b\n?#compact\n%p c").unwrap();
        assert!(nodes[0].meta().debug.show_source);
        assert!(!nodes[1].meta().debug.show_source);
        assert_eq!(nodes[2].meta().style, Style::Compact);

        let err = build("?#x+").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Directive);
    }

    #[test]
    fn test_doctype_errors() {
        let err = build("!!! Bogus").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Config);
        assert!(err.message.contains("Strict"));
    }

    #[test]
    fn test_ugly_drops_comments() {
        let mut filters = FilterRegistry::default();
        let settings = ParseSettings {
            emit_comments: false,
            ..settings()
        };
        let mut builder =
            TreeBuilder::new("/ note\n%p", Arc::from("t.haml"), &mut filters, settings).unwrap();
        let nodes = builder.build().unwrap();
        assert_eq!(nodes.len(), 1);
    }
}
