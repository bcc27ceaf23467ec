//! Line classification.
//!
//! Every physical (or multiline-joined) source line is matched against the one
//! structural shape of a Haml line:
//!
//! ```text
//! indent [:filter] [%tag] [.class|#id]* [[objref]] [(attrs)] [{attrs}] [<>] [token] [content] [|]
//! ```
//!
//! and turned into a [`Line`] record with named fields.

use crate::ast::WhitespaceControl;
use crate::error::HamlError;
use std::sync::Arc;

/// Leading control token of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// `!!!`
    Doctype,
    /// `/` on a line without a tag
    XmlComment,
    /// `/` after a tag
    SelfClose,
    /// `-#`
    HamlComment,
    /// `!=`
    UnescapedOutput,
    /// `&=`
    EscapedOutput,
    /// `=`
    Output,
    /// `-`
    RunCode,
    /// `~`
    PreserveOutput,
    /// `\`
    EscapeLiteral,
    /// `!` followed by plain text
    UnescapedText,
    /// `&` followed by plain text
    EscapedText,
    /// `?#`
    Directive,
}

/// Tokens recognized at the start of a line, longest first where they overlap
const LINE_TOKENS: &[(&str, Token)] = &[
    ("?#", Token::Directive),
    ("!!!", Token::Doctype),
    ("-#", Token::HamlComment),
    ("!=", Token::UnescapedOutput),
    ("&=", Token::EscapedOutput),
    ("/", Token::XmlComment),
    ("!", Token::UnescapedText),
    ("&", Token::EscapedText),
    ("=", Token::Output),
    ("-", Token::RunCode),
    ("~", Token::PreserveOutput),
    ("\\", Token::EscapeLiteral),
];

/// Tokens allowed after a tag, class, id or attribute list
const ELEMENT_TOKENS: &[(&str, Token)] = &[
    ("!=", Token::UnescapedOutput),
    ("&=", Token::EscapedOutput),
    ("/", Token::SelfClose),
    ("!", Token::UnescapedText),
    ("&", Token::EscapedText),
    ("=", Token::Output),
    ("~", Token::PreserveOutput),
];

/// Structured record of one source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub indent: String,
    pub filter: Option<String>,
    /// Explicit tag, or `div` when only a class or id was given
    pub tag: Option<String>,
    pub classes: Vec<String>,
    pub id: Option<String>,
    pub object_ref: Option<String>,
    /// Text between `(` and `)`
    pub paren_attrs: Option<String>,
    /// Text between `{` and `}`
    pub brace_attrs: Option<String>,
    pub whitespace: WhitespaceControl,
    pub token: Option<Token>,
    pub content: String,
    /// Line ended with the ` |` continuation marker
    pub multiline: bool,
    /// 1-based number of the first physical line
    pub number: usize,
    pub file: Arc<str>,
    pub level: usize,
    /// The trimmed source text, for debug echoes
    pub source: String,
}

impl Line {
    pub fn is_element(&self) -> bool {
        self.tag.is_some()
    }

    pub fn has_content(&self) -> bool {
        !self.content.is_empty()
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_tag_char(c: char) -> bool {
    is_word_char(c) || c == '-' || c == ':'
}

fn is_class_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '-' || c == '_' || c == ':'
}

fn is_id_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == ':'
}

fn is_name_char(c: char) -> bool {
    is_word_char(c) || c == '-' || c == ':'
}

/// Remove a trailing ` |` multiline marker, returning the remaining text
pub fn strip_multiline(text: &str) -> Option<&str> {
    let trimmed = text.trim_end();
    let body = trimmed.strip_suffix('|')?;
    if body.is_empty() || body.ends_with([' ', '\t']) {
        Some(body.trim_end())
    } else {
        None
    }
}

struct Cursor<'a> {
    text: &'a str,
    pos: usize,
    number: usize,
    file: &'a Arc<str>,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        self.text[self.pos..].chars().nth(1)
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn consume_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        &self.text[start..self.pos]
    }

    fn skip_spaces(&mut self) {
        self.consume_while(|c| c == ' ' || c == '\t');
    }

    fn match_token(&mut self, table: &[(&str, Token)]) -> Option<Token> {
        let rest = self.rest();
        let (literal, token) = table.iter().find(|(lit, _)| rest.starts_with(lit))?;
        self.pos += literal.len();
        Some(*token)
    }

    /// Read a bracketed section starting at `open`, honoring nesting and quotes.
    fn consume_balanced(&mut self, open: char, close: char) -> Result<&'a str, HamlError> {
        self.advance();
        let start = self.pos;
        let mut depth = 1usize;
        let mut quote: Option<char> = None;
        let mut escaped = false;

        while let Some(c) = self.peek() {
            if let Some(q) = quote {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            } else if c == '"' || c == '\'' {
                quote = Some(c);
            } else if c == open {
                depth += 1;
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    let inner = &self.text[start..self.pos];
                    self.advance();
                    return Ok(inner);
                }
            }
            self.advance();
        }

        Err(HamlError::grammar(format!("Unterminated '{}' in attribute list.", open))
            .at(self.number, self.file)
            .with_help(format!("Close the list with '{}' on the same line.", close)))
    }
}

/// Classify one logical line. `number` is 1-based.
pub fn classify(text: &str, number: usize, file: &Arc<str>) -> Result<Line, HamlError> {
    let mut cursor = Cursor { text, pos: 0, number, file };
    let indent = cursor.consume_while(|c| c == ' ' || c == '\t').to_string();

    let mut line = Line {
        indent,
        filter: None,
        tag: None,
        classes: Vec::new(),
        id: None,
        object_ref: None,
        paren_attrs: None,
        brace_attrs: None,
        whitespace: WhitespaceControl::default(),
        token: None,
        content: String::new(),
        multiline: false,
        number,
        file: file.clone(),
        level: 0,
        source: text.trim().to_string(),
    };

    if cursor.peek() == Some(':') && cursor.peek_next().is_some_and(is_word_char) {
        cursor.advance();
        line.filter = Some(cursor.consume_while(is_word_char).to_string());
        line.content = cursor.rest().trim().to_string();
        return Ok(line);
    }

    if cursor.peek() == Some('%') {
        cursor.advance();
        let tag = cursor.consume_while(is_tag_char);
        if tag.is_empty() {
            return Err(HamlError::grammar("Invalid tag: '%' must be followed by a tag name.")
                .at(number, file));
        }
        line.tag = Some(tag.to_string());
    }

    loop {
        match (cursor.peek(), cursor.peek_next()) {
            (Some('.'), Some(next)) if is_class_start(next) => {
                cursor.advance();
                line.classes.push(cursor.consume_while(is_name_char).to_string());
            }
            (Some('#'), Some(next)) if is_id_start(next) => {
                cursor.advance();
                line.id = Some(cursor.consume_while(is_name_char).to_string());
            }
            _ => break,
        }
    }

    let has_selector = line.tag.is_some() || !line.classes.is_empty() || line.id.is_some();
    if has_selector {
        loop {
            match cursor.peek() {
                Some('[') if line.object_ref.is_none() => {
                    line.object_ref = Some(cursor.consume_balanced('[', ']')?.trim().to_string());
                }
                Some('(') if line.paren_attrs.is_none() => {
                    line.paren_attrs = Some(cursor.consume_balanced('(', ')')?.to_string());
                }
                Some('{') if line.brace_attrs.is_none() => {
                    line.brace_attrs = Some(cursor.consume_balanced('{', '}')?.to_string());
                }
                _ => break,
            }
        }

        while let Some(c) = cursor.peek() {
            match c {
                '<' if !line.whitespace.inner => line.whitespace.inner = true,
                '>' if !line.whitespace.outer => line.whitespace.outer = true,
                _ => break,
            }
            cursor.advance();
        }

        if line.tag.is_none() {
            line.tag = Some("div".to_string());
        }
    }

    cursor.skip_spaces();
    line.token = if has_selector {
        cursor.match_token(ELEMENT_TOKENS)
    } else {
        cursor.match_token(LINE_TOKENS)
    };
    cursor.skip_spaces();

    let content = cursor.rest();
    match strip_multiline(content) {
        Some(body) => {
            line.multiline = true;
            line.content = body.to_string();
        }
        None => line.content = content.trim_end().to_string(),
    }

    if line.token == Some(Token::SelfClose) && line.has_content() {
        return Err(HamlError::grammar(format!(
            "Self-closing tag <{}> can't have content.",
            line.tag.as_deref().unwrap_or("div")
        ))
        .at(number, file));
    }

    tracing::trace!(number, tag = ?line.tag, token = ?line.token, "classified line");
    Ok(line)
}
