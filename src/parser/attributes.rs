//! Attribute resolution.
//!
//! Both attribute-list forms share one pair syntax:
//!
//! - `(name="value" other=$expr)`
//! - `{:name => "value", "data-x" => $expr}`
//!
//! Parenthesized pairs are applied first, brace pairs after them, then the
//! object reference or the class/id shorthand.

use crate::ast::{AttrValue, AttributeMap, Line, Segment};
use crate::error::HamlError;
use crate::interpolate::interpolate;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Attribute name and its `=` or `=>` separator
    static ref ATTRIBUTE_NAME: Regex =
        Regex::new(r#"^(?:["']([\w:-]+)["']|:?(\w+(?:[-:]\w+)*))\s*=>?\s*"#).unwrap();
    static ref FUNCTION_CALL: Regex =
        Regex::new(r"^\$?[_a-zA-Z]\w*(?:(?:->[_a-zA-Z]\w*)+|::[_a-zA-Z]\w*)?\(.+\)$").unwrap();
}

/// Key used for an attribute list given as a single function call
pub const CALL_KEY: &str = "0";

/// Which brackets an attribute list was written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    /// `(a=1 b=$x)`: pairs separated by whitespace
    Paren,
    /// `{:a => 1, :b => $x}`: pairs separated by commas
    Brace,
}

/// Value text of one pair, before interpretation
#[derive(Debug, PartialEq, Eq)]
enum RawValue<'a> {
    Quoted(String),
    Bare(&'a str),
}

/// Build the final attribute mapping for an element line.
pub fn resolve(line: &Line, escape: bool) -> Result<AttributeMap, HamlError> {
    let mut attributes = AttributeMap::new();

    let lists = [
        (&line.paren_attrs, ListKind::Paren),
        (&line.brace_attrs, ListKind::Brace),
    ];
    for (text, kind) in lists {
        if let Some(text) = text {
            parse_list(text, kind, escape, line, &mut attributes)?;
        }
    }

    if let Some(reference) = &line.object_ref {
        let (class, id) = object_reference(reference);
        attributes.insert("class", AttrValue::Code(class));
        attributes.insert("id", AttrValue::Code(id));
        return Ok(attributes);
    }

    if !line.classes.is_empty() {
        let shorthand = line.classes.join(" ");
        let merged = match attributes.get("class") {
            Some(AttrValue::Text(segments)) => {
                let mut merged = vec![Segment::Literal(format!("{} ", shorthand))];
                merged.extend(segments.iter().cloned());
                AttrValue::Text(merged)
            }
            Some(AttrValue::Code(expr)) => AttrValue::Text(vec![
                Segment::Literal(format!("{} ", shorthand)),
                Segment::code(expr.clone(), false),
            ]),
            _ => AttrValue::Text(vec![Segment::Literal(shorthand)]),
        };
        attributes.insert("class", merged);
    }
    if let Some(id) = &line.id {
        attributes.insert("id", AttrValue::Text(vec![Segment::Literal(id.clone())]));
    }

    Ok(attributes)
}

/// Apply one attribute list body (without its brackets) to `attributes`.
///
/// Every character of the list must belong to a pair or to the whitespace and
/// commas between pairs.
fn parse_list(
    text: &str,
    kind: ListKind,
    escape: bool,
    line: &Line,
    attributes: &mut AttributeMap,
) -> Result<(), HamlError> {
    let subject = text.trim();
    if subject.is_empty() {
        return Ok(());
    }

    if FUNCTION_CALL.is_match(subject) {
        attributes.insert(CALL_KEY, AttrValue::Call(subject.to_string()));
        return Ok(());
    }

    let invalid = |at: &str| {
        HamlError::grammar(format!("Invalid attribute list: {} (at '{}')", subject, at))
            .at(line.number, &line.file)
            .with_help("Attributes are written as name=value or :name => value pairs.")
    };

    let mut rest = subject;
    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        if rest.is_empty() {
            return Ok(());
        }

        let Some(caps) = ATTRIBUTE_NAME.captures(rest) else {
            return Err(invalid(rest));
        };
        let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        let value_start = caps.get(0).map_or(0, |m| m.end());
        let Some((value, remaining)) = read_value(&rest[value_start..], kind) else {
            return Err(invalid(rest));
        };
        rest = remaining;

        match value {
            RawValue::Quoted(quoted) => {
                attributes.insert(name, AttrValue::Text(interpolate(&quoted, escape)))
            }
            RawValue::Bare("true") => attributes.insert(name, AttrValue::Boolean),
            RawValue::Bare("false") => {
                attributes.remove(name);
            }
            RawValue::Bare(expr) => attributes.insert(name, AttrValue::Code(expr.to_string())),
        }
    }
}

/// Read one value from the start of `text`, returning it with the text after it.
///
/// A quoted value ends at its closing quote; `\"` inside it is a literal quote.
/// A bare value runs to the next separator outside brackets and quotes.
fn read_value(text: &str, kind: ListKind) -> Option<(RawValue<'_>, &str)> {
    let first = text.chars().next()?;

    if first == '"' || first == '\'' {
        let mut value = String::new();
        let mut escaped = false;
        for (i, c) in text.char_indices().skip(1) {
            if escaped {
                if c != first {
                    value.push('\\');
                }
                value.push(c);
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == first {
                return Some((RawValue::Quoted(value), &text[i + c.len_utf8()..]));
            } else {
                value.push(c);
            }
        }
        return None;
    }

    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut end = text.len();

    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 && kind == ListKind::Brace => {
                end = i;
                break;
            }
            c if depth == 0 && kind == ListKind::Paren && c.is_whitespace() => {
                end = i;
                break;
            }
            _ => {}
        }
    }

    if quote.is_some() || depth > 0 {
        return None;
    }
    let value = text[..end].trim_end();
    if value.is_empty() {
        return None;
    }
    Some((RawValue::Bare(value), &text[end..]))
}

/// Class and id expressions for `[expr]` or `[expr, prefix]`
fn object_reference(reference: &str) -> (String, String) {
    let (expr, prefix) = match reference.split_once(',') {
        Some((expr, prefix)) => (expr.trim(), prefix.trim()),
        None => (reference.trim(), ""),
    };

    let prefix = if prefix.is_empty() {
        String::new()
    } else {
        format!("'{}_' . ", prefix)
    };
    let class = format!(
        "{}strtolower(str_replace(' ', '_', preg_replace('/(?<=\\w)([ A-Z])/', '_\\1', get_class({}))))",
        prefix, expr
    );
    let id = format!("{} . '_' . {}->id", class, expr);
    (class, id)
}
