//! `#{expr}` interpolation.
//!
//! Every piece of template text that ends up in the output (plain content,
//! quoted attribute values, filter bodies) goes through [`interpolate`], which
//! splits it into literal runs and code-output fragments. A backslash in front
//! of `#{` keeps the token literal.

use crate::ast::Segment;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref INTERPOLATION: Regex = Regex::new(r"(\\)?#\{(.*?)\}").unwrap();
}

/// Split `text` into literal and code segments.
pub fn interpolate(text: &str, escape: bool) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut last = 0;

    for caps in INTERPOLATION.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        literal.push_str(&text[last..whole.start()]);
        last = whole.end();

        if caps.get(1).is_some() {
            // Escaped token: drop the backslash, keep the rest verbatim
            literal.push_str(&whole.as_str()[1..]);
            continue;
        }

        let expr = caps.get(2).map_or("", |m| m.as_str()).trim();
        if expr.is_empty() {
            literal.push_str(whole.as_str());
            continue;
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }
        segments.push(Segment::code(expr, escape));
    }

    literal.push_str(&text[last..]);
    if !literal.is_empty() || segments.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    segments
}

/// Apply `f` to the literal runs only, leaving code segments untouched
pub fn map_literals(segments: Vec<Segment>, f: impl Fn(&str) -> String) -> Vec<Segment> {
    segments
        .into_iter()
        .map(|segment| match segment {
            Segment::Literal(text) => Segment::Literal(f(&text)),
            code => code,
        })
        .collect()
}
