/// Tag and doctype tables for markup generation.
use crate::options::Format;

/// Void elements: rendered without a closing tag when they have no content.
const VOID_ELEMENTS: &[&str] = &[
    "meta", "img", "link", "br", "hr", "input", "area", "param", "col", "base",
];

/// Inline elements; everything else is block level.
const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "acronym", "b", "big", "cite", "code", "dfn", "em", "i",
    "kbd", "q", "samp", "small", "span", "strike", "strong", "tt", "u", "var",
];

/// Elements whose content keeps its newlines.
const PRESERVE_ELEMENTS: &[&str] = &["pre", "textarea"];

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str())
}

pub fn is_block_element(tag: &str) -> bool {
    !INLINE_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str())
}

pub fn is_preserve_element(tag: &str) -> bool {
    PRESERVE_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str())
}

const XHTML_DOCTYPES: &[(&str, &str)] = &[
    ("", r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd">"#),
    ("Strict", r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Strict//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd">"#),
    ("Frameset", r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Frameset//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-frameset.dtd">"#),
    ("5", "<!DOCTYPE html>"),
    ("1.1", r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.1//EN" "http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd">"#),
    ("Basic", r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML Basic 1.1//EN" "http://www.w3.org/TR/xhtml-basic/xhtml-basic11.dtd">"#),
    ("Mobile", r#"<!DOCTYPE html PUBLIC "-//WAPFORUM//DTD XHTML Mobile 1.2//EN" "http://www.openmobilealliance.org/tech/DTD/xhtml-mobile12.dtd">"#),
];

const HTML4_DOCTYPES: &[(&str, &str)] = &[
    ("", r#"<!DOCTYPE html PUBLIC "-//W3C//DTD HTML 4.01 Transitional//EN" "http://www.w3.org/TR/html4/loose.dtd">"#),
    ("Strict", r#"<!DOCTYPE html PUBLIC "-//W3C//DTD HTML 4.01//EN" "http://www.w3.org/TR/html4/strict.dtd">"#),
    ("Frameset", r#"<!DOCTYPE html PUBLIC "-//W3C//DTD HTML 4.01 Frameset//EN" "http://www.w3.org/TR/html4/frameset.dtd">"#),
];

const HTML5_DOCTYPES: &[(&str, &str)] = &[("", "<!DOCTYPE html>")];

fn doctypes(format: Format) -> &'static [(&'static str, &'static str)] {
    match format {
        Format::Xhtml => XHTML_DOCTYPES,
        Format::Html4 => HTML4_DOCTYPES,
        Format::Html5 => HTML5_DOCTYPES,
    }
}

/// Look up a doctype declaration; an empty keyword selects the format default.
pub fn doctype(format: Format, keyword: &str) -> Option<&'static str> {
    doctypes(format)
        .iter()
        .find(|(key, _)| *key == keyword)
        .map(|(_, decl)| *decl)
}

/// Doctype keywords accepted by a format (excluding the empty default)
pub fn doctype_keywords(format: Format) -> Vec<&'static str> {
    doctypes(format)
        .iter()
        .map(|(key, _)| *key)
        .filter(|key| !key.is_empty())
        .collect()
}
