//! Code-fragment emission.
//!
//! Every dynamic piece of output goes through [`CodeEmitter`], so the
//! delimiter pair, `suppressEval` and the escaping call live in one place.

use crate::ast::Segment;
use crate::options::{CodeDelimiters, Options};

#[derive(Debug, Clone)]
pub struct CodeEmitter {
    delimiters: CodeDelimiters,
    suppress_eval: bool,
}

impl CodeEmitter {
    pub fn new(delimiters: CodeDelimiters, suppress_eval: bool) -> Self {
        Self {
            delimiters,
            suppress_eval,
        }
    }

    pub fn from_options(options: &Options) -> Self {
        Self::new(options.code_delimiters.clone(), options.suppress_eval)
    }

    pub fn open(&self) -> &str {
        &self.delimiters.open
    }

    pub fn close(&self) -> &str {
        &self.delimiters.close
    }

    /// `<?php code ?>`
    pub fn wrap(&self, code: &str) -> String {
        format!("{} {} {}", self.delimiters.open, code, self.delimiters.close)
    }

    /// Output fragment for `expr`; empty when evaluation is suppressed.
    pub fn echo(&self, expr: &str, escape: bool, preserve: bool) -> String {
        if self.suppress_eval {
            return String::new();
        }
        let mut value = expr.to_string();
        if escape {
            value = format!("htmlentities({})", value);
        }
        if preserve {
            value = format!("str_replace(\"\\n\", '&#x000A;', {})", value);
        }
        self.wrap(&format!("echo {};", value))
    }

    pub fn segments(&self, segments: &[Segment]) -> String {
        segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => text.clone(),
                Segment::Code {
                    expr,
                    escape,
                    preserve,
                } => self.echo(expr, *escape, *preserve),
            })
            .collect()
    }

    /// `- $x = 1`
    pub fn statement(&self, code: &str) -> String {
        self.wrap(&format!("{};", code.trim_end_matches(';')))
    }

    /// `- case 1`
    pub fn label(&self, code: &str) -> String {
        self.wrap(&format!("{}:", code.trim_end_matches(':')))
    }

    pub fn block_open(&self, code: &str) -> String {
        self.wrap(&format!("{} {{", code))
    }

    /// Closes the previous branch and opens `code`
    pub fn block_else(&self, code: &str) -> String {
        self.wrap(&format!("}} {} {{", code))
    }

    pub fn block_close(&self) -> String {
        self.wrap("}")
    }

    pub fn do_while_close(&self, condition: &str) -> String {
        self.wrap(&format!("}} while {};", condition))
    }

    /// XML prolog, emitted through code so short open tags stay harmless
    pub fn xml_prolog(&self, encoding: &str) -> String {
        self.wrap(&format!(
            "echo \"<?xml version='1.0' encoding='{}' ?>\\n\";",
            encoding
        ))
    }
}

impl Default for CodeEmitter {
    fn default() -> Self {
        Self::new(CodeDelimiters::default(), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo() {
        let e = CodeEmitter::default();
        assert_eq!(e.echo("$x", false, false), "<?php echo $x; ?>");
        assert_eq!(e.echo("$x", true, false), "<?php echo htmlentities($x); ?>");
        assert_eq!(
            e.echo("$x", false, true),
            "<?php echo str_replace(\"\\n\", '&#x000A;', $x); ?>"
        );
    }

    #[test]
    fn test_suppress_eval() {
        let e = CodeEmitter::new(CodeDelimiters::default(), true);
        assert_eq!(e.echo("$x", false, false), "");
        assert_eq!(e.statement("$x = 1"), "<?php $x = 1; ?>");
    }

    #[test]
    fn test_blocks() {
        let e = CodeEmitter::default();
        assert_eq!(e.block_open("if ($a)"), "<?php if ($a) { ?>");
        assert_eq!(e.block_else("else"), "<?php } else { ?>");
        assert_eq!(e.block_close(), "<?php } ?>");
        assert_eq!(e.do_while_close("($i < 3)"), "<?php } while ($i < 3); ?>");
        assert_eq!(e.label("case 1"), "<?php case 1: ?>");
    }

    #[test]
    fn test_custom_delimiters() {
        let e = CodeEmitter::new(
            CodeDelimiters {
                open: "<%".into(),
                close: "%>".into(),
            },
            false,
        );
        assert_eq!(e.statement("x = 1;"), "<% x = 1; %>");
    }

    #[test]
    fn test_xml_prolog() {
        let e = CodeEmitter::default();
        assert_eq!(
            e.xml_prolog("utf-8"),
            "<?php echo \"<?xml version='1.0' encoding='utf-8' ?>\\n\"; ?>"
        );
    }
}
