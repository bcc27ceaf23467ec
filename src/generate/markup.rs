use super::emitter::CodeEmitter;
use super::output::{indent_lines, inner_separator, Output, Piece};
use super::Generator;
use crate::ast::*;
use crate::filters::FilterContext;
use crate::html;
use crate::options::{Format, Style};

/// Renders a document to markup with embedded code fragments
#[derive(Debug, Clone)]
pub struct MarkupGenerator {
    emitter: CodeEmitter,
    escape_output: bool,
}

impl MarkupGenerator {
    pub fn new(emitter: CodeEmitter, escape_output: bool) -> Self {
        Self {
            emitter,
            escape_output,
        }
    }
}

/// Per-document render state
struct Render<'a> {
    emitter: &'a CodeEmitter,
    escape_output: bool,
    format: Format,
    attr_wrapper: char,
    file: &'a str,
}

impl Generator for MarkupGenerator {
    fn generate(&self, document: &Document) -> String {
        let render = Render {
            emitter: &self.emitter,
            escape_output: self.escape_output,
            format: document.format,
            attr_wrapper: document.attr_wrapper,
            file: &document.file,
        };

        let mut out = Output::new();
        render.nodes(&document.nodes, 0, &mut out);
        let mut markup = out.join(0);
        if !markup.is_empty() && document.style != Style::Compressed {
            markup.push('\n');
        }
        markup
    }
}

impl Render<'_> {
    fn nodes(&self, nodes: &[Node], depth: usize, out: &mut Output) {
        for node in nodes {
            self.node(node, depth, out);
        }
    }

    fn node(&self, node: &Node, depth: usize, out: &mut Output) {
        let start = out.len();
        let meta = node.meta();

        match node {
            Node::Element(el) => out.push(self.element(el, depth)),
            Node::CodeBlock(block) => self.code_block(block, depth, out),
            Node::Statement(stmt) => {
                let code = if stmt.label {
                    self.emitter.label(&stmt.code)
                } else {
                    self.emitter.statement(&stmt.code)
                };
                out.push(Piece::new(code, meta.style));
                self.nodes(&stmt.children, depth, out);
            }
            Node::Filter(filter) => {
                let ctx = FilterContext {
                    emitter: self.emitter,
                    escape: self.escape_output,
                    format: self.format,
                };
                let text = filter.filter.transform(&filter.raw, &ctx);
                out.push(Piece::new(indent_lines(&text, meta.style, depth), meta.style));
            }
            Node::Comment(comment) => out.push(self.comment(comment, depth)),
            Node::Doctype(doctype) => {
                let text = match &doctype.declaration {
                    Declaration::Doctype(decl) => decl.clone(),
                    Declaration::XmlProlog { encoding } => self.emitter.xml_prolog(encoding),
                };
                out.push(Piece::new(text, meta.style));
            }
            Node::Text(text) => {
                out.push(Piece::new(self.emitter.segments(&text.segments), meta.style));
            }
        }

        if meta.debug.show_output && out.len() > start {
            let rendered = out.join_from(start, 0);
            out.push(Piece::new(
                format!(
                    "<pre class=\"haml-debug\">{}</pre>",
                    html_escape::encode_text(&rendered)
                ),
                meta.style,
            ));
        }
        if meta.debug.show_source {
            out.insert(start, Piece::new(self.source_echo(&meta.line), meta.style));
        }
    }

    fn source_echo(&self, line: &Line) -> String {
        format!(
            "<!-- haml {}:{}: {} -->",
            self.file,
            line.number,
            line.source.replace("--", "- -")
        )
    }

    fn element(&self, el: &ElementNode, depth: usize) -> Piece {
        let style = el.meta.style;
        let attrs = self.attributes(&el.attributes);
        let piece = |text: String| Piece::new(text, style).trimmed(el.whitespace.outer);

        if el.self_closing {
            let close = if self.format.is_xhtml() { " />" } else { ">" };
            return piece(format!("<{}{}{}", el.tag, attrs, close));
        }

        let open = format!("<{}{}>", el.tag, attrs);
        let close = format!("</{}>", el.tag);

        let mut children = Output::new();
        self.nodes(&el.children, depth + 1, &mut children);
        if children.is_empty() {
            return piece(format!("{}{}", open, close));
        }

        let single_text = el.children.len() == 1 && matches!(el.children[0], Node::Text(_));
        if html::is_preserve_element(&el.tag) {
            return piece(format!("{}{}{}", open, children.join_with("\n"), close));
        }
        if el.inline_content || (!el.block && single_text && children.len() == 1) {
            return piece(format!("{}{}{}", open, children.join(depth + 1), close));
        }

        let inner = el.whitespace.inner;
        let open_sep = match children.first() {
            Some(first) if !inner && !first.trim_outer => inner_separator(style, depth + 1),
            _ => String::new(),
        };
        let close_sep = match children.last() {
            Some(last) if !inner && !last.trim_outer => inner_separator(style, depth),
            _ => String::new(),
        };

        piece(format!(
            "{}{}{}{}{}",
            open,
            open_sep,
            children.join(depth + 1),
            close_sep,
            close
        ))
    }

    fn attributes(&self, attributes: &AttributeMap) -> String {
        let w = self.attr_wrapper;
        let mut out = String::new();

        for (name, value) in attributes.iter() {
            match value {
                AttrValue::Call(expr) => {
                    let call = self.emitter.echo(expr, false, false);
                    if !call.is_empty() {
                        out.push(' ');
                        out.push_str(&call);
                    }
                }
                AttrValue::Boolean if self.format.is_xhtml() => {
                    out.push_str(&format!(" {name}={w}{name}{w}"));
                }
                AttrValue::Boolean => out.push_str(&format!(" {}", name)),
                AttrValue::Code(expr) => {
                    let value = self.emitter.echo(expr, false, false);
                    out.push_str(&format!(" {name}={w}{value}{w}"));
                }
                AttrValue::Text(segments) => {
                    let value: String = segments
                        .iter()
                        .map(|segment| match segment {
                            Segment::Literal(text) => self.escape_wrapper(text),
                            Segment::Code {
                                expr,
                                escape,
                                preserve,
                            } => self.emitter.echo(expr, *escape, *preserve),
                        })
                        .collect();
                    out.push_str(&format!(" {name}={w}{value}{w}"));
                }
            }
        }
        out
    }

    fn escape_wrapper(&self, text: &str) -> String {
        match self.attr_wrapper {
            '\'' => text.replace('\'', "&#039;"),
            _ => text.replace('"', "&quot;"),
        }
    }

    fn code_block(&self, block: &CodeBlockNode, depth: usize, out: &mut Output) {
        let style = block.meta.style;
        out.push(Piece::new(self.emitter.block_open(&block.code), style));
        self.nodes(&block.children, depth, out);

        let mut next = block.alternative.as_deref();
        while let Some(alt) = next {
            out.push(Piece::new(self.emitter.block_else(&alt.code), alt.meta.style));
            self.nodes(&alt.children, depth, out);
            next = alt.alternative.as_deref();
        }

        let close = match &block.do_while {
            Some(condition) => self.emitter.do_while_close(condition),
            None => self.emitter.block_close(),
        };
        out.push(Piece::new(close, style));
    }

    fn comment(&self, comment: &CommentNode, depth: usize) -> Piece {
        let style = comment.meta.style;
        let (open, close) = match &comment.conditional {
            Some(condition) => (format!("<!--[{}]>", condition), "<![endif]-->".to_string()),
            None => ("<!--".to_string(), "-->".to_string()),
        };

        if comment.children.is_empty() {
            return Piece::new(format!("{} {} {}", open, comment.text, close), style);
        }

        let mut children = Output::new();
        self.nodes(&comment.children, depth + 1, &mut children);
        Piece::new(
            format!(
                "{}{}{}{}{}",
                open,
                inner_separator(style, depth + 1),
                children.join(depth + 1),
                inner_separator(style, depth),
                close
            ),
            style,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Compiler;
    use crate::options::Options;

    fn render(source: &str, options: Options) -> String {
        let mut compiler = Compiler::new(options).unwrap();
        compiler.compile(source, "test.haml").unwrap()
    }

    fn nested(source: &str) -> String {
        render(source, Options::default())
    }

    #[test]
    fn test_nested_elements() {
        assert_eq!(
            nested("%div\n  %p Hello\n  %p World"),
            "<div>\n  <p>Hello</p>\n  <p>World</p>\n</div>\n"
        );
    }

    #[test]
    fn test_empty_element() {
        assert_eq!(nested("%div"), "<div></div>\n");
    }

    #[test]
    fn test_inline_tag_with_nested_text() {
        assert_eq!(nested("%span\n  hi"), "<span>hi</span>\n");
    }

    #[test]
    fn test_void_element_formats() {
        assert_eq!(nested("%br"), "<br />\n");
        let html = Options {
            format: "html5".into(),
            ..Options::default()
        };
        assert_eq!(render("%br", html), "<br>\n");
    }

    #[test]
    fn test_boolean_attribute_formats() {
        assert_eq!(
            nested("%input(checked=true)"),
            "<input checked=\"checked\" />\n"
        );
        let html = Options {
            format: "html4".into(),
            ..Options::default()
        };
        assert_eq!(render("%input(checked=true)", html), "<input checked>\n");
    }

    #[test]
    fn test_attribute_wrapper() {
        let options = Options {
            attr_wrapper: '\'',
            ..Options::default()
        };
        assert_eq!(
            render(r#"%a(title="it's")"#, options),
            "<a title='it&#039;s'></a>\n"
        );
        assert_eq!(
            nested(r#"%a(title='say "hi"')"#),
            "<a title=\"say &quot;hi&quot;\"></a>\n"
        );
    }

    #[test]
    fn test_code_attribute() {
        assert_eq!(
            nested("%a{:href => $url} x"),
            "<a href=\"<?php echo $url; ?>\">x</a>\n"
        );
    }

    #[test]
    fn test_call_attribute() {
        assert_eq!(
            nested("%div{attrs($x)}"),
            "<div <?php echo attrs($x); ?>></div>\n"
        );
    }

    #[test]
    fn test_whitespace_removal() {
        assert_eq!(
            nested("%ul\n  %li> one\n  %li two"),
            "<ul><li>one</li><li>two</li>\n</ul>\n"
        );
        assert_eq!(
            nested("%blockquote<\n  %p quote"),
            "<blockquote><p>quote</p></blockquote>\n"
        );
    }

    #[test]
    fn test_preserve_element() {
        assert_eq!(
            nested("%div\n  %pre\n    one\n    two"),
            "<div>\n  <pre>one\ntwo</pre>\n</div>\n"
        );
    }

    #[test]
    fn test_styles() {
        let source = "%div\n  %p a\n%div\n  %p b";
        let with = |style| Options {
            style,
            ..Options::default()
        };
        assert_eq!(
            render(source, with(Style::Expanded)),
            "<div>\n<p>a</p>\n</div>\n<div>\n<p>b</p>\n</div>\n"
        );
        assert_eq!(
            render(source, with(Style::Compact)),
            "<div><p>a</p></div>\n<div><p>b</p></div>\n"
        );
        assert_eq!(
            render(source, with(Style::Compressed)),
            "<div><p>a</p></div><div><p>b</p></div>"
        );
    }

    #[test]
    fn test_comments() {
        assert_eq!(nested("/ note"), "<!-- note -->\n");
        assert_eq!(
            nested("/[if IE]\n  %p old"),
            "<!--[if IE]>\n  <p>old</p>\n<![endif]-->\n"
        );
        assert_eq!(
            nested("/\n  %p hidden"),
            "<!--\n  <p>hidden</p>\n-->\n"
        );
    }

    #[test]
    fn test_ugly_drops_comments() {
        let options = Options {
            ugly: true,
            ..Options::default()
        };
        assert_eq!(render("/ note\n%p x", options), "<p>x</p>");
    }

    #[test]
    fn test_code_blocks_are_transparent() {
        assert_eq!(
            nested("%ul\n  - foreach ($items as $item)\n    %li= $item"),
            "<ul>\n  <?php foreach ($items as $item) { ?>\n  <li><?php echo $item; ?></li>\n  <?php } ?>\n</ul>\n"
        );
    }

    #[test]
    fn test_filter_indented() {
        assert_eq!(
            nested("%div\n  :cdata\n    x"),
            "<div>\n  <![CDATA[\n  x\n  ]]>\n</div>\n"
        );
    }

    #[test]
    fn test_debug_output() {
        let options = Options {
            debug: 3,
            ..Options::default()
        };
        assert_eq!(
            render("%p a", options),
            "<!-- haml test.haml:1: %p a -->\n<p>a</p>\n<pre class=\"haml-debug\">&lt;p&gt;a&lt;/p&gt;</pre>\n"
        );
    }
}
