use super::{Filter, FilterContext};
use crate::options::Format;

/// Interpolated text, otherwise untouched
#[derive(Debug, Default)]
pub struct PlainFilter;

impl Filter for PlainFilter {
    fn transform(&self, raw: &str, ctx: &FilterContext<'_>) -> String {
        ctx.interpolate(raw)
    }
}

/// Html-escaped text; interpolated values are escaped as well
#[derive(Debug, Default)]
pub struct EscapedFilter;

impl Filter for EscapedFilter {
    fn transform(&self, raw: &str, ctx: &FilterContext<'_>) -> String {
        let ctx = FilterContext { escape: true, ..*ctx };
        ctx.interpolate_with(raw, |text| html_escape::encode_text(text).into_owned())
    }
}

/// Newlines become `&#x000A;` so the block survives reindentation
#[derive(Debug, Default)]
pub struct PreserveFilter;

impl Filter for PreserveFilter {
    fn transform(&self, raw: &str, ctx: &FilterContext<'_>) -> String {
        ctx.interpolate(raw).replace('\n', "&#x000A;")
    }
}

#[derive(Debug, Default)]
pub struct CdataFilter;

impl Filter for CdataFilter {
    fn transform(&self, raw: &str, ctx: &FilterContext<'_>) -> String {
        format!("<![CDATA[\n{}\n]]>", ctx.interpolate(raw))
    }
}

#[derive(Debug, Default)]
pub struct JavascriptFilter;

impl Filter for JavascriptFilter {
    fn transform(&self, raw: &str, ctx: &FilterContext<'_>) -> String {
        let open = match ctx.format {
            Format::Html5 => "<script>",
            _ => "<script type=\"text/javascript\">",
        };
        format!("{}\n//<![CDATA[\n{}\n//]]>\n</script>", open, ctx.interpolate(raw))
    }
}

#[derive(Debug, Default)]
pub struct CssFilter;

impl Filter for CssFilter {
    fn transform(&self, raw: &str, ctx: &FilterContext<'_>) -> String {
        let open = match ctx.format {
            Format::Html5 => "<style>",
            _ => "<style type=\"text/css\">",
        };
        format!("{}\n/*<![CDATA[*/\n{}\n/*]]>*/\n</style>", open, ctx.interpolate(raw))
    }
}

/// Raw code block, emitted without interpolation
#[derive(Debug, Default)]
pub struct PhpFilter;

impl Filter for PhpFilter {
    fn transform(&self, raw: &str, ctx: &FilterContext<'_>) -> String {
        format!("{}\n{}\n{}", ctx.emitter.open(), raw, ctx.emitter.close())
    }
}

/// Filter loaded from a `<name>.filter` file. The file is a template whose
/// `{content}` placeholder receives the interpolated body.
#[derive(Debug, Clone)]
pub struct TemplateFilter {
    template: String,
}

impl TemplateFilter {
    pub const PLACEHOLDER: &'static str = "{content}";

    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

impl Filter for TemplateFilter {
    fn init(&mut self) -> Result<(), String> {
        if self.template.contains(Self::PLACEHOLDER) {
            Ok(())
        } else {
            Err(format!("template has no {} placeholder", Self::PLACEHOLDER))
        }
    }

    fn transform(&self, raw: &str, ctx: &FilterContext<'_>) -> String {
        self.template
            .trim_end_matches('\n')
            .replace(Self::PLACEHOLDER, &ctx.interpolate(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::CodeEmitter;
    use crate::options::CodeDelimiters;

    fn run_as(filter: &dyn Filter, raw: &str, format: Format) -> String {
        let emitter = CodeEmitter::default();
        let ctx = FilterContext {
            emitter: &emitter,
            escape: false,
            format,
        };
        filter.transform(raw, &ctx)
    }

    fn run(filter: &dyn Filter, raw: &str) -> String {
        run_as(filter, raw, Format::Xhtml)
    }

    #[test]
    fn test_plain() {
        assert_eq!(run(&PlainFilter, "Hi #{$name}"), "Hi <?php echo $name; ?>");
    }

    #[test]
    fn test_escaped() {
        assert_eq!(
            run(&EscapedFilter, "<b> #{$x}"),
            "&lt;b&gt; <?php echo htmlentities($x); ?>"
        );
    }

    #[test]
    fn test_preserve() {
        assert_eq!(run(&PreserveFilter, "a\n  b"), "a&#x000A;  b");
    }

    #[test]
    fn test_javascript() {
        assert_eq!(
            run(&JavascriptFilter, "alert('#{$msg}');"),
            "<script type=\"text/javascript\">\n//<![CDATA[\nalert('<?php echo $msg; ?>');\n//]]>\n</script>"
        );
    }

    #[test]
    fn test_html5_drops_type_attribute() {
        assert!(run_as(&JavascriptFilter, "x", Format::Html5).starts_with("<script>\n"));
        assert!(run_as(&CssFilter, "x", Format::Html5).starts_with("<style>\n"));
    }

    #[test]
    fn test_css_and_cdata() {
        assert!(run(&CssFilter, "p { color: red; }").starts_with("<style type=\"text/css\">\n/*<![CDATA[*/\np {"));
        assert_eq!(run(&CdataFilter, "x"), "<![CDATA[\nx\n]]>");
    }

    #[test]
    fn test_php_is_not_interpolated() {
        assert_eq!(run(&PhpFilter, "echo \"#{x}\";"), "<?php\necho \"#{x}\";\n?>");
    }

    #[test]
    fn test_php_uses_code_delimiters() {
        let emitter = CodeEmitter::new(
            CodeDelimiters {
                open: "<%".into(),
                close: "%>".into(),
            },
            false,
        );
        let ctx = FilterContext {
            emitter: &emitter,
            escape: false,
            format: Format::Xhtml,
        };
        assert_eq!(PhpFilter.transform("$x = 1;", &ctx), "<%\n$x = 1;\n%>");
    }

    #[test]
    fn test_template() {
        let mut filter = TemplateFilter::new("<em>{content}</em>\n");
        assert!(filter.init().is_ok());
        assert_eq!(run(&filter, "x"), "<em>x</em>");
        assert!(TemplateFilter::new("nothing").init().is_err());
    }
}
