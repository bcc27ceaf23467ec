//! Haml to PHP template compiler.
//!
//! Indentation-structured Haml source is parsed into a [`Document`] and then
//! rendered to markup in which every dynamic part is a `<?php ... ?>` fragment
//! left for the PHP runtime to evaluate.
//!
//! ```
//! let php = haml_transpiler::compile("%p= $greeting").unwrap();
//! assert_eq!(php, "<p><?php echo $greeting; ?></p>\n");
//! ```

pub mod ast;
pub mod error;
pub mod filters;
pub mod generate;
pub mod html;
pub mod interpolate;
pub mod options;
pub mod parser;

pub use ast::Document;
pub use error::{ErrorKind, HamlError};
pub use filters::{Filter, FilterContext, FilterRegistry};
pub use generate::{CodeEmitter, Generator, MarkupGenerator};
pub use options::{DebugFlags, Format, Options, Style};
pub use parser::HamlParser;

/// Parses and renders templates with one configuration.
///
/// The compiler owns its filter registry, so filters are loaded at most once
/// across every template it compiles.
#[derive(Debug)]
pub struct Compiler {
    options: Options,
    parser: HamlParser,
    generator: MarkupGenerator,
    filters: FilterRegistry,
}

impl Compiler {
    /// Validate `options` and build a compiler for them.
    pub fn new(options: Options) -> Result<Self, HamlError> {
        let format = options.validate()?;
        tracing::debug!(format = format.as_str(), style = %options.effective_style(), "compiler configured");

        Ok(Self {
            parser: HamlParser::new(&options, format),
            generator: MarkupGenerator::new(CodeEmitter::from_options(&options), options.escape_output),
            filters: FilterRegistry::new(options.filter_path.clone()),
            options,
        })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The filter registry, for registering additional filters
    pub fn filters_mut(&mut self) -> &mut FilterRegistry {
        &mut self.filters
    }

    /// Parse pass
    pub fn parse(&mut self, source: &str, file: &str) -> Result<Document, HamlError> {
        self.parser.parse(source, file, &mut self.filters)
    }

    /// Render pass
    pub fn render(&self, document: &Document) -> String {
        self.generator.generate(document)
    }

    pub fn compile(&mut self, source: &str, file: &str) -> Result<String, HamlError> {
        let document = self.parse(source, file)?;
        Ok(self.render(&document))
    }
}

/// Compile `source` with the default options.
pub fn compile(source: &str) -> Result<String, HamlError> {
    Compiler::new(Options::default())?.compile(source, "template.haml")
}
