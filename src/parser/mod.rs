pub mod indent;
pub mod line;
mod attributes;
mod tree_builder;

pub use attributes::CALL_KEY;
pub use tree_builder::ParseSettings;
use tree_builder::TreeBuilder;

use crate::ast::Document;
use crate::error::HamlError;
use crate::filters::FilterRegistry;
use crate::options::{DebugFlags, Format, Options};
use std::sync::Arc;

/// Haml template parser
#[derive(Debug, Clone)]
pub struct HamlParser {
    settings: ParseSettings,
    attr_wrapper: char,
}

impl HamlParser {
    pub fn new(options: &Options, format: Format) -> Self {
        Self {
            settings: ParseSettings {
                format,
                doctype: options.doctype.clone(),
                escape_output: options.escape_output,
                emit_comments: options.emit_comments(),
                style: options.effective_style(),
                debug: DebugFlags::from_bits(options.debug),
            },
            attr_wrapper: options.attr_wrapper,
        }
    }

    /// Parse `source` into a document. Filters are loaded from `filters` as
    /// filter lines are met.
    pub fn parse(
        &self,
        source: &str,
        file: &str,
        filters: &mut FilterRegistry,
    ) -> Result<Document, HamlError> {
        let file: Arc<str> = Arc::from(file);
        let mut builder = TreeBuilder::new(source, file.clone(), filters, self.settings.clone())?;
        let nodes = builder.build()?;
        let style = builder.style();
        tracing::debug!(%file, nodes = nodes.len(), %style, "parsed document");

        Ok(Document {
            format: self.settings.format,
            style,
            attr_wrapper: self.attr_wrapper,
            nodes,
            source: Arc::from(source),
            file,
        })
    }
}
