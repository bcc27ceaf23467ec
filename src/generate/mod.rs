mod emitter;
mod markup;
mod output;

pub use emitter::CodeEmitter;
pub use markup::MarkupGenerator;
pub use output::{Output, Piece, inner_separator, sibling_separator};

use crate::ast::Document;

/// Generator trait - renders a parsed document to output text
pub trait Generator {
    fn generate(&self, document: &Document) -> String;
}
