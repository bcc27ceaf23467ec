//! Filters transform the raw text nested under a `:name` line.
//!
//! The [`FilterRegistry`] is owned by a [`crate::Compiler`] and loads each
//! filter at most once. A `<name>.filter` file in the configured filter path
//! wins over a built-in of the same name.

mod builtin;

pub use builtin::{
    CdataFilter, CssFilter, EscapedFilter, JavascriptFilter, PhpFilter, PlainFilter,
    PreserveFilter, TemplateFilter,
};

use crate::ast::Segment;
use crate::error::HamlError;
use crate::generate::CodeEmitter;
use crate::interpolate::interpolate;
use crate::options::Format;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Render-time state handed to a filter
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    pub emitter: &'a CodeEmitter,
    /// Interpolated code is escaped
    pub escape: bool,
    pub format: Format,
}

impl FilterContext<'_> {
    /// Substitute `#{}` tokens in `text`
    pub fn interpolate(&self, text: &str) -> String {
        self.emitter.segments(&interpolate(text, self.escape))
    }

    /// Substitute `#{}` tokens, running literal text through `f` first
    pub fn interpolate_with(&self, text: &str, f: impl Fn(&str) -> String) -> String {
        let segments: Vec<Segment> =
            crate::interpolate::map_literals(interpolate(text, self.escape), f);
        self.emitter.segments(&segments)
    }
}

/// A named text transformation
pub trait Filter: Send + Sync + fmt::Debug {
    /// Runs once, right after the filter is instantiated.
    fn init(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn transform(&self, raw: &str, ctx: &FilterContext<'_>) -> String;
}

pub type FilterFactory = fn() -> Box<dyn Filter>;

/// Extension of filter template files
pub const FILTER_EXTENSION: &str = "filter";

pub struct FilterRegistry {
    path: Option<PathBuf>,
    factories: HashMap<String, FilterFactory>,
    cache: HashMap<String, Arc<dyn Filter>>,
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("path", &self.path)
            .field("factories", &format!("<{} factories>", self.factories.len()))
            .field("loaded", &self.cache.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl FilterRegistry {
    /// Registry with no filters at all
    pub fn empty(path: Option<PathBuf>) -> Self {
        Self {
            path,
            factories: HashMap::new(),
            cache: HashMap::new(),
        }
    }

    /// Registry with the built-in filters
    pub fn new(path: Option<PathBuf>) -> Self {
        let mut registry = Self::empty(path);
        registry.register("plain", || Box::new(PlainFilter));
        registry.register("escaped", || Box::new(EscapedFilter));
        registry.register("preserve", || Box::new(PreserveFilter));
        registry.register("cdata", || Box::new(CdataFilter));
        registry.register("javascript", || Box::new(JavascriptFilter));
        registry.register("css", || Box::new(CssFilter));
        registry.register("php", || Box::new(PhpFilter));
        registry
    }

    /// Register a factory, replacing any filter of the same name.
    pub fn register(&mut self, name: impl Into<String>, factory: FilterFactory) {
        let name = name.into();
        self.cache.remove(&name);
        self.factories.insert(name, factory);
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.cache.contains_key(name)
    }

    /// Return the filter called `name`, loading it on first use.
    pub fn get(&mut self, name: &str) -> Result<Arc<dyn Filter>, HamlError> {
        if let Some(filter) = self.cache.get(name) {
            tracing::debug!(filter = name, "filter cache hit");
            return Ok(Arc::clone(filter));
        }

        let filter = self.load(name)?;
        tracing::debug!(filter = name, "loaded filter");
        self.cache.insert(name.to_string(), Arc::clone(&filter));
        Ok(filter)
    }

    fn load(&self, name: &str) -> Result<Arc<dyn Filter>, HamlError> {
        if let Some(template) = self.load_template(name)? {
            return Ok(Arc::new(template));
        }

        let Some(factory) = self.factories.get(name) else {
            let mut known: Vec<_> = self.factories.keys().map(String::as_str).collect();
            known.sort_unstable();
            return Err(HamlError::filter(format!("Unknown filter ({}).", name))
                .with_help(format!("Available filters: {}", known.join(", "))));
        };

        let mut filter = factory();
        filter.init().map_err(|reason| {
            HamlError::filter(format!("Unable to initialise filter ({}): {}", name, reason))
        })?;
        Ok(Arc::from(filter))
    }

    fn load_template(&self, name: &str) -> Result<Option<TemplateFilter>, HamlError> {
        let Some(dir) = &self.path else {
            return Ok(None);
        };
        let path = dir.join(format!("{}.{}", name, FILTER_EXTENSION));
        if !path.is_file() {
            return Ok(None);
        }

        let template = std::fs::read_to_string(&path).map_err(|e| {
            HamlError::filter(format!("Unable to load filter ({}): {}", path.display(), e))
        })?;
        let mut filter = TemplateFilter::new(template);
        filter.init().map_err(|reason| {
            HamlError::filter(format!("Invalid filter ({}): {}", name, reason))
        })?;
        Ok(Some(filter))
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;

    #[derive(Debug)]
    struct Shout;

    impl Filter for Shout {
        fn transform(&self, raw: &str, _ctx: &FilterContext<'_>) -> String {
            raw.to_uppercase()
        }
    }

    #[derive(Debug)]
    struct Broken;

    impl Filter for Broken {
        fn init(&mut self) -> Result<(), String> {
            Err("missing dependency".to_string())
        }

        fn transform(&self, raw: &str, _ctx: &FilterContext<'_>) -> String {
            raw.to_string()
        }
    }

    #[test]
    fn test_loads_once() {
        let mut registry = FilterRegistry::default();
        assert!(!registry.is_loaded("plain"));
        let first = registry.get("plain").unwrap();
        let second = registry.get("plain").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(registry.is_loaded("plain"));
    }

    #[test]
    fn test_unknown_filter() {
        let mut registry = FilterRegistry::default();
        let err = registry.get("sass").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Filter);
        assert!(err.help.unwrap().contains("javascript"));
    }

    #[test]
    fn test_register() {
        let mut registry = FilterRegistry::default();
        registry.register("shout", || Box::new(Shout));
        let filter = registry.get("shout").unwrap();
        let emitter = CodeEmitter::default();
        let ctx = FilterContext {
            emitter: &emitter,
            escape: false,
            format: Format::Xhtml,
        };
        assert_eq!(filter.transform("hi", &ctx), "HI");
    }

    #[test]
    fn test_failed_init() {
        let mut registry = FilterRegistry::default();
        registry.register("broken", || Box::new(Broken));
        let err = registry.get("broken").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Filter);
        assert!(!registry.is_loaded("broken"));
    }

    #[test]
    fn test_path_filter_wins() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("plain.filter")).unwrap();
        write!(file, "<div class=\"plain\">{{content}}</div>").unwrap();

        let mut registry = FilterRegistry::new(Some(dir.path().to_path_buf()));
        let filter = registry.get("plain").unwrap();
        let emitter = CodeEmitter::default();
        let ctx = FilterContext {
            emitter: &emitter,
            escape: false,
            format: Format::Xhtml,
        };
        assert_eq!(filter.transform("x", &ctx), "<div class=\"plain\">x</div>");
    }

    #[test]
    fn test_path_filter_without_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.filter"), "no placeholder").unwrap();
        let mut registry = FilterRegistry::new(Some(dir.path().to_path_buf()));
        let err = registry.get("bad").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Filter);
    }
}
