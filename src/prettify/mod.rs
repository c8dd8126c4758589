//! Source reformatting, dispatched on the file's extension class.

pub mod javascript;

use crate::Result;
use std::path::Path;

pub use javascript::JsStyle;

/// Extension classes the pretty-printer knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    JavaScript,
    /// Anything without a formatter; passed through untouched
    Plain,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("js" | "mjs" | "cjs" | "jsx") => SourceKind::JavaScript,
            _ => SourceKind::Plain,
        }
    }
}

/// A formatter capability. Implementations must return `Plain` input as is.
pub trait Prettifier: Send + Sync {
    fn format(&self, source: &str, kind: SourceKind) -> Result<String>;
}

/// Built-in formatter: JavaScript via [`javascript::format`], identity otherwise.
#[derive(Debug, Clone, Default)]
pub struct DefaultPrettifier {
    pub js_style: JsStyle,
}

impl Prettifier for DefaultPrettifier {
    fn format(&self, source: &str, kind: SourceKind) -> Result<String> {
        match kind {
            SourceKind::JavaScript => javascript::format(source, &self.js_style),
            SourceKind::Plain => Ok(source.to_string()),
        }
    }
}
