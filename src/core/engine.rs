// src/core/engine.rs

//! Seams to the template engine that surrounds the host: the front-end parser,
//! the back-end code generator and the class-name sanitizer.

use crate::core::directive_parser::DirectiveSyntaxError;
use crate::models::{ChunkTree, GeneratedCode};
use std::path::Path;

/// Turns raw template source into a chunk tree.
pub trait TemplateParser: Send + Sync {
    /// Parses one template. Malformed directives are the only hard error.
    fn parse(&self, source: &str) -> Result<ChunkTree, DirectiveSyntaxError>;
}

/// Turns a (merged) chunk tree into generated source.
pub trait CodeGenerator: Send + Sync {
    /// Problems are reported as diagnostics on the result, never as an error.
    fn generate(&self, class_name: &str, tree: &ChunkTree) -> GeneratedCode;
}

/// Derives a class identifier from a template path.
pub trait ClassNameSanitizer: Send + Sync {
    /// Must be pure: the same path always yields the same name.
    fn sanitize(&self, path: &Path) -> String;
}

/// Replaces every character that cannot appear in an identifier with `_`.
///
/// `Views/Home/index.tmpl` becomes `Views_Home_index_tmpl`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultSanitizer;

impl ClassNameSanitizer for DefaultSanitizer {
    fn sanitize(&self, path: &Path) -> String {
        let raw = path.to_string_lossy();
        let mut name: String = raw
            .trim_start_matches(['/', '\\'])
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
            name.insert(0, '_');
        }
        name
    }
}
