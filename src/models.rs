// src/models.rs

use crate::constants::{
    DEFAULT_BASE_CLASS, DEFAULT_CLASS_NAME, DEFAULT_MODEL_TYPE, DEFAULT_NAMESPACES,
    MODEL_PLACEHOLDER,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

// --- DIRECTIVE MODELS ---

/// A single configuration fact declared by a directive or template file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub enum DirectiveChunk {
    /// Overrides the generated class's base type. May contain the model placeholder.
    BaseType(String),
    /// The data type the template is parameterized over.
    ModelType(String),
    /// An extra namespace import.
    NamespaceImport(String),
}

/// One node of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    /// A configuration directive.
    Directive(DirectiveChunk),
    /// Body text emitted verbatim.
    Literal(String),
    /// An expression whose value is written at runtime.
    Expression(String),
}

/// The parser's view of one template: an ordered list of chunks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkTree {
    pub chunks: Vec<Chunk>,
}

impl ChunkTree {
    pub fn new(chunks: Vec<Chunk>) -> Self {
        Self { chunks }
    }

    /// Directive chunks in document order.
    pub fn directives(&self) -> impl Iterator<Item = &DirectiveChunk> {
        self.chunks.iter().filter_map(|chunk| match chunk {
            Chunk::Directive(directive) => Some(directive),
            _ => None,
        })
    }

    /// Everything that is not a directive, in document order.
    pub fn body(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks
            .iter()
            .filter(|chunk| !matches!(chunk, Chunk::Directive(_)))
    }
}

/// The directive chunks of a single file, normalized so that singleton directives
/// appear at most once (last declaration wins) and imports keep first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSet {
    path: PathBuf,
    content_hash: String,
    base_type: Option<String>,
    model_type: Option<String>,
    namespaces: Vec<String>,
}

impl ChunkSet {
    /// Builds a chunk set from raw directive chunks in file order.
    pub fn from_chunks<I>(path: impl Into<PathBuf>, content_hash: String, chunks: I) -> Self
    where
        I: IntoIterator<Item = DirectiveChunk>,
    {
        let path = path.into();
        let mut base_type = None;
        let mut model_type = None;
        let mut namespaces = Vec::new();
        let mut seen = HashSet::new();

        for chunk in chunks {
            match chunk {
                DirectiveChunk::BaseType(name) => {
                    if let Some(previous) = base_type.replace(name) {
                        log::warn!(
                            "'{}' declares more than one base type; '{}' is overridden.",
                            path.display(),
                            previous
                        );
                    }
                }
                DirectiveChunk::ModelType(name) => {
                    if let Some(previous) = model_type.replace(name) {
                        log::warn!(
                            "'{}' declares more than one model type; '{}' is overridden.",
                            path.display(),
                            previous
                        );
                    }
                }
                DirectiveChunk::NamespaceImport(name) => {
                    if seen.insert(name.clone()) {
                        namespaces.push(name);
                    }
                }
            }
        }

        Self {
            path,
            content_hash,
            base_type,
            model_type,
            namespaces,
        }
    }

    /// A chunk set declaring nothing, e.g. for a template without directives.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self::from_chunks(path, String::new(), std::iter::empty())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Truncated blake3 hash of the source the set was parsed from.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn base_type(&self) -> Option<&str> {
        self.base_type.as_deref()
    }

    pub fn model_type(&self) -> Option<&str> {
        self.model_type.as_deref()
    }

    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    /// The normalized chunks: imports first, then base type, then model type.
    pub fn chunks(&self) -> Vec<DirectiveChunk> {
        let mut chunks: Vec<DirectiveChunk> = self
            .namespaces
            .iter()
            .cloned()
            .map(DirectiveChunk::NamespaceImport)
            .collect();
        if let Some(base) = &self.base_type {
            chunks.push(DirectiveChunk::BaseType(base.clone()));
        }
        if let Some(model) = &self.model_type {
            chunks.push(DirectiveChunk::ModelType(model.clone()));
        }
        chunks
    }
}

// --- HOST DEFAULTS ---

/// A base-class declaration with a model-type placeholder, e.g. `TemplatePage<TModel>`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BaseTypeTemplate {
    pub template: String,
    pub placeholder: String,
}

impl BaseTypeTemplate {
    pub fn new(template: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            placeholder: placeholder.into(),
        }
    }

    /// Replaces every occurrence of the placeholder with `model_type`.
    pub fn substitute(&self, model_type: &str) -> String {
        if self.placeholder.is_empty() {
            return self.template.clone();
        }
        self.template.replace(&self.placeholder, model_type)
    }

    /// The same placeholder applied to a different template string.
    pub fn with_template(&self, template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            placeholder: self.placeholder.clone(),
        }
    }
}

impl Default for BaseTypeTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_CLASS, MODEL_PLACEHOLDER)
    }
}

/// Names of the members the code generator calls on the base class.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratedMethodNames {
    pub execute: String,
    pub write: String,
    pub write_literal: String,
    pub write_to: String,
    pub write_literal_to: String,
}

impl Default for GeneratedMethodNames {
    fn default() -> Self {
        Self {
            execute: "ExecuteAsync".to_string(),
            write: "Write".to_string(),
            write_literal: "WriteLiteral".to_string(),
            write_to: "WriteTo".to_string(),
            write_literal_to: "WriteLiteralTo".to_string(),
        }
    }
}

/// Process-wide settings shared read-only by every compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostDefaults {
    pub namespaces: Vec<String>,
    pub model_type: String,
    pub base_type: BaseTypeTemplate,
    pub class_name: String,
    pub methods: GeneratedMethodNames,
}

impl Default for HostDefaults {
    fn default() -> Self {
        Self {
            namespaces: DEFAULT_NAMESPACES.iter().map(|s| s.to_string()).collect(),
            model_type: DEFAULT_MODEL_TYPE.to_string(),
            base_type: BaseTypeTemplate::default(),
            class_name: DEFAULT_CLASS_NAME.to_string(),
            methods: GeneratedMethodNames::default(),
        }
    }
}

// --- RESOLUTION RESULTS ---

/// The merged settings applied to one template's code generation.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct EffectiveConfiguration {
    /// The winning base-type template, placeholder still in place.
    pub base_type_template: String,
    /// The winning model type (or the default).
    pub model_type: String,
    /// `base_type_template` with the model type substituted.
    pub base_class: String,
    /// Defaults, then ancestors root-to-leaf, then the template's own imports.
    pub namespaces: Vec<String>,
}

/// How serious a generator diagnostic is. Any `Error` fails the template.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A message reported by the code generator for one template.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

/// The artifact produced by a code generator.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCode {
    pub class_name: String,
    pub source: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl GeneratedCode {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }
}
