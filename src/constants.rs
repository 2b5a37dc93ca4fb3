// src/constants.rs

/// The conventional name of a directory's directive file.
pub const DIRECTIVE_FILENAME: &str = "_imports.tmpl";

/// The file extension of compilable templates.
pub const TEMPLATE_EXTENSION: &str = "tmpl";

/// The name of the optional host configuration file (at the tree root).
pub const CONFIG_FILENAME: &str = "cascade.toml";

/// The model type used when no directive ever declares one.
pub const DEFAULT_MODEL_TYPE: &str = "dynamic";

/// The token inside a base-class template that is replaced by the model type.
pub const MODEL_PLACEHOLDER: &str = "TModel";

/// The base class every generated template derives from unless overridden.
pub const DEFAULT_BASE_CLASS: &str = "TemplatePage<TModel>";

/// The class name used for templates compiled without a path.
pub const DEFAULT_CLASS_NAME: &str = "__GeneratedTemplate";

/// Namespaces imported by every generated template.
pub const DEFAULT_NAMESPACES: &[&str] = &[
    "System",
    "System.Linq",
    "System.Collections.Generic",
    "System.Threading.Tasks",
];

/// Extension of the files written by `cascade compile --out`.
pub const GENERATED_EXTENSION: &str = "gen";

/// Number of hash bytes kept when fingerprinting a directive file (16 bytes = 32 hex chars).
pub const HASH_TRUNCATE_LENGTH: usize = 16;
