// src/config.rs

//! Host configuration, read from an optional `cascade.toml`.
//!
//! ```toml
//! root = "~/site/views"
//! directive_filename = "_imports.tmpl"
//! default_model = "dynamic"
//! base_class = "TemplatePage<TModel>"
//! model_placeholder = "TModel"
//! default_namespaces = ["System", "System.Linq"]
//!
//! [methods]
//! execute = "RenderAsync"
//! ```

use crate::constants::{
    CONFIG_FILENAME, DEFAULT_BASE_CLASS, DEFAULT_CLASS_NAME, DEFAULT_MODEL_TYPE,
    DEFAULT_NAMESPACES, DIRECTIVE_FILENAME, MODEL_PLACEHOLDER, TEMPLATE_EXTENSION,
};
use crate::core::host::CompilationHost;
use crate::models::{BaseTypeTemplate, GeneratedMethodNames, HostDefaults};
use crate::system::storage::PhysicalStorage;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error while reading configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML file at '{}': {source}", path.display())]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Template root '{root}' could not be expanded: {message}")]
    RootExpansion { root: String, message: String },
    #[error("Template root '{}' does not exist or is not a directory.", path.display())]
    RootNotFound { path: PathBuf },
}

/// Everything a `CompilationHost` is configured with.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct HostOptions {
    /// The tree root. Relative roots are taken relative to the config file.
    pub root: PathBuf,
    pub directive_filename: String,
    pub template_extension: String,
    pub default_model: String,
    pub base_class: String,
    pub model_placeholder: String,
    pub default_class_name: String,
    pub default_namespaces: Vec<String>,
    pub methods: GeneratedMethodNames,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            directive_filename: DIRECTIVE_FILENAME.to_string(),
            template_extension: TEMPLATE_EXTENSION.to_string(),
            default_model: DEFAULT_MODEL_TYPE.to_string(),
            base_class: DEFAULT_BASE_CLASS.to_string(),
            model_placeholder: MODEL_PLACEHOLDER.to_string(),
            default_class_name: DEFAULT_CLASS_NAME.to_string(),
            default_namespaces: DEFAULT_NAMESPACES.iter().map(|s| s.to_string()).collect(),
            methods: GeneratedMethodNames::default(),
        }
    }
}

impl HostOptions {
    /// Loads options from a TOML file. A relative `root` is resolved against the
    /// file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let mut options: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
            path: path.to_path_buf(),
            source: e,
        })?;
        let expanded = expand_root(&options.root)?;
        options.root = match path.parent() {
            Some(dir) if expanded.is_relative() => dir.join(expanded),
            _ => expanded,
        };
        log::debug!("Loaded host options from '{}'.", path.display());
        Ok(options)
    }

    /// Looks for `cascade.toml` in `root`; falls back to defaults rooted at `root`.
    pub fn discover(root: &Path) -> Result<Self, ConfigError> {
        let config_path = root.join(CONFIG_FILENAME);
        if config_path.is_file() {
            Self::load(&config_path)
        } else {
            log::debug!(
                "No '{}' in '{}'. Using default options.",
                CONFIG_FILENAME,
                root.display()
            );
            Ok(Self {
                root: root.to_path_buf(),
                ..Self::default()
            })
        }
    }

    /// The immutable defaults shared by every compilation.
    pub fn defaults(&self) -> HostDefaults {
        HostDefaults {
            namespaces: self.default_namespaces.clone(),
            model_type: self.default_model.clone(),
            base_type: BaseTypeTemplate::new(&self.base_class, &self.model_placeholder),
            class_name: self.default_class_name.clone(),
            methods: self.methods.clone(),
        }
    }

    /// Builds a host over the physical directory at `root`.
    pub fn build_host(&self) -> Result<CompilationHost, ConfigError> {
        let root = expand_root(&self.root)?;
        let storage = PhysicalStorage::new(&root)
            .map_err(|_| ConfigError::RootNotFound { path: root.clone() })?;
        let canonical_root = storage.root().to_path_buf();
        Ok(
            CompilationHost::new(Arc::new(storage), canonical_root, self.defaults())
                .with_directive_filename(&self.directive_filename),
        )
    }
}

/// Expands `~` and environment variables in a configured root.
fn expand_root(root: &Path) -> Result<PathBuf, ConfigError> {
    let raw = root.to_string_lossy();
    let expanded = shellexpand::full(&raw).map_err(|e| ConfigError::RootExpansion {
        root: raw.to_string(),
        message: e.to_string(),
    })?;
    Ok(PathBuf::from(expanded.into_owned()))
}
