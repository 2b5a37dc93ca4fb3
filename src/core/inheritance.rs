// src/core/inheritance.rs

use crate::core::chunk_cache::ChunkTreeCache;
use crate::core::error::CompileResult;
use crate::core::paths::{ancestor_dirs, normalize_relative};
use crate::models::ChunkSet;
use crate::system::storage::FileStorage;
use log::{debug, trace};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Ancestor directive sets for one template, root directory first.
pub type InheritanceChain = Vec<Arc<ChunkSet>>;

/// Discovers the directive files that apply to a template by walking from its
/// directory up to the tree root.
#[derive(Debug)]
pub struct InheritanceResolver {
    cache: ChunkTreeCache,
    root: PathBuf,
    directive_filename: String,
}

impl InheritanceResolver {
    /// # Arguments
    /// * `storage` - Where directive files are looked up.
    /// * `root` - The tree root. Absolute template paths must lie under it.
    /// * `directive_filename` - The conventional directive file name, e.g. `_imports.tmpl`.
    pub fn new(
        storage: Arc<dyn FileStorage>,
        root: impl Into<PathBuf>,
        directive_filename: impl Into<String>,
    ) -> Self {
        Self {
            cache: ChunkTreeCache::new(storage),
            root: root.into(),
            directive_filename: directive_filename.into(),
        }
    }

    pub fn cache(&self) -> &ChunkTreeCache {
        &self.cache
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn directive_filename(&self) -> &str {
        &self.directive_filename
    }

    /// The template path relative to the tree root.
    pub fn normalize(&self, template_path: &Path) -> CompileResult<PathBuf> {
        normalize_relative(&self.root, template_path)
    }

    /// Every place a directive file may apply to `template_path` from, root first.
    /// The template itself is never included.
    pub fn directive_paths(&self, template_path: &Path) -> CompileResult<Vec<PathBuf>> {
        let template = self.normalize(template_path)?;
        Ok(ancestor_dirs(&template)
            .into_iter()
            .map(|dir| dir.join(&self.directive_filename))
            .filter(|candidate| *candidate != template)
            .collect())
    }

    /// Returns the parsed directive sets that apply to `template_path`, root first.
    ///
    /// Levels without a directive file are skipped.
    ///
    /// # Errors
    /// `InvalidArgument` if the path escapes the root; otherwise the first
    /// `DirectiveParse` or `Storage` error met while walking up from the template.
    pub fn resolve_chain(&self, template_path: &Path) -> CompileResult<InheritanceChain> {
        let candidates = self.directive_paths(template_path)?;

        let mut chain = Vec::with_capacity(candidates.len());
        for candidate in candidates.iter().rev() {
            match self.cache.get_or_parse(candidate)? {
                Some(set) => chain.push(set),
                None => trace!("No directive file at '{}'.", candidate.display()),
            }
        }
        chain.reverse();

        debug!(
            "Resolved {} ancestor directive file(s) for '{}'.",
            chain.len(),
            template_path.display()
        );
        Ok(chain)
    }
}
