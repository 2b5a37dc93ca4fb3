//! # Compilation Host
//!
//! The facade the template engine talks to. It owns the process-wide defaults,
//! lazily builds the `InheritanceResolver` (and with it the chunk cache), and for
//! each compile:
//!
//! 1. parses the template with a fresh `DirectiveAwareParser`,
//! 2. resolves the ancestor chain (only when the template has a path),
//! 3. merges defaults, ancestors and the template's own directives,
//! 4. rewrites the chunk tree with the effective declarations,
//! 5. hands it to a `ModelCodeGenerator` bound to the effective configuration.

use crate::constants::DIRECTIVE_FILENAME;
use crate::core::chunk_cache::content_hash;
use crate::core::directive_parser::{DirectiveAwareParser, DirectiveSyntaxError};
use crate::core::engine::{ClassNameSanitizer, CodeGenerator, DefaultSanitizer, TemplateParser};
use crate::core::error::{CompileError, CompileResult};
use crate::core::generator::ModelCodeGenerator;
use crate::core::inheritance::InheritanceResolver;
use crate::core::merge;
use crate::core::paths::normalize_relative;
use crate::models::{ChunkSet, ChunkTree, EffectiveConfiguration, GeneratedCode, HostDefaults};
use crate::system::storage::FileStorage;
use log::debug;
use rayon::prelude::*;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Label used for errors in templates compiled without a path.
const INLINE_TEMPLATE: &str = "<inline>";

/// Compiles templates with the directives inherited from their directory tree.
pub struct CompilationHost {
    defaults: HostDefaults,
    storage: Arc<dyn FileStorage>,
    root: PathBuf,
    directive_filename: String,
    sanitizer: Arc<dyn ClassNameSanitizer>,
    resolver: Mutex<Option<Arc<InheritanceResolver>>>,
    resolver_builds: AtomicUsize,
}

impl fmt::Debug for CompilationHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilationHost")
            .field("defaults", &self.defaults)
            .field("storage", &self.storage)
            .field("root", &self.root)
            .field("directive_filename", &self.directive_filename)
            .field("resolver_builds", &self.resolver_builds)
            .finish_non_exhaustive()
    }
}

impl CompilationHost {
    /// # Arguments
    /// * `storage` - Storage the templates and directive files live in.
    /// * `root` - The tree root; the ancestor walk never goes above it.
    /// * `defaults` - Process-wide defaults, immutable from here on.
    pub fn new(
        storage: Arc<dyn FileStorage>,
        root: impl Into<PathBuf>,
        defaults: HostDefaults,
    ) -> Self {
        Self {
            defaults,
            storage,
            root: root.into(),
            directive_filename: DIRECTIVE_FILENAME.to_string(),
            sanitizer: Arc::new(DefaultSanitizer),
            resolver: Mutex::new(None),
            resolver_builds: AtomicUsize::new(0),
        }
    }

    pub fn with_directive_filename(mut self, name: impl Into<String>) -> Self {
        self.directive_filename = name.into();
        self
    }

    pub fn with_sanitizer(mut self, sanitizer: Arc<dyn ClassNameSanitizer>) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn defaults(&self) -> &HostDefaults {
        &self.defaults
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn storage(&self) -> &Arc<dyn FileStorage> {
        &self.storage
    }

    // --- RESOLVER LIFECYCLE ---

    /// Returns the resolver, building it on first use. Concurrent first callers
    /// all receive the same instance.
    pub fn resolver(&self) -> Arc<InheritanceResolver> {
        let mut slot = self.resolver.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(resolver) = &*slot {
            return Arc::clone(resolver);
        }

        debug!(
            "Building inheritance resolver (root: '{}', directive file: '{}').",
            self.root.display(),
            self.directive_filename
        );
        self.resolver_builds.fetch_add(1, Ordering::Relaxed);
        let resolver = Arc::new(InheritanceResolver::new(
            Arc::clone(&self.storage),
            self.root.clone(),
            self.directive_filename.clone(),
        ));
        *slot = Some(Arc::clone(&resolver));
        resolver
    }

    pub fn is_resolver_initialized(&self) -> bool {
        self.resolver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// How many times a resolver has been built by this host.
    pub fn resolver_builds(&self) -> usize {
        self.resolver_builds.load(Ordering::Relaxed)
    }

    /// Installs `resolver` for all subsequent compiles, returning the previous one.
    pub fn replace_resolver(
        &self,
        resolver: Arc<InheritanceResolver>,
    ) -> Option<Arc<InheritanceResolver>> {
        self.resolver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(resolver)
    }

    /// Drops the resolver and its chunk cache; the next compile builds a fresh one.
    pub fn reset_resolver(&self) -> bool {
        let previous = self
            .resolver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            debug!("Inheritance resolver reset; chunk cache dropped.");
        }
        previous.is_some()
    }

    // --- ENGINE HOOKS ---

    /// Supplies the front-end parser. The engine's default is ignored.
    pub fn decorate_parser(&self, _default: Box<dyn TemplateParser>) -> Box<dyn TemplateParser> {
        Box::new(DirectiveAwareParser)
    }

    /// Supplies the back-end generator, bound to the template's effective configuration.
    pub fn decorate_code_generator(
        &self,
        _default: Box<dyn CodeGenerator>,
        config: &EffectiveConfiguration,
    ) -> Box<dyn CodeGenerator> {
        Box::new(ModelCodeGenerator::new(
            config.clone(),
            self.defaults.methods.clone(),
        ))
    }

    // --- COMPILATION ---

    /// Compiles one template.
    ///
    /// `template_path` is `None` for templates that only exist as text; those never
    /// inherit directives and the resolver is not touched.
    ///
    /// # Errors
    /// * `InvalidArgument` - no source, a source that is not UTF-8, or a path outside the root.
    /// * `DirectiveParse` - a malformed directive in an ancestor file or the template itself.
    /// * `Storage` - the source or a directive file could not be read.
    pub fn compile(
        &self,
        template_path: Option<&Path>,
        source: Option<&mut dyn Read>,
    ) -> CompileResult<GeneratedCode> {
        let source = source
            .ok_or_else(|| CompileError::invalid("a template source stream is required"))?;
        let text = read_source(template_path, source)?;

        let (class_name, tree, config) = match template_path {
            Some(path) => {
                let resolver = self.resolver();
                let relative = resolver.normalize(path)?;
                let tree = self.parse(&relative, &text)?;
                let config = self.merge_for(&resolver, &relative, &text, &tree)?;
                (self.sanitizer.sanitize(&relative), tree, config)
            }
            None => {
                let tree = self.parse(Path::new(INLINE_TEMPLATE), &text)?;
                let own = own_chunk_set(Path::new(INLINE_TEMPLATE), &text, &tree);
                let config = merge::merge(&[], &own, &self.defaults);
                (self.defaults.class_name.clone(), tree, config)
            }
        };

        let merged_tree = merge::apply_to_tree(&config, &tree);
        let default_generator = Box::new(ModelCodeGenerator::new(
            merge::from_defaults(&self.defaults),
            self.defaults.methods.clone(),
        ));
        let generator = self.decorate_code_generator(default_generator, &config);
        let generated = generator.generate(&class_name, &merged_tree);

        debug!(
            "Compiled '{}' as '{}' ({} diagnostic(s)).",
            template_path.map_or_else(|| INLINE_TEMPLATE.into(), |p| p.display().to_string()),
            generated.class_name,
            generated.diagnostics.len()
        );
        Ok(generated)
    }

    /// Reads a template from storage and compiles it.
    pub fn compile_file(&self, template_path: &Path) -> CompileResult<GeneratedCode> {
        let relative = normalize_relative(&self.root, template_path)?;
        let mut reader = self
            .storage
            .open_read(&relative)
            .map_err(|e| CompileError::storage(&relative, e))?;
        self.compile(Some(&relative), Some(&mut *reader))
    }

    /// Compiles many templates in parallel. Results keep the input order.
    pub fn compile_batch(
        &self,
        template_paths: &[PathBuf],
    ) -> Vec<(PathBuf, CompileResult<GeneratedCode>)> {
        template_paths
            .par_iter()
            .map(|path| (path.clone(), self.compile_file(path)))
            .collect()
    }

    /// The effective configuration of a stored template, without generating code.
    pub fn resolve(&self, template_path: &Path) -> CompileResult<EffectiveConfiguration> {
        let resolver = self.resolver();
        let relative = resolver.normalize(template_path)?;
        let mut reader = self
            .storage
            .open_read(&relative)
            .map_err(|e| CompileError::storage(&relative, e))?;
        let text = read_source(Some(&relative), &mut *reader)?;
        let tree = self.parse(&relative, &text)?;
        self.merge_for(&resolver, &relative, &text, &tree)
    }

    fn parse(&self, label: &Path, text: &str) -> CompileResult<ChunkTree> {
        let parser = self.decorate_parser(Box::new(DirectiveAwareParser));
        parser
            .parse(text)
            .map_err(|DirectiveSyntaxError { line, message }| CompileError::DirectiveParse {
                path: label.to_path_buf(),
                line,
                message,
            })
    }

    fn merge_for(
        &self,
        resolver: &InheritanceResolver,
        relative: &Path,
        text: &str,
        tree: &ChunkTree,
    ) -> CompileResult<EffectiveConfiguration> {
        let chain = resolver.resolve_chain(relative)?;
        let own = own_chunk_set(relative, text, tree);
        Ok(merge::merge(&chain, &own, &self.defaults))
    }
}

fn own_chunk_set(path: &Path, text: &str, tree: &ChunkTree) -> ChunkSet {
    ChunkSet::from_chunks(path, content_hash(text.as_bytes()), tree.directives().cloned())
}

fn read_source(template_path: Option<&Path>, source: &mut dyn Read) -> CompileResult<String> {
    let label = template_path.unwrap_or(Path::new(INLINE_TEMPLATE));
    let mut bytes = Vec::new();
    source
        .read_to_end(&mut bytes)
        .map_err(|e| CompileError::storage(label, e))?;
    String::from_utf8(bytes).map_err(|_| {
        CompileError::invalid(format!("template '{}' is not valid UTF-8", label.display()))
    })
}
