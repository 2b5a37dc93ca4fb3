// src/core/chunk_cache.rs

//! # Chunk Tree Cache
//!
//! Holds the parsed `ChunkSet` of every directive file seen so far, keyed by its
//! normalized path. Entries are validated on every lookup with a layered strategy:
//!
//! 1. Stamp (modification time / revision and size): unchanged means the entry is served.
//! 2. Content hash (blake3): a changed stamp with identical content keeps the parsed set.
//! 3. Existence: a file that disappeared evicts its entry.
//!
//! Parsing happens outside the lock, so concurrent lookups of the same path may both
//! parse; whichever inserts first wins and the other result is dropped.

use crate::constants::HASH_TRUNCATE_LENGTH;
use crate::core::directive_parser::parse_directive_file;
use crate::core::error::{CompileError, CompileResult};
use crate::models::ChunkSet;
use crate::system::storage::{FileStamp, FileStorage};
use log::{debug, trace};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Clone)]
struct CacheEntry {
    stamp: FileStamp,
    set: Arc<ChunkSet>,
}

/// Lookup counters since the cache was created.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Served without touching file content.
    pub hits: u64,
    /// Parsed from source.
    pub misses: u64,
    /// Stamp changed but content hash matched, so the parsed set was kept.
    pub revalidations: u64,
}

/// Parsed directive files keyed by their path relative to the root.
#[derive(Debug)]
pub struct ChunkTreeCache {
    storage: Arc<dyn FileStorage>,
    entries: RwLock<HashMap<PathBuf, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    revalidations: AtomicU64,
}

impl ChunkTreeCache {
    pub fn new(storage: Arc<dyn FileStorage>) -> Self {
        Self {
            storage,
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            revalidations: AtomicU64::new(0),
        }
    }

    /// Returns the parsed directives at `path`, or `None` if no file exists there.
    ///
    /// # Errors
    /// `DirectiveParse` if the file is malformed, `Storage` if it cannot be read.
    pub fn get_or_parse(&self, path: &Path) -> CompileResult<Option<Arc<ChunkSet>>> {
        let Some(stamp) = self
            .storage
            .stamp(path)
            .map_err(|e| CompileError::storage(path, e))?
        else {
            self.evict_missing(path);
            return Ok(None);
        };

        let cached = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned();

        // Layer 1: stamp.
        if let Some(entry) = &cached {
            if entry.stamp == stamp {
                trace!("Chunk cache hit for '{}'.", path.display());
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Some(Arc::clone(&entry.set)));
            }
        }

        let bytes = match self.storage.read_to_end(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.evict_missing(path);
                return Ok(None);
            }
            Err(e) => return Err(CompileError::storage(path, e)),
        };
        let hash = content_hash(&bytes);

        // Layer 2: content hash.
        if let Some(entry) = cached {
            if entry.set.content_hash() == hash {
                debug!(
                    "'{}' was touched but its content is unchanged. Keeping parsed directives.",
                    path.display()
                );
                self.revalidations.fetch_add(1, Ordering::Relaxed);
                return Ok(Some(self.insert(path, stamp, entry.set)));
            }
            debug!("'{}' has changed. Re-parsing.", path.display());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let set = Arc::new(parse_chunk_set(path, hash, bytes)?);
        debug!(
            "Parsed '{}' ({} import(s), base type: {:?}, model: {:?}).",
            path.display(),
            set.namespaces().len(),
            set.base_type(),
            set.model_type()
        );
        Ok(Some(self.insert(path, stamp, set)))
    }

    /// Drops the entry for `path`, forcing a re-parse on the next lookup.
    pub fn invalidate(&self, path: &Path) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path)
            .is_some()
    }

    /// Drops every entry. Counters are kept.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            revalidations: self.revalidations.load(Ordering::Relaxed),
        }
    }

    /// Inserts unless an entry with the same stamp is already present,
    /// in which case that entry wins. Returns the set that ended up cached.
    fn insert(&self, path: &Path, stamp: FileStamp, set: Arc<ChunkSet>) -> Arc<ChunkSet> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = entries.get(path) {
            if existing.stamp == stamp {
                return Arc::clone(&existing.set);
            }
        }
        entries.insert(
            path.to_path_buf(),
            CacheEntry {
                stamp,
                set: Arc::clone(&set),
            },
        );
        set
    }

    fn evict_missing(&self, path: &Path) {
        if self.invalidate(path) {
            debug!(
                "'{}' no longer exists. Evicted from the chunk cache.",
                path.display()
            );
        }
    }
}

/// Truncated blake3 hash of `content`, hex encoded.
pub fn content_hash(content: &[u8]) -> String {
    let hash = blake3::hash(content);
    let bytes = hash.as_bytes();
    hex::encode(bytes.get(..HASH_TRUNCATE_LENGTH).unwrap_or(bytes))
}

fn parse_chunk_set(path: &Path, hash: String, bytes: Vec<u8>) -> CompileResult<ChunkSet> {
    let source = String::from_utf8(bytes).map_err(|e| {
        let valid = e.as_bytes().get(..e.utf8_error().valid_up_to()).unwrap_or_default();
        CompileError::DirectiveParse {
            path: path.to_path_buf(),
            line: valid.iter().filter(|&&b| b == b'\n').count() + 1,
            message: "file is not valid UTF-8".to_string(),
        }
    })?;
    let chunks = parse_directive_file(&source).map_err(|e| CompileError::DirectiveParse {
        path: path.to_path_buf(),
        line: e.line,
        message: e.message,
    })?;
    Ok(ChunkSet::from_chunks(path, hash, chunks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::storage::InMemoryStorage;
    use std::io::Read;

    fn cache_with(storage: &Arc<InMemoryStorage>) -> ChunkTreeCache {
        ChunkTreeCache::new(Arc::clone(storage) as Arc<dyn FileStorage>)
    }

    #[test]
    fn test_content_hash_is_truncated_blake3() {
        assert_eq!(content_hash(b"hello world"), "d74981efa70a0c880b8d8c1985d075db");
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let storage = Arc::new(InMemoryStorage::new());
        let cache = cache_with(&storage);
        assert!(cache.get_or_parse(Path::new("_imports.tmpl")).unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_second_lookup_is_a_hit() {
        let storage = Arc::new(InMemoryStorage::new().with_file("_imports.tmpl", "@using A"));
        let cache = cache_with(&storage);
        let path = Path::new("_imports.tmpl");

        let first = cache.get_or_parse(path).unwrap().unwrap();
        let second = cache.get_or_parse(path).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                revalidations: 0
            }
        );
    }

    #[test]
    fn test_modified_file_is_reparsed() {
        let storage = Arc::new(InMemoryStorage::new().with_file("_imports.tmpl", "@model Foo"));
        let cache = cache_with(&storage);
        let path = Path::new("_imports.tmpl");

        assert_eq!(cache.get_or_parse(path).unwrap().unwrap().model_type(), Some("Foo"));
        storage.insert("_imports.tmpl", "@model Bar");
        assert_eq!(cache.get_or_parse(path).unwrap().unwrap().model_type(), Some("Bar"));
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn test_touched_file_with_same_content_is_revalidated() {
        let storage = Arc::new(InMemoryStorage::new().with_file("_imports.tmpl", "@model Foo"));
        let cache = cache_with(&storage);
        let path = Path::new("_imports.tmpl");

        let first = cache.get_or_parse(path).unwrap().unwrap();
        storage.touch(path);
        let second = cache.get_or_parse(path).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.stats().revalidations, 1);

        // The refreshed stamp makes the next lookup a plain hit.
        cache.get_or_parse(path).unwrap();
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_deleted_file_is_evicted() {
        let storage = Arc::new(InMemoryStorage::new().with_file("_imports.tmpl", "@using A"));
        let cache = cache_with(&storage);
        let path = Path::new("_imports.tmpl");

        cache.get_or_parse(path).unwrap();
        assert_eq!(cache.len(), 1);
        storage.remove(path);
        assert!(cache.get_or_parse(path).unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_parse_error_names_the_file() {
        let storage = Arc::new(
            InMemoryStorage::new().with_file("A/_imports.tmpl", "@using A\nnot a directive\n"),
        );
        let cache = cache_with(&storage);
        let err = cache.get_or_parse(Path::new("A/_imports.tmpl")).unwrap_err();
        match err {
            CompileError::DirectiveParse { path, line, .. } => {
                assert_eq!(path, PathBuf::from("A/_imports.tmpl"));
                assert_eq!(line, 2);
            }
            other => panic!("Expected DirectiveParse, got {:?}", other),
        }
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalid_utf8_reports_line() {
        let storage = Arc::new(
            InMemoryStorage::new().with_file("_imports.tmpl", b"@using A\n@using \xff\n"),
        );
        let cache = cache_with(&storage);
        let err = cache.get_or_parse(Path::new("_imports.tmpl")).unwrap_err();
        assert!(matches!(err, CompileError::DirectiveParse { line: 2, .. }));
    }

    #[derive(Debug)]
    struct BrokenStorage;

    impl FileStorage for BrokenStorage {
        fn stamp(&self, _path: &Path) -> io::Result<Option<FileStamp>> {
            Ok(Some(FileStamp { version: 1, len: 1 }))
        }

        fn open_read(&self, _path: &Path) -> io::Result<Box<dyn Read + Send>> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }
    }

    #[test]
    fn test_storage_failure_is_propagated() {
        let cache = ChunkTreeCache::new(Arc::new(BrokenStorage));
        let err = cache.get_or_parse(Path::new("_imports.tmpl")).unwrap_err();
        assert!(matches!(err, CompileError::Storage { .. }));
    }

    #[test]
    fn test_concurrent_lookups_agree() {
        let storage = Arc::new(
            InMemoryStorage::new().with_file("_imports.tmpl", "@using A\n@model Foo\n"),
        );
        let cache = cache_with(&storage);
        let path = Path::new("_imports.tmpl");

        let results: Vec<Arc<ChunkSet>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| cache.get_or_parse(path).unwrap().unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(cache.len(), 1);
        for set in &results {
            assert_eq!(**set, *results[0]);
        }
        let stats = cache.stats();
        assert_eq!(stats.hits + stats.misses, 8);
    }

    #[test]
    fn test_invalidate_forces_reparse() {
        let storage = Arc::new(InMemoryStorage::new().with_file("_imports.tmpl", "@using A"));
        let cache = cache_with(&storage);
        let path = Path::new("_imports.tmpl");

        cache.get_or_parse(path).unwrap();
        assert!(cache.invalidate(path));
        assert!(!cache.invalidate(path));
        cache.get_or_parse(path).unwrap();
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn test_clear_drops_every_entry() {
        let storage = Arc::new(
            InMemoryStorage::new()
                .with_file("_imports.tmpl", "@using A")
                .with_file("A/_imports.tmpl", "@model M"),
        );
        let cache = cache_with(&storage);
        let root = Path::new("_imports.tmpl");

        let before = cache.get_or_parse(root).unwrap().unwrap();
        cache.get_or_parse(Path::new("A/_imports.tmpl")).unwrap();
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());

        let after = cache.get_or_parse(root).unwrap().unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(*before, *after);
        assert_eq!(cache.stats().misses, 3);
    }
}
