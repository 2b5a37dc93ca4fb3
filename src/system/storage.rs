// src/system/storage.rs

//! File storage abstraction used to find and read directive files and templates.
//!
//! Paths handed to a `FileStorage` are always relative to the storage root and use
//! `Path::join` for composition. A missing file is reported as `Ok(None)` by
//! `stamp`, never as an error.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::UNIX_EPOCH;
use walkdir::WalkDir;

/// Cheap identity of a file's current revision, compared before any content is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileStamp {
    /// Modification time in nanoseconds since the epoch, or a revision counter.
    pub version: u128,
    pub len: u64,
}

pub trait FileStorage: Send + Sync + fmt::Debug {
    /// Returns the stamp of a regular file, or `None` if nothing is stored at `path`.
    fn stamp(&self, path: &Path) -> io::Result<Option<FileStamp>>;

    /// Opens the file at `path` for reading.
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>>;

    fn exists(&self, path: &Path) -> bool {
        matches!(self.stamp(path), Ok(Some(_)))
    }

    fn read_to_end(&self, path: &Path) -> io::Result<Vec<u8>> {
        let mut reader = self.open_read(path)?;
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

// --- PHYSICAL STORAGE ---

/// Storage backed by a directory on disk.
#[derive(Debug, Clone)]
pub struct PhysicalStorage {
    root: PathBuf,
}

impl PhysicalStorage {
    /// Creates a storage rooted at `root`, which must be an existing directory.
    ///
    /// # Errors
    /// Returns an I/O error if `root` cannot be canonicalized.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = dunce::canonicalize(root.as_ref())?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("'{}' is not a directory", root.display()),
            ));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every file under the root with the given extension, relative to the root
    /// and sorted, skipping files named `exclude`.
    pub fn discover(&self, extension: &str, exclude: &str) -> io::Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = entry.map_err(io::Error::other)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != extension) {
                continue;
            }
            if path.file_name().is_some_and(|name| name == exclude) {
                continue;
            }
            if let Ok(relative) = path.strip_prefix(&self.root) {
                found.push(relative.to_path_buf());
            }
        }
        found.sort();
        Ok(found)
    }
}

impl FileStorage for PhysicalStorage {
    fn stamp(&self, path: &Path) -> io::Result<Option<FileStamp>> {
        let metadata = match fs::metadata(self.root.join(path)) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        if !metadata.is_file() {
            return Ok(None);
        }
        let version = metadata
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        Ok(Some(FileStamp {
            version,
            len: metadata.len(),
        }))
    }

    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        let file = fs::File::open(self.root.join(path))?;
        Ok(Box::new(io::BufReader::new(file)))
    }
}

// --- IN-MEMORY STORAGE ---

#[derive(Debug, Clone)]
struct MemoryFile {
    content: Arc<[u8]>,
    revision: u64,
}

/// A thread-safe virtual file tree. Every write bumps a global revision counter,
/// which serves as the file's stamp.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    files: RwLock<HashMap<PathBuf, MemoryFile>>,
    revision: AtomicU64,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style `insert`.
    pub fn with_file(self, path: impl Into<PathBuf>, content: impl AsRef<[u8]>) -> Self {
        self.insert(path, content);
        self
    }

    /// Creates or replaces a file.
    pub fn insert(&self, path: impl Into<PathBuf>, content: impl AsRef<[u8]>) {
        let revision = self.next_revision();
        let file = MemoryFile {
            content: Arc::from(content.as_ref()),
            revision,
        };
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into(), file);
    }

    /// Gives an existing file a new revision without changing its content.
    pub fn touch(&self, path: &Path) -> bool {
        let revision = self.next_revision();
        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        match files.get_mut(path) {
            Some(file) => {
                file.revision = revision;
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, path: &Path) -> bool {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path)
            .is_some()
    }

    fn next_revision(&self) -> u64 {
        self.revision.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl FileStorage for InMemoryStorage {
    fn stamp(&self, path: &Path) -> io::Result<Option<FileStamp>> {
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        Ok(files.get(path).map(|file| FileStamp {
            version: u128::from(file.revision),
            len: file.content.len() as u64,
        }))
    }

    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        let file = files.get(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("'{}' does not exist", path.display()),
            )
        })?;
        Ok(Box::new(Cursor::new(Arc::clone(&file.content))))
    }
}
