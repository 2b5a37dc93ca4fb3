// src/core/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by `CompilationHost::compile` and the components behind it.
#[derive(Error, Debug)]
pub enum CompileError {
    /// A required input was absent or unusable.
    #[error("Invalid argument: {what}")]
    InvalidArgument { what: String },
    /// A directive (in an ancestor directive file or the template itself) is malformed.
    #[error("Malformed directive in '{}' (line {line}): {message}", path.display())]
    DirectiveParse {
        path: PathBuf,
        line: usize,
        message: String,
    },
    /// The storage layer failed for a reason other than the file being absent.
    #[error("Storage error on '{}': {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CompileError {
    pub(crate) fn invalid(what: impl Into<String>) -> Self {
        Self::InvalidArgument { what: what.into() }
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// The file a directive error points at, if any.
    pub fn directive_path(&self) -> Option<&std::path::Path> {
        match self {
            Self::DirectiveParse { path, .. } => Some(path),
            _ => None,
        }
    }
}

pub type CompileResult<T> = Result<T, CompileError>;
