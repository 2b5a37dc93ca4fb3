// src/core/paths.rs

use crate::core::error::{CompileError, CompileResult};
use std::path::{Component, Path, PathBuf};

/// Normalizes a template path into a path relative to the tree root.
///
/// Relative paths are taken as relative to `root`; absolute paths must lie
/// under `root`. `.` segments are dropped and `..` is resolved lexically.
///
/// # Errors
/// Returns `InvalidArgument` if the path is empty or would escape the root.
pub fn normalize_relative(root: &Path, path: &Path) -> CompileResult<PathBuf> {
    let relative = if path.is_absolute() {
        path.strip_prefix(root).map_err(|_| {
            CompileError::invalid(format!(
                "'{}' is outside the template root '{}'",
                path.display(),
                root.display()
            ))
        })?
    } else {
        path
    };

    let mut normalized = PathBuf::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(CompileError::invalid(format!(
                        "'{}' escapes the template root",
                        path.display()
                    )));
                }
            }
            // Only reachable for absolute paths not under `root`.
            Component::RootDir | Component::Prefix(_) => {
                return Err(CompileError::invalid(format!(
                    "'{}' is not a path inside the template root",
                    path.display()
                )));
            }
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(CompileError::invalid(format!(
            "'{}' does not name a file",
            path.display()
        )));
    }
    Ok(normalized)
}

/// The directories from the root (the empty path) down to `file`'s parent, root first.
pub fn ancestor_dirs(file: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = file
        .ancestors()
        .skip(1)
        .map(Path::to_path_buf)
        .collect();
    dirs.reverse();
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_drops_cur_dir_and_resolves_parent() {
        let path = normalize_relative(Path::new("/root"), Path::new("./A/B/../page.tmpl")).unwrap();
        assert_eq!(path, PathBuf::from("A/page.tmpl"));
    }

    #[test]
    fn test_normalize_strips_root_prefix() {
        let path =
            normalize_relative(Path::new("/srv/views"), Path::new("/srv/views/A/page.tmpl"))
                .unwrap();
        assert_eq!(path, PathBuf::from("A/page.tmpl"));
    }

    #[test]
    fn test_normalize_rejects_escape() {
        let err = normalize_relative(Path::new("/root"), Path::new("A/../../x.tmpl")).unwrap_err();
        assert!(matches!(err, CompileError::InvalidArgument { .. }));
    }

    #[test]
    fn test_normalize_rejects_foreign_absolute_path() {
        let err =
            normalize_relative(Path::new("/srv/views"), Path::new("/etc/passwd")).unwrap_err();
        assert!(matches!(err, CompileError::InvalidArgument { .. }));
    }

    #[test]
    fn test_normalize_rejects_empty() {
        assert!(normalize_relative(Path::new("/root"), Path::new(".")).is_err());
    }

    #[test]
    fn test_ancestor_dirs_root_first() {
        let dirs = ancestor_dirs(Path::new("A/B/page.tmpl"));
        assert_eq!(
            dirs,
            vec![PathBuf::new(), PathBuf::from("A"), PathBuf::from("A/B")]
        );
    }

    #[test]
    fn test_ancestor_dirs_of_root_level_file() {
        assert_eq!(ancestor_dirs(Path::new("page.tmpl")), vec![PathBuf::new()]);
    }
}
