//! Path utilities
//!
//! Normalization for display plus the unifier that turns a set of selected
//! files and directories into one synthetic root directory.

use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Normalize a path to use '/' as separator (for cross-platform consistency)
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Make a path relative to the root directory
pub fn make_relative(path: &Path, root: &Path) -> Option<String> {
    path.strip_prefix(root).ok().map(normalize_path)
}

/// Last path segment, or the whole path for roots like `/`
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Lowest common ancestor directory of `paths`
///
/// Paths that do not exist are dropped. The rest are canonicalized and
/// their longest common component prefix is taken; when that prefix is a
/// regular file its parent directory is used instead. An empty input (or
/// nothing left after dropping) gives an empty `PathBuf`, meaning there is
/// nothing to scan.
pub fn unify<P: AsRef<Path>>(paths: &[P]) -> PathBuf {
    let resolved: Vec<PathBuf> = paths
        .iter()
        .filter_map(|p| match p.as_ref().canonicalize() {
            Ok(canonical) => Some(canonical),
            Err(e) => {
                debug!("dropping {}: {}", p.as_ref().display(), e);
                None
            }
        })
        .collect();

    let prefix = common_prefix(&resolved);
    if prefix.is_file() {
        if let Some(parent) = prefix.parent() {
            return parent.to_path_buf();
        }
    }
    prefix
}

/// Longest common component prefix, without touching the filesystem
///
/// Absolute paths always share at least their root, so unrelated inputs
/// yield the filesystem root. Paths with different prefixes (e.g. two
/// Windows drives) share nothing and yield an empty path.
pub fn common_prefix(paths: &[PathBuf]) -> PathBuf {
    let Some((first, rest)) = paths.split_first() else {
        return PathBuf::new();
    };

    let mut common: Vec<Component<'_>> = first.components().collect();
    for path in rest {
        let shared = common
            .iter()
            .zip(path.components())
            .take_while(|(a, b)| **a == *b)
            .count();
        common.truncate(shared);
    }

    common.iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_normalize_path() {
        let path = Path::new("src/main.rs");
        assert_eq!(normalize_path(path), "src/main.rs");
    }

    #[test]
    fn test_make_relative() {
        let root = Path::new("/project");
        let path = Path::new("/project/src/main.rs");
        assert_eq!(make_relative(path, root), Some("src/main.rs".to_string()));
        assert_eq!(make_relative(Path::new("/other/file.rs"), root), None);
        assert_eq!(make_relative(root, root), Some("".to_string()));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(Path::new("/project/src")), "src");
        assert_eq!(display_name(Path::new("/")), "/");
    }

    #[test]
    fn test_common_prefix_siblings() {
        let paths = vec![
            PathBuf::from("/project/src/a.rs"),
            PathBuf::from("/project/src/b.rs"),
            PathBuf::from("/project/docs"),
        ];
        assert_eq!(common_prefix(&paths), PathBuf::from("/project"));
    }

    #[test]
    fn test_common_prefix_unrelated_is_root() {
        let paths = vec![PathBuf::from("/a/b/c"), PathBuf::from("/x/y")];
        assert_eq!(common_prefix(&paths), PathBuf::from("/"));
    }

    #[test]
    fn test_common_prefix_partial_segment_does_not_match() {
        let paths = vec![PathBuf::from("/data/app"), PathBuf::from("/data/apple")];
        assert_eq!(common_prefix(&paths), PathBuf::from("/data"));
    }

    #[test]
    fn test_common_prefix_empty() {
        assert_eq!(common_prefix(&[]), PathBuf::new());
    }

    #[test]
    fn test_unify_single_file_is_parent() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("note.txt");
        fs::write(&file, "x").unwrap();

        let root = temp.path().canonicalize().unwrap();
        assert_eq!(unify(&[&file]), root);
    }

    #[test]
    fn test_unify_single_dir_is_itself() {
        let temp = tempdir().unwrap();
        let root = temp.path().canonicalize().unwrap();
        assert_eq!(unify(&[temp.path()]), root);
    }

    #[test]
    fn test_unify_mixed_inputs() {
        let temp = tempdir().unwrap();
        let sub = temp.path().join("sub/deeper");
        fs::create_dir_all(&sub).unwrap();
        let file = temp.path().join("sub/file.md");
        fs::write(&file, "x").unwrap();

        let expected = temp.path().join("sub").canonicalize().unwrap();
        assert_eq!(unify(&[sub, file]), expected);
    }

    #[test]
    fn test_unify_drops_missing_paths() {
        let temp = tempdir().unwrap();
        let missing = temp.path().join("missing");
        let root = temp.path().canonicalize().unwrap();
        assert_eq!(unify(&[missing.clone(), temp.path().to_path_buf()]), root);
        assert_eq!(unify(&[missing]), PathBuf::new());
    }

    #[test]
    fn test_unify_empty_input() {
        let empty: [&Path; 0] = [];
        assert_eq!(unify(&empty), PathBuf::new());
    }

    #[cfg(unix)]
    #[test]
    fn test_unify_with_filesystem_root() {
        let temp = tempdir().unwrap();
        assert_eq!(unify(&[temp.path(), Path::new("/")]), PathBuf::from("/"));
    }
}
