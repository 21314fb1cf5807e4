//! Path normalization utilities.
//!
//! Provides consistent path handling across the codebase:
//! - `normalize_path` - file system paths (canonicalize + fallback)
//! - `resolve_path` - resolve relative paths against a base directory

use std::path::{Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to:
/// - Return as-is if already absolute
/// - Join with current directory if relative
///
/// Every path that identifies a script unit goes through here, so that
/// registry lookups and watcher events agree on one spelling.
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Resolve a path written inside a file relative to that file's directory.
///
/// Absolute paths are used as-is. Always returns a normalized path.
#[inline]
pub fn resolve_path(path: &Path, base_dir: &Path) -> PathBuf {
    if path.is_absolute() {
        return normalize_path(path);
    }
    normalize_path(&base_dir.join(path))
}

/// File name without extension, lossily converted.
///
/// Returns `"script"` for paths without a usable stem.
pub fn file_stem_lossy(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "script".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_absolute() {
        let path = Path::new("/absolute/path/file.txt");
        let normalized = normalize_path(path);
        assert!(normalized.is_absolute());
    }

    #[test]
    fn test_normalize_path_relative() {
        let path = Path::new("relative/path/file.txt");
        let normalized = normalize_path(path);
        assert!(normalized.is_absolute());
    }

    #[test]
    fn test_normalize_path_resolves_dot_dot() {
        let temp = tempfile::TempDir::new().unwrap();
        let sub = temp.path().join("sub");
        std::fs::create_dir_all(&sub).unwrap();
        std::fs::write(temp.path().join("a.rs"), "").unwrap();

        let via_parent = normalize_path(&sub.join("../a.rs"));
        assert_eq!(via_parent, normalize_path(&temp.path().join("a.rs")));
    }

    #[test]
    fn test_resolve_path_absolute() {
        let path = Path::new("/absolute/path");
        let resolved = resolve_path(path, Path::new("/fallback"));
        assert_eq!(resolved, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_resolve_path_relative_to_base() {
        let path = Path::new("nonexistent/path.rs");
        let resolved = resolve_path(path, Path::new("/base"));
        assert_eq!(resolved, PathBuf::from("/base/nonexistent/path.rs"));
    }

    #[test]
    fn test_file_stem_lossy() {
        assert_eq!(file_stem_lossy(Path::new("/a/hello.rs")), "hello");
        assert_eq!(file_stem_lossy(Path::new("/")), "script");
    }
}
