use std::path::{Path, PathBuf};

use notify::{RecursiveMode, Watcher};
use rustc_hash::FxHashSet;

/// Directories under watch. Each directory is attached once, non-recursively.
#[derive(Debug, Default)]
pub(super) struct WatchedDirs {
    attached: FxHashSet<PathBuf>,
}

impl WatchedDirs {
    /// Attach the directory containing `file`. Returns whether a new
    /// directory was attached.
    pub(super) fn attach_parent<W: Watcher>(
        &mut self,
        file: &Path,
        watcher: &mut W,
    ) -> notify::Result<bool> {
        let Some(dir) = file.parent() else {
            return Ok(false);
        };
        if self.attached.contains(dir) {
            return Ok(false);
        }

        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        self.attached.insert(dir.to_path_buf());
        crate::debug!("watch"; "watching {}", dir.display());
        Ok(true)
    }

    #[cfg(test)]
    pub(super) fn len(&self) -> usize {
        self.attached.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_directory_attached_once() {
        let temp = TempDir::new().unwrap();
        let mut watcher = notify::recommended_watcher(|_: notify::Result<notify::Event>| {}).unwrap();
        let mut dirs = WatchedDirs::default();

        assert!(dirs.attach_parent(&temp.path().join("main.rs"), &mut watcher).unwrap());
        assert!(!dirs.attach_parent(&temp.path().join("util.rs"), &mut watcher).unwrap());
        assert_eq!(dirs.len(), 1);
    }
}
