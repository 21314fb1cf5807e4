//! Per-instance output directory.
//!
//! ```text
//! {temp_root}/
//! ├── myhost_4242/          this process
//! │   ├── .instance.lock    held exclusively while the process lives
//! │   ├── hello_1.rs        generated crate roots
//! │   └── hello_1.so        artifacts
//! └── myhost_977/           stale: lock free, removed by sweep()
//! ```

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use fs2::FileExt;
use regex::Regex;

const LOCK_FILE: &str = ".instance.lock";

static INSTANCE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_([0-9]+)$").expect("valid instance suffix regex"));

/// The output directory owned by this process.
#[derive(Debug)]
pub struct TempLayout {
    instance_dir: PathBuf,
    /// Keeps the instance marked live; released on drop.
    _lock: File,
}

impl TempLayout {
    /// Default root: `<system temp>/scripthost`.
    pub fn default_root() -> PathBuf {
        std::env::temp_dir().join("scripthost")
    }

    /// Create and lock `{temp_root}/{exe}_{pid}`.
    pub fn create(temp_root: &Path) -> io::Result<Self> {
        Self::create_named(temp_root, &host_name(), std::process::id())
    }

    pub(crate) fn create_named(temp_root: &Path, host: &str, pid: u32) -> io::Result<Self> {
        let instance_dir = temp_root.join(format!("{host}_{pid}"));
        fs::create_dir_all(&instance_dir)?;

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(instance_dir.join(LOCK_FILE))?;
        lock.try_lock_exclusive()?;

        Ok(Self {
            instance_dir,
            _lock: lock,
        })
    }

    #[inline]
    pub fn instance_dir(&self) -> &Path {
        &self.instance_dir
    }
}

/// File stem of the running executable.
fn host_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "scripthost".to_string())
}

/// Remove instance directories of processes that are gone.
///
/// A directory is stale when its name ends in `_{pid}` with a pid other than
/// `own_pid`, and its lock file is missing or can be locked. Failures on one
/// directory do not stop the sweep. Returns the number of directories
/// removed.
pub fn sweep(temp_root: &Path, own_pid: u32) -> usize {
    let Ok(entries) = fs::read_dir(temp_root) else {
        return 0;
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() || !is_foreign_instance(&path, own_pid) || !is_stale(&path) {
            continue;
        }
        match fs::remove_dir_all(&path) {
            Ok(()) => {
                crate::debug!("clean"; "removed {}", path.display());
                removed += 1;
            }
            Err(e) => crate::debug!("clean"; "could not remove {}: {}", path.display(), e),
        }
    }
    removed
}

fn is_foreign_instance(dir: &Path, own_pid: u32) -> bool {
    let Some(name) = dir.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return false;
    };
    INSTANCE_SUFFIX
        .captures(&name)
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .is_some_and(|pid| pid != own_pid)
}

fn is_stale(dir: &Path) -> bool {
    let lock_path = dir.join(LOCK_FILE);
    if !lock_path.exists() {
        return true;
    }
    let Ok(file) = OpenOptions::new().write(true).open(&lock_path) else {
        return false;
    };
    // The handle closes at scope end, before the directory is removed.
    file.try_lock_exclusive().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_makes_locked_dir() {
        let temp = TempDir::new().unwrap();
        let layout = TempLayout::create_named(temp.path(), "host", 42).unwrap();

        assert_eq!(layout.instance_dir(), temp.path().join("host_42"));
        assert!(layout.instance_dir().join(LOCK_FILE).is_file());
        assert!(!is_stale(layout.instance_dir()));
    }

    #[test]
    fn test_sweep_removes_only_stale_foreign_dirs() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        let live = TempLayout::create_named(root, "host", 100).unwrap();
        {
            let _dead = TempLayout::create_named(root, "host", 200).unwrap();
        }
        fs::create_dir_all(root.join("host_300")).unwrap();
        fs::create_dir_all(root.join("unrelated")).unwrap();
        let own = TempLayout::create_named(root, "host", 400).unwrap();
        drop(own);

        let removed = sweep(root, 400);

        assert_eq!(removed, 2);
        assert!(live.instance_dir().exists());
        assert!(!root.join("host_200").exists());
        assert!(!root.join("host_300").exists());
        assert!(root.join("unrelated").exists());
        assert!(root.join("host_400").exists());
    }

    #[test]
    fn test_sweep_missing_root() {
        let temp = TempDir::new().unwrap();
        assert_eq!(sweep(&temp.path().join("absent"), 1), 0);
    }
}
