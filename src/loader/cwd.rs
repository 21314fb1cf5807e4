//! Scoped working directory.

use std::io;
use std::path::{Path, PathBuf};

/// Serializes tests that change the process working directory.
#[cfg(test)]
pub static CWD_LOCK: parking_lot::Mutex<()> = parking_lot::Mutex::new(());

/// Switches the process working directory, restoring it on drop.
///
/// The working directory is process-wide: only the designated execution
/// context may hold a guard.
#[derive(Debug)]
pub struct CwdGuard {
    previous: PathBuf,
}

impl CwdGuard {
    pub fn enter(dir: &Path) -> io::Result<Self> {
        let previous = std::env::current_dir()?;
        std::env::set_current_dir(dir)?;
        Ok(Self { previous })
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        if let Err(e) = std::env::set_current_dir(&self.previous) {
            crate::log!("error"; "could not restore working directory {}: {}", self.previous.display(), e);
        }
    }
}
