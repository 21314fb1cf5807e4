//! `clean` command.

use anyhow::Result;

use crate::build::layout::sweep;
use crate::config::HostConfig;

/// Remove build directories of hosts that are no longer running.
pub fn clean(config: &HostConfig) -> Result<usize> {
    let temp_root = config.temp_root();
    let removed = sweep(&temp_root, std::process::id());
    crate::log!("clean"; "removed {} stale build dir(s) from {}", removed, temp_root.display());
    Ok(removed)
}
