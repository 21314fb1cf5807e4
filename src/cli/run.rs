//! `run` and `watch` commands.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};

use super::terminal::TerminalSink;
use crate::config::HostConfig;
use crate::core::{is_shutdown, setup_shutdown_handler};
use crate::host::{self, ChannelDispatcher, ScriptHost};
use crate::logger::{status_error, status_success};
use crate::utils::path::normalize_path;

/// How often the main thread checks for Ctrl+C while idle.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Build and run `script` once. Returns whether it ran successfully.
pub fn run_script(config: &HostConfig, script: &Path) -> Result<bool> {
    let script = existing_script(script)?;
    let generation = host::run_once(config, Arc::new(TerminalSink::new(false)), &script)?;
    if let Some(generation) = generation {
        crate::debug!("run"; "{} (generation {})", script.display(), generation);
    }
    Ok(generation.is_some())
}

/// Observe `script` and run reloads on this thread until Ctrl+C.
pub fn watch_script(config: &HostConfig, script: &Path) -> Result<()> {
    let script = existing_script(script)?;
    setup_shutdown_handler()?;

    let (dispatcher, queue) = ChannelDispatcher::new();
    let mut host = ScriptHost::builder(config)
        .sink(Arc::new(TerminalSink::new(true)))
        .dispatcher(Arc::new(dispatcher))
        .observer(Box::new(|master, result| {
            let name = display_name(master);
            match result {
                Ok(generation) => status_success(&format!("reloaded: {name} (generation {generation})")),
                Err(e) => status_error(&format!("failed: {name} ({} error)", e.kind()), ""),
            }
        }))
        .start()?;

    crate::log!("watch"; "watching {} (Ctrl+C to stop)", script.display());
    host.observe(&script);

    queue.pump_until(POLL_INTERVAL, is_shutdown);
    host.shutdown();
    Ok(())
}

fn existing_script(script: &Path) -> Result<std::path::PathBuf> {
    if !script.is_file() {
        bail!("script '{}' not found", script.display());
    }
    Ok(normalize_path(script))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_script_is_an_error() {
        let temp = TempDir::new().unwrap();
        let err = run_script(&HostConfig::default(), &temp.path().join("absent.rs")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(Path::new("/s/hello.rs")), "hello.rs");
    }
}
