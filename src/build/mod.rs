//! Build orchestration: resolved build set → loadable artifact.
//!
//! # Module Structure
//!
//! ```text
//! build/
//! ├── entry       # entry point discovery (syn)
//! ├── layout      # instance directory, stale sweep
//! ├── output      # toolchain output → positioned BuildError
//! ├── request     # generated crate root
//! ├── toolchain   # Toolchain trait, rustc
//! └── mod.rs      # BuildOrchestrator (this file)
//! ```
//!
//! # Flow
//!
//! ```text
//! ResolvedBuildSet
//!   → next generation
//!   → remove stale {stem}_{gen}.{ext}
//!   → discover entry points
//!   → write {stem}_{gen}.rs
//!   → toolchain (out of process, output captured)
//!   → BuildArtifact | BuildError
//! ```

pub mod entry;
pub mod layout;
mod output;
pub mod request;
pub mod toolchain;

#[cfg(test)]
mod tests;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

pub use entry::EntryCandidate;
pub use layout::TempLayout;
pub use request::BuildRequest;
pub use toolchain::{CompileOutput, Rustc, Toolchain};

use crate::core::{Diagnostic, ScriptError, ScriptUnit};
use crate::directive::ResolvedBuildSet;
use crate::utils::path::file_stem_lossy;

/// Process-wide generation counter.
///
/// Artifacts of every master share one instance directory, and a loaded
/// library path can never be reused, so generations are unique across
/// masters rather than per master.
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Take the next generation id.
#[inline]
pub fn next_generation() -> u64 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

// =============================================================================
// BuildArtifact
// =============================================================================

/// A compiled master, one generation.
#[derive(Debug, Clone)]
pub struct BuildArtifact {
    master: PathBuf,
    generation: u64,
    path: PathBuf,
    root: PathBuf,
    entries: Vec<EntryCandidate>,
}

impl BuildArtifact {
    pub fn new(
        master: PathBuf,
        generation: u64,
        path: PathBuf,
        root: PathBuf,
        entries: Vec<EntryCandidate>,
    ) -> Self {
        Self {
            master,
            generation,
            path,
            root,
            entries,
        }
    }

    #[inline]
    pub fn master(&self) -> &Path {
        &self.master
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The loadable library.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The generated crate root.
    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every `main` found in the sources, qualifying or not.
    #[inline]
    pub fn entries(&self) -> &[EntryCandidate] {
        &self.entries
    }
}

// =============================================================================
// BuildOrchestrator
// =============================================================================

/// Builds resolved sets into artifacts inside one instance directory.
pub struct BuildOrchestrator {
    toolchain: Box<dyn Toolchain>,
    instance_dir: PathBuf,
}

impl BuildOrchestrator {
    pub fn new(toolchain: impl Toolchain + 'static, instance_dir: impl Into<PathBuf>) -> Self {
        Self {
            toolchain: Box::new(toolchain),
            instance_dir: instance_dir.into(),
        }
    }

    #[inline]
    pub fn instance_dir(&self) -> &Path {
        &self.instance_dir
    }

    /// Build `set` into a fresh generation.
    pub fn build(&self, set: &ResolvedBuildSet) -> Result<BuildArtifact, ScriptError> {
        let master = set.master().path();
        let generation = next_generation();
        let base = format!("{}_{generation}", file_stem_lossy(master));

        let output = self
            .instance_dir
            .join(format!("{base}.{}", std::env::consts::DLL_EXTENSION));
        let root = self.instance_dir.join(format!("{base}.rs"));

        remove_stale(&output).map_err(|e| ScriptError::transient(&output, e))?;

        let entries = discover_entries(set)?;
        let mut qualifying = entries.iter().filter(|e| e.qualifies());
        let entry = match (qualifying.next(), qualifying.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        };

        fs::write(&root, request::render_root(set, entry)).map_err(|e| ScriptError::transient(&root, e))?;

        let request = BuildRequest {
            master: master.to_path_buf(),
            generation,
            crate_name: request::crate_name(master, generation),
            root: root.clone(),
            output: output.clone(),
            work_dir: self.instance_dir.clone(),
            references: set.references().to_vec(),
        };

        let compiled = self
            .toolchain
            .compile(&request)
            .map_err(|e| ScriptError::Build {
                diagnostic: Diagnostic::at_start(master, format!("{e:#}")),
                output: String::new(),
            })?;

        if !compiled.success || !output.is_file() {
            return Err(output::build_failure(
                master,
                &self.instance_dir,
                compiled.output,
                &compiled.command_line,
            ));
        }

        crate::debug!("build"; "{} -> generation {}", master.display(), generation);
        Ok(BuildArtifact::new(
            master.to_path_buf(),
            generation,
            output,
            root,
            entries,
        ))
    }
}

fn remove_stale(output: &Path) -> io::Result<()> {
    match fs::remove_file(output) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn discover_entries(set: &ResolvedBuildSet) -> Result<Vec<EntryCandidate>, ScriptError> {
    let mut entries = Vec::new();
    for unit in set.sources() {
        let source = read_source(unit)?;
        entries.extend(entry::discover(unit.path(), &source));
    }
    Ok(entries)
}

fn read_source(unit: &ScriptUnit) -> Result<String, ScriptError> {
    let bytes = fs::read(unit.path()).map_err(|e| ScriptError::transient(unit.path(), e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
