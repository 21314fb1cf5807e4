//! Which masters to rebuild when a file changes.
//!
//! Two mappings, both only ever growing:
//! - `targets`: watched file → the master rebuilt when it changes
//! - `dependents`: child file → masters that include it
//!
//! ```text
//! observe(main.rs)                         targets[main.rs] = main.rs
//! observe(main.rs, util.rs, true)          dependents[util.rs] = [main.rs]
//! observe(main.rs, view.rs, false)         targets[view.rs] = view.rs
//!                                          targets[main.rs] = view.rs
//! ```

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

/// Outcome of one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// Already known; nothing changed.
    Duplicate,
    /// A new master watched on its own; it needs an initial build.
    NewMaster,
    /// A new child relationship.
    NewChild,
}

/// Dependency graph of the watched scripts.
///
/// # Invariants
/// - Paths are normalized by the caller
/// - Entries are never removed
/// - A master appears at most once in each dependents list
#[derive(Debug, Default)]
pub struct DependencyRegistry {
    targets: FxHashMap<PathBuf, PathBuf>,
    dependents: FxHashMap<PathBuf, Vec<PathBuf>>,
}

impl DependencyRegistry {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one `observe` call.
    pub fn register(
        &mut self,
        master: &Path,
        child: Option<&Path>,
        recompile_master: bool,
    ) -> Registration {
        let Some(child) = child else {
            if self.targets.contains_key(master) {
                return Registration::Duplicate;
            }
            self.targets.insert(master.to_path_buf(), master.to_path_buf());
            return Registration::NewMaster;
        };

        if recompile_master {
            let masters = self.dependents.entry(child.to_path_buf()).or_default();
            if masters.iter().any(|m| m == master) {
                return Registration::Duplicate;
            }
            masters.push(master.to_path_buf());
            return Registration::NewChild;
        }

        let redirected = self.targets.get(master).is_some_and(|t| t == child);
        let child_known = self.targets.get(child).is_some_and(|t| t == child);
        if redirected && child_known {
            return Registration::Duplicate;
        }
        self.targets
            .entry(child.to_path_buf())
            .or_insert_with(|| child.to_path_buf());
        self.targets.insert(master.to_path_buf(), child.to_path_buf());
        Registration::NewChild
    }

    /// Rebuild targets affected by a change to `file`, without duplicates.
    pub fn affected(&self, file: &Path) -> Vec<PathBuf> {
        let mut out: Vec<PathBuf> = Vec::new();
        let mut push = |path: &Path| {
            if !out.iter().any(|p| p == path) {
                out.push(path.to_path_buf());
            }
        };

        if let Some(target) = self.targets.get(file) {
            push(target);
        }
        if let Some(masters) = self.dependents.get(file) {
            for master in masters {
                push(self.target_of(master));
            }
        }
        out
    }

    /// Where a rebuild of `master` is directed.
    pub fn target_of<'a>(&'a self, master: &'a Path) -> &'a Path {
        self.targets.get(master).map_or(master, PathBuf::as_path)
    }

    /// Every file whose changes matter.
    pub fn watched_files(&self) -> impl Iterator<Item = &Path> {
        self.targets
            .keys()
            .chain(self.dependents.keys())
            .map(PathBuf::as_path)
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty() && self.dependents.is_empty()
    }
}
