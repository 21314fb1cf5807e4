//! Directive resolution: from one master script to its full build set.
//!
//! ```text
//! master.rs ──//css_include──▶ helpers.rs ──//css_include──▶ strings.rs
//!     │                            │
//!     └──//css_ref──▶ libmath.rlib └──//css_ref──▶ libtext.rlib
//! ```
//!
//! Resolution is depth-first and cycle-safe: a file already visited in the
//! current traversal is recorded once but never descended into again.

mod parse;
mod reference;


use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;

use crate::core::{Diagnostic, ScriptError, ScriptUnit};
use crate::utils::path::resolve_path;

pub use parse::{Directive, is_header_line, is_inner_attribute, parse_directive};
pub use reference::{expand_env, resolve_reference};

// =============================================================================
// ResolvedBuildSet
// =============================================================================

/// Everything needed to build one master.
///
/// # Invariants
/// - No include appears twice
/// - The master is never one of its own includes
/// - No reference appears twice
#[derive(Debug, Clone)]
pub struct ResolvedBuildSet {
    master: ScriptUnit,
    includes: Vec<ScriptUnit>,
    references: Vec<PathBuf>,
}

impl ResolvedBuildSet {
    fn new(master: ScriptUnit) -> Self {
        Self {
            master,
            includes: Vec::new(),
            references: Vec::new(),
        }
    }

    #[inline]
    pub fn master(&self) -> &ScriptUnit {
        &self.master
    }

    /// Includes in discovery order.
    #[inline]
    pub fn includes(&self) -> &[ScriptUnit] {
        &self.includes
    }

    /// Reference artifacts in discovery order.
    #[inline]
    pub fn references(&self) -> &[PathBuf] {
        &self.references
    }

    /// Rust sources to compile: the master first, then source includes.
    pub fn sources(&self) -> impl Iterator<Item = &ScriptUnit> {
        std::iter::once(&self.master).chain(self.includes.iter().filter(|u| u.is_source()))
    }

    /// Non-source includes, embedded into the artifact.
    pub fn resources(&self) -> impl Iterator<Item = &ScriptUnit> {
        self.includes.iter().filter(|u| !u.is_source())
    }

    fn add_include(&mut self, path: &Path) {
        let unit = ScriptUnit::include(path);
        if unit != self.master && !self.includes.contains(&unit) {
            self.includes.push(unit);
        }
    }

    fn add_reference(&mut self, path: PathBuf) {
        if !self.references.contains(&path) {
            self.references.push(path);
        }
    }
}

// =============================================================================
// DirectiveResolver
// =============================================================================

/// Resolves include and reference directives.
#[derive(Debug, Clone, Default)]
pub struct DirectiveResolver {
    /// First directory searched for relative references.
    host_dir: Option<PathBuf>,
}

impl DirectiveResolver {
    pub fn new(host_dir: Option<PathBuf>) -> Self {
        Self { host_dir }
    }

    /// Resolver searching references next to the running executable.
    pub fn for_current_exe() -> Self {
        let host_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        Self::new(host_dir)
    }

    pub fn host_dir(&self) -> Option<&Path> {
        self.host_dir.as_deref()
    }

    /// Resolve the full build set of `master`.
    ///
    /// `on_include` is called for every include found at any depth; each one
    /// is a child of `master` for reload purposes.
    pub fn resolve(
        &self,
        master: &Path,
        mut on_include: impl FnMut(&Path),
    ) -> Result<ResolvedBuildSet, ScriptError> {
        let mut visited = FxHashSet::default();
        self.resolve_with_visited(master, &mut visited, &mut on_include)
    }

    /// Resolve `master`, never descending into paths already in `visited`.
    pub fn resolve_with_visited(
        &self,
        master: &Path,
        visited: &mut FxHashSet<PathBuf>,
        on_include: &mut dyn FnMut(&Path),
    ) -> Result<ResolvedBuildSet, ScriptError> {
        let master = ScriptUnit::master(master);
        if !master.path().is_file() {
            let name = master
                .path()
                .file_name()
                .map_or_else(|| master.path().display().to_string(), |n| n.to_string_lossy().into_owned());
            return Err(ScriptError::Directive(Diagnostic::at_start(
                master.path(),
                format!("Could not load file '{name}': File does not exist"),
            )));
        }

        let root = master.path().to_path_buf();
        let mut set = ResolvedBuildSet::new(master);
        self.scan(&root, &root, visited, &mut set, on_include)?;

        crate::debug!("directive"; "{}: {} include(s), {} reference(s)",
            root.display(), set.includes.len(), set.references.len());
        Ok(set)
    }

    fn scan(
        &self,
        file: &Path,
        master: &Path,
        visited: &mut FxHashSet<PathBuf>,
        set: &mut ResolvedBuildSet,
        on_include: &mut dyn FnMut(&Path),
    ) -> Result<(), ScriptError> {
        visited.insert(file.to_path_buf());

        let dir = file.parent().unwrap_or(Path::new("/"));
        let header = read_header(file).map_err(|err| ScriptError::transient(file, err))?;

        for (index, line) in header.iter().enumerate() {
            let line_no = u32::try_from(index + 1).unwrap_or(u32::MAX);

            if is_inner_attribute(line) {
                return Err(ScriptError::directive(
                    file,
                    line_no,
                    "Inner attributes and `//!` doc comments are not supported in scripts; use `//` comments and item attributes instead",
                ));
            }

            match parse_directive(line) {
                Some(Directive::Reference(raw)) => {
                    if raw.is_empty() {
                        return Err(ScriptError::directive(file, line_no, "//css_ref requires a path"));
                    }
                    set.add_reference(resolve_reference(raw, self.host_dir(), dir));
                }
                Some(Directive::Include(raw)) => {
                    if raw.is_empty() {
                        return Err(ScriptError::directive(file, line_no, "//css_include requires a path"));
                    }

                    let target = resolve_path(Path::new(raw), dir);
                    if !target.is_file() {
                        let included_from = file
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_default();
                        return Err(ScriptError::directive(
                            file,
                            line_no,
                            format!("Include file specified in '{raw}' was not found (Included from '{included_from}')"),
                        ));
                    }

                    if target == master {
                        continue;
                    }

                    on_include(&target);
                    set.add_include(&target);

                    if !visited.contains(&target) {
                        self.scan(&target, master, visited, set, on_include)?;
                    }
                }
                None => {}
            }
        }

        Ok(())
    }
}

/// Read the header lines of `file` (up to the first non-header line).
///
/// A non-header line that opens an inner attribute is kept so the caller can
/// reject it.
///
/// Invalid UTF-8 is replaced rather than rejected; the compiler reports it
/// properly.
fn read_header(file: &Path) -> io::Result<Vec<String>> {
    let mut reader = BufReader::new(File::open(file)?);
    let mut lines = Vec::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\r', '\n']);
        if !is_header_line(line) {
            if is_inner_attribute(line) {
                lines.push(line.to_string());
            }
            break;
        }
        lines.push(line.to_string());
    }

    Ok(lines)
}
