//! Script units: a file plus the role it plays in a build.

use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use crate::utils::path::normalize_path;

/// Role of a file within one master's build.
///
/// References are not units: they may be bare names the toolchain resolves,
/// so the build set keeps them as plain paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Root of a hot-reloadable build, owns the entry point.
    Master,
    /// Source or resource merged into the master's compilation unit.
    Include,
}

/// A file path plus its role.
///
/// Identity is the canonical absolute path; the role does not take part in
/// equality or hashing.
#[derive(Debug, Clone)]
pub struct ScriptUnit {
    path: PathBuf,
    role: Role,
}

impl ScriptUnit {
    pub fn master(path: &Path) -> Self {
        Self {
            path: normalize_path(path),
            role: Role::Master,
        }
    }

    pub fn include(path: &Path) -> Self {
        Self {
            path: normalize_path(path),
            role: Role::Include,
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Whether this unit is compiled as Rust code (as opposed to embedded
    /// as a resource).
    pub fn is_source(&self) -> bool {
        self.path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("rs"))
    }

    /// Directory containing the unit.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("/"))
    }
}

impl PartialEq for ScriptUnit {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for ScriptUnit {}

impl Hash for ScriptUnit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_ignores_role() {
        let a = ScriptUnit::master(Path::new("/scripts/a.rs"));
        let b = ScriptUnit::include(Path::new("/scripts/a.rs"));
        assert_eq!(a, b);
        assert_ne!(a.role(), b.role());
    }

    #[test]
    fn test_constructors_tag_role() {
        let master = ScriptUnit::master(Path::new("/scripts/main.rs"));
        assert_eq!(master.role(), Role::Master);
        assert_eq!(master.path(), Path::new("/scripts/main.rs"));
        assert_eq!(ScriptUnit::include(Path::new("/scripts/a.rs")).role(), Role::Include);
    }

    #[test]
    fn test_is_source() {
        assert!(ScriptUnit::include(Path::new("/s/helper.rs")).is_source());
        assert!(ScriptUnit::include(Path::new("/s/HELPER.RS")).is_source());
        assert!(!ScriptUnit::include(Path::new("/s/layout.xml")).is_source());
    }
}
