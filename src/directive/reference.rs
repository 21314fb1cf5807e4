//! Reference directive resolution.
//!
//! `//css_ref` names an external artifact the build links against. The path
//! may use environment variables (`$VAR`, `${VAR}`, `%VAR%`) and a leading
//! `~`. Relative names are searched for in:
//!
//! 1. the host executable's directory
//! 2. the referencing script's directory
//!
//! First existing match wins. When neither exists the name is kept as
//! written and left to the toolchain's own search path.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::utils::path::normalize_path;

static PERCENT_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%([A-Za-z_][A-Za-z0-9_]*)%").expect("valid percent variable regex")
});

/// Expand environment variables and `~`. Unknown variables stay untouched.
pub fn expand_env(raw: &str) -> String {
    let percent = PERCENT_VAR.replace_all(raw, |caps: &Captures<'_>| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    });
    let dollar: Cow<'_, str> =
        shellexpand::env_with_context_no_errors(&*percent, |var| std::env::var(var).ok());
    shellexpand::tilde(&*dollar).into_owned()
}

/// Resolve a reference directive argument to the path handed to the
/// toolchain.
pub fn resolve_reference(raw: &str, host_dir: Option<&Path>, script_dir: &Path) -> PathBuf {
    let expanded = PathBuf::from(expand_env(raw));
    if expanded.is_absolute() {
        return expanded;
    }

    for dir in host_dir.into_iter().chain(std::iter::once(script_dir)) {
        let candidate = dir.join(&expanded);
        if candidate.exists() {
            return normalize_path(&candidate);
        }
    }

    expanded
}
