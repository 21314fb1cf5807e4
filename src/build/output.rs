//! Toolchain output classification.
//!
//! rustc's short error format prints one line per diagnostic:
//!
//! ```text
//! /scripts/hello.rs:4:5: error[E0425]: cannot find value `x` in this scope
//! /scripts/hello.rs:9:1: warning: unused import: `std::fs`
//! ```

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::{Diagnostic, ScriptError};

static ERROR_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(.+?):([0-9]+):([0-9]+): error").expect("valid error line regex")
});

static UNRESOLVED_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"error\[E04(12|22|23|25|33)\]").expect("valid unresolved name regex"));

/// Appended when a name fails to resolve. Script files see each other
/// through glob imports, which skip private items.
const PUB_HINT: &str = "note: items used from another script file must be declared `pub`";

/// Location of the first error reported in `output`.
///
/// Relative file names are taken relative to `work_dir`.
pub fn first_error_location(output: &str, work_dir: &Path) -> Option<(std::path::PathBuf, u32, u32)> {
    let caps = ERROR_LINE.captures(output)?;
    let file = Path::new(&caps[1]);
    let file = if file.is_absolute() {
        file.to_path_buf()
    } else {
        work_dir.join(file)
    };
    let line = caps[2].parse().ok()?;
    let column = caps[3].parse().ok()?;
    Some((file, line, column))
}

/// A failed build, positioned at the first compiler error when there is one.
pub fn build_failure(master: &Path, work_dir: &Path, output: String, command_line: &str) -> ScriptError {
    let mut message = output.trim_end().to_string();
    if UNRESOLVED_NAME.is_match(&output) {
        message.push('\n');
        message.push_str(PUB_HINT);
    }
    message.push_str(&format!("\nWhile executing command '{command_line}'"));
    let diagnostic = match first_error_location(&output, work_dir) {
        Some((file, line, column)) => Diagnostic::new(file, line, column, message),
        None => Diagnostic::at_start(master, message),
    };
    ScriptError::Build { diagnostic, output }
}
