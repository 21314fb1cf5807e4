//! The uniform shape of every user-visible failure.

use std::fmt;
use std::path::{Path, PathBuf};

/// A positioned error message.
///
/// Rendered as `{file}({line},{column}): error: {message}`, the format most
/// editors and IDE output panes turn into a clickable location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: PathBuf,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl Diagnostic {
    pub fn new(file: impl Into<PathBuf>, line: u32, column: u32, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            message: message.into(),
        }
    }

    /// Diagnostic positioned at the start of `file`, `(1,1)`.
    pub fn at_start(file: &Path, message: impl Into<String>) -> Self {
        Self::new(file, 1, 1, message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({},{}): error: {}",
            self.file.display(),
            self.line,
            self.column,
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_format() {
        let diag = Diagnostic::new("/scripts/hello.rs", 12, 5, "attempt to divide by zero");
        assert_eq!(
            diag.to_string(),
            "/scripts/hello.rs(12,5): error: attempt to divide by zero"
        );
    }

    #[test]
    fn test_at_start() {
        let diag = Diagnostic::at_start(Path::new("/scripts/hello.rs"), "missing entry");
        assert_eq!((diag.line, diag.column), (1, 1));
    }
}
