//! Error taxonomy of the reload pipeline.

use std::io;
use std::path::Path;

use thiserror::Error;

use super::Diagnostic;

/// Everything that can go wrong between a file change and a finished run.
///
/// Each variant carries the [`Diagnostic`] it is reported as. Only
/// [`ScriptError::TransientIo`] is retried.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// Malformed or missing include/reference target, or missing master.
    #[error("{0}")]
    Directive(Diagnostic),

    /// Toolchain exited non-zero or produced no artifact.
    #[error("{diagnostic}")]
    Build {
        diagnostic: Diagnostic,
        /// Full captured toolchain output.
        output: String,
    },

    /// Zero or several qualifying entry points.
    #[error("{0}")]
    EntryPoint(Diagnostic),

    /// The entry point panicked or returned an error.
    #[error("{0}")]
    Runtime(Diagnostic),

    /// A source file could not be read, presumably mid-write.
    #[error("{diagnostic}")]
    TransientIo {
        diagnostic: Diagnostic,
        #[source]
        source: io::Error,
    },

    /// The artifact could not be loaded into the process.
    #[error("{0}")]
    Load(Diagnostic),
}

impl ScriptError {
    pub fn directive(file: &Path, line: u32, message: impl Into<String>) -> Self {
        Self::Directive(Diagnostic::new(file, line, 1, message))
    }

    pub fn transient(file: &Path, source: io::Error) -> Self {
        let message = format!("Could not read '{}': {}", file.display(), source);
        Self::TransientIo {
            diagnostic: Diagnostic::at_start(file, message),
            source,
        }
    }

    pub fn entry_point(master: &Path, message: impl Into<String>) -> Self {
        Self::EntryPoint(Diagnostic::at_start(master, message))
    }

    pub fn load(master: &Path, message: impl Into<String>) -> Self {
        Self::Load(Diagnostic::at_start(master, message))
    }

    /// The diagnostic this error is reported as.
    pub fn diagnostic(&self) -> &Diagnostic {
        match self {
            Self::Directive(d) | Self::EntryPoint(d) | Self::Runtime(d) | Self::Load(d) => d,
            Self::Build { diagnostic, .. } | Self::TransientIo { diagnostic, .. } => diagnostic,
        }
    }

    /// Whether a retry may succeed (file presumed mid-write by an editor).
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientIo { .. })
    }

    /// Short name of the error class, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Directive(_) => "directive",
            Self::Build { .. } => "build",
            Self::EntryPoint(_) => "entry point",
            Self::Runtime(_) => "runtime",
            Self::TransientIo { .. } => "io",
            Self::Load(_) => "load",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_io_is_transient() {
        let path = Path::new("/s/a.rs");
        let io = ScriptError::transient(path, io::Error::other("locked"));
        assert!(io.is_transient());
        assert!(!ScriptError::directive(path, 3, "missing").is_transient());
        assert!(!ScriptError::entry_point(path, "no main").is_transient());
    }

    #[test]
    fn test_display_is_diagnostic_line() {
        let err = ScriptError::directive(Path::new("/s/a.rs"), 3, "include not found");
        assert_eq!(err.to_string(), "/s/a.rs(3,1): error: include not found");
        assert_eq!(err.diagnostic().line, 3);
    }
}
