//! Artifact loading and entry point invocation.
//!
//! ```text
//! BuildArtifact
//!   → find_entry_point      exactly one qualifying `main`
//!   → Executor::load        libloading, ABI check, keeps the library alive
//!   → EntryPoint::invoke    cwd = master dir, failures → RuntimeError
//! ```
//!
//! Libraries are never unloaded: every generation stays mapped for the life
//! of the process.

mod abi;
mod cwd;


use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use libloading::Library;
use parking_lot::Mutex;

use abi::{ABI_SYMBOL, ABI_VERSION, CallContext, Failure, INVOKE_SYMBOL, InvokeFn};
use cwd::CwdGuard;
#[cfg(test)]
pub(crate) use cwd::CWD_LOCK;

use crate::build::{BuildArtifact, EntryCandidate};
use crate::core::{Diagnostic, ScriptError};
use crate::host::OutputSink;

/// The single qualifying entry point of `artifact`.
pub fn find_entry_point(artifact: &BuildArtifact) -> Result<&EntryCandidate, ScriptError> {
    let master = artifact.master();
    let qualifying: Vec<_> = artifact.entries().iter().filter(|e| e.qualifies()).collect();

    match qualifying.as_slice() {
        [only] => Ok(*only),
        [] => {
            let message = match artifact.entries().first() {
                Some(with_inputs) => format!(
                    "Function '{}' is not expected to have input parameters",
                    with_inputs.call
                ),
                None => "Code does not have 'main' function".to_string(),
            };
            Err(ScriptError::entry_point(master, message))
        }
        several => {
            let names: Vec<_> = several.iter().map(|e| e.call.as_str()).collect();
            Err(ScriptError::entry_point(
                master,
                format!("Code has more than one 'main' function ({})", names.join(", ")),
            ))
        }
    }
}

/// A resolved entry point, ready to run. Borrows the [`Executor`] that
/// keeps its library loaded.
pub struct EntryPoint<'a> {
    master: PathBuf,
    generation: u64,
    invoke: InvokeFn,
    _library: PhantomData<&'a Executor>,
}

impl fmt::Debug for EntryPoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryPoint")
            .field("master", &self.master)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl EntryPoint<'_> {
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Run the entry point with the working directory set to the master's
    /// directory.
    pub fn invoke(&self, sink: &dyn OutputSink) -> Result<(), ScriptError> {
        let dir = self.master.parent().unwrap_or(Path::new("/"));
        let _cwd = CwdGuard::enter(dir).map_err(|e| ScriptError::transient(&self.master, e))?;

        let ctx = CallContext::new(sink);
        let api = ctx.api();
        // SAFETY: the symbol comes from a library kept alive by the Executor,
        // and `api` outlives the call.
        let status = unsafe { (self.invoke)(&raw const api) };

        if status == 0 {
            return Ok(());
        }
        Err(runtime_error(&self.master, ctx.take_failure()))
    }
}

/// Map what the script reported to a positioned diagnostic.
fn runtime_error(master: &Path, failure: Option<Failure>) -> ScriptError {
    let diagnostic = match failure {
        Some(Failure::Returned(message)) => Diagnostic::at_start(master, message),
        Some(Failure::Panicked {
            file,
            line,
            column,
            message,
        }) if line > 0 && !file.is_empty() => Diagnostic::new(file, line, column.max(1), message),
        Some(Failure::Panicked { message, .. }) => {
            Diagnostic::at_start(master, format!("Internal error - exception '{message}'"))
        }
        None => Diagnostic::at_start(master, "Internal error - exception 'unknown failure'"),
    };
    ScriptError::Runtime(diagnostic)
}

/// Loads artifacts and keeps them loaded.
#[derive(Default)]
pub struct Executor {
    libraries: Mutex<Vec<Library>>,
}

impl Executor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of generations loaded so far.
    pub fn loaded(&self) -> usize {
        self.libraries.lock().len()
    }

    /// Load `artifact` and resolve its entry point.
    pub fn load(&self, artifact: &BuildArtifact) -> Result<EntryPoint<'_>, ScriptError> {
        find_entry_point(artifact)?;
        let master = artifact.master();

        // SAFETY: artifacts are built from the generated crate root, whose
        // initializers only set up thread-locals.
        let library = unsafe { Library::new(artifact.path()) }.map_err(|e| {
            ScriptError::load(master, format!("Could not load '{}': {e}", artifact.path().display()))
        })?;

        // SAFETY: both symbols are emitted by the generated crate root with
        // exactly these types.
        let (version, invoke) = unsafe {
            let version = library
                .get::<*const u32>(ABI_SYMBOL)
                .map(|symbol| **symbol)
                .map_err(|e| ScriptError::load(master, format!("Missing ABI version: {e}")))?;
            let invoke = library
                .get::<InvokeFn>(INVOKE_SYMBOL)
                .map(|symbol| *symbol)
                .map_err(|e| ScriptError::load(master, format!("Missing entry trampoline: {e}")))?;
            (version, invoke)
        };

        if version != ABI_VERSION {
            return Err(ScriptError::load(
                master,
                format!("ABI version {version} does not match host ABI version {ABI_VERSION}"),
            ));
        }

        self.libraries.lock().push(library);
        Ok(EntryPoint {
            master: master.to_path_buf(),
            generation: artifact.generation(),
            invoke,
            _library: PhantomData,
        })
    }

    /// Load `artifact` and run its entry point.
    pub fn execute(&self, artifact: &BuildArtifact, sink: &dyn OutputSink) -> Result<(), ScriptError> {
        self.load(artifact)?.invoke(sink)
    }
}
