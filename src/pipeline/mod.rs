//! Reload pipeline: resolve → build → execute, with retry and reporting.
//!
//! ```text
//! Reloader::reload(master)
//!   └── RetryPolicy::run
//!         ├── DirectiveResolver::resolve   includes → Registrar
//!         ├── BuildOrchestrator::build
//!         └── Executor::execute
//!   └── failure → OutputSink::output_line(diagnostic)
//! ```
//!
//! Nothing here returns an error to the watch actor: every failure ends up
//! as one line in the output sink. A failed reload leaves earlier
//! generations loaded and untouched.

pub mod retry;

use std::path::Path;
use std::sync::{Arc, OnceLock};

pub use retry::RetryPolicy;

use crate::build::BuildOrchestrator;
use crate::core::ScriptError;
use crate::directive::DirectiveResolver;
use crate::host::OutputSink;
use crate::loader::Executor;
use crate::watch::{Registrar, Reload};

/// Called after every reload with the generation run, or the error shown.
pub type ReloadObserver = Box<dyn Fn(&Path, Result<u64, &ScriptError>) + Send + Sync>;

/// Everything needed to rebuild and rerun a master.
pub struct Reloader {
    resolver: DirectiveResolver,
    builds: BuildOrchestrator,
    executor: Executor,
    sink: Arc<dyn OutputSink>,
    retry: RetryPolicy,
    registrar: OnceLock<Registrar>,
    observer: Option<ReloadObserver>,
}

impl Reloader {
    pub fn new(resolver: DirectiveResolver, builds: BuildOrchestrator, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            resolver,
            builds,
            executor: Executor::new(),
            sink,
            retry: RetryPolicy::default(),
            registrar: OnceLock::new(),
            observer: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Report every discovered include to the watch actor from now on.
    ///
    /// Only the first registrar attached is kept.
    pub fn attach_registrar(&self, registrar: Registrar) {
        let _ = self.registrar.set(registrar);
    }

    pub fn with_observer(mut self, observer: ReloadObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    #[inline]
    pub fn sink(&self) -> &Arc<dyn OutputSink> {
        &self.sink
    }

    /// One attempt: resolve, build and run `master`. Returns the generation
    /// that ran.
    pub fn reload_master(&self, master: &Path) -> Result<u64, ScriptError> {
        let set = self.resolver.resolve(master, |child| {
            if let Some(registrar) = self.registrar.get() {
                registrar.include(master, child);
            }
        })?;
        let artifact = self.builds.build(&set)?;
        self.executor.execute(&artifact, self.sink.as_ref())?;
        Ok(artifact.generation())
    }

    /// Reload with retries; failures go to the sink. Returns the generation
    /// that ran, if any.
    pub fn run(&self, master: &Path) -> Option<u64> {
        let result = run_reported(&self.retry, self.sink.as_ref(), || self.reload_master(master));

        if let Some(observer) = &self.observer {
            match &result {
                Ok(generation) => observer(master, Ok(*generation)),
                Err(e) => observer(master, Err(e)),
            }
        }
        result.ok()
    }
}

impl Reload for Reloader {
    fn reload(&self, master: &Path) {
        if let Some(generation) = self.run(master) {
            crate::debug!("reload"; "{} (generation {})", master.display(), generation);
        }
    }
}

/// Run `op` under `retry`; a final failure is written to `sink` as one
/// diagnostic line.
pub fn run_reported<T>(
    retry: &RetryPolicy,
    sink: &dyn OutputSink,
    op: impl FnMut() -> Result<T, ScriptError>,
) -> Result<T, ScriptError> {
    let result = retry.run(op);
    if let Err(e) = &result {
        crate::debug!("reload"; "{} error", e.kind());
        sink.output_line(&e.to_string());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::io;
    use std::time::Duration;

    #[derive(Default)]
    struct Lines(Mutex<Vec<String>>);

    impl OutputSink for Lines {
        fn output_line(&self, text: &str) {
            self.0.lock().push(text.to_string());
        }

        fn clear_output(&self) {}
    }

    fn transient() -> ScriptError {
        ScriptError::transient(Path::new("/s/a.rs"), io::Error::other("being written"))
    }

    #[test]
    fn test_transient_then_success_reports_nothing() {
        let sink = Lines::default();
        let mut calls = 0;
        let result = run_reported(&RetryPolicy::new(10, Duration::ZERO), &sink, || {
            calls += 1;
            if calls <= 3 { Err(transient()) } else { Ok(7) }
        });

        assert_eq!(result.unwrap(), 7);
        assert!(sink.0.lock().is_empty());
    }

    #[test]
    fn test_exhausted_retries_report_once() {
        let sink = Lines::default();
        let mut calls = 0;
        let result: Result<(), _> = run_reported(&RetryPolicy::new(10, Duration::ZERO), &sink, || {
            calls += 1;
            Err(transient())
        });

        assert!(result.is_err());
        assert_eq!(calls, 10);
        let lines = sink.0.lock();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("/s/a.rs(1,1): error: "));
    }

    #[test]
    fn test_missing_master_reported_without_retry() {
        let temp = tempfile::TempDir::new().unwrap();
        let sink: Arc<Lines> = Arc::new(Lines::default());
        let reloader = Reloader::new(
            DirectiveResolver::new(None),
            BuildOrchestrator::new(
                crate::build::Rustc::new("rustc".into(), "2021", Vec::new()),
                temp.path(),
            ),
            sink.clone(),
        );

        let outcomes = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&outcomes);
        let reloader = reloader.with_observer(Box::new(move |_, result| {
            seen.lock().push(result.is_ok());
        }));

        assert_eq!(reloader.run(&temp.path().join("absent.rs")), None);
        let lines = sink.0.lock();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("Could not load file 'absent.rs'"));
        assert_eq!(*outcomes.lock(), vec![false]);
    }
}
