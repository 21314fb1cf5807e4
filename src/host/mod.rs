//! Host facade: what an embedding application talks to.
//!
//! # Module Structure
//!
//! ```text
//! host/
//! ├── dispatch    # Dispatcher, InlineDispatcher, ChannelDispatcher
//! ├── sink        # OutputSink, NullSink
//! └── mod.rs      # ScriptHost (this file)
//! ```
//!
//! # Lifecycle
//!
//! ```text
//! ScriptHost::builder(&config).dispatcher(..).sink(..).start()
//!   ├── TempLayout::create        {temp_root}/{exe}_{pid}/, locked
//!   ├── sweep                     stale sibling instances
//!   ├── Reloader                  resolver + orchestrator + executor
//!   └── watch::spawn(WatchActor)  "scripthost-watch" thread
//!
//! observe_script(master, child, recompile_master) ──▶ Registrar
//! drop / shutdown()                                ──▶ actor stops, thread joined
//! ```

mod dispatch;
mod sink;

use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{Context, Result};

pub use dispatch::{ChannelDispatcher, Dispatcher, InlineDispatcher, Job, JobQueue};
pub use sink::{NullSink, OutputSink};

use crate::build::{BuildOrchestrator, Rustc, TempLayout, Toolchain, layout};
use crate::config::HostConfig;
use crate::pipeline::{ReloadObserver, Reloader};
use crate::watch::{self, Registrar, WatchActor};

/// A running hot-reload host.
pub struct ScriptHost {
    registrar: Registrar,
    reloader: Arc<Reloader>,
    watch: Option<JoinHandle<()>>,
    layout: TempLayout,
}

/// Configures and starts a [`ScriptHost`].
pub struct ScriptHostBuilder<'a> {
    config: &'a HostConfig,
    sink: Arc<dyn OutputSink>,
    dispatcher: Arc<dyn Dispatcher>,
    toolchain: Option<Box<dyn Toolchain>>,
    observer: Option<ReloadObserver>,
}

impl<'a> ScriptHostBuilder<'a> {
    /// Where script output and diagnostics go. Default: discarded.
    pub fn sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The designated execution context. Default: the watch thread itself.
    pub fn dispatcher(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Use `toolchain` instead of the configured `rustc`.
    pub fn toolchain(mut self, toolchain: impl Toolchain + 'static) -> Self {
        self.toolchain = Some(Box::new(toolchain));
        self
    }

    /// Called after every reload, on the execution context.
    pub fn observer(mut self, observer: ReloadObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn start(self) -> Result<ScriptHost> {
        let (layout, builds) = prepare(self.config, self.toolchain)?;

        let mut reloader = Reloader::new(self.config.resolver(), builds, self.sink)
            .with_retry(self.config.retry());
        if let Some(observer) = self.observer {
            reloader = reloader.with_observer(observer);
        }
        let reloader = Arc::new(reloader);

        let (actor, registrar) =
            WatchActor::new(self.config.debounce(), self.dispatcher, reloader.clone())
                .context("Failed to create file watcher")?;
        reloader.attach_registrar(registrar.clone());
        let watch = watch::spawn(actor)?;

        crate::debug!("host"; "instance {}", layout.instance_dir().display());
        Ok(ScriptHost {
            registrar,
            reloader,
            watch: Some(watch),
            layout,
        })
    }
}

impl ScriptHost {
    pub fn builder(config: &HostConfig) -> ScriptHostBuilder<'_> {
        ScriptHostBuilder {
            config,
            sink: Arc::new(NullSink),
            dispatcher: Arc::new(InlineDispatcher),
            toolchain: None,
            observer: None,
        }
    }

    /// Watch `master` (and `child`, if given) and keep it built and running.
    ///
    /// - no child: `master` is its own rebuild target; an initial build and
    ///   run is dispatched right away.
    /// - child, `recompile_master`: changes to `child` rebuild `master`.
    /// - child, `!recompile_master`: changes to `child` rebuild `child`, and
    ///   changes to `master` are redirected to `child`.
    ///
    /// Registering the same pair twice does nothing.
    pub fn observe_script(&self, master: &Path, child: Option<&Path>, recompile_master: bool) {
        self.registrar.observe(master, child, recompile_master);
    }

    /// Shorthand for `observe_script(master, None, true)`.
    #[inline]
    pub fn observe(&self, master: &Path) {
        self.observe_script(master, None, true);
    }

    pub fn output_line(&self, text: &str) {
        self.reloader.sink().output_line(text);
    }

    pub fn clear_output(&self) {
        self.reloader.sink().clear_output();
    }

    pub fn instance_dir(&self) -> &Path {
        self.layout.instance_dir()
    }

    /// Stop the watch actor and wait for its thread.
    ///
    /// Jobs already handed to the dispatcher still run.
    pub fn shutdown(&mut self) {
        let Some(watch) = self.watch.take() else {
            return;
        };
        self.registrar.shutdown();
        if watch.join().is_err() {
            crate::log!("host"; "watch thread panicked");
        }
    }
}

impl Drop for ScriptHost {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Build and run `master` once, without watching.
///
/// Diagnostics go to `sink`. Returns the generation that ran, or `None`
/// when the reload failed.
pub fn run_once(config: &HostConfig, sink: Arc<dyn OutputSink>, master: &Path) -> Result<Option<u64>> {
    let (_layout, builds) = prepare(config, None)?;
    let reloader = Reloader::new(config.resolver(), builds, sink).with_retry(config.retry());
    Ok(reloader.run(master))
}

/// Debug-log `text` positioned at the caller, as `{file}({line}): {text}`.
#[track_caller]
pub fn trace_line(text: &str) {
    let at = std::panic::Location::caller();
    crate::debug!("trace"; "{}({}): {}", at.file(), at.line(), text);
}

/// Instance directory (after sweeping stale ones) and the orchestrator
/// building into it.
fn prepare(
    config: &HostConfig,
    toolchain: Option<Box<dyn Toolchain>>,
) -> Result<(TempLayout, BuildOrchestrator)> {
    let temp_root = config.temp_root();
    let swept = layout::sweep(&temp_root, std::process::id());
    if swept > 0 {
        crate::debug!("host"; "removed {} stale instance dir(s)", swept);
    }

    let layout = TempLayout::create(&temp_root)
        .with_context(|| format!("Failed to create build directory in {}", temp_root.display()))?;

    let toolchain: Box<dyn Toolchain> = match toolchain {
        Some(toolchain) => toolchain,
        None => Box::new(Rustc::locate(
            &config.build.rustc,
            config.build.edition.clone(),
            config.build.extra_args.clone(),
        )?),
    };
    let builds = BuildOrchestrator::new(toolchain, layout.instance_dir());
    Ok((layout, builds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{BuildRequest, CompileOutput};
    use parking_lot::Mutex;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    #[derive(Default)]
    struct Lines(Mutex<Vec<String>>);

    impl OutputSink for Lines {
        fn output_line(&self, text: &str) {
            self.0.lock().push(text.to_string());
        }

        fn clear_output(&self) {
            self.0.lock().clear();
        }
    }

    /// Always fails to compile.
    struct Rejecting;

    impl Toolchain for Rejecting {
        fn compile(&self, request: &BuildRequest) -> anyhow::Result<CompileOutput> {
            Ok(CompileOutput {
                success: false,
                output: "error: rejected".to_string(),
                command_line: format!("reject {}", request.crate_name),
            })
        }
    }

    fn config(temp: &TempDir) -> HostConfig {
        let mut config = HostConfig::default();
        config.build.temp_root = Some(temp.path().join("builds"));
        config.watch.retry_delay_ms = 0;
        config
    }

    fn wait_for(mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done() {
            assert!(Instant::now() < deadline, "timed out");
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_observe_reports_build_failure_to_sink() {
        let temp = TempDir::new().unwrap();
        let master = temp.path().join("hello.rs");
        std::fs::write(&master, "fn main() {}\n").unwrap();

        let sink = Arc::new(Lines::default());
        let outcomes = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&outcomes);
        let config = config(&temp);
        let mut host = ScriptHost::builder(&config)
            .sink(sink.clone())
            .toolchain(Rejecting)
            .observer(Box::new(move |_, result| seen.lock().push(result.is_ok())))
            .start()
            .unwrap();
        assert!(host.instance_dir().starts_with(temp.path().join("builds")));

        host.observe(&master);
        wait_for(|| !outcomes.lock().is_empty());
        host.shutdown();

        let lines = sink.0.lock();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("error: rejected"));
        assert!(lines[0].contains("While executing command 'reject hello_"));
        assert_eq!(*outcomes.lock(), vec![false]);
    }

    #[test]
    fn test_output_goes_to_sink() {
        let temp = TempDir::new().unwrap();
        let sink = Arc::new(Lines::default());
        let config = config(&temp);
        let host = ScriptHost::builder(&config)
            .sink(sink.clone())
            .toolchain(Rejecting)
            .start()
            .unwrap();

        host.output_line("one");
        host.output_line("two");
        assert_eq!(sink.0.lock().len(), 2);
        host.clear_output();
        assert!(sink.0.lock().is_empty());
    }

    #[test]
    fn test_trace_line_is_quiet_by_default() {
        trace_line("not shown");
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let config = config(&temp);
        let mut host = ScriptHost::builder(&config).toolchain(Rejecting).start().unwrap();
        host.shutdown();
        host.shutdown();
    }

    #[test]
    fn test_run_once_reports_missing_script() {
        if which::which("rustc").is_err() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let sink = Arc::new(Lines::default());

        let result = run_once(&config(&temp), sink.clone(), &temp.path().join("absent.rs")).unwrap();
        assert_eq!(result, None);
        assert!(sink.0.lock()[0].contains("File does not exist"));
    }

    #[test]
    fn test_run_once_runs_script() {
        if which::which("rustc").is_err() {
            return;
        }
        let _lock = crate::loader::CWD_LOCK.lock();
        let temp = TempDir::new().unwrap();
        let master = temp.path().join("hi.rs");
        std::fs::write(&master, "fn main() { host::output_line(\"hi\"); }\n").unwrap();
        let sink = Arc::new(Lines::default());

        let generation = run_once(&config(&temp), sink.clone(), &master).unwrap().expect("script ran");
        assert!(generation >= 1);
        assert_eq!(*sink.0.lock(), vec!["hi".to_string()]);
    }
}
