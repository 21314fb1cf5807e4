//! Watch actor: filesystem events → debounced, dependency-aware reloads.
//!
//! ```text
//! notify thread ──Fs(event)──┐
//! Registrar ───Observe{..}───┼──▶ WatchActor (own thread, current-thread runtime)
//! ScriptHost ──Shutdown──────┘      ├── DependencyRegistry
//!                                   ├── Aggregator (pending set + timer)
//!                                   ├── WatchedDirs + notify watcher
//!                                   └── Dispatcher ──job──▶ Reload::reload(master)
//! ```
//!
//! The actor owns all mutable watch state; everything else talks to it by
//! message. It never builds or runs a script itself.

mod debouncer;
mod dirs;
pub mod registry;


use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use notify::RecommendedWatcher;
use tokio::sync::mpsc;

pub use debouncer::{Aggregator, DEFAULT_DEBOUNCE_MS, is_change};
use dirs::WatchedDirs;
pub use registry::{DependencyRegistry, Registration};

use crate::host::Dispatcher;
use crate::utils::path::normalize_path;

/// Messages handled by the watch actor.
#[derive(Debug)]
pub enum WatchMsg {
    /// Register a master, or a child of a master.
    Observe {
        master: PathBuf,
        child: Option<PathBuf>,
        recompile_master: bool,
    },
    /// Raw filesystem notification.
    Fs(notify::Event),
    Shutdown,
}

/// Rebuilds and reruns one master. Runs on the designated execution context.
pub trait Reload: Send + Sync + 'static {
    fn reload(&self, master: &Path);
}

/// Cloneable handle for registering scripts with the watch actor.
#[derive(Debug, Clone)]
pub struct Registrar {
    tx: mpsc::UnboundedSender<WatchMsg>,
}

impl Registrar {
    /// Relative paths are resolved against the caller's working directory
    /// before the message is sent.
    pub fn observe(&self, master: &Path, child: Option<&Path>, recompile_master: bool) {
        let msg = WatchMsg::Observe {
            master: normalize_path(master),
            child: child.map(normalize_path),
            recompile_master,
        };
        if self.tx.send(msg).is_err() {
            crate::debug!("watch"; "actor stopped, registration dropped");
        }
    }

    /// Register `child` as an include of `master`.
    #[inline]
    pub fn include(&self, master: &Path, child: &Path) {
        self.observe(master, Some(child), true);
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(WatchMsg::Shutdown);
    }
}

// =============================================================================
// Actor
// =============================================================================

pub struct WatchActor {
    rx: mpsc::UnboundedReceiver<WatchMsg>,
    watcher: RecommendedWatcher,
    dirs: WatchedDirs,
    registry: DependencyRegistry,
    aggregator: Aggregator,
    dispatcher: Arc<dyn Dispatcher>,
    reloader: Arc<dyn Reload>,
}

impl WatchActor {
    /// Create the actor and its registrar. The watcher starts immediately;
    /// its events queue up until [`WatchActor::run`] is polled.
    pub fn new(
        debounce: Duration,
        dispatcher: Arc<dyn Dispatcher>,
        reloader: Arc<dyn Reload>,
    ) -> notify::Result<(Self, Registrar)> {
        let (tx, rx) = mpsc::unbounded_channel();

        let events = tx.clone();
        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
            Ok(event) => {
                let _ = events.send(WatchMsg::Fs(event));
            }
            Err(e) => crate::log!("watch"; "notify error: {}", e),
        })?;

        let actor = Self {
            rx,
            watcher,
            dirs: WatchedDirs::default(),
            registry: DependencyRegistry::new(),
            aggregator: Aggregator::new(debounce),
            dispatcher,
            reloader,
        };
        Ok((actor, Registrar { tx }))
    }

    /// Run the event loop until shutdown or until every sender is gone.
    pub async fn run(mut self) {
        loop {
            let sleep = self.aggregator.sleep_duration(Instant::now());
            tokio::select! {
                biased;
                msg = self.rx.recv() => match msg {
                    Some(WatchMsg::Observe { master, child, recompile_master }) => {
                        self.observe(&master, child.as_deref(), recompile_master);
                    }
                    Some(WatchMsg::Fs(event)) => self.on_event(&event, Instant::now()),
                    Some(WatchMsg::Shutdown) | None => break,
                },
                () = tokio::time::sleep(sleep) => self.flush(Instant::now()),
            }
        }
        crate::debug!("watch"; "actor stopped");
    }

    /// Paths arrive normalized from [`Registrar::observe`].
    fn observe(&mut self, master: &Path, child: Option<&Path>, recompile_master: bool) {
        let registration = self.registry.register(master, child, recompile_master);
        if registration == Registration::Duplicate {
            return;
        }

        for file in std::iter::once(master).chain(child) {
            if let Err(e) = self.dirs.attach_parent(file, &mut self.watcher) {
                crate::log!("watch"; "cannot watch {}: {}", file.display(), e);
            }
        }

        if registration == Registration::NewMaster {
            self.dispatch(master.to_path_buf());
        }
    }

    fn on_event(&mut self, event: &notify::Event, now: Instant) {
        if !is_change(&event.kind) {
            return;
        }
        for path in &event.paths {
            let affected = self.registry.affected(&normalize_path(path));
            if !affected.is_empty() {
                crate::debug!("watch"; "{:?} {}", event.kind, path.display());
            }
            self.aggregator.add(affected, now);
        }
    }

    fn flush(&mut self, now: Instant) {
        let Some(masters) = self.aggregator.take_if_ready(now) else {
            return;
        };
        for master in masters {
            self.dispatch(master);
        }
    }

    fn dispatch(&self, master: PathBuf) {
        let reloader = Arc::clone(&self.reloader);
        self.dispatcher
            .dispatch(Box::new(move || reloader.reload(&master)));
    }
}

/// Run `actor` on a dedicated thread with its own current-thread runtime.
pub fn spawn(actor: WatchActor) -> Result<JoinHandle<()>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("Failed to create watch runtime")?;

    thread::Builder::new()
        .name("scripthost-watch".to_string())
        .spawn(move || runtime.block_on(actor.run()))
        .context("Failed to spawn watch thread")
}
