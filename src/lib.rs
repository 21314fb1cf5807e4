//! scripthost - hot-reload host for Rust scripts.
//!
//! A script is a plain `.rs` file. The host compiles it (and everything it
//! pulls in with `//css_include`) into a `cdylib`, loads it, calls its
//! `main`, and does it all again whenever one of those files changes.
//!
//! # Module Structure
//!
//! ```text
//! src/
//! ├── core/       # ScriptUnit, Diagnostic, ScriptError, shutdown flag
//! ├── directive/  # //css_include, //css_ref → ResolvedBuildSet
//! ├── build/      # generated crate root, rustc, temp layout
//! ├── loader/     # libloading, entry point, cwd guard
//! ├── watch/      # watch actor, dependency registry, debounce
//! ├── pipeline/   # Reloader: resolve → build → run, with retry
//! ├── host/       # ScriptHost, OutputSink, Dispatcher
//! ├── config/     # scripthost.toml
//! ├── cli/        # command-line host
//! ├── logger.rs   # log!/debug!, watch status line
//! └── utils/      # process execution, path normalization
//! ```
//!
//! # Example
//!
//! ```ignore
//! let config = HostConfig::default();
//! let (dispatcher, queue) = ChannelDispatcher::new();
//! let host = ScriptHost::builder(&config)
//!     .sink(Arc::new(MyConsole))
//!     .dispatcher(Arc::new(dispatcher))
//!     .start()?;
//! host.observe(Path::new("scripts/hello.rs"));
//! queue.pump_until(Duration::from_millis(100), || done());
//! ```

pub mod build;
pub mod cli;
pub mod config;
pub mod core;
pub mod directive;
pub mod host;
pub mod loader;
pub mod logger;
pub mod pipeline;
pub mod utils;
pub mod watch;

pub use config::HostConfig;
pub use core::{Diagnostic, ScriptError};
pub use host::{ChannelDispatcher, Dispatcher, InlineDispatcher, NullSink, OutputSink, ScriptHost};
