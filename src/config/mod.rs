//! Host configuration, `scripthost.toml`.
//!
//! # Sections
//!
//! | Section   | Purpose                                             |
//! |-----------|-----------------------------------------------------|
//! | `[build]` | toolchain, edition, temp root, reference search dir |
//! | `[watch]` | debounce delay, retry policy                        |
//!
//! Every field is optional. Relative paths resolve against the directory of
//! the config file; a leading `~` is expanded.

mod error;

pub use error::ConfigError;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::build::TempLayout;
use crate::cli::Cli;
use crate::directive::DirectiveResolver;
use crate::pipeline::RetryPolicy;
use crate::pipeline::retry::{DEFAULT_ATTEMPTS, DEFAULT_DELAY_MS};
use crate::utils::path::normalize_path;
use crate::watch::DEFAULT_DEBOUNCE_MS;

/// Default config file name.
pub const CONFIG_FILE: &str = "scripthost.toml";

const EDITIONS: [&str; 4] = ["2015", "2018", "2021", "2024"];

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing scripthost.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Toolchain and build directory settings
    pub build: BuildSection,

    /// Watch and reload settings
    pub watch: WatchSection,
}

/// `[build]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSection {
    /// Toolchain executable, a name on `PATH` or a path.
    pub rustc: String,

    /// Edition scripts are compiled with.
    pub edition: String,

    /// Parent of the per-instance build directories.
    pub temp_root: Option<PathBuf>,

    /// First directory searched for relative `//css_ref` paths.
    pub host_dir: Option<PathBuf>,

    /// Appended to every toolchain invocation.
    pub extra_args: Vec<String>,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            rustc: "rustc".to_string(),
            edition: "2021".to_string(),
            temp_root: None,
            host_dir: None,
            extra_args: Vec::new(),
        }
    }
}

/// `[watch]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSection {
    /// Quiet period after the last change before a reload.
    pub debounce_ms: u64,

    /// Attempts per reload while sources are unreadable.
    pub retry_attempts: u32,

    /// Pause between attempts.
    pub retry_delay_ms: u64,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            retry_attempts: DEFAULT_ATTEMPTS,
            retry_delay_ms: DEFAULT_DELAY_MS,
        }
    }
}

impl HostConfig {
    /// Load `path`, or the defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.is_file() {
            Self::load(path)
        } else {
            crate::debug!("config"; "{} not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load configuration from file path with unknown field detection.
    ///
    /// Unknown fields are reported and ignored.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (mut config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            print_unknown_fields_warning(&ignored, path);
        }

        let root = path.parent().map(normalize_path).unwrap_or_default();
        config.normalize_paths(&root);
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    pub fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Apply command-line overrides.
    pub fn apply_cli(&mut self, cli: &Cli) {
        update_option(&mut self.build.rustc, cli.rustc.as_ref());
        update_option(&mut self.build.edition, cli.edition.as_ref());
        update_option(&mut self.watch.debounce_ms, cli.debounce_ms.as_ref());
        if let Some(temp_root) = &cli.temp_root {
            self.build.temp_root = Some(normalize_path(temp_root));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.build.rustc.trim().is_empty() {
            return Err(ConfigError::Validation("[build.rustc] must not be empty".to_string()));
        }
        if !EDITIONS.contains(&self.build.edition.as_str()) {
            return Err(ConfigError::Validation(format!(
                "[build.edition] unknown edition `{}` (expected one of {})",
                self.build.edition,
                EDITIONS.join(", ")
            )));
        }
        if self.watch.retry_attempts == 0 {
            return Err(ConfigError::Validation(
                "[watch.retry_attempts] must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    // ========================================================================
    // derived settings
    // ========================================================================

    pub fn temp_root(&self) -> PathBuf {
        self.build
            .temp_root
            .clone()
            .unwrap_or_else(TempLayout::default_root)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.watch.debounce_ms)
    }

    pub fn retry(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.watch.retry_attempts,
            Duration::from_millis(self.watch.retry_delay_ms),
        )
    }

    /// Reference resolver; defaults to the running executable's directory.
    pub fn resolver(&self) -> DirectiveResolver {
        match &self.build.host_dir {
            Some(dir) => DirectiveResolver::new(Some(dir.clone())),
            None => DirectiveResolver::for_current_exe(),
        }
    }

    fn normalize_paths(&mut self, root: &Path) {
        for path in [&mut self.build.temp_root, &mut self.build.host_dir]
            .into_iter()
            .flatten()
        {
            *path = expand_path(path, root);
        }
    }
}

fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
    if let Some(value) = cli_option {
        *config_option = value.clone();
    }
}

/// Tilde expansion, then resolution against `root`.
fn expand_path(path: &Path, root: &Path) -> PathBuf {
    let expanded = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned());
    if expanded.is_relative() {
        normalize_path(&root.join(expanded))
    } else {
        normalize_path(&expanded)
    }
}

fn print_unknown_fields_warning(fields: &[String], path: &Path) {
    let display_path = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_else(|| path.to_string_lossy());
    crate::log!("warning"; "unknown fields in {}, ignoring:", display_path);
    for field in fields {
        eprintln!("- {field}");
    }
}
