//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Hot-reload host for Rust scripts
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: scripthost.toml)
    #[arg(short = 'C', long, global = true, default_value = "scripthost.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Toolchain executable (overrides [build.rustc])
    #[arg(long, global = true, value_hint = clap::ValueHint::CommandName)]
    pub rustc: Option<String>,

    /// Edition scripts are compiled with (overrides [build.edition])
    #[arg(short, long, global = true)]
    pub edition: Option<String>,

    /// Parent of the per-instance build directories (overrides [build.temp_root])
    #[arg(long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub temp_root: Option<PathBuf>,

    /// Quiet period before a reload, in milliseconds (overrides [watch.debounce_ms])
    #[arg(short, long, global = true)]
    pub debounce_ms: Option<u64>,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build and run a script once
    #[command(visible_alias = "r")]
    Run {
        /// Master script
        #[arg(value_hint = clap::ValueHint::FilePath)]
        script: PathBuf,
    },

    /// Run a script and rerun it whenever it or its includes change
    #[command(visible_alias = "w")]
    Watch {
        /// Master script
        #[arg(value_hint = clap::ValueHint::FilePath)]
        script: PathBuf,
    },

    /// Remove build directories left behind by exited hosts
    Clean,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_with_global_flags() {
        let cli = Cli::parse_from(["scripthost", "watch", "hello.rs", "--verbose", "-e", "2024"]);
        assert!(cli.verbose);
        assert_eq!(cli.edition.as_deref(), Some("2024"));
        assert!(matches!(cli.command, Commands::Watch { ref script } if script == &PathBuf::from("hello.rs")));
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["scripthost", "clean"]);
        assert_eq!(cli.config, PathBuf::from("scripthost.toml"));
        assert!(!cli.verbose);
        assert!(cli.rustc.is_none());
        assert!(cli.debounce_ms.is_none());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_requires_script() {
        assert!(Cli::try_parse_from(["scripthost", "run"]).is_err());
    }
}
