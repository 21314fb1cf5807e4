//! scripthost - edit a Rust script, see it rebuilt and re-run in place.

use anyhow::Result;
use clap::{ColorChoice, Parser};
use scripthost::cli::{self, Cli, Commands};
use scripthost::config::HostConfig;
use scripthost::logger;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let mut config = HostConfig::load_or_default(&cli.config)?;
    config.apply_cli(&cli);
    config.validate()?;

    match &cli.command {
        Commands::Run { script } => {
            if !cli::run::run_script(&config, script)? {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Watch { script } => cli::run::watch_script(&config, script),
        Commands::Clean => cli::clean::clean(&config).map(|_| ()),
    }
}
