//! Command-line interface module.

mod args;
pub mod clean;
pub mod run;
pub mod terminal;

pub use args::{Cli, Commands};
