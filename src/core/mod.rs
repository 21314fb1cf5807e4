//! Core types - pure abstractions shared across the codebase.

mod diagnostic;
mod error;
mod state;
mod unit;

pub use diagnostic::Diagnostic;
pub use error::ScriptError;
pub use state::{is_shutdown, request_shutdown, setup_shutdown_handler};
pub use unit::{Role, ScriptUnit};
