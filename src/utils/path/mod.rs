//! Path utilities.
//!
//! Pure functions for path manipulation. No side effects.
//!
//! - [`fs`]: Filesystem path normalization (`normalize_path`, `resolve_path`)

pub mod fs;

pub use fs::{file_stem_lossy, normalize_path, resolve_path};
