//! Utility modules shared by the reload pipeline.

pub mod exec;
pub mod path;
