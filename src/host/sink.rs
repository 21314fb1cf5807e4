//! Where script output and diagnostics go.

/// Receives script output and reload diagnostics.
///
/// Called on the designated execution context only.
pub trait OutputSink: Send + Sync {
    /// Append one line.
    fn output_line(&self, text: &str);

    /// Clear everything shown so far.
    fn clear_output(&self);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn output_line(&self, _text: &str) {}

    fn clear_output(&self) {}
}
