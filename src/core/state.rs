//! Process-wide shutdown state.
//!
//! `SHUTDOWN`: Has shutdown been requested? (Ctrl+C received)

use std::sync::atomic::{AtomicBool, Ordering};

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Setup the global Ctrl+C handler. Call once at program start.
///
/// The handler only sets the flag; the host loop notices it on its next
/// poll.
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(request_shutdown)
        .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Request shutdown programmatically (same effect as Ctrl+C).
pub fn request_shutdown() {
    if !SHUTDOWN.swap(true, Ordering::SeqCst) {
        crate::debug!("host"; "shutting down...");
    }
}

/// Check if shutdown has been requested
///
/// Uses Relaxed ordering - worst case the host runs one more queued job
/// before stopping.
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}
