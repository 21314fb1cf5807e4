//! Bounded retry for transient source access failures.
//!
//! Editors often save by truncate-then-write or write-then-rename, so a
//! change notification may arrive while the file is still unreadable.

use std::thread;
use std::time::Duration;

use crate::core::ScriptError;

pub const DEFAULT_ATTEMPTS: u32 = 10;
pub const DEFAULT_DELAY_MS: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. At least one is always made.
    pub attempts: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// Run `op` until it succeeds, fails for good, or attempts run out.
    ///
    /// Only [`ScriptError::is_transient`] failures are retried. When
    /// attempts run out the last transient error is returned.
    pub fn run<T>(&self, mut op: impl FnMut() -> Result<T, ScriptError>) -> Result<T, ScriptError> {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Err(e) if e.is_transient() && attempt < attempts => {
                    crate::debug!("reload"; "attempt {}/{} failed: {}", attempt, attempts, e);
                    attempt += 1;
                    thread::sleep(self.delay);
                }
                result => return result,
            }
        }
    }
}
