//! Output sink for the terminal host.

use std::io::{Write, stdout};

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};

use crate::host::OutputSink;
use crate::logger::status_detach;

/// Prints script output and diagnostics to stdout.
///
/// `clear_output` clears the screen only when `clear` is set; the one-shot
/// `run` command keeps everything.
#[derive(Debug, Clone, Copy)]
pub struct TerminalSink {
    clear: bool,
}

impl TerminalSink {
    pub const fn new(clear: bool) -> Self {
        Self { clear }
    }
}

impl OutputSink for TerminalSink {
    fn output_line(&self, text: &str) {
        let mut stdout = stdout().lock();
        writeln!(stdout, "{text}").ok();
        stdout.flush().ok();
        status_detach();
    }

    fn clear_output(&self) {
        if !self.clear {
            return;
        }
        let mut stdout = stdout().lock();
        execute!(stdout, Clear(ClearType::All), cursor::MoveTo(0, 0)).ok();
        status_detach();
    }
}
