//! External command execution utilities.
//!
//! Provides a Builder-based API for running toolchain processes with both
//! output streams captured into one buffer.
//!
//! # Examples
//!
//! ```ignore
//! use crate::utils::exec::Cmd;
//!
//! let captured = Cmd::new("rustc")
//!     .args(["--crate-type", "cdylib", "root.rs"])
//!     .cwd(instance_dir)
//!     .run_captured()?;
//!
//! if !captured.success() {
//!     eprintln!("{}", captured.output);
//! }
//! ```

use anyhow::{Context, Result};
use crossbeam::channel;
use std::{
    ffi::{OsStr, OsString},
    io::{BufRead, BufReader, Read},
    path::{Path, PathBuf},
    process::{Command, ExitStatus, Stdio},
    thread,
};

// ============================================================================
// Builder API
// ============================================================================

/// Command builder for external process execution.
#[derive(Debug, Default, Clone)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
}

/// Result of [`Cmd::run_captured`].
#[derive(Debug)]
pub struct Captured {
    pub status: ExitStatus,
    /// stdout and stderr lines, interleaved in the order they were read.
    pub output: String,
}

impl Captured {
    #[inline]
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

impl Cmd {
    /// Create a new command builder.
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            ..Default::default()
        }
    }

    /// Add a single argument.
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        let arg = arg.as_ref();
        if !arg.is_empty() {
            self.args.push(arg.to_owned());
        }
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            let arg = arg.as_ref();
            if !arg.is_empty() {
                self.args.push(arg.to_owned());
            }
        }
        self
    }

    /// Set working directory.
    pub fn cwd<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    /// Command line as a single string, for error messages.
    pub fn command_line(&self) -> String {
        let mut line = self.program.to_string_lossy().into_owned();
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            line.push(' ');
            if arg.contains(' ') {
                line.push('"');
                line.push_str(&arg);
                line.push('"');
            } else {
                line.push_str(&arg);
            }
        }
        line
    }

    /// Execute the command, capturing stdout and stderr into one buffer.
    ///
    /// Both pipes are read on their own threads and drained to EOF before
    /// the exit status is collected; a child blocked on a full pipe would
    /// otherwise never exit.
    pub fn run_captured(self) -> Result<Captured> {
        let name = self.program.to_string_lossy().into_owned();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn `{name}`"))?;

        let (tx, rx) = channel::unbounded::<String>();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_line_reader(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_line_reader(stderr, tx.clone()));
        }
        drop(tx);

        // Ends once both readers hit EOF and drop their senders.
        let mut output = String::new();
        for line in rx {
            output.push_str(&line);
            output.push('\n');
        }

        for reader in readers {
            reader
                .join()
                .map_err(|_| anyhow::anyhow!("Output reader for `{name}` panicked"))?;
        }

        let status = child
            .wait()
            .with_context(|| format!("Failed to wait for `{name}`"))?;

        Ok(Captured { status, output })
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn spawn_line_reader<R>(pipe: R, tx: channel::Sender<String>) -> thread::JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(['\r', '\n']).to_string();
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

// ============================================================================
// Tests
// ============================================================================
