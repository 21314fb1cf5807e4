//! The designated execution context.
//!
//! Builds and script runs never happen on the watcher thread: every reload is
//! handed to a [`Dispatcher`] as a [`Job`], and the dispatcher decides where
//! it runs (usually the host's main or UI thread).

use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};

/// Unit of work for the designated execution context.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Hands jobs to the designated execution context.
pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, job: Job);
}

/// Runs every job immediately on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineDispatcher;

impl Dispatcher for InlineDispatcher {
    fn dispatch(&self, job: Job) {
        job();
    }
}

/// Queues jobs for whichever thread pumps the paired [`JobQueue`].
#[derive(Debug, Clone)]
pub struct ChannelDispatcher {
    tx: Sender<Job>,
}

/// Receiving side of a [`ChannelDispatcher`].
pub struct JobQueue {
    rx: Receiver<Job>,
}

impl ChannelDispatcher {
    pub fn new() -> (Self, JobQueue) {
        let (tx, rx) = channel::unbounded();
        (Self { tx }, JobQueue { rx })
    }
}

impl Dispatcher for ChannelDispatcher {
    fn dispatch(&self, job: Job) {
        if self.tx.send(job).is_err() {
            crate::debug!("dispatch"; "queue closed, job dropped");
        }
    }
}

impl JobQueue {
    /// Run queued jobs until `stop` returns true or every dispatcher is gone.
    ///
    /// `stop` is checked between jobs and at least every `poll`.
    pub fn pump_until(&self, poll: Duration, mut stop: impl FnMut() -> bool) {
        while !stop() {
            match self.rx.recv_timeout(poll) {
                Ok(job) => job(),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    /// Run every job queued right now; returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        ran
    }
}
