//! Single-flight background worker
//!
//! Runs one job at a time on a dedicated thread and streams progress back to
//! the front-end over an `mpsc` channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use thiserror::Error;
use tracing::debug;

/// Progress of one job, in order: `Started`, any number of `Status`, `Finished`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    Started,
    Status(String),
    /// `Ok` carries a success message, `Err` a one-line failure
    Finished(Result<String, String>),
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("another operation is already running")]
    Busy,

    #[error("failed to start worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Handle a job uses to emit status lines
#[derive(Debug, Clone)]
pub struct StatusReporter {
    tx: Sender<WorkerEvent>,
}

impl StatusReporter {
    pub fn report(&self, line: &str) {
        // Receiver gone means nobody is listening any more
        let _ = self.tx.send(WorkerEvent::Status(line.to_string()));
    }
}

/// Clears the busy flag when the job ends, including by panic
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
pub struct Worker {
    busy: Arc<AtomicBool>,
}

impl Worker {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Start `job` on a new thread unless one is already in flight.
    ///
    /// The busy flag is cleared before `Finished` is sent, so a caller that
    /// has seen `Finished` may spawn again immediately.
    pub fn spawn<F>(&self, job: F) -> Result<Receiver<WorkerEvent>, WorkerError>
    where
        F: FnOnce(&StatusReporter) -> Result<String, String> + Send + 'static,
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(WorkerError::Busy);
        }

        let (tx, rx) = mpsc::channel();
        let guard = BusyGuard(Arc::clone(&self.busy));

        thread::Builder::new()
            .name("watermark-worker".to_string())
            .spawn(move || {
                let _ = tx.send(WorkerEvent::Started);
                let reporter = StatusReporter { tx: tx.clone() };

                let result = job(&reporter);
                debug!(ok = result.is_ok(), "Worker job finished");

                drop(guard);
                let _ = tx.send(WorkerEvent::Finished(result));
            })
            .map_err(WorkerError::Spawn)?;

        Ok(rx)
    }
}
