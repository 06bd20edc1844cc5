//! Spawn-and-join worker abstraction.
//!
//! Wraps task spawning with a deterministic join: the worker signals
//! completion as its last act, and the spawner waits on that signal with a
//! bound. A join that times out leaves the handle intact, so the spawner
//! can try again once the worker has had more time — the worker's state is
//! never reclaimed while it may still be running.

use crate::domain::error::BridgeError;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Errors from [`WorkerHandle::join`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum JoinError {
    /// The worker did not signal completion within the bound.
    /// The handle stays joinable.
    #[error("worker did not finish within {timeout_ms} ms")]
    Timeout {
        /// The bound that expired.
        timeout_ms: u64,
    },

    /// The worker's completion was already consumed by an earlier join.
    #[error("worker already joined")]
    AlreadyJoined,

    /// The worker exited without signalling (it panicked or was aborted).
    #[error("worker terminated abnormally")]
    WorkerPanicked,
}

/// Handle to a spawned worker, joinable exactly once.
#[derive(Debug)]
pub struct WorkerHandle {
    label: String,
    done_rx: Option<oneshot::Receiver<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Start `work` on a new execution context immediately.
    ///
    /// Fails with [`BridgeError::ResourceExhausted`] when no runtime is
    /// available to host the worker. `label` only feeds logging.
    pub fn spawn<F>(label: &str, work: F) -> Result<Self, BridgeError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| BridgeError::ResourceExhausted(e.to_string()))?;

        let (done_tx, done_rx) = oneshot::channel();
        let task_label = label.to_string();
        let task = runtime.spawn(async move {
            work.await;
            // Completion is signalled before the task exits; a dropped
            // receiver just means nobody is waiting.
            if done_tx.send(()).is_err() {
                debug!(worker = %task_label, "Worker finished with no joiner");
            }
        });

        debug!(worker = label, "Spawned worker");
        Ok(Self {
            label: label.to_string(),
            done_rx: Some(done_rx),
            task: Some(task),
        })
    }

    /// Wait for the worker to signal completion.
    ///
    /// On success the worker's resources are released as part of this
    /// call and further joins return [`JoinError::AlreadyJoined`]. On
    /// timeout nothing is released and join may be called again.
    pub async fn join(&mut self, timeout: Duration) -> Result<(), JoinError> {
        let Some(done_rx) = self.done_rx.as_mut() else {
            return Err(JoinError::AlreadyJoined);
        };

        match tokio::time::timeout(timeout, done_rx).await {
            Err(_elapsed) => {
                warn!(
                    worker = %self.label,
                    timeout_ms = timeout.as_millis() as u64,
                    "Worker not finished within join timeout"
                );
                Err(JoinError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
            Ok(Ok(())) => {
                self.release();
                debug!(worker = %self.label, "Worker joined");
                Ok(())
            }
            Ok(Err(_closed)) => {
                // The sender was dropped without signalling.
                self.release();
                warn!(worker = %self.label, "Worker terminated abnormally");
                Err(JoinError::WorkerPanicked)
            }
        }
    }

    /// Whether this handle can still be joined.
    #[must_use]
    pub fn is_joinable(&self) -> bool {
        self.done_rx.is_some()
    }

    /// The label given at spawn time.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Stop the worker without waiting for it.
    ///
    /// After aborting, a join reports [`JoinError::WorkerPanicked`] unless
    /// the worker had already signalled completion.
    pub fn abort(&self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }

    fn release(&mut self) {
        self.done_rx = None;
        self.task = None;
    }
}
