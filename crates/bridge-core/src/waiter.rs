//! One-shot blocking-wait primitive.
//!
//! Each correlated request owns a [`Waiter`]; the matching callback holds
//! the paired [`WakeHandle`] through the correlator's table. The wake side
//! is idempotent: the first wake wins, later wakes are no-ops.

use crate::domain::exchange::ExchangeOutcome;
use parking_lot::Mutex;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;

/// The caller's wait expired before a wake arrived.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("wait expired before a wake arrived")]
pub struct WaitExpired;

/// Wake side of a waiter pair. Shared with the callback context.
#[derive(Debug)]
pub struct WakeHandle {
    sender: Mutex<Option<oneshot::Sender<ExchangeOutcome>>>,
}

impl WakeHandle {
    /// Wake the paired waiter with a terminal outcome.
    ///
    /// Returns `true` if this call performed the wake, `false` if the
    /// waiter was already woken or has gone away. The lock is held only
    /// to take the sender, never across the send.
    pub fn wake(&self, outcome: ExchangeOutcome) -> bool {
        let sender = self.sender.lock().take();
        match sender {
            Some(tx) => tx.send(outcome).is_ok(),
            None => false,
        }
    }

    /// Whether a wake has already been delivered or is no longer possible.
    #[must_use]
    pub fn is_spent(&self) -> bool {
        self.sender.lock().is_none()
    }
}

/// Blocking side of a waiter pair. Consumed by the single bounded wait.
#[derive(Debug)]
pub struct Waiter {
    receiver: oneshot::Receiver<ExchangeOutcome>,
}

impl Waiter {
    /// Create a connected waiter/wake pair.
    #[must_use]
    pub fn pair() -> (WakeHandle, Waiter) {
        let (tx, rx) = oneshot::channel();
        (
            WakeHandle {
                sender: Mutex::new(Some(tx)),
            },
            Waiter { receiver: rx },
        )
    }

    /// Suspend the calling task until woken or `timeout` elapses.
    ///
    /// A wake handle dropped without ever waking (an expired correlator
    /// entry) is observed as expiry, not as a distinct condition.
    pub async fn wait(self, timeout: Duration) -> Result<ExchangeOutcome, WaitExpired> {
        match tokio::time::timeout(timeout, self.receiver).await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(_)) | Err(_) => Err(WaitExpired),
        }
    }
}
