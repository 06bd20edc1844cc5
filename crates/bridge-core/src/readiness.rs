//! Agent readiness gate.
//!
//! The agent's connection comes and goes; callers must not submit while
//! it is offline. Connect/disconnect events drive the gate, and callers
//! wait on it with a bound before submitting, resuming as soon as the
//! agent reports ready.

use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info};

/// The agent did not become ready within the caller's bound.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("agent not ready within the wait bound")]
pub struct NotReady;

/// Watch-backed ready/offline flag.
#[derive(Debug)]
pub struct ReadinessGate {
    state: watch::Sender<bool>,
}

impl ReadinessGate {
    /// Create a gate in the offline state.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self { state }
    }

    /// Mark the agent ready, releasing current and future waiters.
    pub fn set_ready(&self) {
        if !*self.state.borrow() {
            info!("Agent ready");
        }
        let _ = self.state.send(true);
    }

    /// Mark the agent offline; subsequent waits block until ready again.
    pub fn set_offline(&self) {
        if *self.state.borrow() {
            info!("Agent offline");
        }
        let _ = self.state.send(false);
    }

    /// Current state without waiting.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        *self.state.borrow()
    }

    /// Wait up to `timeout` for the agent to be ready.
    pub async fn wait_ready(&self, timeout: Duration) -> Result<(), NotReady> {
        let mut rx = self.state.subscribe();
        let wait = async move {
            while !*rx.borrow_and_update() {
                if rx.changed().await.is_err() {
                    return Err(NotReady);
                }
            }
            Ok(())
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result,
            Err(_elapsed) => {
                debug!(
                    timeout_ms = timeout.as_millis() as u64,
                    "Gave up waiting for agent readiness"
                );
                Err(NotReady)
            }
        }
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}
