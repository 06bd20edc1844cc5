//! Outbound port: the external agent's inbound command queue.

use crate::domain::command::AgentCommand;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors from a single submission attempt.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// No queue space became available within the bound.
    #[error("agent command queue full")]
    QueueFull,

    /// The agent's dispatcher is gone.
    #[error("agent command channel closed")]
    ChannelClosed,
}

/// Write side of the external agent's command queue.
///
/// Implementations enqueue only; they never wait for the command to be
/// executed or acknowledged.
#[async_trait]
pub trait CommandSink: Send + Sync {
    /// Enqueue `command`, waiting up to `block_timeout` for queue space.
    async fn submit(
        &self,
        command: AgentCommand,
        block_timeout: Duration,
    ) -> Result<(), SubmitError>;
}
