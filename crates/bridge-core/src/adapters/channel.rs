//! Channel-backed implementation of the agent's command queue.

use crate::domain::command::AgentCommand;
use crate::ports::outbound::{CommandSink, SubmitError};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;

/// Bounded `mpsc` sender exposed as a [`CommandSink`].
///
/// The channel's capacity models the agent's inbound queue depth; a full
/// channel is backpressure, not failure.
pub struct ChannelCommandSink {
    sender: mpsc::Sender<AgentCommand>,
}

impl ChannelCommandSink {
    /// Create the sink and the receiving end the agent drains.
    #[must_use]
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<AgentCommand>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl CommandSink for ChannelCommandSink {
    async fn submit(
        &self,
        command: AgentCommand,
        block_timeout: Duration,
    ) -> Result<(), SubmitError> {
        match self.sender.send_timeout(command, block_timeout).await {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => Err(SubmitError::QueueFull),
            Err(SendTimeoutError::Closed(_)) => Err(SubmitError::ChannelClosed),
        }
    }
}
