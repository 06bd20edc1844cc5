//! Bounded-retry command submission.
//!
//! A momentarily full queue is expected while the agent drains at its own
//! rate. Each attempt waits a bounded time for space; the retry loop is
//! bounded by a total elapsed budget so a wedged agent cannot hang the
//! caller. Retrying constructs a fresh command value per attempt, keeping
//! submission idempotent at the command level.

use crate::domain::command::AgentCommand;
use crate::domain::error::BridgeError;
use crate::ports::outbound::{CommandSink, SubmitError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Submits commands to the agent's inbound queue with backpressure retry.
#[derive(Clone)]
pub struct CommandSubmitter {
    sink: Arc<dyn CommandSink>,
    block_timeout: Duration,
    retry_budget: Duration,
}

impl CommandSubmitter {
    /// Create a submitter over `sink`.
    ///
    /// `block_timeout` bounds each attempt's wait for queue space;
    /// `retry_budget` bounds the total time spent retrying.
    pub fn new(sink: Arc<dyn CommandSink>, block_timeout: Duration, retry_budget: Duration) -> Self {
        Self {
            sink,
            block_timeout,
            retry_budget,
        }
    }

    /// One bounded enqueue attempt.
    pub async fn submit_once(&self, command: AgentCommand) -> Result<(), SubmitError> {
        self.sink.submit(command, self.block_timeout).await
    }

    /// Enqueue a command, retrying while the queue reports full.
    ///
    /// `make_command` is invoked once per attempt so every submission is a
    /// fresh command value. There is no backoff between attempts; each
    /// attempt already blocks up to the per-attempt bound. Gives up with
    /// [`BridgeError::QueueFull`] once the budget is exhausted.
    pub async fn submit_with_retry<F>(&self, make_command: F) -> Result<(), BridgeError>
    where
        F: Fn() -> AgentCommand + Send + Sync,
    {
        let started = Instant::now();
        let mut attempts = 0u32;

        loop {
            let command = make_command();
            let operation = command.operation();
            let token = command.token();
            attempts += 1;

            match self.sink.submit(command, self.block_timeout).await {
                Ok(()) => {
                    debug!(token = %token, operation, attempts, "Command submitted");
                    return Ok(());
                }
                Err(SubmitError::ChannelClosed) => {
                    warn!(token = %token, operation, "Agent command channel closed");
                    return Err(BridgeError::AgentUnavailable);
                }
                Err(SubmitError::QueueFull) => {
                    let elapsed = started.elapsed();
                    if elapsed >= self.retry_budget {
                        warn!(
                            token = %token,
                            operation,
                            attempts,
                            elapsed_ms = elapsed.as_millis() as u64,
                            "Giving up on full command queue"
                        );
                        return Err(BridgeError::QueueFull {
                            elapsed_ms: elapsed.as_millis() as u64,
                        });
                    }
                    debug!(token = %token, operation, attempts, "Command queue full, retrying");
                }
            }
        }
    }
}
