//! Exchange lifecycle types.
//!
//! One exchange is a request submitted to the agent paired with the
//! response that eventually resolves it:
//!
//! ```text
//! Idle -> Registered -> Submitted -> {Succeeded, Failed, TimedOut}
//! ```
//!
//! After `TimedOut` the exchange enters a foreign-completion window: a late
//! callback may still arrive and resolves nothing, because the correlator
//! entry was removed when the caller gave up.

use crate::domain::token::ExchangeToken;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result reported by the agent's completion callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExchangeOutcome {
    /// The agent acknowledged the command.
    Succeeded,
    /// The agent reported a protocol or transport failure.
    Failed {
        /// Agent-defined status code.
        code: i32,
    },
}

/// Terminal state of one exchange as observed by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExchangeStatus {
    /// Registered or submitted, no terminal event yet.
    Pending,
    /// Completed successfully.
    Succeeded,
    /// Completed with an agent failure code.
    Failed {
        /// Agent-defined status code.
        code: i32,
    },
    /// The caller's wait expired before any completion arrived.
    TimedOut,
}

impl From<ExchangeOutcome> for ExchangeStatus {
    fn from(outcome: ExchangeOutcome) -> Self {
        match outcome {
            ExchangeOutcome::Succeeded => Self::Succeeded,
            ExchangeOutcome::Failed { code } => Self::Failed { code },
        }
    }
}

impl ExchangeStatus {
    /// Whether the exchange left `Pending`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// A resolved exchange handed back to the caller.
#[derive(Debug, Clone)]
pub struct CompletedExchange {
    /// Token that identified the exchange.
    pub token: ExchangeToken,
    /// Terminal status.
    pub status: ExchangeStatus,
    /// Bytes the callback delivered into the destination buffer, if any.
    pub payload: Vec<u8>,
    /// Time between submission and resolution.
    pub elapsed: Duration,
}
