//! Bridge error taxonomy.
//!
//! Recoverable conditions (`QueueFull`, `Timeout`) are ordinary results
//! that callers retry or abandon. Synchronization-layer defects
//! (`Overflow`, `TokenInFlight`) are programming or configuration errors:
//! they are logged at error severity at the detection site and fail the
//! affected exchange rather than being retried.

use crate::domain::token::ExchangeToken;
use thiserror::Error;

/// Errors surfaced by the bridge to application call sites.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// A worker execution context could not be created.
    #[error("worker resources exhausted: {0}")]
    ResourceExhausted(String),

    /// The agent's command queue stayed full for the whole retry budget.
    #[error("agent command queue full after {elapsed_ms} ms of retries")]
    QueueFull {
        /// Time spent retrying before giving up.
        elapsed_ms: u64,
    },

    /// The agent's command channel is gone (agent shut down).
    #[error("agent command channel closed")]
    AgentUnavailable,

    /// The agent never became ready within the caller's bound.
    #[error("agent not ready within {timeout_ms} ms")]
    AgentNotReady {
        /// The bound that expired.
        timeout_ms: u64,
    },

    /// The caller's wait expired; the exchange was abandoned.
    #[error("exchange {token} timed out after {timeout_ms} ms")]
    Timeout {
        /// Token of the abandoned exchange.
        token: ExchangeToken,
        /// The bound that expired.
        timeout_ms: u64,
    },

    /// A payload exceeded the destination buffer fixed at registration.
    #[error("payload of {payload_len} bytes exceeds buffer capacity {capacity}")]
    Overflow {
        /// Length of the offending payload.
        payload_len: usize,
        /// Capacity negotiated at registration time.
        capacity: usize,
    },

    /// A live exchange already holds this token.
    #[error("token {0} already identifies an exchange in flight")]
    TokenInFlight(ExchangeToken),

    /// The agent acknowledged the command with a failure code.
    #[error("agent reported failure code {code}")]
    AgentFailure {
        /// Agent-defined status code.
        code: i32,
    },
}
