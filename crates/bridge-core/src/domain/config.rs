//! Bridge tunables.

use std::time::Duration;

/// Default capacity of the agent's inbound command channel.
pub const DEFAULT_COMMAND_QUEUE_CAPACITY: usize = 64;

/// Default per-attempt bound on waiting for command queue space.
pub const DEFAULT_SUBMIT_BLOCK_TIMEOUT: Duration = Duration::from_millis(500);

/// Default total budget for re-attempting a submission while the queue
/// stays full.
pub const DEFAULT_SUBMIT_RETRY_BUDGET: Duration = Duration::from_secs(5);

/// Default bound on waiting for an exchange to complete.
pub const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound on waiting for the agent to become ready.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Default destination buffer capacity, which doubles as the negotiated
/// maximum payload size.
pub const DEFAULT_MAX_PAYLOAD: usize = 1024;

/// Default interval for sweeping expired correlator entries.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(5);

/// Tunables shared by one bridge instance.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Capacity of the agent's inbound command channel.
    pub command_queue_capacity: usize,
    /// Per-attempt bound on waiting for queue space.
    pub submit_block_timeout: Duration,
    /// Total budget for submission retries.
    pub submit_retry_budget: Duration,
    /// Bound on waiting for an exchange to complete.
    pub exchange_timeout: Duration,
    /// Bound on waiting for agent readiness before submitting.
    pub ready_timeout: Duration,
    /// Destination buffer capacity for exchanges and subscriptions.
    pub max_payload: usize,
    /// Interval for the correlator's expiry sweep.
    pub cleanup_interval: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            command_queue_capacity: DEFAULT_COMMAND_QUEUE_CAPACITY,
            submit_block_timeout: DEFAULT_SUBMIT_BLOCK_TIMEOUT,
            submit_retry_budget: DEFAULT_SUBMIT_RETRY_BUDGET,
            exchange_timeout: DEFAULT_EXCHANGE_TIMEOUT,
            ready_timeout: DEFAULT_READY_TIMEOUT,
            max_payload: DEFAULT_MAX_PAYLOAD,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }
}
