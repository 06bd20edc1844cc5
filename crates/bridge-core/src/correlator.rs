//! Token-keyed exchange correlator.
//!
//! Maps each outstanding request to its waiting caller. The caller context
//! registers before submitting; the agent's callback context resolves,
//! delivers, and completes. The table entry is the only shared state:
//! removing it is what makes `complete` idempotent and what turns late
//! callbacks into harmless no-ops.
//!
//! Flow:
//! 1. Caller draws a token and calls [`ExchangeCorrelator::register`],
//!    receiving a [`Waiter`].
//! 2. Caller submits the command carrying the token.
//! 3. The completion callback calls [`ExchangeCorrelator::deliver_payload`]
//!    (if the event carries bytes) and [`ExchangeCorrelator::complete`].
//! 4. Caller resumes from [`Waiter::wait`] with the outcome, or cancels
//!    the entry on timeout.

use crate::buffer::{Overflow, PayloadBuffer};
use crate::domain::error::BridgeError;
use crate::domain::exchange::ExchangeOutcome;
use crate::domain::token::ExchangeToken;
use crate::waiter::{WakeHandle, Waiter};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Counters describing correlator traffic.
#[derive(Debug, Default)]
pub struct CorrelatorStats {
    /// Exchanges registered.
    pub total_registered: AtomicU64,
    /// Exchanges completed by a matching callback.
    pub total_completed: AtomicU64,
    /// Exchanges removed by the expiry sweep.
    pub total_expired: AtomicU64,
    /// Exchanges cancelled by their caller (timeout or submit failure).
    pub total_cancelled: AtomicU64,
    /// Events ignored because their token matched nothing.
    pub total_foreign: AtomicU64,
    /// Deliveries refused because the payload exceeded the buffer.
    pub total_overflows: AtomicU64,
}

/// One registered exchange as seen from the callback context.
#[derive(Debug)]
struct RegisteredExchange {
    waker: Arc<WakeHandle>,
    buffer: PayloadBuffer,
    operation: String,
    registered_at: Instant,
    timeout: Duration,
}

/// Outcome of a payload delivery attempt from the callback context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadDelivery {
    /// The payload was copied into the registered buffer.
    Delivered,
    /// No live exchange matched the token; the event is stale or foreign.
    NoMatch,
    /// The payload exceeded the buffer; nothing was written.
    Refused(Overflow),
}

/// Lookup/dispatch structure matching incoming events to outstanding
/// exchanges.
///
/// Shared between the caller context (`register`, `cancel`) and the
/// agent's callback context (`deliver_payload`, `complete`). The map's
/// internal locks are held only for the table operation, never across a
/// wake.
pub struct ExchangeCorrelator {
    pending: DashMap<ExchangeToken, RegisteredExchange>,
    default_timeout: Duration,
    stats: Arc<CorrelatorStats>,
}

impl ExchangeCorrelator {
    /// Create a correlator whose entries expire after `default_timeout`
    /// unless registered with an explicit bound.
    #[must_use]
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            pending: DashMap::new(),
            default_timeout,
            stats: Arc::new(CorrelatorStats::default()),
        }
    }

    /// Install the lookup entry for `token` and hand back the waiter.
    ///
    /// Must be called before the corresponding command is submitted, so a
    /// response cannot arrive ahead of its entry. Registering a token that
    /// is already in flight is a caller bug and fails with
    /// [`BridgeError::TokenInFlight`].
    pub fn register(
        &self,
        token: ExchangeToken,
        operation: &str,
        buffer: PayloadBuffer,
        timeout: Option<Duration>,
    ) -> Result<Waiter, BridgeError> {
        let (wake, waiter) = Waiter::pair();
        let entry = RegisteredExchange {
            waker: Arc::new(wake),
            buffer,
            operation: operation.to_string(),
            registered_at: Instant::now(),
            timeout: timeout.unwrap_or(self.default_timeout),
        };

        // Entry API keeps the insert-or-reject decision atomic.
        match self.pending.entry(token) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                warn!(token = %token, operation, "Token already identifies a live exchange");
                Err(BridgeError::TokenInFlight(token))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(entry);
                self.stats.total_registered.fetch_add(1, Ordering::Relaxed);
                debug!(token = %token, operation, "Registered exchange");
                Ok(waiter)
            }
        }
    }

    /// Copy an event's payload into the matching exchange's buffer.
    ///
    /// Called from the callback context before [`complete`]. A sentinel or
    /// unmatched token is a stale/foreign event and a no-op. An oversized
    /// payload is refused without touching the buffer.
    ///
    /// [`complete`]: ExchangeCorrelator::complete
    pub fn deliver_payload(&self, raw_token: u64, payload: &[u8]) -> PayloadDelivery {
        let Some(token) = ExchangeToken::from_raw(raw_token) else {
            self.note_foreign(raw_token, "payload");
            return PayloadDelivery::NoMatch;
        };
        let Some(entry) = self.pending.get(&token) else {
            self.note_foreign(raw_token, "payload");
            return PayloadDelivery::NoMatch;
        };

        match entry.buffer.deliver(payload) {
            Ok(()) => PayloadDelivery::Delivered,
            Err(overflow) => {
                self.stats.total_overflows.fetch_add(1, Ordering::Relaxed);
                PayloadDelivery::Refused(overflow)
            }
        }
    }

    /// Transition the matching exchange to a terminal outcome and wake its
    /// waiter exactly once.
    ///
    /// Returns `true` if a live exchange was resolved. Removing the entry
    /// first makes this idempotent: a second completion for the same token
    /// finds no match and is ignored.
    pub fn complete(&self, raw_token: u64, outcome: ExchangeOutcome) -> bool {
        let Some(token) = ExchangeToken::from_raw(raw_token) else {
            self.note_foreign(raw_token, "completion");
            return false;
        };
        let Some((_, entry)) = self.pending.remove(&token) else {
            self.note_foreign(raw_token, "completion");
            return false;
        };

        let woke = entry.waker.wake(outcome);
        self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
        debug!(
            token = %token,
            operation = %entry.operation,
            elapsed_ms = entry.registered_at.elapsed().as_millis() as u64,
            ?outcome,
            woke,
            "Completed exchange"
        );
        true
    }

    /// Remove an entry whose caller gave up (timeout or submit failure).
    ///
    /// Returns `true` if the entry was still live. After cancellation any
    /// late callback for the token observes "no match".
    pub fn cancel(&self, token: ExchangeToken) -> bool {
        if self.pending.remove(&token).is_some() {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            debug!(token = %token, "Cancelled exchange");
            true
        } else {
            false
        }
    }

    /// Drop entries that outlived their registration timeout.
    ///
    /// Dropping the entry drops its wake handle, which a still-waiting
    /// caller observes as expiry. Returns the number removed.
    pub fn remove_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;

        self.pending.retain(|token, entry| {
            let elapsed = now.duration_since(entry.registered_at);
            if elapsed > entry.timeout {
                warn!(
                    token = %token,
                    operation = %entry.operation,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Removing expired exchange"
                );
                self.stats.total_expired.fetch_add(1, Ordering::Relaxed);
                removed += 1;
                false
            } else {
                true
            }
        });

        removed
    }

    /// Whether `token` currently has a live entry.
    #[must_use]
    pub fn is_pending(&self, token: ExchangeToken) -> bool {
        self.pending.contains_key(&token)
    }

    /// Number of live entries.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Traffic counters.
    #[must_use]
    pub fn stats(&self) -> &CorrelatorStats {
        &self.stats
    }

    fn note_foreign(&self, raw_token: u64, kind: &str) {
        self.stats.total_foreign.fetch_add(1, Ordering::Relaxed);
        debug!(raw_token, kind, "Ignoring event for unknown or stale token");
    }
}

/// Background sweep for expired entries.
///
/// Runs until the owning task is dropped; pair it with a worker handle or
/// an aborting join handle.
pub async fn cleanup_task(correlator: Arc<ExchangeCorrelator>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let removed = correlator.remove_expired();
        if removed > 0 {
            debug!(removed, "Swept expired exchanges");
        }
    }
}
