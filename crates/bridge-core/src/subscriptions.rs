//! Per-topic subscription registry.
//!
//! The second correlation discipline: incoming publishes are keyed by the
//! subscribed topic filter rather than a numeric token. Each subscription
//! owns a fixed-capacity buffer and a re-armable signal; a delivered
//! publish overwrites the buffer (latest publish wins) and wakes the
//! current waiter.
//!
//! Entries are added after the broker acknowledges the subscribe and
//! removed on unsubscribe — or when the [`SubscriptionHandle`] is dropped,
//! so an abandoned subscriber cannot grow the registry for the life of
//! the process.

use crate::buffer::{Overflow, PayloadBuffer};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::{debug, warn};

/// No publish arrived within the subscriber's bound.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("no publish arrived within the wait bound")]
pub struct NoPublish;

/// Receiving side of one subscription.
///
/// Shared between the registry entry (written by the callback context)
/// and the subscribing caller (read after each wake).
#[derive(Debug, Clone)]
pub struct IncomingSink {
    buffer: PayloadBuffer,
    signal: Arc<Notify>,
}

impl IncomingSink {
    /// Create a sink whose buffer capacity bounds accepted payloads.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: PayloadBuffer::with_capacity(capacity),
            signal: Arc::new(Notify::new()),
        }
    }

    /// Copy a publish into the buffer and wake the waiting subscriber.
    ///
    /// Runs in the callback context; an oversized payload is refused
    /// without waking anyone.
    fn deliver(&self, payload: &[u8]) -> Result<(), Overflow> {
        self.buffer.deliver(payload)?;
        self.signal.notify_one();
        Ok(())
    }

    /// Wait up to `timeout` for the next publish and copy it out.
    ///
    /// A publish that arrived since the previous call is returned
    /// immediately (the wake is stored, not lost). Consecutive publishes
    /// between waits overwrite one another; only the latest is observed.
    pub async fn next_publish(&self, timeout: Duration) -> Result<Vec<u8>, NoPublish> {
        match tokio::time::timeout(timeout, self.signal.notified()).await {
            Ok(()) => Ok(self.buffer.snapshot()),
            Err(_elapsed) => Err(NoPublish),
        }
    }

    /// Capacity negotiated at creation.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }
}

#[derive(Debug)]
struct SubscriptionEntry {
    id: u64,
    sink: IncomingSink,
}

type EntryMap = Arc<DashMap<String, Vec<SubscriptionEntry>>>;

/// Registry mapping topic filters to subscriber sinks.
///
/// Mutated by the caller context (add/remove) and read by the callback
/// context (dispatch); the map's sharded locks are held only for the
/// table operation.
pub struct SubscriptionRegistry {
    entries: EntryMap,
    next_id: AtomicU64,
    unsolicited: AtomicU64,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(1),
            unsolicited: AtomicU64::new(0),
        }
    }

    /// Register `sink` for `filter` after a successful subscribe ack.
    ///
    /// Several subscribers may share one filter; each delivery fans out
    /// to all of them. The returned handle removes the entry when dropped.
    #[must_use]
    pub fn add(&self, filter: &str, sink: IncomingSink) -> SubscriptionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries
            .entry(filter.to_string())
            .or_default()
            .push(SubscriptionEntry {
                id,
                sink: sink.clone(),
            });

        debug!(filter, id, "Subscription registered");
        SubscriptionHandle {
            entries: Arc::clone(&self.entries),
            filter: filter.to_string(),
            id,
            sink,
        }
    }

    /// Fan an incoming publish out to every sink registered for `topic`.
    ///
    /// Called from the callback context. Returns the number of sinks that
    /// accepted the payload. A publish matching no entry is unsolicited:
    /// logged and counted, never an error.
    pub fn dispatch(&self, topic: &str, payload: &[u8]) -> usize {
        let Some(entries) = self.entries.get(topic) else {
            self.unsolicited.fetch_add(1, Ordering::Relaxed);
            warn!(topic, "Received an unsolicited publish");
            return 0;
        };

        let mut delivered = 0;
        for entry in entries.iter() {
            match entry.sink.deliver(payload) {
                Ok(()) => delivered += 1,
                Err(overflow) => {
                    warn!(
                        topic,
                        id = entry.id,
                        payload_len = overflow.payload_len,
                        capacity = overflow.capacity,
                        "Dropping publish that exceeds a subscriber's buffer"
                    );
                }
            }
        }
        delivered
    }

    /// Number of filters with at least one live subscription.
    #[must_use]
    pub fn filter_count(&self) -> usize {
        self.entries.len()
    }

    /// Publishes that matched no subscription.
    #[must_use]
    pub fn unsolicited_count(&self) -> u64 {
        self.unsolicited.load(Ordering::Relaxed)
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Owned handle to one registered subscription.
///
/// Dropping the handle removes the registry entry.
#[derive(Debug)]
pub struct SubscriptionHandle {
    entries: EntryMap,
    filter: String,
    id: u64,
    sink: IncomingSink,
}

impl SubscriptionHandle {
    /// The topic filter this subscription covers.
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// The receiving sink, for waiting on publishes.
    #[must_use]
    pub fn sink(&self) -> &IncomingSink {
        &self.sink
    }

    /// Wait up to `timeout` for the next publish on this subscription.
    pub async fn next_publish(&self, timeout: Duration) -> Result<Vec<u8>, NoPublish> {
        self.sink.next_publish(timeout).await
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        let Some(mut entries) = self.entries.get_mut(&self.filter) else {
            return;
        };
        entries.retain(|entry| entry.id != self.id);
        let now_empty = entries.is_empty();
        drop(entries);

        if now_empty {
            self.entries
                .remove_if(&self.filter, |_, entries| entries.is_empty());
        }
        debug!(filter = %self.filter, id = self.id, "Subscription removed");
    }
}
