//! Bounded payload transfer from callback context to caller.
//!
//! A [`PayloadBuffer`]'s capacity is fixed when the caller registers the
//! exchange and doubles as the negotiated maximum message size. Delivery
//! copies the payload only if it fits; an oversized payload fails loudly
//! and leaves the buffer untouched, since truncation would corrupt
//! correctness checks downstream.
//!
//! The buffer is shared (`Arc`) between the owning caller and the
//! correlator's table entry, so it outlives every callback that may write
//! to it regardless of how the exchange ends. The state machine keeps the
//! two sides from touching it concurrently: the callback writes only
//! before the terminal transition, the caller reads only after it. The
//! short-held lock is insurance for the foreign-completion window, not a
//! synchronization point callbacks may block on.

use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

/// A payload did not fit the destination buffer.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("payload of {payload_len} bytes exceeds buffer capacity {capacity}")]
pub struct Overflow {
    /// Length of the offending payload.
    pub payload_len: usize,
    /// Fixed capacity of the destination buffer.
    pub capacity: usize,
}

#[derive(Debug)]
struct BufferInner {
    bytes: Box<[u8]>,
    len: usize,
}

/// Caller-owned destination buffer with capacity fixed at creation.
#[derive(Debug, Clone)]
pub struct PayloadBuffer {
    inner: Arc<Mutex<BufferInner>>,
    capacity: usize,
}

impl PayloadBuffer {
    /// Allocate an empty buffer of the given fixed capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BufferInner {
                bytes: vec![0u8; capacity].into_boxed_slice(),
                len: 0,
            })),
            capacity,
        }
    }

    /// The fixed capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of bytes delivered so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len
    }

    /// Whether nothing has been delivered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy `payload` into the buffer, replacing previous contents.
    ///
    /// Fails with [`Overflow`] without modifying the buffer if the payload
    /// exceeds the capacity. An overflow indicates a protocol or
    /// configuration defect, never a recoverable runtime condition.
    pub fn deliver(&self, payload: &[u8]) -> Result<(), Overflow> {
        if payload.len() > self.capacity {
            error!(
                payload_len = payload.len(),
                capacity = self.capacity,
                "Payload exceeds destination buffer, refusing to truncate"
            );
            return Err(Overflow {
                payload_len: payload.len(),
                capacity: self.capacity,
            });
        }

        let mut inner = self.inner.lock();
        inner.bytes[..payload.len()].copy_from_slice(payload);
        inner.len = payload.len();
        Ok(())
    }

    /// Copy out the delivered bytes.
    #[must_use]
    pub fn snapshot(&self) -> Vec<u8> {
        let inner = self.inner.lock();
        inner.bytes[..inner.len].to_vec()
    }

    /// Discard delivered bytes, keeping the allocation.
    pub fn clear(&self) {
        self.inner.lock().len = 0;
    }
}
