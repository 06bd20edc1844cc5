//! Exchange tokens for request/response correlation.
//!
//! A token identifies one in-flight exchange. The wire value `0` is the
//! reserved "no exchange" sentinel and is unrepresentable in
//! [`ExchangeToken`] itself.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

/// Correlation token for one in-flight exchange.
///
/// Uniqueness is only required among exchanges concurrently in flight;
/// values may be reused once an exchange reaches a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExchangeToken(NonZeroU64);

impl ExchangeToken {
    /// Wire value reserved for "no exchange outstanding".
    pub const SENTINEL: u64 = 0;

    /// Parse a raw wire value.
    ///
    /// Returns `None` for the sentinel, which callers treat as a stale or
    /// foreign event rather than an error.
    #[must_use]
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// The raw wire value.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for ExchangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ExchangeToken> for u64 {
    fn from(token: ExchangeToken) -> Self {
        token.as_u64()
    }
}

/// Monotonic token source shared by all callers of one agent connection.
///
/// Mirrors the shared message-id counter of the original agent clients:
/// every request draws the next value under the same sequence so acks can
/// be matched to the request that produced them.
#[derive(Debug)]
pub struct TokenSequence {
    next: AtomicU64,
}

impl TokenSequence {
    /// Create a sequence starting just above the sentinel.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Draw the next token. Skips the sentinel on wraparound.
    pub fn next(&self) -> ExchangeToken {
        loop {
            let raw = self.next.fetch_add(1, Ordering::Relaxed);
            if let Some(token) = ExchangeToken::from_raw(raw) {
                return token;
            }
        }
    }
}

impl Default for TokenSequence {
    fn default() -> Self {
        Self::new()
    }
}
