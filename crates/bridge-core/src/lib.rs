//! # Bridge Core - Synchronous Facade over an Async Messaging Agent
//!
//! Lets blocking-style task code drive an asynchronous, callback-based
//! messaging agent: submit a request, hand control to the agent's
//! dispatcher, and resume only when the matching completion fires or a
//! timeout elapses.
//!
//! ## Control Flow
//!
//! ```text
//! ┌──────────────┐ register   ┌──────────────┐  resolve/complete
//! │ Caller task  │ ─────────→ │  Correlator  │ ←──────────────────┐
//! │              │            └──────────────┘                    │
//! │              │ submit     ┌──────────────┐    callbacks  ┌────┴─────┐
//! │              │ ─────────→ │ Command queue│ ────────────→ │  Agent   │
//! │              │            └──────────────┘               │ (extern) │
//! │   (waits)    │                                           └────┬─────┘
//! └──────────────┘ ←───────────────── wake ──────────────────────┘
//! ```
//!
//! The caller registers a waiter and a fixed-capacity destination buffer
//! with the correlator, submits a token-carrying command (retrying while
//! the agent's queue is full), then blocks with a timeout. The agent's
//! callbacks run on its own execution context: they look up the
//! correlator, copy payload bytes into the registered buffer, and wake
//! the waiter exactly once. Stale or foreign events resolve nothing.
//!
//! ## Correlation Disciplines
//!
//! - **Token table** ([`ExchangeCorrelator`]): one entry per in-flight
//!   exchange, keyed by a non-sentinel integer token.
//! - **Per-topic** ([`SubscriptionRegistry`]): incoming publishes keyed by
//!   the subscribed topic filter, fanned out to every live subscription.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod adapters;
pub mod buffer;
pub mod client;
pub mod correlator;
pub mod domain;
pub mod ports;
pub mod readiness;
pub mod submitter;
pub mod subscriptions;
pub mod waiter;
pub mod worker;

// Re-export main types
pub use adapters::{in_memory_bridge, AgentBehavior, ChannelCommandSink, InMemoryAgent};
pub use buffer::{Overflow, PayloadBuffer};
pub use client::ExchangeClient;
pub use correlator::{cleanup_task, CorrelatorStats, ExchangeCorrelator, PayloadDelivery};
pub use domain::{
    AgentCommand, BridgeConfig, BridgeError, CompletedExchange, ExchangeOutcome, ExchangeStatus,
    ExchangeToken, TokenSequence,
};
pub use ports::{CommandSink, SubmitError};
pub use readiness::{NotReady, ReadinessGate};
pub use submitter::CommandSubmitter;
pub use subscriptions::{IncomingSink, NoPublish, SubscriptionHandle, SubscriptionRegistry};
pub use waiter::{WaitExpired, Waiter, WakeHandle};
pub use worker::{JoinError, WorkerHandle};
