//! # AgentBridge Test Suite
//!
//! Unified test crate containing:
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── exchange_flows.rs   # End-to-end request/response scenarios
//!     └── fault_paths.rs      # Timeouts, foreign tokens, backpressure
//! ```
//!
//! Component-level unit tests live next to each module inside
//! `bridge-core`; this crate exercises the assembled bridge the way the
//! demo runtime does.

pub mod integration;
