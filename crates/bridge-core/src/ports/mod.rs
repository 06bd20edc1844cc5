//! Port traits decoupling the bridge from the external agent.

pub mod outbound;

pub use outbound::{CommandSink, SubmitError};
