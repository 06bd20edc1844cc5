//! Adapters connecting the bridge to an agent implementation.

pub mod channel;
pub mod memory;

pub use channel::ChannelCommandSink;
pub use memory::{in_memory_bridge, AgentBehavior, InMemoryAgent};
