//! Domain types for the bridge: tokens, exchange lifecycle, commands,
//! configuration, and the error taxonomy.

pub mod command;
pub mod config;
pub mod error;
pub mod exchange;
pub mod token;

pub use command::AgentCommand;
pub use config::BridgeConfig;
pub use error::BridgeError;
pub use exchange::{CompletedExchange, ExchangeOutcome, ExchangeStatus};
pub use token::{ExchangeToken, TokenSequence};
