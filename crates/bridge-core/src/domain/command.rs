//! Commands accepted by the external agent's inbound queue.
//!
//! Topic-string formatting and protocol encoding belong to the agent;
//! these values only carry what the correlation layer needs to route the
//! eventual callbacks back to the caller.

use crate::domain::token::ExchangeToken;
use serde::{Deserialize, Serialize};

/// One command for the agent's dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentCommand {
    /// Publish a payload to a topic.
    Publish {
        /// Correlation token echoed back by the completion callback.
        token: ExchangeToken,
        /// Destination topic.
        topic: String,
        /// Payload bytes.
        payload: Vec<u8>,
    },

    /// Subscribe to a topic filter.
    Subscribe {
        /// Correlation token echoed back by the subscribe ack.
        token: ExchangeToken,
        /// Topic filter to subscribe to.
        filter: String,
    },

    /// Remove a subscription.
    Unsubscribe {
        /// Correlation token echoed back by the unsubscribe ack.
        token: ExchangeToken,
        /// Topic filter to remove.
        filter: String,
    },
}

impl AgentCommand {
    /// The correlation token this command carries.
    #[must_use]
    pub fn token(&self) -> ExchangeToken {
        match self {
            Self::Publish { token, .. }
            | Self::Subscribe { token, .. }
            | Self::Unsubscribe { token, .. } => *token,
        }
    }

    /// Short operation name for logging.
    #[must_use]
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Publish { .. } => "publish",
            Self::Subscribe { .. } => "subscribe",
            Self::Unsubscribe { .. } => "unsubscribe",
        }
    }
}
