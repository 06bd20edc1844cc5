//! In-memory agent for tests and demos.
//!
//! Plays the external agent's role inside the process: drains the command
//! channel on its own task, acks subscribes and unsubscribes, echoes
//! publishes back to matching subscriptions, and invokes the completion
//! path for every command — exactly the callback traffic a networked
//! agent would generate, minus the network.

use crate::adapters::channel::ChannelCommandSink;
use crate::client::ExchangeClient;
use crate::correlator::ExchangeCorrelator;
use crate::domain::command::AgentCommand;
use crate::domain::config::BridgeConfig;
use crate::domain::error::BridgeError;
use crate::domain::exchange::ExchangeOutcome;
use crate::readiness::ReadinessGate;
use crate::submitter::CommandSubmitter;
use crate::subscriptions::SubscriptionRegistry;
use crate::worker::WorkerHandle;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Failure-injection switches for exercising unhappy paths.
#[derive(Debug, Clone, Default)]
pub struct AgentBehavior {
    /// Delay before each command is handled.
    pub ack_delay: Duration,
    /// Ack every subscribe with this failure code instead of success.
    pub fail_subscribes_with: Option<i32>,
    /// Never invoke completion callbacks; callers run into their timeout.
    pub drop_completions: bool,
    /// Echo publishes under this token instead of the command's own,
    /// producing foreign completions.
    pub misroute_completions_to: Option<u64>,
}

/// The agent side of an in-process bridge.
pub struct InMemoryAgent {
    correlator: Arc<ExchangeCorrelator>,
    subscriptions: Arc<SubscriptionRegistry>,
    behavior: AgentBehavior,
}

impl InMemoryAgent {
    /// Start the agent's dispatcher on its own worker.
    ///
    /// Marks `readiness` ready once the dispatcher is running, mirroring
    /// a transport's connected event.
    pub fn spawn(
        mut commands: mpsc::Receiver<AgentCommand>,
        correlator: Arc<ExchangeCorrelator>,
        subscriptions: Arc<SubscriptionRegistry>,
        readiness: Arc<ReadinessGate>,
        behavior: AgentBehavior,
    ) -> Result<WorkerHandle, BridgeError> {
        let agent = Self {
            correlator,
            subscriptions,
            behavior,
        };

        WorkerHandle::spawn("in-memory-agent", async move {
            readiness.set_ready();
            while let Some(command) = commands.recv().await {
                agent.handle(command).await;
            }
            readiness.set_offline();
            debug!("In-memory agent drained its command channel");
        })
    }

    async fn handle(&self, command: AgentCommand) {
        if !self.behavior.ack_delay.is_zero() {
            tokio::time::sleep(self.behavior.ack_delay).await;
        }

        let raw_token = self
            .behavior
            .misroute_completions_to
            .unwrap_or_else(|| command.token().as_u64());

        match command {
            AgentCommand::Publish { topic, payload, .. } => {
                // Broker loopback: subscribers to the topic see the bytes,
                // then the publisher's completion fires.
                let delivered = self.subscriptions.dispatch(&topic, &payload);
                debug!(topic = %topic, delivered, "Echoed publish");
                self.complete(raw_token, ExchangeOutcome::Succeeded, Some(&payload));
            }
            AgentCommand::Subscribe { filter, .. } => {
                let outcome = match self.behavior.fail_subscribes_with {
                    Some(code) => ExchangeOutcome::Failed { code },
                    None => ExchangeOutcome::Succeeded,
                };
                debug!(filter = %filter, ?outcome, "Acked subscribe");
                self.complete(raw_token, outcome, None);
            }
            AgentCommand::Unsubscribe { filter, .. } => {
                debug!(filter = %filter, "Acked unsubscribe");
                self.complete(raw_token, ExchangeOutcome::Succeeded, None);
            }
        }
    }

    fn complete(&self, raw_token: u64, outcome: ExchangeOutcome, payload: Option<&[u8]>) {
        if self.behavior.drop_completions {
            return;
        }
        if let Some(payload) = payload {
            self.correlator.deliver_payload(raw_token, payload);
        }
        self.correlator.complete(raw_token, outcome);
    }
}

/// Wire a complete in-process bridge: client on one side, in-memory agent
/// on the other.
///
/// Returns the client and the agent's worker handle; dropping the client
/// closes the command channel, after which the agent drains and exits.
pub fn in_memory_bridge(
    config: BridgeConfig,
    behavior: AgentBehavior,
) -> Result<(ExchangeClient, WorkerHandle), BridgeError> {
    let correlator = Arc::new(ExchangeCorrelator::new(config.exchange_timeout));
    let subscriptions = Arc::new(SubscriptionRegistry::new());
    let readiness = Arc::new(ReadinessGate::new());

    let (sink, commands) = ChannelCommandSink::bounded(config.command_queue_capacity);
    let submitter = CommandSubmitter::new(
        Arc::new(sink),
        config.submit_block_timeout,
        config.submit_retry_budget,
    );

    let agent = InMemoryAgent::spawn(
        commands,
        Arc::clone(&correlator),
        Arc::clone(&subscriptions),
        Arc::clone(&readiness),
        behavior,
    )?;

    let client = ExchangeClient::new(correlator, subscriptions, submitter, readiness, config);
    Ok((client, agent))
}
