//! Blocking-style request API over the asynchronous agent.
//!
//! One correlated request walks the exchange state machine end to end:
//!
//! ```text
//! Idle -> Registered -> Submitted -> {Succeeded, Failed, TimedOut}
//! ```
//!
//! Register happens before submit so a response can never arrive ahead of
//! its correlator entry; a timed-out exchange is cancelled before the
//! caller returns, so any late completion resolves nothing.

use crate::buffer::PayloadBuffer;
use crate::correlator::ExchangeCorrelator;
use crate::domain::command::AgentCommand;
use crate::domain::config::BridgeConfig;
use crate::domain::error::BridgeError;
use crate::domain::exchange::{CompletedExchange, ExchangeStatus};
use crate::domain::token::{ExchangeToken, TokenSequence};
use crate::readiness::ReadinessGate;
use crate::submitter::CommandSubmitter;
use crate::subscriptions::{IncomingSink, SubscriptionHandle, SubscriptionRegistry};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Application-facing handle for driving the agent synchronously.
#[derive(Clone)]
pub struct ExchangeClient {
    correlator: Arc<ExchangeCorrelator>,
    subscriptions: Arc<SubscriptionRegistry>,
    submitter: CommandSubmitter,
    readiness: Arc<ReadinessGate>,
    tokens: Arc<TokenSequence>,
    config: BridgeConfig,
}

impl ExchangeClient {
    /// Wire a client over the shared bridge components.
    pub fn new(
        correlator: Arc<ExchangeCorrelator>,
        subscriptions: Arc<SubscriptionRegistry>,
        submitter: CommandSubmitter,
        readiness: Arc<ReadinessGate>,
        config: BridgeConfig,
    ) -> Self {
        Self {
            correlator,
            subscriptions,
            submitter,
            readiness,
            tokens: Arc::new(TokenSequence::new()),
            config,
        }
    }

    /// Submit one command and block until its completion callback fires
    /// or `wait_timeout` elapses.
    ///
    /// `make_command` receives the freshly drawn token; it is invoked once
    /// per submission attempt. The destination buffer's `capacity` is
    /// fixed here and bounds any payload the completion may carry.
    pub async fn correlated_request<F>(
        &self,
        operation: &str,
        capacity: usize,
        make_command: F,
        wait_timeout: Duration,
    ) -> Result<CompletedExchange, BridgeError>
    where
        F: Fn(ExchangeToken) -> AgentCommand + Send + Sync,
    {
        let token = self.tokens.next();
        let buffer = PayloadBuffer::with_capacity(capacity);

        // Register before submit: the response must never win the race
        // against its own table entry.
        let waiter = self
            .correlator
            .register(token, operation, buffer.clone(), Some(wait_timeout))?;

        if self.readiness.wait_ready(self.config.ready_timeout).await.is_err() {
            self.correlator.cancel(token);
            return Err(BridgeError::AgentNotReady {
                timeout_ms: self.config.ready_timeout.as_millis() as u64,
            });
        }

        let submitted_at = Instant::now();
        if let Err(e) = self
            .submitter
            .submit_with_retry(|| make_command(token))
            .await
        {
            self.correlator.cancel(token);
            return Err(e);
        }

        match waiter.wait(wait_timeout).await {
            Ok(outcome) => {
                let status = ExchangeStatus::from(outcome);
                debug!(token = %token, operation, ?status, "Exchange resolved");
                Ok(CompletedExchange {
                    token,
                    status,
                    payload: buffer.snapshot(),
                    elapsed: submitted_at.elapsed(),
                })
            }
            Err(_expired) => {
                // Abandon the exchange; a late callback must find nothing.
                self.correlator.cancel(token);
                warn!(
                    token = %token,
                    operation,
                    timeout_ms = wait_timeout.as_millis() as u64,
                    "Timed out waiting for exchange"
                );
                Err(BridgeError::Timeout {
                    token,
                    timeout_ms: wait_timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Publish `payload` to `topic` and wait for the agent's ack.
    pub async fn publish(
        &self,
        topic: &str,
        payload: &[u8],
    ) -> Result<CompletedExchange, BridgeError> {
        let topic = topic.to_string();
        let payload = payload.to_vec();
        self.correlated_request(
            "publish",
            self.config.max_payload,
            move |token| AgentCommand::Publish {
                token,
                topic: topic.clone(),
                payload: payload.clone(),
            },
            self.config.exchange_timeout,
        )
        .await
    }

    /// Subscribe to `filter` and wait for the agent's ack.
    ///
    /// On success the subscription is installed in the registry and the
    /// returned handle receives matching publishes until it is dropped or
    /// [`unsubscribe`] is called.
    ///
    /// [`unsubscribe`]: ExchangeClient::unsubscribe
    pub async fn subscribe(&self, filter: &str) -> Result<SubscriptionHandle, BridgeError> {
        let command_filter = filter.to_string();
        let ack = self
            .correlated_request(
                "subscribe",
                0,
                move |token| AgentCommand::Subscribe {
                    token,
                    filter: command_filter.clone(),
                },
                self.config.exchange_timeout,
            )
            .await?;

        match ack.status {
            ExchangeStatus::Succeeded => {
                let sink = IncomingSink::new(self.config.max_payload);
                let handle = self.subscriptions.add(filter, sink);
                info!(filter, "Subscribed");
                Ok(handle)
            }
            ExchangeStatus::Failed { code } => {
                warn!(filter, code, "Broker rejected subscribe");
                Err(BridgeError::AgentFailure { code })
            }
            // correlated_request only returns terminal ack statuses.
            ExchangeStatus::Pending | ExchangeStatus::TimedOut => Err(BridgeError::Timeout {
                token: ack.token,
                timeout_ms: self.config.exchange_timeout.as_millis() as u64,
            }),
        }
    }

    /// Tear down a subscription: wait for the unsubscribe ack, then
    /// remove the registry entry by dropping the handle.
    pub async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), BridgeError> {
        let filter = handle.filter().to_string();
        let command_filter = filter.clone();
        let ack = self
            .correlated_request(
                "unsubscribe",
                0,
                move |token| AgentCommand::Unsubscribe {
                    token,
                    filter: command_filter.clone(),
                },
                self.config.exchange_timeout,
            )
            .await?;

        match ack.status {
            ExchangeStatus::Succeeded => {
                drop(handle);
                info!(filter = %filter, "Unsubscribed");
                Ok(())
            }
            ExchangeStatus::Failed { code } => {
                warn!(filter = %filter, code, "Broker rejected unsubscribe");
                Err(BridgeError::AgentFailure { code })
            }
            ExchangeStatus::Pending | ExchangeStatus::TimedOut => Err(BridgeError::Timeout {
                token: ack.token,
                timeout_ms: self.config.exchange_timeout.as_millis() as u64,
            }),
        }
    }

    /// The shared correlator, for wiring callback glue.
    #[must_use]
    pub fn correlator(&self) -> &Arc<ExchangeCorrelator> {
        &self.correlator
    }

    /// The shared subscription registry, for wiring callback glue.
    #[must_use]
    pub fn subscriptions(&self) -> &Arc<SubscriptionRegistry> {
        &self.subscriptions
    }

    /// The readiness gate driven by agent connect/disconnect events.
    #[must_use]
    pub fn readiness(&self) -> &Arc<ReadinessGate> {
        &self.readiness
    }

    /// The client's configuration.
    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }
}
