//! # Fault Paths
//!
//! The unhappy half of the bridge contract: queues that never drain,
//! completions that never come, oversized payloads, offline agents, and
//! workers that outlive their join bound. Every path must return in
//! bounded time without corrupting shared state.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use bridge_core::{
        in_memory_bridge, AgentBehavior, BridgeConfig, BridgeError, ChannelCommandSink,
        CommandSubmitter, ExchangeCorrelator, ExchangeToken, JoinError, PayloadBuffer,
        PayloadDelivery, ReadinessGate, SubscriptionRegistry, WorkerHandle,
    };
    use bridge_core::{AgentCommand, ExchangeClient};
    use tokio::sync::Notify;

    fn fast_config() -> BridgeConfig {
        BridgeConfig {
            exchange_timeout: Duration::from_millis(300),
            ready_timeout: Duration::from_millis(300),
            submit_block_timeout: Duration::from_millis(20),
            submit_retry_budget: Duration::from_millis(100),
            command_queue_capacity: 2,
            ..BridgeConfig::default()
        }
    }

    /// Build a client whose command channel nobody ever drains.
    fn undrained_client(config: BridgeConfig) -> ExchangeClient {
        let correlator = Arc::new(ExchangeCorrelator::new(config.exchange_timeout));
        let subscriptions = Arc::new(SubscriptionRegistry::new());
        let readiness = Arc::new(ReadinessGate::new());
        readiness.set_ready();

        let (sink, receiver) = ChannelCommandSink::bounded(config.command_queue_capacity);
        // Keep the receiver alive but idle: the queue fills and stays full.
        std::mem::forget(receiver);

        let submitter = CommandSubmitter::new(
            Arc::new(sink),
            config.submit_block_timeout,
            config.submit_retry_budget,
        );
        ExchangeClient::new(correlator, subscriptions, submitter, readiness, config)
    }

    // =========================================================================
    // BACKPRESSURE
    // =========================================================================

    /// An agent that never drains must produce `QueueFull` within the
    /// retry budget — no unbounded hang.
    #[tokio::test]
    async fn test_queue_full_returns_in_bounded_time() {
        let config = fast_config();
        let client = undrained_client(config.clone());

        // Fill the queue to capacity; each attempt times out unanswered.
        for _ in 0..config.command_queue_capacity {
            let _ = client.publish("stuck", b"x").await;
        }

        let started = Instant::now();
        let err = client.publish("stuck", b"overflowing").await.unwrap_err();
        assert!(matches!(err, BridgeError::QueueFull { .. }));
        assert!(started.elapsed() < Duration::from_secs(2));
        // Abandoned registrations must not leak.
        assert_eq!(client.correlator().pending_count(), 0);
    }

    // =========================================================================
    // TIMEOUTS AND LATE CALLBACKS
    // =========================================================================

    #[tokio::test]
    async fn test_silent_agent_times_out_and_late_ack_is_ignored() {
        let behavior = AgentBehavior {
            drop_completions: true,
            ..AgentBehavior::default()
        };
        let (client, _agent) = in_memory_bridge(fast_config(), behavior).unwrap();

        let err = client.publish("void", b"unanswered").await.unwrap_err();
        let token = match err {
            BridgeError::Timeout { token, .. } => token,
            other => panic!("expected timeout, got {other}"),
        };

        // The exchange was cancelled on timeout; a late completion for the
        // same token resolves nothing.
        assert!(!client
            .correlator()
            .complete(token.as_u64(), bridge_core::ExchangeOutcome::Succeeded));
    }

    #[tokio::test]
    async fn test_slow_agent_still_completes_within_bound() {
        let behavior = AgentBehavior {
            ack_delay: Duration::from_millis(50),
            ..AgentBehavior::default()
        };
        let (client, _agent) = in_memory_bridge(fast_config(), behavior).unwrap();

        let exchange = client.publish("slow", b"patient").await.unwrap();
        assert!(exchange.elapsed >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_offline_agent_fails_fast_with_not_ready() {
        let config = fast_config();
        let correlator = Arc::new(ExchangeCorrelator::new(config.exchange_timeout));
        let subscriptions = Arc::new(SubscriptionRegistry::new());
        // Gate never set ready.
        let readiness = Arc::new(ReadinessGate::new());

        let (sink, _receiver) = ChannelCommandSink::bounded(config.command_queue_capacity);
        let submitter = CommandSubmitter::new(
            Arc::new(sink),
            config.submit_block_timeout,
            config.submit_retry_budget,
        );
        let client =
            ExchangeClient::new(correlator, subscriptions, submitter, readiness, config);

        let err = client.publish("nowhere", b"x").await.unwrap_err();
        assert!(matches!(err, BridgeError::AgentNotReady { .. }));
        assert_eq!(client.correlator().pending_count(), 0);
    }

    // =========================================================================
    // OVERSIZED PAYLOADS
    // =========================================================================

    #[tokio::test]
    async fn test_oversized_completion_payload_is_refused() {
        let correlator = ExchangeCorrelator::new(Duration::from_secs(5));
        let token = ExchangeToken::from_raw(11).unwrap();
        let buffer = PayloadBuffer::with_capacity(8);
        let _waiter = correlator
            .register(token, "publish", buffer.clone(), None)
            .unwrap();

        let delivery = correlator.deliver_payload(11, &[0u8; 64]);
        assert!(matches!(delivery, PayloadDelivery::Refused(_)));
        assert!(buffer.is_empty());
    }

    // =========================================================================
    // WORKER JOIN SEMANTICS
    // =========================================================================

    #[tokio::test]
    async fn test_join_timeout_then_successful_rejoin() {
        let release = Arc::new(Notify::new());
        let gate = Arc::clone(&release);
        let mut worker = WorkerHandle::spawn("straggler", async move {
            gate.notified().await;
        })
        .unwrap();

        // First join expires; the worker's state is untouched and the
        // handle remains usable.
        let err = worker.join(Duration::from_millis(20)).await.unwrap_err();
        assert!(matches!(err, JoinError::Timeout { .. }));
        assert!(worker.is_joinable());

        release.notify_one();
        worker.join(Duration::from_secs(1)).await.unwrap();
        assert_eq!(
            worker.join(Duration::from_secs(1)).await.unwrap_err(),
            JoinError::AlreadyJoined
        );
    }

    // =========================================================================
    // SUBMITTER COMMAND FRESHNESS
    // =========================================================================

    /// Each retry attempt must construct a fresh command value.
    #[tokio::test]
    async fn test_retry_attempts_build_fresh_commands() {
        use async_trait::async_trait;
        use bridge_core::{CommandSink, SubmitError};
        use std::sync::atomic::{AtomicU32, Ordering};

        struct CountingSink {
            rejections: u32,
            seen: AtomicU32,
        }

        #[async_trait]
        impl CommandSink for CountingSink {
            async fn submit(
                &self,
                _command: AgentCommand,
                _block_timeout: Duration,
            ) -> Result<(), SubmitError> {
                if self.seen.fetch_add(1, Ordering::SeqCst) < self.rejections {
                    Err(SubmitError::QueueFull)
                } else {
                    Ok(())
                }
            }
        }

        let sink = Arc::new(CountingSink {
            rejections: 2,
            seen: AtomicU32::new(0),
        });
        let submitter = CommandSubmitter::new(
            sink.clone(),
            Duration::from_millis(1),
            Duration::from_secs(1),
        );

        let built = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&built);
        submitter
            .submit_with_retry(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                AgentCommand::Publish {
                    token: ExchangeToken::from_raw(1).unwrap(),
                    topic: "fresh".into(),
                    payload: vec![],
                }
            })
            .await
            .unwrap();

        assert_eq!(built.load(Ordering::SeqCst), 3);
        assert_eq!(sink.seen.load(Ordering::SeqCst), 3);
    }
}
