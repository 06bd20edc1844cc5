//! # End-to-End Exchange Flows
//!
//! Drives the assembled bridge — client, correlator, submitter,
//! subscription registry, and in-memory agent — through the request/
//! response scenarios the layer exists for: correlated publishes,
//! subscribe-then-echo round trips, and concurrent workers sharing one
//! agent connection.

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    use bridge_core::{
        in_memory_bridge, AgentBehavior, BridgeConfig, ExchangeCorrelator, ExchangeOutcome,
        ExchangeStatus, ExchangeToken, PayloadBuffer, WorkerHandle,
    };

    fn fast_config() -> BridgeConfig {
        BridgeConfig {
            exchange_timeout: Duration::from_millis(500),
            ready_timeout: Duration::from_millis(500),
            submit_block_timeout: Duration::from_millis(20),
            submit_retry_budget: Duration::from_millis(200),
            ..BridgeConfig::default()
        }
    }

    // =========================================================================
    // CORRELATED PUBLISH SCENARIOS
    // =========================================================================

    /// Token 42, 64-byte buffer, a 10-byte completion payload: the wait
    /// resolves `Succeeded` and the buffer holds exactly those bytes.
    #[tokio::test]
    async fn test_correlated_exchange_delivers_payload() {
        let correlator = ExchangeCorrelator::new(Duration::from_secs(5));
        let token = ExchangeToken::from_raw(42).unwrap();
        let buffer = PayloadBuffer::with_capacity(64);

        let waiter = correlator
            .register(token, "publish", buffer.clone(), None)
            .unwrap();

        // The "agent" completes from its own task, as a callback would.
        let correlator = Arc::new(correlator);
        let callback_side = Arc::clone(&correlator);
        tokio::spawn(async move {
            callback_side.deliver_payload(42, b"helloworld");
            callback_side.complete(42, ExchangeOutcome::Succeeded);
        });

        let outcome = waiter.wait(Duration::from_secs(1)).await.unwrap();
        assert_eq!(outcome, ExchangeOutcome::Succeeded);
        assert_eq!(&buffer.snapshot()[..10], b"helloworld");
    }

    /// A foreign completion (token 7) followed by silence: the waiting
    /// exchange times out, its buffer stays empty, and resolving the
    /// foreign token later crashes nothing.
    #[tokio::test]
    async fn test_foreign_token_then_timeout() {
        let correlator = ExchangeCorrelator::new(Duration::from_secs(5));
        let token = ExchangeToken::from_raw(42).unwrap();
        let buffer = PayloadBuffer::with_capacity(64);

        let waiter = correlator
            .register(token, "publish", buffer.clone(), None)
            .unwrap();

        assert!(!correlator.complete(7, ExchangeOutcome::Succeeded));

        let result = waiter.wait(Duration::from_millis(50)).await;
        assert!(result.is_err());
        assert!(buffer.is_empty());

        correlator.cancel(token);
        // The late echo of the foreign event is still a no-op.
        assert!(!correlator.complete(7, ExchangeOutcome::Succeeded));
        assert_eq!(correlator.stats().total_foreign.load(Ordering::Relaxed), 2);
    }

    /// Arbitrary bytes up to the buffer capacity survive the round trip
    /// unchanged.
    #[tokio::test]
    async fn test_random_payloads_round_trip_byte_for_byte() {
        use rand::RngCore;

        let (client, _agent) = in_memory_bridge(fast_config(), AgentBehavior::default()).unwrap();
        let mut rng = rand::thread_rng();

        for len in [0usize, 1, 16, 255, 1024] {
            let mut payload = vec![0u8; len];
            rng.fill_bytes(&mut payload);

            let exchange = client.publish("fuzz/bytes", &payload).await.unwrap();
            assert_eq!(exchange.status, ExchangeStatus::Succeeded);
            assert_eq!(exchange.payload, payload);
        }
    }

    #[tokio::test]
    async fn test_publish_ack_round_trip() {
        let (client, _agent) = in_memory_bridge(fast_config(), AgentBehavior::default()).unwrap();

        let exchange = client.publish("telemetry/cpu", b"0.73").await.unwrap();
        assert_eq!(exchange.status, ExchangeStatus::Succeeded);
        assert_eq!(exchange.payload, b"0.73");
        assert_eq!(client.correlator().pending_count(), 0);
    }

    // =========================================================================
    // SUBSCRIBE / ECHO / UNSUBSCRIBE
    // =========================================================================

    #[tokio::test]
    async fn test_subscribe_publish_echo_unsubscribe() {
        let (client, _agent) = in_memory_bridge(fast_config(), AgentBehavior::default()).unwrap();

        let subscription = client.subscribe("demo/echo/0").await.unwrap();
        assert_eq!(client.subscriptions().filter_count(), 1);

        client.publish("demo/echo/0", b"ping").await.unwrap();
        let echoed = subscription
            .next_publish(Duration::from_millis(500))
            .await
            .unwrap();
        assert_eq!(echoed, b"ping");

        client.unsubscribe(subscription).await.unwrap();
        assert_eq!(client.subscriptions().filter_count(), 0);
    }

    #[tokio::test]
    async fn test_sequential_round_trips_reuse_the_bridge() {
        let (client, _agent) = in_memory_bridge(fast_config(), AgentBehavior::default()).unwrap();

        for round in 0..5 {
            let subscription = client.subscribe("demo/loop").await.unwrap();
            let payload = format!("round-{round}");
            client.publish("demo/loop", payload.as_bytes()).await.unwrap();

            let echoed = subscription
                .next_publish(Duration::from_millis(500))
                .await
                .unwrap();
            assert_eq!(echoed, payload.as_bytes());

            client.unsubscribe(subscription).await.unwrap();
        }

        assert_eq!(client.correlator().pending_count(), 0);
        assert_eq!(client.subscriptions().filter_count(), 0);
    }

    // =========================================================================
    // CONCURRENT WORKERS SHARING ONE AGENT
    // =========================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_workers_do_not_cross_wires() {
        let (client, _agent) = in_memory_bridge(fast_config(), AgentBehavior::default()).unwrap();

        let mut workers = Vec::new();
        for worker_number in 0..4usize {
            let client = client.clone();
            let handle = WorkerHandle::spawn(&format!("worker-{worker_number}"), async move {
                let topic = format!("workers/{worker_number}");
                let payload = format!("payload-{worker_number}");

                let subscription = client.subscribe(&topic).await.unwrap();
                client.publish(&topic, payload.as_bytes()).await.unwrap();

                let echoed = subscription
                    .next_publish(Duration::from_secs(1))
                    .await
                    .unwrap();
                // Each worker must see its own payload, not a neighbor's.
                assert_eq!(echoed, payload.as_bytes());

                client.unsubscribe(subscription).await.unwrap();
            })
            .unwrap();
            workers.push(handle);
        }

        for worker in &mut workers {
            worker.join(Duration::from_secs(5)).await.unwrap();
        }
        assert_eq!(client.correlator().pending_count(), 0);
        assert_eq!(client.subscriptions().filter_count(), 0);
    }

    #[tokio::test]
    async fn test_worker_join_after_agent_teardown() {
        let (client, mut agent) = in_memory_bridge(fast_config(), AgentBehavior::default()).unwrap();

        client.publish("final/word", b"done").await.unwrap();

        drop(client);
        agent.join(Duration::from_secs(1)).await.unwrap();
        assert!(!agent.is_joinable());
    }
}
