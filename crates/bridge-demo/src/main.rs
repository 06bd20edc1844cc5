//! # Bridge Demo
//!
//! Several concurrent workers share one in-memory agent over the same
//! bridge. Each worker subscribes to its own topic, publishes a payload,
//! waits for the agent's echo, verifies the bytes, and unsubscribes —
//! the round trip the bridge exists to make synchronous.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bridge_core::{
    cleanup_task, in_memory_bridge, AgentBehavior, BridgeConfig, ExchangeClient, WorkerHandle,
};

/// Number of concurrent echo workers.
const WORKER_COUNT: usize = 3;

/// Round trips each worker performs before exiting.
const LOOPS_PER_WORKER: usize = 5;

/// Pause between a worker's round trips.
const DELAY_BETWEEN_LOOPS: Duration = Duration::from_millis(200);

/// Bound on joining each worker at shutdown.
const JOIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(workers = WORKER_COUNT, "Starting bridge demo");

    let (client, mut agent) = in_memory_bridge(BridgeConfig::default(), AgentBehavior::default())
        .context("failed to wire the in-memory bridge")?;

    let sweeper = tokio::spawn(cleanup_task(
        std::sync::Arc::clone(client.correlator()),
        client.config().cleanup_interval,
    ));

    let mut workers = Vec::with_capacity(WORKER_COUNT);
    for worker_number in 0..WORKER_COUNT {
        let client = client.clone();
        let label = format!("echo-{worker_number}");
        let worker_label = label.clone();
        let handle = WorkerHandle::spawn(&label, async move {
            if let Err(e) = echo_worker(&worker_label, worker_number, client).await {
                warn!(worker = %worker_label, error = %e, "Worker failed");
            }
        })
        .context("failed to spawn echo worker")?;
        workers.push(handle);
    }

    for worker in &mut workers {
        worker
            .join(JOIN_TIMEOUT)
            .await
            .with_context(|| format!("worker {} did not finish", worker.label()))?;
        info!(worker = %worker.label(), "Worker joined");
    }

    // All workers are done; dropping the client closes the command
    // channel and the agent drains out.
    sweeper.abort();
    drop(client);
    agent
        .join(JOIN_TIMEOUT)
        .await
        .context("agent did not drain")?;

    info!("Bridge demo complete");
    Ok(())
}

/// One worker's subscribe / publish / wait / unsubscribe loop.
async fn echo_worker(label: &str, worker_number: usize, client: ExchangeClient) -> Result<()> {
    let topic = format!("demo/echo/{worker_number}");
    let payload = format!("hello from {label}");

    for loop_number in 0..LOOPS_PER_WORKER {
        let subscription = client
            .subscribe(&topic)
            .await
            .with_context(|| format!("subscribe to {topic}"))?;

        let exchange = client
            .publish(&topic, payload.as_bytes())
            .await
            .with_context(|| format!("publish to {topic}"))?;
        info!(
            worker = label,
            loop_number,
            token = %exchange.token,
            elapsed_ms = exchange.elapsed.as_millis() as u64,
            "Publish acknowledged"
        );

        let echoed = subscription
            .next_publish(client.config().exchange_timeout)
            .await
            .with_context(|| format!("waiting for echo on {topic}"))?;
        if echoed != payload.as_bytes() {
            bail!("echo mismatch on {topic}");
        }
        info!(worker = label, loop_number, "Echo verified");

        client
            .unsubscribe(subscription)
            .await
            .with_context(|| format!("unsubscribe from {topic}"))?;

        tokio::time::sleep(DELAY_BETWEEN_LOOPS).await;
    }

    Ok(())
}
