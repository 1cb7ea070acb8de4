//! Stress tests for many concurrent connections.
//!
//! These tests are marked #[ignore] and run via: cargo test -- --ignored

mod harness;

use std::sync::Arc;
use std::time::{Duration, Instant};

use harness::{EchoServer, Metrics, RawClient, init_tracing};
use tcpwire::{Client, Config, Event};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

fn get_stress_client_count() -> usize {
    std::env::var("TCPWIRE_STRESS_CLIENTS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(1000)
}

const MAX_CONCURRENT: usize = 200;
const MESSAGES_PER_CLIENT: usize = 10;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore]
async fn test_stress_connections() {
    init_tracing();
    let num_clients = get_stress_client_count();
    println!("Stress test: {num_clients} clients, {MAX_CONCURRENT} max concurrent");

    let echo = EchoServer::spawn().await;
    let addr = echo.addr;
    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT));
    let metrics = Metrics::new();

    let mut set = JoinSet::new();
    for client_id in 0..num_clients {
        let permit = semaphore.clone().acquire_owned().await.unwrap();
        let metrics = metrics.clone();

        set.spawn(async move {
            match RawClient::connect(addr).await {
                Ok(mut client) => {
                    metrics.record_connection();
                    let msg = format!("stress:{client_id}");
                    client.send(msg.as_bytes()).await;
                    metrics.record_message_sent();
                    if client.recv().await.is_some() {
                        metrics.record_message_received();
                    }
                    client.close().await;
                }
                Err(_) => metrics.record_connection_failed(),
            }
            drop(permit);
        });
    }

    while let Some(result) = set.join_next().await {
        if result.is_err() {
            metrics.record_error();
        }
    }
    metrics.report();

    let total = metrics.connections_total();
    let success_rate = if num_clients > 0 {
        (total as f64 / num_clients as f64) * 100.0
    } else {
        0.0
    };
    assert!(
        success_rate >= 95.0,
        "Expected at least 95% connection success rate, got {success_rate:.1}%"
    );

    echo.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore]
async fn test_stress_throughput() {
    init_tracing();
    let num_clients = get_stress_client_count().min(200);
    println!("Throughput test: {num_clients} clients, {MESSAGES_PER_CLIENT} messages each");

    let echo = EchoServer::spawn().await;
    let port = echo.port();
    let metrics = Metrics::new();

    let start = Instant::now();
    let mut set = JoinSet::new();
    for client_id in 0..num_clients {
        let metrics = metrics.clone();
        set.spawn(async move {
            let client = Client::new(Config::lan());
            if !client.connect("127.0.0.1", port) {
                metrics.record_connection_failed();
                return;
            }
            match tokio::time::timeout(Duration::from_secs(10), client.next_event()).await {
                Ok(Event::Connected { .. }) => metrics.record_connection(),
                _ => {
                    metrics.record_connection_failed();
                    return;
                }
            }

            for seq in 0..MESSAGES_PER_CLIENT {
                if client.send(format!("throughput:{client_id}:{seq}")) {
                    metrics.record_message_sent();
                }
            }
            for _ in 0..MESSAGES_PER_CLIENT {
                match tokio::time::timeout(Duration::from_secs(10), client.next_event()).await {
                    Ok(Event::Data { .. }) => metrics.record_message_received(),
                    _ => break,
                }
            }
            client.disconnect().await;
        });
    }

    while let Some(result) = set.join_next().await {
        if result.is_err() {
            metrics.record_error();
        }
    }
    let elapsed = start.elapsed();
    metrics.report();

    let received = metrics.messages_received();
    println!(
        "{received} messages in {elapsed:?} ({:.0} msg/s)",
        received as f64 / elapsed.as_secs_f64()
    );
    assert_eq!(received, metrics.messages_sent());

    echo.shutdown().await;
}
