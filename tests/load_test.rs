//! Load testing for the load balancer.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use circuit_lb::load_balancer::StrategyKind;

mod common;

async fn counting_backend(hits: Arc<AtomicU32>, body: &'static str) -> std::net::SocketAddr {
    common::start_programmable_backend(move |_| {
        let hits = hits.clone();
        async move {
            hits.fetch_add(1, Ordering::SeqCst);
            (200, body.to_string())
        }
    })
    .await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_load_round_robin_fairness() {
    // 1. Setup Mock Backends
    let a_hits = Arc::new(AtomicU32::new(0));
    let b_hits = Arc::new(AtomicU32::new(0));
    let a = counting_backend(a_hits.clone(), "a").await;
    let b = counting_backend(b_hits.clone(), "b").await;

    // 2. Start Proxy
    let mut config = common::config_for(&[a, b]);
    config.balancer.strategy = StrategyKind::RoundRobin;
    let proxy = common::start_proxy(config).await;

    // 3. Run Load Test
    let concurrency = 20;
    let requests_per_task = 25;
    let total_requests = concurrency * requests_per_task;

    let client = common::client();
    let start = Instant::now();

    let mut tasks = Vec::new();
    for _ in 0..concurrency {
        let client = client.clone();
        let url = proxy.url("/");
        tasks.push(tokio::spawn(async move {
            let mut latencies = Vec::new();
            for _ in 0..requests_per_task {
                let req_start = Instant::now();
                if let Ok(res) = client.get(&url).send().await {
                    if res.status().is_success() {
                        latencies.push(req_start.elapsed());
                    }
                }
            }
            latencies
        }));
    }

    let mut all_latencies = Vec::new();
    for task in tasks {
        all_latencies.extend(task.await.unwrap());
    }

    let duration = start.elapsed();
    let rps = total_requests as f64 / duration.as_secs_f64();

    assert_eq!(all_latencies.len(), total_requests, "every request should succeed");

    all_latencies.sort();
    let p50 = all_latencies[all_latencies.len() / 2];
    let p95 = all_latencies[(all_latencies.len() as f64 * 0.95) as usize];
    let p99 = all_latencies[(all_latencies.len() as f64 * 0.99) as usize];

    println!("\n--- Load Test Results ---");
    println!("Total Requests: {}", total_requests);
    println!("Concurrency:    {}", concurrency);
    println!("Total Duration: {:?}", duration);
    println!("Requests/sec:   {:.2}", rps);
    println!("P50 Latency:    {:?}", p50);
    println!("P95 Latency:    {:?}", p95);
    println!("P99 Latency:    {:?}", p99);
    println!("-------------------------\n");

    // Every request selects exactly once, so the cursor splits them evenly.
    assert_eq!(a_hits.load(Ordering::SeqCst), b_hits.load(Ordering::SeqCst));
    assert_eq!(a_hits.load(Ordering::SeqCst) as usize, total_requests / 2);

    proxy.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_load_random_spreads_traffic() {
    let a_hits = Arc::new(AtomicU32::new(0));
    let b_hits = Arc::new(AtomicU32::new(0));
    let a = counting_backend(a_hits.clone(), "a").await;
    let b = counting_backend(b_hits.clone(), "b").await;

    let mut config = common::config_for(&[a, b]);
    config.balancer.strategy = StrategyKind::Random;
    let proxy = common::start_proxy(config).await;
    let client = common::client();

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let client = client.clone();
        let url = proxy.url("/");
        tasks.push(tokio::spawn(async move {
            for _ in 0..20 {
                let res = client.get(&url).send().await.unwrap();
                assert!(res.status().is_success());
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let (a, b) = (a_hits.load(Ordering::SeqCst), b_hits.load(Ordering::SeqCst));
    assert_eq!(a + b, 200);
    assert!(a > 40 && b > 40, "skewed split: a={} b={}", a, b);

    proxy.shutdown().await;
}
