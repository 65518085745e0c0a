//! Load testing for the simulator.

use std::collections::HashMap;
use std::time::{Duration, Instant};

mod common;

#[tokio::test]
async fn test_concurrent_round_robin_load() {
    let sim = common::start_simulation(3, "round_robin", 0).await;

    let concurrency = 10;
    let requests_per_task = 6;
    let total_requests = concurrency * requests_per_task;

    let start = Instant::now();
    let mut tasks = Vec::new();
    for t in 0..concurrency {
        let sim = sim.clone();
        tasks.push(tokio::spawn(async move {
            let mut served = Vec::new();
            for i in 0..requests_per_task {
                let req = common::request(&format!("C{t}-{i}"));
                match sim.submit_request(req, common::localhost()).await {
                    Ok(res) => served.push(res.server_id),
                    Err(e) => panic!("request failed under load: {e}"),
                }
            }
            served
        }));
    }

    let mut per_backend: HashMap<String, usize> = HashMap::new();
    for task in tasks {
        for server_id in task.await.unwrap() {
            *per_backend.entry(server_id).or_default() += 1;
        }
    }
    let elapsed = start.elapsed();

    println!("Load test: {} requests in {:?}", total_requests, elapsed);
    println!("Distribution: {:?}", per_backend);

    // The counter is shared, so even concurrent callers split evenly.
    assert_eq!(per_backend.len(), 3);
    assert!(per_backend.values().all(|&n| n == total_requests / 3));

    let metrics = sim.status().await.unwrap().metrics;
    assert_eq!(metrics.total_requests, total_requests as u64);
    assert_eq!(metrics.success_rate, 100.0);
    assert!(metrics.avg_response_time > 0.0);

    // Workers are capped, so the backlog takes a few rounds to clear.
    assert!(
        common::eventually(Duration::from_secs(10), || async {
            sim.status().await.unwrap().backends.iter().all(|b| b.active_connections == 0)
        })
        .await,
        "connections never drained"
    );

    sim.stop().await.unwrap();
}
