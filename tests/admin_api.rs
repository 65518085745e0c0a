//! Admin API tests over real HTTP and WebSocket.

use futures_util::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::connect_async;

use lb_simulator::simulation::Simulation;

mod common;

#[tokio::test]
async fn test_admin_lifecycle() {
    let sim = Arc::new(Simulation::new(common::test_config()));
    let addr = common::start_admin(sim.clone()).await;
    let client = reqwest::Client::new();
    let url = |path: &str| format!("http://{addr}{path}");

    let res = client.get(url("/api/status")).send().await.unwrap();
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "no simulation running");

    let res = client
        .post(url("/api/start"))
        .json(&json!({"num_servers": 2, "algorithm": "round_robin", "health_check_interval": 0.1}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Simulation started successfully");

    let res = client.post(url("/api/start")).json(&json!({})).send().await.unwrap();
    assert_eq!(res.status(), 400);

    let res = client.post(url("/api/send_request")).json(&json!({})).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["server_id"], "S0");
    assert!(body["client_id"].as_str().unwrap().starts_with('C'));
    assert_eq!(body["redirected"], false);

    let res = client.get(url("/api/status")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["algorithm"], "round_robin");
    assert_eq!(body["backends"].as_array().unwrap().len(), 2);
    assert_eq!(body["backends"][0]["id"], "S0");
    assert_eq!(body["backends"][0]["status"], "healthy");
    assert_eq!(body["metrics"]["total_requests"], 1);

    let res = client.post(url("/api/stop")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let res = client.post(url("/api/stop")).send().await.unwrap();
    assert_eq!(res.status(), 400);
}

#[tokio::test]
async fn test_start_validation_errors() {
    let sim = Arc::new(Simulation::new(common::test_config()));
    let addr = common::start_admin(sim.clone()).await;
    let client = reqwest::Client::new();

    for body in [
        json!({"algorithm": "fastest"}),
        json!({"num_servers": 0}),
        json!({"health_check_interval": -1.0}),
    ] {
        let res = client.post(format!("http://{addr}/api/start")).json(&body).send().await.unwrap();
        assert_eq!(res.status(), 400, "body {body} should be rejected");
        let err: Value = res.json().await.unwrap();
        assert!(err["error"].is_string());
    }
    assert!(!sim.is_running().await);
}

#[tokio::test]
async fn test_no_healthy_backend_is_503() {
    let sim = common::start_simulation(1, "round_robin", 100).await;
    let addr = common::start_admin(sim.clone()).await;

    let down = common::eventually(Duration::from_secs(3), || async {
        sim.status().await.unwrap().metrics.active_servers == 0
    })
    .await;
    assert!(down);

    let res = reqwest::Client::new()
        .post(format!("http://{addr}/api/send_request"))
        .json(&json!({"client_id": "C42"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 503);

    sim.stop().await.unwrap();
}

#[tokio::test]
async fn test_log_stream() {
    let sim = common::start_simulation(2, "round_robin", 0).await;
    let addr = common::start_admin(sim.clone()).await;

    let (mut ws, _) = connect_async(format!("ws://{addr}/api/logs")).await.unwrap();
    // Let the server subscribe before the request goes out.
    tokio::time::sleep(Duration::from_millis(100)).await;

    reqwest::Client::new()
        .post(format!("http://{addr}/api/send_request"))
        .json(&json!({"client_id": "C7", "client_ip": "10.1.1.1"}))
        .send()
        .await
        .unwrap();

    let line = tokio::time::timeout(Duration::from_secs(3), async {
        while let Some(msg) = ws.next().await {
            let msg = msg.unwrap();
            let Ok(text) = msg.to_text() else { continue };
            let Ok(body) = serde_json::from_str::<Value>(text) else { continue };
            let line = body["message"].as_str().unwrap_or_default().to_string();
            if line.contains("assigned to Server") {
                return line;
            }
        }
        panic!("log stream closed");
    })
    .await
    .unwrap();

    assert!(line.contains("ROUND_ROBIN"));
    assert!(line.contains("Client C7"));
    assert!(line.contains("10.1.1.1"));

    sim.stop().await.unwrap();
}
