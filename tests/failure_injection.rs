//! Failure injection tests for the simulator.

use std::sync::Arc;
use std::time::Duration;

use lb_simulator::health::{HealthMonitor, HealthStatus};
use lb_simulator::load_balancer::{Algorithm, Backend, DispatchError, DispatchRequest, Dispatcher};
use lb_simulator::observability::{EventLog, LogEvent};
use lb_simulator::server::{BackendSettings, ServerError, SimulatedBackend};
use lb_simulator::simulation::{Simulation, SimulationError};

mod common;

fn settings() -> BackendSettings {
    BackendSettings {
        status_interval: Duration::from_millis(100),
        processing_min: Duration::from_millis(10),
        processing_max: Duration::from_millis(20),
        max_workers: 4,
    }
}

#[tokio::test]
async fn test_retry_once_on_delivery_failure() {
    let events = EventLog::new();
    let mut rx = events.subscribe();

    let live = SimulatedBackend::start("S1", "127.0.0.1:0".parse().unwrap(), 0, &settings(), events.clone())
        .await
        .unwrap();
    let dead = Arc::new(Backend::new("S0", common::dead_addr(), 0));

    let dispatcher = Dispatcher::new(
        vec![dead, live.backend()],
        Algorithm::RoundRobin,
        Duration::from_secs(1),
        events,
    );

    let res = dispatcher.process(&DispatchRequest::new("C1", "1.2.3.4", "hello")).await.unwrap();
    assert_eq!(res.server_id, "S1");
    assert_eq!(res.client_id, "C1");
    assert!(res.redirected);

    let mut kinds = Vec::new();
    while let Ok(event) = rx.try_recv() {
        match event {
            LogEvent::ServerStarted { .. } => {}
            LogEvent::Redirected { from, to, .. } => {
                assert_eq!((from.as_str(), to.as_str()), ("S0", "S1"));
                kinds.push("redirected");
            }
            LogEvent::Selected { .. } => kinds.push("selected"),
            LogEvent::DeliveryFailed { .. } => kinds.push("delivery_failed"),
            LogEvent::Responded { .. } => kinds.push("responded"),
            other => panic!("unexpected event: {other}"),
        }
    }
    assert_eq!(kinds, ["selected", "delivery_failed", "redirected", "responded"]);

    live.stop(Duration::from_secs(2)).await;
}

#[tokio::test]
async fn test_delivery_failed_when_alternate_also_fails() {
    let dispatcher = Dispatcher::new(
        vec![
            Arc::new(Backend::new("S0", common::dead_addr(), 0)),
            Arc::new(Backend::new("S1", common::dead_addr(), 0)),
        ],
        Algorithm::RoundRobin,
        Duration::from_millis(500),
        EventLog::new(),
    );

    let err = dispatcher.process(&DispatchRequest::new("C1", "1.2.3.4", "x")).await.unwrap_err();
    match err {
        DispatchError::DeliveryFailed { client_id, server_id, .. } => {
            assert_eq!(client_id, "C1");
            assert_eq!(server_id, "S1");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_down_backend_is_not_retried() {
    let events = EventLog::new();
    let live = SimulatedBackend::start("S1", "127.0.0.1:0".parse().unwrap(), 0, &settings(), events.clone())
        .await
        .unwrap();
    let dead = Arc::new(Backend::new("S0", common::dead_addr(), 0));
    live.backend().set_observed_status(HealthStatus::Down);

    let dispatcher = Dispatcher::new(vec![dead, live.backend()], Algorithm::RoundRobin, Duration::from_secs(1), events);
    let err = dispatcher.process(&DispatchRequest::new("C1", "1.2.3.4", "x")).await.unwrap_err();
    assert!(matches!(err, DispatchError::DeliveryFailed { ref server_id, .. } if server_id == "S0"));

    live.stop(Duration::from_secs(2)).await;
}

#[tokio::test]
async fn test_full_fail_rate_takes_every_backend_down() {
    let sim = common::start_simulation(2, "round_robin", 100).await;

    let all_down = common::eventually(Duration::from_secs(3), || async {
        let status = sim.status().await.unwrap();
        status
            .backends
            .iter()
            .all(|b| b.reported_status == HealthStatus::Down && b.status == HealthStatus::Down)
    })
    .await;
    assert!(all_down, "backends never observed DOWN");
    assert_eq!(sim.status().await.unwrap().metrics.active_servers, 0);

    let err = sim.submit_request(common::request("C1"), common::localhost()).await.unwrap_err();
    assert!(matches!(
        err,
        SimulationError::Dispatch(DispatchError::NoHealthyBackend { ref client_id }) if client_id == "C1"
    ));

    // A rejected request still counts against the success rate.
    let metrics = sim.status().await.unwrap().metrics;
    assert_eq!(metrics.total_requests, 1);
    assert_eq!(metrics.success_rate, 0.0);

    sim.stop().await.unwrap();
}

#[tokio::test]
async fn test_zero_fail_rate_stays_healthy() {
    let sim = common::start_simulation(3, "random", 0).await;

    for _ in 0..5 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let status = sim.status().await.unwrap();
        assert!(status
            .backends
            .iter()
            .all(|b| b.reported_status == HealthStatus::Healthy && b.status == HealthStatus::Healthy));
    }

    sim.stop().await.unwrap();
}

#[tokio::test]
async fn test_port_in_use_fails_start() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port();

    let mut config = common::test_config();
    config.simulation.base_port = port;
    let sim = Simulation::new(config);

    let err = sim.start(common::params(1, "round_robin", 0)).await.unwrap_err();
    match err {
        SimulationError::Backend { server_id, source } => {
            assert_eq!(server_id, "S0");
            assert!(matches!(source, ServerError::PortUnavailable { port: p, .. } if p == port));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!sim.is_running().await);
}

#[tokio::test]
async fn test_monitor_marks_unreachable_backend_down() {
    let events = EventLog::new();
    let mut rx = events.subscribe();
    let live = SimulatedBackend::start("S0", "127.0.0.1:0".parse().unwrap(), 0, &settings(), events.clone())
        .await
        .unwrap();
    let dead = Arc::new(Backend::new("S1", common::dead_addr(), 0));

    let dispatcher = Arc::new(Dispatcher::new(
        vec![live.backend(), dead.clone()],
        Algorithm::RoundRobin,
        Duration::from_secs(1),
        events.clone(),
    ));
    let monitor = HealthMonitor::new(dispatcher, Duration::from_millis(50), Duration::from_millis(500), events);
    monitor.check_all().await;

    assert_eq!(live.backend().observed_status(), HealthStatus::Healthy);
    assert_eq!(dead.observed_status(), HealthStatus::Down);

    let mut probes = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let LogEvent::HealthProbe { server_id, status } = event {
            probes.push((server_id, status));
        }
    }
    assert_eq!(
        probes,
        [("S0".to_string(), HealthStatus::Healthy), ("S1".to_string(), HealthStatus::Down)]
    );

    live.stop(Duration::from_secs(2)).await;
}

#[tokio::test]
async fn test_retry_stops_after_one_alternate() {
    let events = EventLog::new();
    let mut rx = events.subscribe();
    let live = SimulatedBackend::start("S2", "127.0.0.1:0".parse().unwrap(), 0, &settings(), events.clone())
        .await
        .unwrap();

    let dispatcher = Dispatcher::new(
        vec![
            Arc::new(Backend::new("S0", common::dead_addr(), 0)),
            Arc::new(Backend::new("S1", common::dead_addr(), 0)),
            live.backend(),
        ],
        Algorithm::RoundRobin,
        Duration::from_millis(500),
        events,
    );

    let err = dispatcher.process(&DispatchRequest::new("C1", "1.2.3.4", "x")).await.unwrap_err();
    assert!(matches!(err, DispatchError::DeliveryFailed { ref server_id, .. } if server_id == "S1"));

    let (mut selected, mut redirected, mut failed) = (0, 0, Vec::new());
    while let Ok(event) = rx.try_recv() {
        match event {
            LogEvent::ServerStarted { .. } => {}
            LogEvent::Selected { .. } => selected += 1,
            LogEvent::Redirected { .. } => redirected += 1,
            LogEvent::DeliveryFailed { server_id, .. } => failed.push(server_id),
            other => panic!("unexpected event: {other}"),
        }
    }
    assert_eq!((selected, redirected), (1, 1));
    assert_eq!(failed, ["S0", "S1"]);
    assert_eq!(live.backend().active_connections(), 0);

    live.stop(Duration::from_secs(2)).await;
}

#[tokio::test]
async fn test_stopped_monitor_goes_quiet() {
    let events = EventLog::new();
    let mut rx = events.subscribe();
    let live = SimulatedBackend::start("S0", "127.0.0.1:0".parse().unwrap(), 0, &settings(), events.clone())
        .await
        .unwrap();

    let dispatcher = Arc::new(Dispatcher::new(
        vec![live.backend()],
        Algorithm::RoundRobin,
        Duration::from_secs(1),
        events.clone(),
    ));
    let interval = Duration::from_millis(20);
    let handle = HealthMonitor::new(dispatcher, interval, Duration::from_millis(500), events).spawn();

    tokio::time::sleep(interval * 5).await;
    assert!(handle.stop(Duration::from_secs(1)).await, "monitor loop was aborted");

    let mut checked = false;
    while let Ok(event) = rx.try_recv() {
        checked |= matches!(event, LogEvent::HealthProbe { .. });
    }
    assert!(checked, "monitor never ran a check before stop");

    tokio::time::sleep(interval * 8).await;
    while let Ok(event) = rx.try_recv() {
        assert!(!matches!(event, LogEvent::HealthProbe { .. }), "health check after stop: {event}");
    }

    live.stop(Duration::from_secs(2)).await;
}

#[tokio::test]
async fn test_in_flight_work_outlives_stop() {
    let settings = BackendSettings {
        processing_min: Duration::from_millis(600),
        processing_max: Duration::from_millis(600),
        max_workers: 8,
        ..settings()
    };
    let sim_backend = SimulatedBackend::start("S0", "127.0.0.1:0".parse().unwrap(), 0, &settings, EventLog::new())
        .await
        .unwrap();
    let backend = sim_backend.backend();

    let client = reqwest::Client::new();
    for i in 0..5 {
        let res = client
            .post(backend.url("/process"))
            .json(&serde_json::json!({"client_id": format!("C{i}"), "payload": "x"}))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 202);
    }
    assert_eq!(backend.active_connections(), 5);

    sim_backend.stop(Duration::from_millis(50)).await;
    assert!(backend.active_connections() > 0, "work finished before the grace period ran out");

    let drained = common::eventually(Duration::from_secs(3), || async { backend.active_connections() == 0 }).await;
    assert!(drained, "connections still held after processing window");
}
