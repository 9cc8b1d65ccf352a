//! Graceful shutdown over a real socket.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use profile_server::config::ServerConfig;
use profile_server::{HttpServer, Shutdown, ShutdownReport};

mod common;

use common::{collaborators, open_config, seeded_users, CountingEngine};

struct Running {
    base: String,
    shutdown: Shutdown,
    server: tokio::task::JoinHandle<ShutdownReport>,
}

async fn start(config: ServerConfig, engine: Arc<CountingEngine>) -> (Running, profile_server::lifecycle::DrainState) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config, collaborators(engine, seeded_users().await), None).unwrap();
    let drain = server.drain_state();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let server = tokio::spawn(async move { server.run(listener, rx).await.unwrap() });

    (
        Running {
            base: format!("http://{addr}"),
            shutdown,
            server,
        },
        drain,
    )
}

fn config_with_grace(secs: u64) -> ServerConfig {
    let mut config = open_config();
    config.lifecycle.shutdown_grace_secs = secs;
    config
}

#[tokio::test]
async fn idle_server_stops_within_grace() {
    let (running, drain) = start(config_with_grace(5), Arc::new(CountingEngine::default())).await;

    let response = reqwest::get(format!("{}/healthz", running.base)).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    drop(response);

    running.shutdown.trigger();
    let report = tokio::time::timeout(Duration::from_secs(5), running.server)
        .await
        .unwrap()
        .unwrap();

    assert!(!report.forced);
    assert!(report.elapsed < report.grace);
    assert!(drain.is_draining());
    assert!(reqwest::get(format!("{}/healthz", running.base)).await.is_err());
}

#[tokio::test]
async fn in_flight_request_finishes_during_grace() {
    let engine = Arc::new(CountingEngine::slow(Duration::from_millis(500)));
    let (running, drain) = start(config_with_grace(5), engine.clone()).await;

    let url = format!("{}/render?query=cpu", running.base);
    let in_flight = tokio::spawn(async move { reqwest::get(url).await });

    while engine.calls() == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    running.shutdown.trigger();

    let response = in_flight.await.unwrap().unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert!(drain.is_draining());

    let report = running.server.await.unwrap();
    assert!(!report.forced);
}

#[tokio::test]
async fn grace_period_bounds_slow_requests() {
    let engine = Arc::new(CountingEngine::slow(Duration::from_secs(10)));
    let (running, _drain) = start(config_with_grace(1), engine.clone()).await;

    let url = format!("{}/render?query=cpu", running.base);
    let in_flight = tokio::spawn(async move { reqwest::get(url).await });

    while engine.calls() == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    running.shutdown.trigger();

    let report = tokio::time::timeout(Duration::from_secs(5), running.server)
        .await
        .unwrap()
        .unwrap();
    assert!(report.forced);
    let outcome = tokio::time::timeout(Duration::from_secs(3), in_flight).await;
    assert!(!matches!(outcome, Ok(Ok(Ok(_)))));
}
