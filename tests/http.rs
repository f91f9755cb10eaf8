//! REST surface and CORS policy.
#![allow(clippy::panic, clippy::unwrap_used, clippy::expect_used, missing_docs)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use pos_server::config::ServerConfig;
use pos_server::discovery::InMemoryAdvertiser;
use pos_server::server::Server;

async fn start() -> (SocketAddr, oneshot::Sender<()>) {
    let config = ServerConfig {
        listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        emit_interval: Duration::from_millis(200),
        shutdown_timeout: Duration::from_secs(1),
        ..ServerConfig::default()
    };
    let server = Server::bind(&config, Arc::new(InMemoryAdvertiser::new()))
        .await
        .expect("server should bind");
    let addr = server.local_addr();

    let (stop, stopped) = oneshot::channel::<()>();
    tokio::spawn(server.run_until(async move {
        let _ = stopped.await;
    }));
    (addr, stop)
}

#[tokio::test]
async fn health_reports_healthy() {
    let (addr, _stop) = start().await;
    let body: serde_json::Value = reqwest::get(format!("http://{addr}/health"))
        .await
        .expect("request")
        .json()
        .await
        .expect("json body");
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn status_reports_advertisement_and_sessions() {
    let (addr, _stop) = start().await;
    let body: serde_json::Value = reqwest::get(format!("http://{addr}/status"))
        .await
        .expect("request")
        .json()
        .await
        .expect("json body");
    assert_eq!(body["advertised_as"], "pos-server._pos-server._tcp.local.");
    assert_eq!(body["active_connections"], 0);
    assert_eq!(body["accepting"], true);
    assert_eq!(body["stats"]["connections_accepted"], 0);
}

#[tokio::test]
async fn any_origin_is_allowed() {
    let (addr, _stop) = start().await;
    let response = reqwest::Client::new()
        .get(format!("http://{addr}/health"))
        .header("Origin", "http://till.example")
        .send()
        .await
        .expect("request");
    let allowed = response
        .headers()
        .get("access-control-allow-origin")
        .and_then(|v| v.to_str().ok());
    assert_eq!(allowed, Some("*"));
}

#[tokio::test]
async fn ws_endpoint_refuses_plain_get() {
    let (addr, _stop) = start().await;
    let response = reqwest::get(format!("http://{addr}/ws"))
        .await
        .expect("request");
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn openapi_document_lists_system_paths() {
    let (addr, _stop) = start().await;
    let doc: serde_json::Value = reqwest::get(format!("http://{addr}/api-docs/openapi.json"))
        .await
        .expect("request")
        .json()
        .await
        .expect("json body");
    assert!(doc["paths"].get("/health").is_some());
    assert!(doc["paths"].get("/status").is_some());
}
