//! HTTP API Integration Tests
//!
//! Spins the router up on an ephemeral port and drives it with a real client.

use datamonitor::config::MonitorConfig;
use datamonitor::core::{Event, Reading};
use datamonitor::http::create_server;
use datamonitor::monitor::Monitor;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;

async fn serve() -> (Arc<Monitor>, String) {
    let (_tx, rx) = mpsc::channel(8);
    let monitor = Arc::new(Monitor::new(MonitorConfig::default(), rx));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_server(Arc::clone(&monitor));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (monitor, format!("http://{}", addr))
}

fn seed(monitor: &Monitor) {
    for (id, device) in [("evt-1", "Thermostat"), ("evt-2", "Camera"), ("evt-3", "Thermostat")] {
        monitor.db().ingest(
            &Event::new(id, device, "profile", 0, 0).with_reading(Reading::simple(
                &format!("{}-reading", id),
                device,
                "resource",
                "profile",
                "Int32",
                "7",
            )),
        );
    }
}

#[tokio::test]
async fn test_health() {
    let (_monitor, base) = serve().await;
    let response = reqwest::get(format!("{}/health", base)).await.unwrap();
    assert!(response.status().is_success());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Data monitor HTTP API is running");
}

#[tokio::test]
async fn test_stats_and_listing() {
    let (monitor, base) = serve().await;
    seed(&monitor);

    let stats: Value = reqwest::get(format!("{}/api/stats", base)).await.unwrap().json().await.unwrap();
    assert_eq!(stats["live_events"], 3);
    assert_eq!(stats["live_readings"], 3);
    assert_eq!(stats["state"], "running");
    assert_eq!(stats["buffer_size"], 50);

    let events: Vec<Event> =
        reqwest::get(format!("{}/api/events", base)).await.unwrap().json().await.unwrap();
    assert_eq!(events.len(), 3);

    let readings: Vec<Reading> =
        reqwest::get(format!("{}/api/readings", base)).await.unwrap().json().await.unwrap();
    assert_eq!(readings.len(), 3);
}

#[tokio::test]
async fn test_filter_endpoint() {
    let (monitor, base) = serve().await;
    seed(&monitor);
    let client = reqwest::Client::new();

    let stats: Value = client
        .put(format!("{}/api/filter", base))
        .json(&json!({ "filter": "thermostat" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["filter"], "thermostat");
    assert_eq!(stats["visible_events"], 2);
    assert_eq!(stats["matched_readings"], 2);

    let events: Vec<Event> =
        reqwest::get(format!("{}/api/events", base)).await.unwrap().json().await.unwrap();
    assert!(events.iter().all(|e| e.device_name == "Thermostat"));
    assert_eq!(monitor.session().search, "thermostat");

    let stats: Value = client
        .put(format!("{}/api/filter", base))
        .json(&json!({ "filter": "" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["visible_events"], 3);
    assert_eq!(stats["matched_events"], 0);
}

#[tokio::test]
async fn test_buffer_size_endpoint() {
    let (monitor, base) = serve().await;
    let client = reqwest::Client::new();

    let response = client
        .put(format!("{}/api/buffer-size", base))
        .json(&json!({ "buffer_size": 20 }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert_eq!(monitor.db().buffer_size(), 20);

    let response = client
        .put(format!("{}/api/buffer-size", base))
        .json(&json!({ "buffer_size": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("Invalid buffer size 1"));
    assert_eq!(monitor.db().buffer_size(), 20);
}

#[tokio::test]
async fn test_processor_controls() {
    let (monitor, base) = serve().await;
    let client = reqwest::Client::new();

    let response =
        client.post(format!("{}/api/processor/deactivate", base)).send().await.unwrap();
    assert!(response.status().is_success());
    assert!(!monitor.is_connected());

    let stats: Value = reqwest::get(format!("{}/api/stats", base)).await.unwrap().json().await.unwrap();
    assert_eq!(stats["state"], "paused");

    client.post(format!("{}/api/processor/activate", base)).send().await.unwrap();
    assert!(monitor.is_connected());
}

#[tokio::test]
async fn test_filter_over_full_buffer_keeps_serving() {
    let (monitor, base) = serve().await;
    monitor.set_buffer_size(10_000).unwrap();

    let store = Arc::clone(monitor.db());
    tokio::task::spawn_blocking(move || {
        for i in 0..10_000 {
            let device = if i % 100 == 0 { "Thermostat" } else { "Camera" };
            store.ingest(&Event::new(&format!("evt-{}", i), device, "profile", 0, 0));
        }
    })
    .await
    .unwrap();

    let client = reqwest::Client::new();
    let filter = client.put(format!("{}/api/filter", base)).json(&json!({ "filter": "thermostat" })).send();
    let health = reqwest::get(format!("{}/health", base));
    let (filter, health) = tokio::join!(filter, health);

    assert!(health.unwrap().status().is_success());
    let stats: Value = filter.unwrap().json().await.unwrap();
    assert_eq!(stats["live_events"], 10_000);
    assert_eq!(stats["visible_events"], 100);

    let events: Vec<Event> =
        reqwest::get(format!("{}/api/events", base)).await.unwrap().json().await.unwrap();
    assert_eq!(events.len(), 100);
}
