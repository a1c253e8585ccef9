//! Integration tests for the gateway HTTP surface.

use axum::body::Body;
use fep_control_core::config::SessionConfig;
use fep_control_core::fleet::{FleetConfig, SimParticipantConfig, SimSystemConfig};
use fep_control_core::gateway::{GatewayConfig, GatewayState, SharedGateway, gateway_router};
use fep_control_core::{OutputFormatter, SimulatedFleet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

fn make_gateway(token: CancellationToken) -> SharedGateway {
    let fleet = SimulatedFleet::new(&FleetConfig {
        systems: vec![SimSystemConfig::new(
            "demo",
            vec![SimParticipantConfig::new("part_a")],
        )],
    });
    Arc::new(GatewayState::new(
        Arc::new(fleet),
        GatewayConfig::default(),
        SessionConfig {
            auto_discovery: true,
            json: true,
        },
        token,
    ))
}

async fn get_json(gw: SharedGateway, uri: &str) -> (axum::http::StatusCode, serde_json::Value) {
    let app = gateway_router(gw);
    let req = axum::http::Request::builder()
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let resp = ServiceExt::<axum::http::Request<Body>>::oneshot(app, req)
        .await
        .unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), 100_000)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn health_reports_no_connections_at_start() {
    let (status, json) = get_json(make_gateway(CancellationToken::new()), "/health").await;
    assert_eq!(status, 200);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["connections"], 0);
    assert!(json["uptime_secs"].as_u64().unwrap() < 5);
}

#[tokio::test]
async fn ws_route_requires_upgrade() {
    let app = gateway_router(make_gateway(CancellationToken::new()));
    let req = axum::http::Request::builder()
        .uri("/ws")
        .body(Body::empty())
        .unwrap();
    let resp = ServiceExt::<axum::http::Request<Body>>::oneshot(app, req)
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
}

#[tokio::test]
async fn sessions_start_in_configured_modes() {
    let gw = make_gateway(CancellationToken::new());
    let sink = fep_control_core::BufferSink::new();
    let out = Arc::new(OutputFormatter::new(sink.clone(), true));
    let mut session = gw.new_session(out);

    let status = tokio::task::spawn_blocking(move || session.execute_line("getParticipants demo"))
        .await
        .unwrap();
    assert_eq!(status, Some(0));
    let record: serde_json::Value = serde_json::from_str(sink.contents().trim()).unwrap();
    assert_eq!(record["system name"], "demo");
    assert_eq!(record["participants"], "part_a");
}

#[tokio::test]
async fn run_stops_when_token_is_cancelled() {
    let token = CancellationToken::new();
    let gw = Arc::new(GatewayState::new(
        Arc::new(SimulatedFleet::new(&FleetConfig::default())),
        GatewayConfig {
            host: "127.0.0.1".into(),
            port: 0,
            max_connections: 1,
            goodbye_grace_ms: 0,
            outbound_queue: 16,
        },
        SessionConfig::default(),
        token.clone(),
    ));
    let server = tokio::spawn(fep_control_core::gateway::run_gateway(gw));
    token.cancel();
    let finished = tokio::time::timeout(std::time::Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();
    assert!(finished.is_ok());
}
