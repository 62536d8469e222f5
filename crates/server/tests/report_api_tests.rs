//! In-process integration tests for the report and inventory API.

use axum_test::TestServer;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

use soc_core::{
    Asset, AssetStatus, Client, ClientSettings, Label, ReportData, SecurityEvent, Severity,
    Vulnerability,
};
use soc_server::api::{router, AppState};
use soc_server::chat::{ChatEngine, ChatError, CompletionBackend, Turn};
use soc_server::db::Database;
use soc_server::report::TelemetryInputs;

struct OfflineBackend;

#[async_trait::async_trait]
impl CompletionBackend for OfflineBackend {
    async fn complete(&self, _: &str, _: &[Turn], _: &str) -> Result<String, ChatError> {
        Err(ChatError::Status(503))
    }
}

fn ts(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, day, hour, 0, 0).unwrap()
}

fn event(id: &str, severity: Severity, timestamp: DateTime<Utc>) -> SecurityEvent {
    SecurityEvent {
        event_id: id.to_string(),
        client_id: "c1".to_string(),
        timestamp,
        severity,
        event_type: "endpoint".to_string(),
        alert_name: format!("Alert {id}"),
        host: "ws-01".to_string(),
        label: Label::Unclassified,
        status: "open".to_string(),
        comments: String::new(),
        forensics: Default::default(),
    }
}

fn seeded_state() -> Arc<AppState> {
    let db = Database::open_in_memory().unwrap();
    db.upsert_client(&Client {
        client_id: "c1".to_string(),
        name: "Acme Corp".to_string(),
        contact_email: "soc@acme.example".to_string(),
        settings: ClientSettings::default(),
    })
    .unwrap();

    db.insert_event(&event("e1", Severity::Critical, ts(10, 9))).unwrap();
    db.insert_event(&event("e2", Severity::High, ts(11, 9))).unwrap();
    db.insert_event(&event("e3", Severity::Low, ts(12, 9))).unwrap();
    // Outside any June window used below.
    db.insert_event(&event("e4", Severity::Critical, ts(30, 23))).unwrap();

    db.upsert_asset(&Asset {
        asset_id: "a1".to_string(),
        client_id: "c1".to_string(),
        name: "db-01".to_string(),
        ip_address: "10.0.0.9".to_string(),
        status: AssetStatus::Offline,
        vulnerabilities: vec![Vulnerability {
            cve_id: "CVE-2025-1234".to_string(),
            severity: Severity::Critical,
            description: "remote code execution".to_string(),
        }],
    })
    .unwrap();

    Arc::new(AppState::new(
        db,
        ChatEngine::new(Box::new(OfflineBackend)),
        TelemetryInputs {
            avg_response_time_ms: 340.0,
            system_uptime_pct: 99.95,
        },
    ))
}

fn envelope_data(body: &serde_json::Value) -> &serde_json::Value {
    assert_eq!(body["success"], true, "expected success envelope: {body}");
    &body["data"]
}

#[tokio::test]
async fn health_reports_ok() {
    let server = TestServer::new(router(seeded_state())).unwrap();
    let body: serde_json::Value = server.get("/api/health").await.json();
    assert_eq!(envelope_data(&body)["status"], "ok");
}

#[tokio::test]
async fn clients_listing_returns_seeded_tenant() {
    let server = TestServer::new(router(seeded_state())).unwrap();
    let body: serde_json::Value = server.get("/api/clients").await.json();
    let clients = envelope_data(&body).as_array().unwrap();
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0]["name"], "Acme Corp");
}

#[tokio::test]
async fn events_listing_is_newest_first_and_limited() {
    let server = TestServer::new(router(seeded_state())).unwrap();
    let body: serde_json::Value = server
        .get("/api/clients/c1/events")
        .add_query_param("limit", 2)
        .await
        .json();
    let events = envelope_data(&body).as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["event_id"], "e4");
    assert_eq!(events[1]["event_id"], "e3");
}

#[tokio::test]
async fn report_aggregates_only_window_rows() {
    let server = TestServer::new(router(seeded_state())).unwrap();

    let response = server
        .post("/api/clients/c1/report")
        .json(&serde_json::json!({
            "from": "2025-06-01T00:00:00Z",
            "to": "2025-06-15T00:00:00Z",
        }))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    let report: ReportData = serde_json::from_value(envelope_data(&body).clone()).unwrap();

    // e4 (June 30) is outside the window.
    assert_eq!(report.summary.total_events, 3);
    assert_eq!(report.histogram.critical, 1);
    assert_eq!(report.histogram.high, 1);
    assert_eq!(report.histogram.low, 1);
    assert_eq!(report.summary.risk_score, 100);
    assert_eq!(report.summary.assets_monitored, 1);
    assert_eq!(report.asset_summary.offline, 1);
    assert_eq!(report.asset_summary.vulnerable, 1);
    assert_eq!(report.vulnerable_assets.len(), 1);
    assert_eq!(report.vulnerable_assets[0].critical_vulns, 1);
    assert_eq!(report.compliance.events_processed, 3);
    assert_eq!(report.compliance.avg_response_time_ms, 340.0);

    // Critical events and a vulnerable offline asset: the first three
    // recommendations are the conditional advisories.
    assert!(report.recommendations.len() >= 3);
}

#[tokio::test]
async fn report_with_missing_endpoint_is_rejected() {
    let server = TestServer::new(router(seeded_state())).unwrap();

    let response = server
        .post("/api/clients/c1/report")
        .json(&serde_json::json!({ "to": "2025-06-15T00:00:00Z" }))
        .await;
    response.assert_status_bad_request();

    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("window"));
}

#[tokio::test]
async fn report_for_unknown_client_is_404() {
    let server = TestServer::new(router(seeded_state())).unwrap();
    let response = server
        .post("/api/clients/ghost/report")
        .json(&serde_json::json!({
            "from": "2025-06-01T00:00:00Z",
            "to": "2025-06-15T00:00:00Z",
        }))
        .await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn assets_listing_round_trips_vulnerabilities() {
    let server = TestServer::new(router(seeded_state())).unwrap();
    let body: serde_json::Value = server.get("/api/clients/c1/assets").await.json();
    let assets = envelope_data(&body).as_array().unwrap();
    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0]["status"], "offline");
    assert_eq!(assets[0]["vulnerabilities"][0]["cve_id"], "CVE-2025-1234");
}

#[tokio::test]
async fn auth_round_trip() {
    let server = TestServer::new(router(seeded_state())).unwrap();

    let response = server
        .post("/api/auth/signup")
        .json(&serde_json::json!({ "email": "a@example.com", "password": "pw" }))
        .await;
    response.assert_status_ok();

    let response = server
        .post("/api/auth/signin")
        .json(&serde_json::json!({ "email": "a@example.com", "password": "wrong" }))
        .await;
    assert_eq!(response.status_code(), 401);

    let response = server
        .post("/api/auth/signin")
        .json(&serde_json::json!({ "email": "a@example.com", "password": "pw" }))
        .await;
    response.assert_status_ok();
}
