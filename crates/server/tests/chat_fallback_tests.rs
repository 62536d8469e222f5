//! Fallback-path tests for the chat assistant.
//!
//! The remote completion backend is injected, so these tests force
//! failures and assert the local classifier answers instead — the one
//! place a failure is deliberately swallowed.

use axum_test::TestServer;
use chrono::{TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use soc_core::{Client, ClientSettings, Label, SecurityEvent, Severity};
use soc_server::api::{router, AppState};
use soc_server::chat::{
    ChatEngine, ChatError, ChatMessage, CompletionBackend, Sender, Turn, HISTORY_LIMIT,
};
use soc_server::db::Database;
use soc_server::report::TelemetryInputs;

// ============================================================================
// Injected backends
// ============================================================================

/// Always fails, counting attempts.
struct FailingBackend {
    calls: AtomicUsize,
}

impl FailingBackend {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl CompletionBackend for FailingBackend {
    async fn complete(&self, _: &str, _: &[Turn], _: &str) -> Result<String, ChatError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ChatError::Status(502))
    }
}

/// Succeeds, recording what it was sent.
#[derive(Default)]
struct RecordingBackend {
    seen: Mutex<Option<(String, usize)>>,
}

#[async_trait::async_trait]
impl CompletionBackend for RecordingBackend {
    async fn complete(
        &self,
        system_context: &str,
        history: &[Turn],
        _: &str,
    ) -> Result<String, ChatError> {
        *self.seen.lock().unwrap() = Some((system_context.to_string(), history.len()));
        Ok("remote reply".to_string())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn event(id: &str, severity: Severity, alert: &str, hour: u32) -> SecurityEvent {
    SecurityEvent {
        event_id: id.to_string(),
        client_id: "c1".to_string(),
        timestamp: Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).unwrap(),
        severity,
        event_type: "endpoint".to_string(),
        alert_name: alert.to_string(),
        host: "ws-01".to_string(),
        label: Label::Unclassified,
        status: "open".to_string(),
        comments: String::new(),
        forensics: Default::default(),
    }
}

fn mixed_events() -> Vec<SecurityEvent> {
    vec![
        event("e1", Severity::Critical, "Malware beacon", 10),
        event("e2", Severity::Critical, "Credential dump", 11),
        event("e3", Severity::Medium, "Port scan", 12),
    ]
}

// ============================================================================
// Engine-level fallback tests
// ============================================================================

#[tokio::test]
async fn failed_remote_call_degrades_to_event_summary() {
    let engine = ChatEngine::new(Box::new(FailingBackend::new()));
    let events = mixed_events();

    let reply = engine.respond(&[], "any new alerts today?", &events, &[]).await;

    assert_eq!(reply.sender, Sender::Assistant);
    // 2 critical + 1 medium: totals per the classifier contract.
    assert!(reply.content.contains("3 security events"), "{}", reply.content);
    assert!(reply.content.contains("2 are critical or high"), "{}", reply.content);
}

#[tokio::test]
async fn fallback_selects_branch_by_keyword() {
    let engine = ChatEngine::new(Box::new(FailingBackend::new()));
    let events = mixed_events();

    let reply = engine.respond(&[], "classify the latest", &events, &[]).await;
    assert!(reply.content.contains("Requires Investigation"), "{}", reply.content);

    let reply = engine.respond(&[], "what do you suggest?", &events, &[]).await;
    assert!(reply.content.contains("Recommended next steps"), "{}", reply.content);

    let reply = engine.respond(&[], "good morning", &events, &[]).await;
    assert!(reply.content.contains("I can summarize"), "{}", reply.content);
}

#[tokio::test]
async fn fallback_never_errors_and_carries_context_metadata() {
    let engine = ChatEngine::new(Box::new(FailingBackend::new()));
    let events = mixed_events();

    let reply = engine.respond(&[], "hello", &events, &[]).await;
    let context = reply.context.expect("assistant reply carries context metadata");
    assert_eq!(context.events_used, 3);
    assert_eq!(context.assets_used, 0);
}

// ============================================================================
// Remote-path plumbing
// ============================================================================

#[tokio::test]
async fn remote_reply_passes_through_untouched() {
    let engine = ChatEngine::new(Box::new(RecordingBackend::default()));
    let reply = engine.respond(&[], "hello", &mixed_events(), &[]).await;
    assert_eq!(reply.content, "remote reply");
}

#[tokio::test]
async fn history_sent_upstream_is_capped_at_ten_turns() {
    let backend = Arc::new(RecordingBackend::default());

    struct Forward(Arc<RecordingBackend>);
    #[async_trait::async_trait]
    impl CompletionBackend for Forward {
        async fn complete(
            &self,
            system_context: &str,
            history: &[Turn],
            user_message: &str,
        ) -> Result<String, ChatError> {
            self.0.complete(system_context, history, user_message).await
        }
    }

    let engine = ChatEngine::new(Box::new(Forward(backend.clone())));

    let history: Vec<ChatMessage> = (0..25).map(|n| ChatMessage::user(format!("turn {n}"))).collect();
    engine.respond(&history, "latest question", &[], &[]).await;

    let seen = backend.seen.lock().unwrap().clone();
    let (context, turns) = seen.expect("backend saw the request");
    assert_eq!(turns, HISTORY_LIMIT);
    assert!(context.contains("0 security events"));
}

// ============================================================================
// HTTP endpoint
// ============================================================================

fn chat_state() -> Arc<AppState> {
    let db = Database::open_in_memory().unwrap();
    db.upsert_client(&Client {
        client_id: "c1".to_string(),
        name: "Acme Corp".to_string(),
        contact_email: "soc@acme.example".to_string(),
        settings: ClientSettings::default(),
    })
    .unwrap();
    for e in mixed_events() {
        db.insert_event(&e).unwrap();
    }
    Arc::new(AppState::new(
        db,
        ChatEngine::new(Box::new(FailingBackend::new())),
        TelemetryInputs::default(),
    ))
}

#[tokio::test]
async fn chat_endpoint_returns_fallback_reply() {
    let server = TestServer::new(router(chat_state())).unwrap();

    let response = server
        .post("/api/clients/c1/chat")
        .json(&serde_json::json!({ "message": "how many incidents?" }))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["sender"], "assistant");
    assert!(body["data"]["content"]
        .as_str()
        .unwrap()
        .contains("3 security events"));
}

#[tokio::test]
async fn conversation_accumulates_turns() {
    let server = TestServer::new(router(chat_state())).unwrap();

    for message in ["first question about alerts", "second question about assets"] {
        let response = server
            .post("/api/clients/c1/chat")
            .json(&serde_json::json!({ "message": message }))
            .await;
        response.assert_status_ok();
    }

    // Second reply should be the asset branch, proving per-message routing.
    let response = server
        .post("/api/clients/c1/chat")
        .json(&serde_json::json!({ "message": "tell me about my systems" }))
        .await;
    let body: serde_json::Value = response.json();
    assert!(body["data"]["content"]
        .as_str()
        .unwrap()
        .contains("assets are monitored"));
}
