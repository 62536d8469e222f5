//! Chat assistant: context building, remote completion, local fallback.
//!
//! The remote completion call is the one failure that is deliberately
//! swallowed: any error (network, non-2xx, malformed body) is logged at
//! warn and replaced by a rule-based local response, never surfaced to
//! the end user.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use soc_core::{Asset, AssetStatus, SecurityEvent, Severity};

use crate::report::{build_recommendations, CHAT_RECOMMENDATION_CAP};

/// Turns of history sent upstream with each completion request.
pub const HISTORY_LIMIT: usize = 10;

/// Events/assets summarized into the system context block.
const CONTEXT_EVENT_LIMIT: usize = 5;
const CONTEXT_ASSET_LIMIT: usize = 5;

const REMOTE_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);
const REMOTE_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("completion request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("completion service returned status {0}")]
    Status(u16),

    #[error("completion response was malformed: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

/// Counts of rows summarized into the context block for a reply.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContextMeta {
    pub events_used: usize,
    pub assets_used: usize,
}

/// One turn of the session-local conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub sender: Sender,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ContextMeta>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender: Sender::User,
            content: content.into(),
            timestamp: Utc::now(),
            context: None,
        }
    }

    pub fn assistant(content: impl Into<String>, context: ContextMeta) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender: Sender::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            context: Some(context),
        }
    }
}

// ----------------------------------------------------------------------
// Context building
// ----------------------------------------------------------------------

/// Bounded textual context block prepended as system context to the
/// completion call: counts, the most recent events, a sample of assets,
/// and aggregate callouts. `events` is expected newest-first, as the
/// store returns it.
pub fn build_context(events: &[SecurityEvent], assets: &[Asset]) -> String {
    let critical = events
        .iter()
        .filter(|e| e.severity == Severity::Critical)
        .count();
    let high = events.iter().filter(|e| e.severity == Severity::High).count();
    let offline = assets
        .iter()
        .filter(|a| a.status == AssetStatus::Offline)
        .count();

    let mut context = String::new();
    context.push_str("You are a security-operations assistant for one tenant.\n");
    context.push_str(&format!(
        "Current view: {} security events ({critical} critical, {high} high), {} assets monitored.\n",
        events.len(),
        assets.len(),
    ));

    if !events.is_empty() {
        context.push_str("\nMost recent events:\n");
        for event in events.iter().take(CONTEXT_EVENT_LIMIT) {
            context.push_str(&format!(
                "- [{}] {} on {} at {} (status: {})",
                event.severity,
                event.alert_name,
                event.host,
                event.timestamp.format("%Y-%m-%d %H:%M UTC"),
                if event.status.is_empty() { "unknown" } else { &event.status },
            ));
            if !event.comments.is_empty() {
                context.push_str(&format!(" — {}", event.comments));
            }
            context.push('\n');
        }
    }

    if !assets.is_empty() {
        context.push_str("\nAssets:\n");
        for asset in assets.iter().take(CONTEXT_ASSET_LIMIT) {
            context.push_str(&format!(
                "- {} ({}) — {}, {} vulnerabilities\n",
                asset.name,
                asset.ip_address,
                asset.status,
                asset.vulnerabilities.len(),
            ));
        }
    }

    let high_risk = assets.iter().filter(|a| a.critical_vuln_count() > 0).count();
    if high_risk > 0 {
        context.push_str(&format!(
            "\nCallout: {high_risk} asset(s) carry critical vulnerabilities.\n"
        ));
    }
    if offline > 0 {
        context.push_str(&format!("Callout: {offline} asset(s) are offline.\n"));
    }

    context
}

// ----------------------------------------------------------------------
// Completion backend
// ----------------------------------------------------------------------

/// One prior turn as sent upstream.
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    pub role: &'static str,
    pub content: String,
}

/// Seam between the chat engine and the remote text-generation service.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(
        &self,
        system_context: &str,
        history: &[Turn],
        user_message: &str,
    ) -> Result<String, ChatError>;
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    content: Vec<CompletionContent>,
}

#[derive(Deserialize)]
struct CompletionContent {
    text: String,
}

/// HTTP client for a messages-style completion API. Bounded retry with
/// exponential backoff; every attempt exhausted maps to one `ChatError`.
pub struct HttpCompletionBackend {
    api_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl HttpCompletionBackend {
    pub fn new(api_url: String, api_key: String, model: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REMOTE_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            api_url,
            api_key,
            model,
            client,
        }
    }

    async fn attempt(
        &self,
        system_context: &str,
        history: &[Turn],
        user_message: &str,
    ) -> Result<String, ChatError> {
        let mut messages: Vec<WireMessage> = history
            .iter()
            .map(|t| WireMessage {
                role: t.role,
                content: &t.content,
            })
            .collect();
        messages.push(WireMessage {
            role: "user",
            content: user_message,
        });

        let body = CompletionRequest {
            model: &self.model,
            max_tokens: 1024,
            system: system_context,
            messages,
        };

        let resp = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ChatError::Status(status.as_u16()));
        }

        let parsed: CompletionResponse = resp
            .json()
            .await
            .map_err(|e| ChatError::Malformed(e.to_string()))?;
        parsed
            .content
            .first()
            .map(|c| c.text.clone())
            .ok_or_else(|| ChatError::Malformed("empty content array".to_string()))
    }
}

#[async_trait]
impl CompletionBackend for HttpCompletionBackend {
    async fn complete(
        &self,
        system_context: &str,
        history: &[Turn],
        user_message: &str,
    ) -> Result<String, ChatError> {
        let mut last_err = None;
        for attempt in 0..REMOTE_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(RETRY_BASE_DELAY * 2u32.pow(attempt - 1)).await;
            }
            match self.attempt(system_context, history, user_message).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    warn!(attempt, error = %e, "completion attempt failed");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| ChatError::Malformed("no attempt made".to_string())))
    }
}

// ----------------------------------------------------------------------
// Fallback classifier
// ----------------------------------------------------------------------

/// Deterministic classification of the most recent event.
pub fn classify_latest_event(events: &[SecurityEvent]) -> String {
    let Some(latest) = events.iter().max_by_key(|e| e.timestamp) else {
        return "No events available to classify.".to_string();
    };

    let verdict = match latest.severity {
        Severity::Critical | Severity::High => {
            if latest.mentions("malware") {
                "True Positive - Malware Detection"
            } else if latest.mentions("intrusion") || latest.mentions("attack") {
                "True Positive - Intrusion Attempt"
            } else {
                "True Positive - Security Threat"
            }
        }
        Severity::Low | Severity::Info => "True Negative - Normal Activity",
        Severity::Medium | Severity::Unspecified => "Requires Investigation",
    };

    format!(
        "Latest event \"{}\" ({} severity): {}",
        latest.alert_name, latest.severity, verdict
    )
}

/// Rule-based response used whenever the remote call fails. Keyword
/// groups are checked in fixed order; the first match wins.
pub fn fallback_response(message: &str, events: &[SecurityEvent], assets: &[Asset]) -> String {
    let msg = message.to_ascii_lowercase();
    let contains_any = |keys: &[&str]| keys.iter().any(|k| msg.contains(k));

    if contains_any(&["event", "alert", "incident"]) {
        let actionable = events
            .iter()
            .filter(|e| e.severity.is_actionable())
            .count();
        return format!(
            "There are {} security events in the current view. {} are critical or high \
             severity and require attention.",
            events.len(),
            actionable
        );
    }

    if contains_any(&["asset", "system", "vulnerability"]) {
        let vulnerable = assets.iter().filter(|a| a.is_vulnerable()).count();
        let total_vulns: usize = assets.iter().map(|a| a.vulnerabilities.len()).sum();
        let offline = assets
            .iter()
            .filter(|a| a.status == AssetStatus::Offline)
            .count();
        return format!(
            "{} assets are monitored. {} have known vulnerabilities ({} records total) \
             and {} are offline.",
            assets.len(),
            vulnerable,
            total_vulns,
            offline
        );
    }

    if contains_any(&["classify", "analyze"]) {
        return classify_latest_event(events);
    }

    if contains_any(&["recommend", "suggest", "advice"]) {
        let critical = events
            .iter()
            .filter(|e| e.severity == Severity::Critical)
            .count() as u64;
        let high = events.iter().filter(|e| e.severity == Severity::High).count() as u64;
        let vulnerable = assets.iter().filter(|a| a.is_vulnerable()).count() as u64;
        let offline = assets
            .iter()
            .filter(|a| a.status == AssetStatus::Offline)
            .count() as u64;
        let recs = build_recommendations(
            critical,
            high,
            vulnerable,
            offline,
            Some(CHAT_RECOMMENDATION_CAP),
        );
        let mut out = String::from("Recommended next steps:\n");
        for (idx, rec) in recs.iter().enumerate() {
            out.push_str(&format!("{}. {rec}\n", idx + 1));
        }
        return out;
    }

    "I can summarize events and alerts, report on assets and vulnerabilities, classify \
     the latest event, or suggest next steps. Ask me about any of those."
        .to_string()
}

// ----------------------------------------------------------------------
// Engine
// ----------------------------------------------------------------------

/// Orchestrates one assistant reply: build context, call the backend,
/// degrade to the local classifier on any failure.
pub struct ChatEngine {
    backend: Box<dyn CompletionBackend>,
}

impl ChatEngine {
    pub fn new(backend: Box<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    pub async fn respond(
        &self,
        history: &[ChatMessage],
        user_message: &str,
        events: &[SecurityEvent],
        assets: &[Asset],
    ) -> ChatMessage {
        let context = build_context(events, assets);
        let meta = ContextMeta {
            events_used: events.len().min(CONTEXT_EVENT_LIMIT),
            assets_used: assets.len().min(CONTEXT_ASSET_LIMIT),
        };

        let turns: Vec<Turn> = history
            .iter()
            .rev()
            .take(HISTORY_LIMIT)
            .rev()
            .map(|m| Turn {
                role: match m.sender {
                    Sender::User => "user",
                    Sender::Assistant => "assistant",
                },
                content: m.content.clone(),
            })
            .collect();

        let content = match self.backend.complete(&context, &turns, user_message).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "remote generation failed, using local fallback");
                fallback_response(user_message, events, assets)
            }
        };

        ChatMessage::assistant(content, meta)
    }
}
