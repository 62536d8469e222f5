//! HTTP API for the SOC dashboard frontend.
//!
//! Endpoints under /api:
//! - GET  /api/health - liveness + build info
//! - GET  /api/clients - tenant list
//! - GET  /api/clients/:id/assets - asset inventory
//! - GET  /api/clients/:id/events - event rows, newest first
//! - POST /api/clients/:id/report - aggregated ReportData (report tabs)
//! - POST /api/clients/:id/report/pdf - rendered PDF attachment
//! - POST /api/clients/:id/chat - assistant reply
//! - POST /api/auth/* - session operations

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use soc_core::{ReportData, ReportError};

use crate::chat::{ChatEngine, ChatMessage};
use crate::db::{Database, StoreError};
use crate::pdf::{report_filename, PdfRenderer};
use crate::report::{aggregate, TelemetryInputs};
use crate::session::{SessionContext, StaticIdentityProvider};

// ============================================================================
// Application State
// ============================================================================

pub struct AppState {
    pub db: Database,
    pub chat: ChatEngine,
    pub session: SessionContext,
    pub telemetry: TelemetryInputs,
    /// Session-local conversation history, per tenant.
    pub conversations: RwLock<HashMap<String, Vec<ChatMessage>>>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(db: Database, chat: ChatEngine, telemetry: TelemetryInputs) -> Self {
        Self {
            db,
            chat,
            session: SessionContext::new(Box::new(StaticIdentityProvider::default())),
            telemetry,
            conversations: RwLock::new(HashMap::new()),
        }
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }

    fn err(msg: &str) -> Json<Self> {
        Json(Self {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        })
    }
}

/// Report window as sent by the frontend. Either endpoint may be
/// absent; the aggregator rejects that before computing anything.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ReportRequest {
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct EventQueryParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/clients", get(list_clients))
        .route("/api/clients/:id/assets", get(client_assets))
        .route("/api/clients/:id/events", get(client_events))
        .route("/api/clients/:id/report", post(client_report))
        .route("/api/clients/:id/report/pdf", post(client_report_pdf))
        .route("/api/clients/:id/chat", post(client_chat))
        .route("/api/auth/signin", post(auth_sign_in))
        .route("/api/auth/signup", post(auth_sign_up))
        .route("/api/auth/signout", post(auth_sign_out))
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> impl IntoResponse {
    ApiResponse::ok(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn list_clients(State(state): State<SharedState>) -> impl IntoResponse {
    match state.db.list_clients() {
        Ok(clients) => (StatusCode::OK, ApiResponse::ok(clients)),
        Err(e) => store_failure(e),
    }
}

async fn client_assets(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.db.assets_for_client(&id) {
        Ok(assets) => (StatusCode::OK, ApiResponse::ok(assets)),
        Err(e) => store_failure(e),
    }
}

async fn client_events(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(params): Query<EventQueryParams>,
) -> impl IntoResponse {
    match state.db.events_for_client(&id, params.limit) {
        Ok(events) => (StatusCode::OK, ApiResponse::ok(events)),
        Err(e) => store_failure(e),
    }
}

/// Shared by the JSON and PDF report endpoints: snapshot the tenant's
/// rows and aggregate over the requested window.
fn build_report(
    state: &AppState,
    client_id: &str,
    req: &ReportRequest,
) -> Result<(String, ReportData), (StatusCode, Json<ApiResponse<ReportData>>)> {
    let client = match state.db.get_client(client_id) {
        Ok(Some(client)) => client,
        Ok(None) => {
            return Err((StatusCode::NOT_FOUND, ApiResponse::err("Client not found")));
        }
        Err(e) => return Err(store_failure(e)),
    };

    let events = state.db.events_for_client(client_id, None).map_err(store_failure)?;
    let assets = state.db.assets_for_client(client_id).map_err(store_failure)?;

    match aggregate(&events, &assets, req.from, req.to, state.telemetry) {
        Ok(report) => Ok((client.name, report)),
        Err(e @ ReportError::InvalidWindow) => {
            Err((StatusCode::BAD_REQUEST, ApiResponse::err(&e.to_string())))
        }
    }
}

async fn client_report(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<ReportRequest>,
) -> impl IntoResponse {
    match build_report(&state, &id, &req) {
        Ok((_, report)) => (StatusCode::OK, ApiResponse::ok(report)),
        Err(resp) => resp,
    }
}

async fn client_report_pdf(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<ReportRequest>,
) -> axum::response::Response {
    let (client_name, report) = match build_report(&state, &id, &req) {
        Ok(pair) => pair,
        Err(resp) => return resp.into_response(),
    };

    let renderer = PdfRenderer::new();
    match renderer.render(&report, &client_name) {
        Ok(pdf_bytes) => {
            let filename = report_filename(&client_name, Utc::now());
            let content_disposition = format!("attachment; filename=\"{filename}\"");
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "application/pdf".to_string()),
                    (header::CONTENT_DISPOSITION, content_disposition),
                ],
                pdf_bytes,
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "PDF generation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiResponse::<ReportData>::err(&format!("PDF generation failed: {e}")),
            )
                .into_response()
        }
    }
}

async fn client_chat(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> impl IntoResponse {
    // Snapshot rows for context. Only the remote completion call is
    // allowed to fail silently; a store failure stays fatal.
    let events = match state.db.events_for_client(&id, None) {
        Ok(events) => events,
        Err(e) => return store_failure(e),
    };
    let assets = match state.db.assets_for_client(&id) {
        Ok(assets) => assets,
        Err(e) => return store_failure(e),
    };

    let history = {
        let conversations = state.conversations.read().await;
        conversations.get(&id).cloned().unwrap_or_default()
    };

    let reply = state
        .chat
        .respond(&history, &req.message, &events, &assets)
        .await;

    {
        let mut conversations = state.conversations.write().await;
        let conversation = conversations.entry(id).or_default();
        conversation.push(ChatMessage::user(&req.message));
        conversation.push(reply.clone());
    }

    (StatusCode::OK, ApiResponse::ok(reply))
}

async fn auth_sign_in(
    State(state): State<SharedState>,
    Json(req): Json<CredentialsRequest>,
) -> impl IntoResponse {
    match state.session.sign_in(&req.email, &req.password).await {
        Ok(_) => (
            StatusCode::OK,
            ApiResponse::ok(serde_json::json!({ "authenticated": true })),
        ),
        Err(e) => (StatusCode::UNAUTHORIZED, ApiResponse::err(&e.to_string())),
    }
}

async fn auth_sign_up(
    State(state): State<SharedState>,
    Json(req): Json<CredentialsRequest>,
) -> impl IntoResponse {
    match state.session.sign_up(&req.email, &req.password).await {
        Ok(_) => (
            StatusCode::OK,
            ApiResponse::ok(serde_json::json!({ "authenticated": true })),
        ),
        Err(e) => (StatusCode::BAD_REQUEST, ApiResponse::err(&e.to_string())),
    }
}

async fn auth_sign_out(State(state): State<SharedState>) -> impl IntoResponse {
    state.session.sign_out();
    ApiResponse::ok(serde_json::json!({ "authenticated": false }))
}

/// Store failure is fatal to the requesting view; no partial data.
fn store_failure<T: Serialize>(e: StoreError) -> (StatusCode, Json<ApiResponse<T>>) {
    error!(error = %e, "row store query failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ApiResponse::err(&format!("Upstream fetch failed: {e}")),
    )
}
