//! SOC platform server library.
//!
//! Exposes the report pipeline, PDF export, chat engine and HTTP API
//! for in-process testing.

pub mod api;
pub mod chat;
pub mod config;
pub mod db;
pub mod logging;
pub mod pdf;
pub mod report;
pub mod session;

pub use api::{ApiResponse, AppState, ChatRequest, ReportRequest, SharedState};
pub use chat::{
    build_context, classify_latest_event, fallback_response, ChatEngine, ChatError, ChatMessage,
    CompletionBackend, ContextMeta, HttpCompletionBackend, Sender, Turn,
};
pub use db::{Database, StoreError, Table};
pub use pdf::{report_filename, slugify, PdfRenderer};
pub use report::{
    aggregate, aggregate_in_window, build_recommendations, risk_score, TelemetryInputs,
    CHAT_RECOMMENDATION_CAP, TOP_LIMIT,
};
pub use session::{AuthError, AuthState, IdentityProvider, SessionContext, StaticIdentityProvider};
