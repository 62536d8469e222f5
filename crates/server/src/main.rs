// soc-server main.rs
// HTTP API for the SOC dashboard

use clap::Parser;
use std::sync::Arc;
use tracing::info;

use soc_server::api::{router, AppState};
use soc_server::chat::{ChatEngine, HttpCompletionBackend};
use soc_server::config::ServerConfig;
use soc_server::db::Database;
use soc_server::logging::init_logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::parse();
    let _log_guard = init_logging(&config.log_dir);

    let db = Database::open(&config.db_path)?;
    info!(db_path = %config.db_path.display(), "row store opened");

    let backend = HttpCompletionBackend::new(
        config.completion_url.clone(),
        config.completion_api_key.clone(),
        config.completion_model.clone(),
    );
    let chat = ChatEngine::new(Box::new(backend));

    let state = Arc::new(AppState::new(db, chat, config.telemetry()));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!(bind = %config.bind, "soc-server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
