use std::{env, error::Error, sync::Arc};

mod routes;
mod server;

pub use server::MemoryServer;

use axum::{
    Router,
    routing::{get, post},
};
use memory_store::Settings;
use tokio::signal;
use tracing::info;

use crate::routes::{
    ingest_route::ingest,
    tools_route::{call_tool, list_collections, list_tools},
};

/// Shared handler state.
pub type AppState = Arc<MemoryServer>;

pub async fn start() -> Result<(), Box<dyn Error>> {
    let host_url = env::var("API_ADDRESS").unwrap_or_else(|_| "127.0.0.1:8080".into());

    let settings = Settings::from_env()?;
    let state: AppState = Arc::new(MemoryServer::build(settings)?);

    let app = Router::new()
        .route("/tools", get(list_tools))
        .route("/tools/{name}", post(call_tool))
        .route("/collections", get(list_collections))
        .route("/ingest", post(ingest))
        .with_state(state);

    // Bind to address
    let listener = tokio::net::TcpListener::bind(&host_url).await?;
    info!("Listening on {host_url}");

    // Start server with graceful shutdown on Ctrl+C
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Returns a future that resolves when Ctrl+C is pressed
async fn shutdown_signal() {
    // Wait for the Ctrl+C signal
    signal::ctrl_c()
        .await
        .expect("Failed to listen for shutdown signal");
}
