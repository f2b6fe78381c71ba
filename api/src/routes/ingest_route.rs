//! Bulk ingestion trigger route.

use crate::AppState;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use memory_store::{IngestOptions, Metadata};
use regex::Regex;
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::PathBuf;
use tracing::error;

#[derive(Deserialize)]
pub struct IngestRequest {
    pub path: PathBuf,
    #[serde(default)]
    pub collection_name: Option<String>,
    #[serde(default)]
    pub include: Option<String>,
    #[serde(default)]
    pub exclude: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    /// Document-set name or alias; resolved to a canonical slug and stored
    /// as `set` metadata on every ingested entry.
    #[serde(default)]
    pub set: Option<String>,
}

/// `POST /ingest`: walks a path on the server host and stores every
/// supported file it finds.
pub async fn ingest(
    State(server): State<AppState>,
    Json(req): Json<IngestRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut extra_metadata = req.metadata.unwrap_or_default();
    if let Some(set) = &req.set {
        let slug = server
            .set_matcher()
            .match_set(set)
            .unwrap_or(set.as_str())
            .to_string();
        extra_metadata.insert("set".into(), Value::from(slug));
    }

    let options = IngestOptions {
        include: compile_pattern(req.include.as_deref(), "include")?,
        exclude: compile_pattern(req.exclude.as_deref(), "exclude")?,
        extra_metadata,
    };

    let report = server
        .ingestor()
        .ingest_path(&req.path, req.collection_name.as_deref(), &options)
        .await
        .map_err(|e| {
            error!("Ingestion of {} failed: {e}", req.path.display());
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": e.to_string() })),
            )
        })?;

    Ok(Json(json!({
        "successful": report.successful,
        "failed": report.failed,
    })))
}

fn compile_pattern(
    raw: Option<&str>,
    which: &str,
) -> Result<Option<Regex>, (StatusCode, Json<Value>)> {
    raw.map(Regex::new).transpose().map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": format!("invalid {which} pattern: {e}") })),
        )
    })
}
