//! Tool introspection and invocation routes.

use crate::AppState;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use memory_tools::ToolError;
use serde_json::{Map, Value, json};
use tracing::warn;

/// `GET /tools`: names, descriptions and JSON Schemas of every tool.
pub async fn list_tools(State(server): State<AppState>) -> Json<Value> {
    let tools: Vec<Value> = server
        .tools()
        .iter()
        .map(|t| {
            json!({
                "name": t.spec().name,
                "description": t.spec().description,
                "input_schema": t.spec().json_schema(),
            })
        })
        .collect();
    Json(Value::Array(tools))
}

/// `GET /collections`: names of all collections on the Qdrant server.
pub async fn list_collections(
    State(server): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let names = server
        .ingestor()
        .connector()
        .list_collections()
        .await
        .map_err(|e| error_response(StatusCode::BAD_GATEWAY, e.to_string()))?;
    Ok(Json(json!({ "collections": names })))
}

/// `POST /tools/{name}`: invokes one tool with a JSON argument object.
pub async fn call_tool(
    State(server): State<AppState>,
    Path(name): Path<String>,
    Json(args): Json<Map<String, Value>>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let Some(tool) = server.tool(&name) else {
        return Err(error_response(
            StatusCode::NOT_FOUND,
            format!("unknown tool '{name}'"),
        ));
    };

    match tool.invoke(args).await {
        Ok(result) => Ok(Json(json!({ "result": result }))),
        Err(e) => {
            warn!("Tool '{name}' failed: {e}");
            let status = match &e {
                ToolError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
                ToolError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
                ToolError::Execution(_) => StatusCode::BAD_GATEWAY,
            };
            Err(error_response(status, e.to_string()))
        }
    }
}

fn error_response(status: StatusCode, message: String) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": message })))
}
