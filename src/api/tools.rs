//! Tool endpoints
//!
//! `GET /v1/tools` lists the catalog; `POST /v1/tools/:name` runs one tool
//! with a JSON object of arguments.

use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::server::state::AppState;
use crate::services::catalog::EndpointDef;

#[derive(Serialize)]
pub struct ToolListResponse {
    pub count: usize,
    pub tools: &'static [EndpointDef],
}

#[derive(Serialize)]
pub struct ToolResponse {
    pub tool: String,
    pub result: Value,
}

/// GET /v1/tools
pub async fn list_tools(State(state): State<AppState>) -> Json<ToolListResponse> {
    let tools = state.tools.list();
    Json(ToolListResponse {
        count: tools.len(),
        tools,
    })
}

/// POST /v1/tools/:name
///
/// An empty body means "no arguments".
pub async fn invoke_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<ToolResponse>, ApiError> {
    let args = parse_args(&body)?;

    match state.tools.invoke(&name, &args).await {
        Ok(result) => Ok(Json(ToolResponse { tool: name, result })),
        Err(err) => {
            tracing::debug!(tool = %name, error = %err, "Tool invocation failed");
            Err(match ApiError::from(err) {
                ApiError::NoCredentialAvailable { .. } => ApiError::NoCredentialAvailable {
                    retry_after_secs: soonest_reactivation(&state),
                },
                other => other,
            })
        }
    }
}

fn parse_args(body: &[u8]) -> Result<Map<String, Value>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(_) => Err(ApiError::InvalidRequest(
            "request body must be a JSON object of tool arguments".to_string(),
        )),
        Err(e) => Err(ApiError::InvalidRequest(format!("invalid JSON body: {}", e))),
    }
}

/// Seconds until the first disabled credential comes back
fn soonest_reactivation(state: &AppState) -> Option<u64> {
    state
        .pool_stats()
        .credentials
        .iter()
        .filter_map(|c| c.disabled_for_secs)
        .min()
}
