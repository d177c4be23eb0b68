/// Flow management REST API endpoints
///
/// Provides CRUD operations for flow definitions. Updates replace the whole
/// definition; the store diffs it against what is persisted.

use crate::api::{parse_body, ApiError, AppState, MutationResponse};
use crate::flow::Flow;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};

/// Create flow management routes
pub fn create_flow_routes() -> Router<AppState> {
    Router::new()
        .route("/flows", get(list_flows).post(create_flow))
        .route(
            "/flows/{id}",
            get(get_flow).put(update_flow).delete(delete_flow),
        )
}

/// List all flows
///
/// GET /flows
/// Returns: [{ "id": "...", "name": "...", "nodes": [...], "edges": [...], "items": [...] }]
async fn list_flows(State(state): State<AppState>) -> Result<Json<Vec<Flow>>, ApiError> {
    match state.flows.list_flows().await {
        Ok(flows) => Ok(Json(flows)),
        Err(e) => {
            tracing::error!("Failed to list flows: {}", e);
            Err(ApiError::from_store("list flows", e))
        }
    }
}

/// Get a specific flow by ID
///
/// GET /flows/{id}
async fn get_flow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Flow>, ApiError> {
    match state.flows.get_flow(&id).await {
        Ok(Some(flow)) => Ok(Json(flow)),
        Ok(None) => Err(ApiError::not_found("Flow not found")),
        Err(e) => {
            tracing::error!("Failed to get flow {}: {}", id, e);
            Err(ApiError::from_store("get flow", e))
        }
    }
}

/// Create a new flow
///
/// POST /flows
/// Body: { "name": "...", "description": "...", "columns": [...], "nodes": [...],
///         "edges": [...], "items": [...], "deadlines": {...} }
async fn create_flow(
    State(state): State<AppState>,
    body: String,
) -> Result<(StatusCode, Json<MutationResponse>), ApiError> {
    let payload = parse_body(&body)?;

    match state.flows.create_flow(&payload).await {
        Ok(id) => Ok((
            StatusCode::CREATED,
            Json(MutationResponse {
                id: Some(id),
                message: "Flow created successfully".to_string(),
            }),
        )),
        Err(e) => {
            tracing::error!("Failed to create flow: {}", e);
            Err(ApiError::from_store("create flow", e).rolled_back())
        }
    }
}

/// Replace an existing flow's definition
///
/// PUT /flows/{id}
/// Body: full flow state plus optional plannerTeamId/plannerChannelId/plannerPlanId/plannerBucketId
async fn update_flow(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: String,
) -> Result<Json<MutationResponse>, ApiError> {
    let payload = parse_body(&body)?;

    match state.flows.update_flow(&id, &payload).await {
        Ok(()) => Ok(Json(MutationResponse {
            id: Some(id),
            message: "Flow updated successfully".to_string(),
        })),
        Err(e) => {
            tracing::error!("Failed to update flow {}: {}", id, e);
            Err(ApiError::from_store("update flow", e).rolled_back())
        }
    }
}

/// Delete a flow
///
/// DELETE /flows/{id}
/// Returns: { "message": "Flow deleted successfully" }
async fn delete_flow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    match state.flows.delete_flow(&id).await {
        Ok(removed) => {
            if removed {
                tracing::info!("Deleted flow: {}", id);
            } else {
                tracing::debug!("Delete requested for unknown flow: {}", id);
            }
            Ok(Json(json!({ "message": "Flow deleted successfully" })))
        }
        Err(e) => {
            tracing::error!("Failed to delete flow {}: {}", id, e);
            Err(ApiError::from_store("delete flow", e))
        }
    }
}
