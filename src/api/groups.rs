/// Group management REST API endpoints

use crate::api::{parse_body, ApiError, AppState, MutationResponse};
use crate::group::Group;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};

pub fn create_group_routes() -> Router<AppState> {
    Router::new()
        .route("/groups", get(list_groups).post(create_group))
        .route(
            "/groups/{id}",
            get(get_group).put(update_group).delete(delete_group),
        )
}

/// GET /groups
async fn list_groups(State(state): State<AppState>) -> Result<Json<Vec<Group>>, ApiError> {
    state.groups.list_groups().await.map(Json).map_err(|e| {
        tracing::error!("Failed to list groups: {}", e);
        ApiError::from_store("list groups", e)
    })
}

/// GET /groups/{id}
async fn get_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Group>, ApiError> {
    match state.groups.get_group(&id).await {
        Ok(Some(group)) => Ok(Json(group)),
        Ok(None) => Err(ApiError::not_found("Group not found")),
        Err(e) => {
            tracing::error!("Failed to get group {}: {}", id, e);
            Err(ApiError::from_store("get group", e))
        }
    }
}

/// POST /groups
/// Body: { "name": "...", "color": "...", "members": [{ "name": "...", "email": "..." }],
///         "accept_any": false, "team_id": "..." }
async fn create_group(
    State(state): State<AppState>,
    body: String,
) -> Result<(StatusCode, Json<MutationResponse>), ApiError> {
    let payload = parse_body(&body)?;

    match state.groups.create_group(&payload).await {
        Ok(id) => Ok((
            StatusCode::CREATED,
            Json(MutationResponse {
                id: Some(id),
                message: "Group created successfully".to_string(),
            }),
        )),
        Err(e) => {
            tracing::error!("Failed to create group: {}", e);
            Err(ApiError::from_store("create group", e).rolled_back())
        }
    }
}

/// PUT /groups/{id}
async fn update_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: String,
) -> Result<Json<MutationResponse>, ApiError> {
    let payload = parse_body(&body)?;

    match state.groups.update_group(&id, &payload).await {
        Ok(()) => Ok(Json(MutationResponse {
            id: Some(id),
            message: "Group updated successfully".to_string(),
        })),
        Err(e) => {
            tracing::error!("Failed to update group {}: {}", id, e);
            Err(ApiError::from_store("update group", e).rolled_back())
        }
    }
}

/// DELETE /groups/{id}
async fn delete_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    match state.groups.delete_group(&id).await {
        Ok(_) => Ok(Json(json!({ "message": "Group deleted successfully" }))),
        Err(e) => {
            tracing::error!("Failed to delete group {}: {}", id, e);
            Err(ApiError::from_store("delete group", e))
        }
    }
}
