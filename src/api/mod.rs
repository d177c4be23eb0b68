/// HTTP API Layer
///
/// This module provides the REST API endpoints for the flow store:
/// - Flow CRUD with diff-based replacement
/// - Group CRUD with membership sync
/// - JSON error responses shared by all handlers

use crate::error::StoreError;
use crate::flow::FlowStorage;
use crate::group::GroupStorage;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::Value;
use sqlx::sqlite::SqlitePool;

// Flow management endpoints (GET/POST/PUT/DELETE)
pub mod flows;

// Group management endpoints (GET/POST/PUT/DELETE)
pub mod groups;

pub use flows::create_flow_routes;
pub use groups::create_group_routes;

/// Application state containing shared resources
#[derive(Debug, Clone)]
pub struct AppState {
    /// Flow persistence and reconciliation
    pub flows: FlowStorage,
    /// Group persistence
    pub groups: GroupStorage,
}

impl AppState {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            flows: FlowStorage::new(pool.clone()),
            groups: GroupStorage::new(pool),
        }
    }
}

/// Response for create/update operations
#[derive(Debug, Serialize)]
pub struct MutationResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub message: String,
}

/// Error payload: `{ error, details?, rolledBack? }`
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(rename = "rolledBack", skip_serializing_if = "std::ops::Not::not")]
    rolled_back: bool,
}

/// Error returned by every handler
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    details: Option<String>,
    rolled_back: bool,
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            error: message.into(),
            details: None,
            rolled_back: false,
        }
    }

    pub fn bad_request(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: message.into(),
            details: Some(details.into()),
            rolled_back: false,
        }
    }

    /// Map a store failure of `operation` (e.g. "update flow") to a response
    pub fn from_store(operation: &str, err: StoreError) -> Self {
        let (status, error, details) = match &err {
            StoreError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                format!("Failed to {operation}"),
                Some(message.clone()),
            ),
            StoreError::NotFound(message) => (StatusCode::NOT_FOUND, message.clone(), None),
            StoreError::Database(_) | StoreError::Serialization(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to {operation}"),
                Some(err.to_string()),
            ),
        };

        Self {
            status,
            error,
            details,
            rolled_back: false,
        }
    }

    /// Mark the failure as having rolled back its transaction
    pub fn rolled_back(mut self) -> Self {
        self.rolled_back = true;
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.error,
            details: self.details,
            rolled_back: self.rolled_back,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Parse a raw request body, reporting malformed JSON as a 400
pub(crate) fn parse_body(body: &str) -> Result<Value, ApiError> {
    serde_json::from_str(body).map_err(|e| {
        tracing::warn!("❌ Invalid JSON payload: {}", e);
        ApiError::bad_request("Invalid JSON payload", e.to_string())
    })
}
