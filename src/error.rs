/// Store error taxonomy
///
/// Every flow and group store operation reports failures through `StoreError`.
/// Validation and storage failures both abort the surrounding transaction; the
/// HTTP layer decides how each variant is surfaced to clients.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Malformed payload or a violated structural invariant
    #[error("{0}")]
    Validation(String),

    /// The addressed flow or group has no row
    #[error("{0}")]
    NotFound(String),

    /// Connection, query or transaction failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A payload column could not be encoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
