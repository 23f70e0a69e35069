use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Error body returned to API clients.
///
/// Every error carries a human-readable message; the frontend surfaces these
/// directly, so they must stand on their own without the error kind.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// HTTP status category (e.g. "Conflict", "Not Found")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::error::DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Reservation would exceed a stock line's available quantity.
    /// Nothing is deducted when this is returned.
    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    /// An action was attempted against a request or reservation whose
    /// current state does not permit it.
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    /// The image classifier failed or timed out. The reservation stays in
    /// AI_PROCESSING; a failed check never counts as a pass.
    #[error("Classifier unavailable: {0}")]
    ClassifierUnavailable(String),

    /// Optimistic-lock conflict; the caller should retry with fresh state.
    #[error("Concurrent modification of {0}")]
    ConcurrentModification(Uuid),

    /// Internal invariant failure (e.g. reservation quantities no longer sum
    /// to the fulfillment plan). Always logged and surfaced, never swallowed.
    #[error("Consistency violation: {0}")]
    ConsistencyViolation(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ServiceError {
    pub fn db_error(err: sea_orm::error::DbErr) -> Self {
        ServiceError::DatabaseError(err)
    }

    /// Builds an `InvalidStateTransition` with current-state context.
    pub fn invalid_transition(entity: &str, current: &str, action: &str) -> Self {
        ServiceError::InvalidStateTransition(format!(
            "{} in state {} does not permit {}",
            entity, current, action
        ))
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, category) = match &self {
            ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, "Not Found"),
            ServiceError::ValidationError(_) | ServiceError::InvalidOperation(_) => {
                (StatusCode::BAD_REQUEST, "Bad Request")
            }
            ServiceError::InsufficientStock(_)
            | ServiceError::InvalidStateTransition(_)
            | ServiceError::ConcurrentModification(_) => (StatusCode::CONFLICT, "Conflict"),
            ServiceError::ClassifierUnavailable(_) => (StatusCode::BAD_GATEWAY, "Bad Gateway"),
            ServiceError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ServiceError::Forbidden(_) => (StatusCode::FORBIDDEN, "Forbidden"),
            ServiceError::ConsistencyViolation(_)
            | ServiceError::DatabaseError(_)
            | ServiceError::EventError(_)
            | ServiceError::InternalError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "internal error surfaced to client");
        }

        let body = ErrorResponse {
            error: category.to_string(),
            message: self.to_string(),
            details: None,
            timestamp: Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_carries_state_context() {
        let err = ServiceError::invalid_transition("request", "COMPLETED", "resolve");
        assert!(err.to_string().contains("COMPLETED"));
        assert!(err.to_string().contains("resolve"));
    }

    #[test]
    fn error_kinds_are_distinct_for_assertions() {
        let err = ServiceError::InsufficientStock("only 3 of 10 available".into());
        assert!(matches!(err, ServiceError::InsufficientStock(_)));
        let err = ServiceError::ConcurrentModification(Uuid::new_v4());
        assert!(matches!(err, ServiceError::ConcurrentModification(_)));
    }
}
