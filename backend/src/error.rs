//! Error handling for the poultry farm platform
//!
//! Maps domain and persistence failures to consistent JSON error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::InventoryError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // Workflow errors
    #[error("Role violation: {0}")]
    RoleViolation(String),

    #[error("Already confirmed: {0}")]
    AlreadyConfirmed(String),

    #[error("Insufficient inventory: {0}")]
    InsufficientInventory(String),

    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<InventoryError> for AppError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::RoleViolation { .. } => AppError::RoleViolation(err.to_string()),
            InventoryError::AlreadyConfirmed(_) => AppError::AlreadyConfirmed(err.to_string()),
            InventoryError::InsufficientInventory { .. } => {
                AppError::InsufficientInventory(err.to_string())
            }
            InventoryError::CapacityExceeded { .. } => AppError::CapacityExceeded(err.to_string()),
            InventoryError::NotFound(resource) => AppError::NotFound(resource),
            InventoryError::Validation { field, message } => AppError::Validation { field, message },
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::ValidationError(errors.to_string())
    }
}

impl From<shared::ParseEnumError> for AppError {
    fn from(err: shared::ParseEnumError) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    /// HTTP status and error body for this error
    fn detail(&self) -> (StatusCode, ErrorDetail) {
        let simple = |status: StatusCode, code: &str, message: String| {
            (
                status,
                ErrorDetail {
                    code: code.to_string(),
                    message,
                    field: None,
                },
            )
        };

        match self {
            AppError::Unauthorized(msg) => {
                simple(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
            }
            AppError::RoleViolation(msg) => {
                simple(StatusCode::FORBIDDEN, "ROLE_VIOLATION", msg.clone())
            }
            AppError::AlreadyConfirmed(msg) => {
                simple(StatusCode::CONFLICT, "ALREADY_CONFIRMED", msg.clone())
            }
            AppError::InsufficientInventory(msg) => simple(
                StatusCode::UNPROCESSABLE_ENTITY,
                "INSUFFICIENT_INVENTORY",
                msg.clone(),
            ),
            AppError::CapacityExceeded(msg) => simple(
                StatusCode::UNPROCESSABLE_ENTITY,
                "CAPACITY_EXCEEDED",
                msg.clone(),
            ),
            AppError::NotFound(resource) => simple(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{} not found", resource),
            ),
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message: message.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::ValidationError(msg) => {
                simple(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::DuplicateEntry(field) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "DUPLICATE_ENTRY".to_string(),
                    message: format!("A record with this {} already exists", field),
                    field: Some(field.clone()),
                },
            ),
            AppError::DatabaseError(_) => simple(
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "A database error occurred".to_string(),
            ),
            AppError::Internal(_) => simple(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal server error occurred".to_string(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = self.detail();

        match &self {
            AppError::InsufficientInventory(_) => tracing::warn!("Rejected: {}", self),
            _ if status.is_server_error() => tracing::error!("Error: {:?}", self),
            _ => tracing::debug!("Rejected: {}", self),
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Map a unique-constraint violation to `DuplicateEntry`, anything else to a
/// database error
pub fn unique_violation(err: sqlx::Error, field: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::DuplicateEntry(field.to_string())
        }
        _ => AppError::DatabaseError(err),
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::Role;

    fn status_of(err: InventoryError) -> StatusCode {
        AppError::from(err).detail().0
    }

    #[test]
    fn workflow_errors_map_to_distinct_statuses() {
        assert_eq!(
            status_of(InventoryError::RoleViolation {
                required: Role::Doctor,
                action: "confirm".to_string()
            }),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(InventoryError::AlreadyConfirmed("x".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(InventoryError::InsufficientInventory {
                resource: "food".to_string(),
                available: Decimal::from(3),
                requested: Decimal::from(4),
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(InventoryError::NotFound("Transaction".to_string())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn validation_errors_keep_their_field() {
        let (status, detail) =
            AppError::from(InventoryError::validation("quantity", "must be positive")).detail();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(detail.field.as_deref(), Some("quantity"));
    }

    #[test]
    fn error_body_serializes_without_empty_field() {
        let (_, detail) = AppError::NotFound("Chicken house".to_string()).detail();
        let body = serde_json::to_value(ErrorResponse { error: detail }).unwrap();
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert_eq!(body["error"]["message"], "Chicken house not found");
        assert!(body["error"].get("field").is_none());
    }
}
