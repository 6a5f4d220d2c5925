//! Error handling for the Butcher Shop Ledger
//!
//! Every service returns [`AppResult`]; handlers turn the error into a JSON
//! body with a stable machine-readable code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::types::{AmountError, Weight};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Ledger errors
    #[error("Insufficient stock for {product}: requested {requested}, available {available}")]
    InsufficientStock {
        product: String,
        requested: Weight,
        available: Weight,
    },

    #[error("Bulk unit {bulk_unit_id} over-allocated: requested {requested}, remaining {remaining}")]
    Overallocation {
        bulk_unit_id: i64,
        requested: Weight,
        remaining: Weight,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Duplicate entry: {0}")]
    DuplicateKey(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Insufficient permissions")]
    Forbidden,

    // Storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Map a unique-constraint violation to `DuplicateKey`, passing anything
    /// else through as a storage error.
    pub fn unique_or_storage(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return AppError::DuplicateKey(what.to_string());
            }
        }
        AppError::Storage(err)
    }

    /// Machine-readable error code sent to clients
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            AppError::Overallocation { .. } => "OVERALLOCATION",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::DuplicateKey(_) => "DUPLICATE_KEY",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::Migration(_) => "MIGRATION_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InsufficientStock { .. } | AppError::Overallocation { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateKey(_) | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Storage(_) | AppError::Migration(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Turn a shared validation check into a field-level validation error
pub fn ensure_valid(field: &str, result: Result<(), &'static str>) -> AppResult<()> {
    result.map_err(|message| AppError::validation(field, message))
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors
            .field_errors()
            .keys()
            .next()
            .map(|f| f.to_string())
            .unwrap_or_else(|| "body".to_string());
        AppError::Validation {
            field,
            message: errors.to_string(),
        }
    }
}

impl From<AmountError> for AppError {
    fn from(err: AmountError) -> Self {
        AppError::validation("amount", err.to_string())
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

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Validation { message, .. } => message.clone(),
            AppError::NotFound(resource) => format!("{} not found", resource),
            AppError::DuplicateKey(what) => format!("A record with this {} already exists", what),
            AppError::Forbidden => "You do not have permission to perform this action".to_string(),
            // Storage details stay in the log
            AppError::Storage(_) | AppError::Migration(_) => {
                "A database error occurred".to_string()
            }
            other => other.to_string(),
        };
        let field = match &self {
            AppError::Validation { field, .. } => Some(field.clone()),
            AppError::DuplicateKey(what) => Some(what.clone()),
            _ => None,
        };

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::warn!(code = self.code(), "Request rejected: {}", self);
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.code().to_string(),
                message,
                field,
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Result type alias for services and handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::NotFound("Product".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::InsufficientStock {
                product: "Ribs".into(),
                requested: Weight::from_grams(5_000).unwrap(),
                available: Weight::from_grams(3_000).unwrap(),
            }
            .status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::validation("items", "Cart is empty").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::DuplicateKey("code".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_insufficient_stock_message() {
        let err = AppError::InsufficientStock {
            product: "Ribs".into(),
            requested: Weight::from_grams(5_000).unwrap(),
            available: Weight::from_grams(3_000).unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Ribs: requested 5.000 kg, available 3.000 kg"
        );
    }
}
