use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::detection::EventStoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<EventStoreError> for AppError {
    fn from(err: EventStoreError) -> Self {
        match err {
            EventStoreError::NotFound(id) => AppError::NotFound(format!("Event {} not found", id)),
            EventStoreError::InvalidStatus(code) => {
                AppError::Validation(format!("Unknown status code: {}", code))
            }
            EventStoreError::InvalidCount { .. } => AppError::Validation(err.to_string()),
            EventStoreError::Postgres(e) => AppError::Database(e),
            EventStoreError::Serialization(e) => AppError::Internal(e.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// Check if running in production mode (based on RUN_MODE env var)
fn is_production() -> bool {
    std::env::var("RUN_MODE")
        .map(|m| m == "production" || m == "prod")
        .unwrap_or(false)
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            AppError::Database(_) => (StatusCode::SERVICE_UNAVAILABLE, "DATABASE_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let log_message = match &self {
            AppError::Validation(msg) | AppError::NotFound(msg) | AppError::Internal(msg) => {
                msg.clone()
            }
            other => other.to_string(),
        };

        // Server-side failures are masked for clients in production
        let client_message = match &self {
            AppError::Validation(_) | AppError::NotFound(_) => log_message.clone(),
            AppError::Internal(_) if is_production() => "Internal server error".to_string(),
            AppError::Database(_) if is_production() => {
                "Service temporarily unavailable".to_string()
            }
            _ => log_message.clone(),
        };

        tracing::error!(
            code = %code,
            status = %status.as_u16(),
            message = %log_message,
            "API error"
        );

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: client_message,
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let err = AppError::Validation("bad".into());
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

        let err = AppError::NotFound("missing".into());
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);

        let err = AppError::Internal("boom".into());
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_store_error_conversion() {
        let err: AppError = EventStoreError::NotFound(42).into();
        assert!(matches!(err, AppError::NotFound(ref m) if m.contains("42")));

        let err: AppError = EventStoreError::InvalidStatus(7).into();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
