//! Unified error handling with Sentry integration.
//!
//! Every failure leaves the API in the same envelope:
//!
//! ```json
//! {"error": ["name: is required", "price: amount cannot be negative"]}
//! ```
//!
//! Server errors are captured to Sentry before responding and their details
//! never reach the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::db::RepositoryError;
use crate::services::ServiceError;
use crate::validation::ValidationErrors;

/// Message returned for every 5xx response.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request body or parameters failed validation.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Request could not be read (malformed JSON, bad path segment).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request clashes with existing data.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: Vec<String>,
}

impl AppError {
    /// HTTP status this error maps to.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn messages(&self) -> Vec<String> {
        match self {
            Self::Validation(errors) => errors.messages(),
            Self::BadRequest(message) | Self::NotFound(message) | Self::Conflict(message) => {
                vec![message.clone()]
            }
            // Don't expose internal error details to clients
            Self::Database(_) | Self::Internal(_) => vec![INTERNAL_ERROR_MESSAGE.to_string()],
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(errors) => Self::Validation(errors),
            ServiceError::NotFound(message) => Self::NotFound(message),
            ServiceError::Conflict(message) => Self::Conflict(message),
            ServiceError::Repository(err) => Self::Database(err),
            missing @ ServiceError::MissingStatus(_) => Self::Internal(missing.to_string()),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let body = ErrorBody {
            error: self.messages(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use storekeep_core::OrderStatusCode;

    use super::*;

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product 1 not found".to_string());
        assert_eq!(err.to_string(), "Not found: product 1 not found");
    }

    #[test]
    fn test_service_errors_map_to_status_codes() {
        let cases = [
            (
                ServiceError::Validation(ValidationErrors::single("name", "is required")),
                StatusCode::BAD_REQUEST,
            ),
            (ServiceError::NotFound("x".to_string()), StatusCode::NOT_FOUND),
            (ServiceError::Conflict("x".to_string()), StatusCode::CONFLICT),
            (
                ServiceError::MissingStatus(OrderStatusCode::Pending),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ServiceError::Repository(RepositoryError::DataCorruption("x".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(AppError::from(err).status(), expected);
        }
    }

    #[tokio::test]
    async fn test_validation_envelope_lists_every_field() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "is required");
        errors.add("price", "is required");

        let (status, body) = body_of(AppError::Validation(errors)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            serde_json::json!({"error": ["name: is required", "price: is required"]})
        );
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let (status, body) = body_of(AppError::Internal("pool exhausted".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, serde_json::json!({"error": ["Internal Server Error"]}));
    }
}
