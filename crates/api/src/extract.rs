//! Request extractors whose rejections use the API error envelope.
//!
//! Axum's own extractors answer malformed input with a plain-text body. These
//! wrappers delegate to them and turn the rejection into [`AppError`] so every
//! 4xx response has the same `{"error": [...]}` shape.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use storekeep_core::Document;

use crate::error::AppError;
use crate::validation::ValidationErrors;

/// JSON body extractor and response.
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Path parameter extractor.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct Path<T>(pub T);

/// Query string extractor.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct Query<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Parse a customer document taken from the URL.
///
/// # Errors
///
/// Returns `AppError::Validation` naming the `document` field.
pub fn document_param(raw: &str) -> Result<Document, AppError> {
    Document::parse(raw)
        .map_err(|e| ValidationErrors::single("document", e.to_string()).into())
}
