//! Order status route handlers (`/orders/status`).

use std::collections::HashMap;

use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::Deserialize;
use tracing::instrument;
use utoipa::ToSchema;

use storekeep_core::{OrderStatusCode, StatusId};

use crate::error::{ErrorBody, Result};
use crate::extract::{Json, Path, Query};
use crate::models::{NewStatus, Status};
use crate::state::AppState;
use crate::validation::{Validate, ValidationErrors, optional_text, parsed, required_text};

/// Build the status router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders/status", get(list).post(create))
        .route(
            "/orders/status/{id}",
            get(show).put(update).delete(remove),
        )
}

/// Status create/replace body.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct StatusRequest {
    #[schema(value_type = Option<OrderStatusCode>)]
    pub code: Option<String>,
    /// Display label; defaults to the code's standard label.
    pub label: Option<String>,
}

impl Validate for StatusRequest {
    type Output = NewStatus;

    fn validate(self) -> std::result::Result<NewStatus, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let code = required_text(&mut errors, "code", self.code);
        if !errors.is_empty() {
            return Err(errors);
        }

        let code = parsed(&mut errors, "code", code.parse::<OrderStatusCode>()).ok_or(errors)?;
        let label = optional_text(self.label).unwrap_or_else(|| code.default_label().to_string());
        Ok(NewStatus { code, label })
    }
}

/// Add a status row.
#[utoipa::path(
    post,
    path = "/orders/status",
    tag = "statuses",
    request_body = StatusRequest,
    responses(
        (status = 201, body = Status),
        (status = 400, body = ErrorBody),
        (status = 409, body = ErrorBody, description = "Code already present"),
    )
)]
#[instrument(skip(state, body))]
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<StatusRequest>,
) -> Result<(StatusCode, Json<Status>)> {
    let status = body.validate()?;
    let created = state.statuses().create(&status).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// List status rows. Filters: `code`, `label` (substring).
#[utoipa::path(
    get,
    path = "/orders/status",
    tag = "statuses",
    params(
        ("code" = Option<String>, Query),
        ("label" = Option<String>, Query, description = "Case-insensitive substring"),
    ),
    responses(
        (status = 200, body = Vec<Status>),
        (status = 400, body = ErrorBody),
    )
)]
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Status>>> {
    Ok(Json(state.statuses().list(&params).await?))
}

/// Fetch a status row.
#[utoipa::path(
    get,
    path = "/orders/status/{id}",
    tag = "statuses",
    params(("id" = i32, Path)),
    responses(
        (status = 200, body = Status),
        (status = 404, body = ErrorBody),
    )
)]
pub async fn show(State(state): State<AppState>, Path(id): Path<StatusId>) -> Result<Json<Status>> {
    Ok(Json(state.statuses().get(id).await?))
}

/// Replace a status row.
#[utoipa::path(
    put,
    path = "/orders/status/{id}",
    tag = "statuses",
    params(("id" = i32, Path)),
    request_body = StatusRequest,
    responses(
        (status = 200, body = Status),
        (status = 400, body = ErrorBody),
        (status = 404, body = ErrorBody),
        (status = 409, body = ErrorBody),
    )
)]
#[instrument(skip(state, body))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<StatusId>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<Status>> {
    let status = body.validate()?;
    Ok(Json(state.statuses().update(id, &status).await?))
}

/// Delete a status row.
#[utoipa::path(
    delete,
    path = "/orders/status/{id}",
    tag = "statuses",
    params(("id" = i32, Path)),
    responses(
        (status = 204),
        (status = 404, body = ErrorBody),
        (status = 409, body = ErrorBody, description = "Orders still use this status"),
    )
)]
#[instrument(skip(state))]
pub async fn remove(State(state): State<AppState>, Path(id): Path<StatusId>) -> Result<StatusCode> {
    state.statuses().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
