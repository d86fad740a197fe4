//! Order route handlers.

use axum::{Router, extract::State, routing::get};
use serde::Deserialize;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

use storekeep_core::{OrderId, OrderStatusCode};

use crate::error::{ErrorBody, Result};
use crate::extract::{Json, Path, Query};
use crate::models::OrderDetails;
use crate::state::AppState;
use crate::validation::{Validate, ValidationErrors, parsed, required_text};

/// Build the order router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list))
        .route("/orders/{id}", get(show).patch(update_status))
}

/// Order list query.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(default)]
pub struct OrderListQuery {
    /// Only orders currently in this status.
    pub status: Option<String>,
}

/// Order status change body.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct OrderStatusRequest {
    #[schema(value_type = Option<OrderStatusCode>)]
    pub status: Option<String>,
}

impl Validate for OrderStatusRequest {
    type Output = OrderStatusCode;

    fn validate(self) -> std::result::Result<OrderStatusCode, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let status = required_text(&mut errors, "status", self.status);
        if !errors.is_empty() {
            return Err(errors);
        }
        parsed(&mut errors, "status", status.parse::<OrderStatusCode>()).ok_or(errors)
    }
}

/// List orders, oldest first.
#[utoipa::path(
    get,
    path = "/orders",
    tag = "orders",
    params(OrderListQuery),
    responses(
        (status = 200, body = Vec<OrderDetails>),
        (status = 400, body = ErrorBody),
    )
)]
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Vec<OrderDetails>>> {
    let status = match query.status {
        Some(status) => Some(OrderStatusRequest {
            status: Some(status),
        }
        .validate()?),
        None => None,
    };
    Ok(Json(state.orders().list(status).await?))
}

/// Fetch an order with its basket, payment and status.
#[utoipa::path(
    get,
    path = "/orders/{id}",
    tag = "orders",
    params(("id" = i32, Path)),
    responses(
        (status = 200, body = OrderDetails),
        (status = 404, body = ErrorBody),
    )
)]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetails>> {
    Ok(Json(state.orders().get(id).await?))
}

/// Move an order to another status. `completed` stamps `done_at`.
#[utoipa::path(
    patch,
    path = "/orders/{id}",
    tag = "orders",
    params(("id" = i32, Path)),
    request_body = OrderStatusRequest,
    responses(
        (status = 200, body = OrderDetails),
        (status = 400, body = ErrorBody),
        (status = 404, body = ErrorBody, description = "Unknown order or status"),
    )
)]
#[instrument(skip(state, body))]
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(body): Json<OrderStatusRequest>,
) -> Result<Json<OrderDetails>> {
    let code = body.validate()?;
    Ok(Json(state.orders().update_status(id, code).await?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_request() {
        let code = OrderStatusRequest {
            status: Some(" ready ".to_string()),
        }
        .validate()
        .unwrap();
        assert_eq!(code, OrderStatusCode::Ready);

        let errors = OrderStatusRequest::default().validate().unwrap_err();
        assert_eq!(errors.messages(), vec!["status: is required"]);

        let errors = OrderStatusRequest {
            status: Some("shipped".to_string()),
        }
        .validate()
        .unwrap_err();
        assert!(errors.messages()[0].starts_with("status: unknown order status 'shipped'"));
    }
}
