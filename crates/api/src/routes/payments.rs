//! Payment route handlers.

use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use serde::Deserialize;
use tracing::instrument;
use utoipa::ToSchema;

use storekeep_core::{OrderId, PaymentStatus};

use crate::error::{ErrorBody, Result};
use crate::extract::{Json, Path};
use crate::models::{Payment, PaymentUpdate};
use crate::services::PaymentNotification;
use crate::state::AppState;
use crate::validation::{Validate, ValidationErrors, parsed, required_text};

/// Build the payment router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/payment/notifications", post(notify))
        .route("/payment/{order_id}", get(show))
}

/// Payment provider notification body.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct NotificationRequest {
    pub nsu: Option<String>,
    #[schema(value_type = Option<PaymentStatus>)]
    pub status: Option<String>,
}

impl Validate for NotificationRequest {
    type Output = PaymentNotification;

    fn validate(self) -> std::result::Result<PaymentNotification, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let nsu = required_text(&mut errors, "nsu", self.nsu);
        let status = required_text(&mut errors, "status", self.status);
        let status = if status.is_empty() {
            None
        } else {
            parsed(&mut errors, "status", status.parse::<PaymentStatus>())
        };

        match status {
            Some(status) if errors.is_empty() => Ok(PaymentNotification { nsu, status }),
            _ => Err(errors),
        }
    }
}

/// The payment attached to an order.
#[utoipa::path(
    get,
    path = "/payment/{order_id}",
    tag = "payments",
    params(("order_id" = i32, Path)),
    responses(
        (status = 200, body = Payment),
        (status = 404, body = ErrorBody),
    )
)]
pub async fn show(
    State(state): State<AppState>,
    Path(order_id): Path<OrderId>,
) -> Result<Json<Payment>> {
    Ok(Json(state.payments().get_by_order(order_id).await?))
}

/// Apply a payment status reported by the provider.
///
/// `approved` moves the order to `paid`, `refused` to `cancelled`.
#[utoipa::path(
    post,
    path = "/payment/notifications",
    tag = "payments",
    request_body = NotificationRequest,
    responses(
        (status = 200, body = PaymentUpdate),
        (status = 400, body = ErrorBody),
        (status = 404, body = ErrorBody, description = "No payment carries the nsu"),
        (status = 409, body = ErrorBody, description = "Several payments carry the nsu"),
    )
)]
#[instrument(skip(state, body))]
pub async fn notify(
    State(state): State<AppState>,
    Json(body): Json<NotificationRequest>,
) -> Result<Json<PaymentUpdate>> {
    let notification = body.validate()?;
    Ok(Json(
        state.payments().update_status_by_nsu(&notification).await?,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_validation() {
        let notification = NotificationRequest {
            nsu: Some(" abc ".to_string()),
            status: Some("approved".to_string()),
        }
        .validate()
        .unwrap();
        assert_eq!(notification.nsu, "abc");
        assert_eq!(notification.status, PaymentStatus::Approved);

        let errors = NotificationRequest {
            nsu: None,
            status: Some("paid".to_string()),
        }
        .validate()
        .unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["nsu", "status"]);
    }
}
