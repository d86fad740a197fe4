//! Checkout route handlers.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

use storekeep_core::{Document, ProductId};

use crate::error::{ErrorBody, Result};
use crate::extract::Json;
use crate::models::OrderDetails;
use crate::services::checkout::MAX_QUANTITY;
use crate::services::{CheckoutLine, CheckoutRequest};
use crate::state::AppState;
use crate::validation::{Validate, ValidationErrors, parsed, required_text};

/// Build the checkout router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(create))
        .route("/checkout/pending", get(pending))
}

/// One cart line.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(default)]
pub struct CheckoutItemRequest {
    #[schema(value_type = Option<String>, format = Uuid)]
    pub product_id: Option<String>,
    pub quantity: Option<i64>,
}

/// Checkout body.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct CheckoutBody {
    /// Document number of the buying customer.
    pub document: Option<String>,
    pub items: Vec<CheckoutItemRequest>,
}

impl Validate for CheckoutBody {
    type Output = CheckoutRequest;

    fn validate(self) -> std::result::Result<CheckoutRequest, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let document = required_text(&mut errors, "document", self.document);
        let document = if document.is_empty() {
            None
        } else {
            parsed(&mut errors, "document", Document::parse(&document))
        };

        let mut lines = Vec::with_capacity(self.items.len());
        for (index, item) in self.items.into_iter().enumerate() {
            let field = |name: &str| format!("items[{index}].{name}");

            let product_id = required_text(&mut errors, &field("product_id"), item.product_id);
            let product_id = if product_id.is_empty() {
                None
            } else {
                parsed(
                    &mut errors,
                    &field("product_id"),
                    product_id.parse::<ProductId>(),
                )
            };

            let quantity = match item.quantity {
                None => {
                    errors.add(field("quantity"), "is required");
                    None
                }
                Some(quantity) if quantity < 1 => {
                    errors.add(field("quantity"), "must be at least 1");
                    None
                }
                Some(quantity) => match u32::try_from(quantity) {
                    Ok(quantity) if quantity <= MAX_QUANTITY => Some(quantity),
                    _ => {
                        errors.add(field("quantity"), format!("must be at most {MAX_QUANTITY}"));
                        None
                    }
                },
            };

            if let (Some(product_id), Some(quantity)) = (product_id, quantity) {
                lines.push(CheckoutLine {
                    product_id,
                    quantity,
                });
            }
        }

        match document {
            Some(document) if errors.is_empty() => Ok(CheckoutRequest { document, lines }),
            _ => Err(errors),
        }
    }
}

/// Place an order: basket, pending payment and order are created together.
#[utoipa::path(
    post,
    path = "/checkout",
    tag = "checkout",
    request_body = CheckoutBody,
    responses(
        (status = 201, body = OrderDetails),
        (status = 400, body = ErrorBody),
        (status = 404, body = ErrorBody, description = "Unknown customer or product"),
    )
)]
#[instrument(skip(state, body))]
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CheckoutBody>,
) -> Result<(StatusCode, Json<OrderDetails>)> {
    let request = body.validate()?;
    let order = state.checkout().checkout(request).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Orders still waiting for payment, oldest first.
#[utoipa::path(
    get,
    path = "/checkout/pending",
    tag = "checkout",
    responses((status = 200, body = Vec<OrderDetails>))
)]
pub async fn pending(State(state): State<AppState>) -> Result<Json<Vec<OrderDetails>>> {
    Ok(Json(state.checkout().pending().await?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_reports_item_fields() {
        let errors = CheckoutBody {
            document: Some("12345678909".to_string()),
            items: vec![
                CheckoutItemRequest {
                    product_id: Some("not-a-uuid".to_string()),
                    quantity: Some(1),
                },
                CheckoutItemRequest {
                    product_id: Some("67e55044-10b1-426f-9247-bb680e5fe0c8".to_string()),
                    quantity: Some(-2),
                },
                CheckoutItemRequest::default(),
            ],
        }
        .validate()
        .unwrap_err();

        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "items[0].product_id",
                "items[1].quantity",
                "items[2].product_id",
                "items[2].quantity",
            ]
        );
    }

    #[test]
    fn test_validate_bounds_quantity() {
        let item = |quantity| CheckoutItemRequest {
            product_id: Some("67e55044-10b1-426f-9247-bb680e5fe0c8".to_string()),
            quantity: Some(quantity),
        };
        let errors = CheckoutBody {
            document: Some("12345678909".to_string()),
            items: vec![item(0), item(1000), item(5_000_000_000), item(999)],
        }
        .validate()
        .unwrap_err();

        assert_eq!(
            errors.messages(),
            vec![
                "items[0].quantity: must be at least 1",
                "items[1].quantity: must be at most 999",
                "items[2].quantity: must be at most 999",
            ]
        );
    }

    #[test]
    fn test_validate_builds_request() {
        let request = CheckoutBody {
            document: Some("123.456.789-09".to_string()),
            items: vec![CheckoutItemRequest {
                product_id: Some("67e55044-10b1-426f-9247-bb680e5fe0c8".to_string()),
                quantity: Some(3),
            }],
        }
        .validate()
        .unwrap();

        assert_eq!(request.document.as_str(), "12345678909");
        assert_eq!(request.lines.len(), 1);
        assert_eq!(request.lines[0].quantity, 3);
    }

    #[test]
    fn test_empty_items_are_left_to_checkout() {
        let request = CheckoutBody {
            document: Some("12345678909".to_string()),
            items: Vec::new(),
        }
        .validate()
        .unwrap();

        assert!(request.lines.is_empty());
    }
}
