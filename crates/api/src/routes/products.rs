//! Product route handlers.

use std::collections::HashMap;

use axum::{Router, extract::State, http::StatusCode, routing::get};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;
use utoipa::ToSchema;

use storekeep_core::{Money, ProductId};

use crate::error::{ErrorBody, Result};
use crate::extract::{Json, Path, Query};
use crate::models::{NewProduct, Product};
use crate::state::AppState;
use crate::validation::{Validate, ValidationErrors, optional_text, parsed, required_text};

/// Build the product router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list).post(create))
        .route("/products/{id}", get(show).put(update).delete(remove))
}

/// Product create/replace body.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct ProductRequest {
    pub name: Option<String>,
    /// Image URL.
    pub image: Option<String>,
    #[schema(value_type = Option<String>, example = "12.50")]
    pub price: Option<Decimal>,
    pub description: Option<String>,
}

impl Validate for ProductRequest {
    type Output = NewProduct;

    fn validate(self) -> std::result::Result<NewProduct, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = required_text(&mut errors, "name", self.name);
        let description = required_text(&mut errors, "description", self.description);
        let price = match self.price {
            Some(amount) => parsed(&mut errors, "price", Money::parse(amount)),
            None => {
                errors.add("price", "is required");
                None
            }
        };

        match price {
            Some(price) if errors.is_empty() => Ok(NewProduct {
                name,
                image: optional_text(self.image),
                price,
                description,
            }),
            _ => Err(errors),
        }
    }
}

/// Create a product. The id is generated.
#[utoipa::path(
    post,
    path = "/products",
    tag = "products",
    request_body = ProductRequest,
    responses(
        (status = 201, body = Product),
        (status = 400, body = ErrorBody),
    )
)]
#[instrument(skip(state, body))]
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<ProductRequest>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = body.validate()?;
    let created = state.products().create(&product).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// List products. Filters: `name` and `description` (substring), `price`.
#[utoipa::path(
    get,
    path = "/products",
    tag = "products",
    params(
        ("name" = Option<String>, Query, description = "Case-insensitive substring"),
        ("description" = Option<String>, Query, description = "Case-insensitive substring"),
        ("price" = Option<String>, Query, description = "Exact price"),
    ),
    responses(
        (status = 200, body = Vec<Product>),
        (status = 400, body = ErrorBody),
    )
)]
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.products().list(&params).await?))
}

/// Fetch a product.
#[utoipa::path(
    get,
    path = "/products/{id}",
    tag = "products",
    params(("id" = uuid::Uuid, Path)),
    responses(
        (status = 200, body = Product),
        (status = 404, body = ErrorBody),
    )
)]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    Ok(Json(state.products().get(id).await?))
}

/// Replace a product. The id never changes.
#[utoipa::path(
    put,
    path = "/products/{id}",
    tag = "products",
    params(("id" = uuid::Uuid, Path)),
    request_body = ProductRequest,
    responses(
        (status = 200, body = Product),
        (status = 400, body = ErrorBody),
        (status = 404, body = ErrorBody),
    )
)]
#[instrument(skip(state, body))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(body): Json<ProductRequest>,
) -> Result<Json<Product>> {
    let product = body.validate()?;
    Ok(Json(state.products().update(id, &product).await?))
}

/// Delete a product.
#[utoipa::path(
    delete,
    path = "/products/{id}",
    tag = "products",
    params(("id" = uuid::Uuid, Path)),
    responses(
        (status = 204),
        (status = 404, body = ErrorBody),
        (status = 409, body = ErrorBody, description = "Product is part of a basket"),
    )
)]
#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    state.products().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
