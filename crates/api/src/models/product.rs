//! Product domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use storekeep_core::{Money, ProductId};

/// A product available for checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Product {
    /// Generated product ID, immutable once assigned.
    pub id: ProductId,
    pub name: String,
    /// Image URL.
    pub image: Option<String>,
    /// Unit price.
    pub price: Money,
    pub description: String,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating or replacing a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub image: Option<String>,
    pub price: Money,
    pub description: String,
}
