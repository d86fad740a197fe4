//! Checkout domain types: baskets, payments and orders.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use storekeep_core::{
    BasketId, CustomerId, Money, OrderId, PaymentId, PaymentStatus, ProductId, StatusId,
};

use super::Status;

/// A basket line with the price captured at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct BasketItem {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Product price when the basket was created.
    pub unit_price: Money,
    /// `unit_price * quantity`.
    pub line_total: Money,
}

/// The cart persisted for a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Basket {
    pub id: BasketId,
    pub customer_id: CustomerId,
    /// Sum of all line totals.
    pub total: Money,
    pub items: Vec<BasketItem>,
    pub created_at: DateTime<Utc>,
}

/// A payment attempt for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Payment {
    pub id: PaymentId,
    /// External provider reference used to correlate notifications.
    pub nsu: String,
    pub status: PaymentStatus,
    pub amount: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An order row: references its basket, payment and status by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub uuid: Uuid,
    pub basket_id: BasketId,
    pub payment_id: PaymentId,
    pub status_id: StatusId,
    pub expected: DateTime<Utc>,
    pub done_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An order with its basket, payment and status resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct OrderDetails {
    pub id: OrderId,
    /// Public order reference.
    pub uuid: Uuid,
    /// Promised completion time.
    pub expected: DateTime<Utc>,
    /// Set when the order reaches the completion status.
    pub done_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub basket: Basket,
    pub payment: Payment,
    pub status: Status,
}

/// Result of applying a payment provider notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PaymentUpdate {
    pub payment: Payment,
    /// The linked order after any cascaded status change.
    pub order: OrderDetails,
}

/// A validated checkout line with its price snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
}

impl From<&PricedLine> for BasketItem {
    fn from(line: &PricedLine) -> Self {
        Self {
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
            line_total: line.line_total,
        }
    }
}

/// Everything needed to persist a checkout in one unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCheckout {
    pub customer_id: CustomerId,
    pub lines: Vec<PricedLine>,
    pub total: Money,
    /// Reference handed to the payment provider.
    pub nsu: String,
    /// Initial order status.
    pub status_id: StatusId,
    pub order_uuid: Uuid,
    pub expected: DateTime<Utc>,
}
