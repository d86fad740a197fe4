//! Checkout: turns a customer's cart into a basket, a pending payment and an
//! order.
//!
//! The flow is:
//! 1. Normalize the lines (merge repeated products, bound quantities)
//! 2. Resolve the customer by document
//! 3. Resolve every product and snapshot its current price
//! 4. Resolve the initial order status row
//! 5. Hand everything to [`CheckoutRepository::place`], which writes it
//!    atomically
//!
//! Nothing is written unless every lookup succeeds.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use tracing::{info, instrument};
use uuid::Uuid;

use storekeep_core::{Document, Money, MoneyError, OrderStatusCode, ProductId};

use super::ServiceError;
use crate::db::{
    CheckoutRepository, CustomerRepository, OrderRepository, ProductRepository, StatusRepository,
};
use crate::models::{NewCheckout, OrderDetails, PricedLine};
use crate::validation::ValidationErrors;

/// Largest quantity accepted for a single product in one checkout.
pub const MAX_QUANTITY: u32 = 999;

/// A product and how many of it to buy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A checkout for the customer identified by `document`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub document: Document,
    pub lines: Vec<CheckoutLine>,
}

/// Checkout and pending-order queries.
#[derive(Clone)]
pub struct CheckoutService {
    customers: Arc<dyn CustomerRepository>,
    products: Arc<dyn ProductRepository>,
    statuses: Arc<dyn StatusRepository>,
    checkout: Arc<dyn CheckoutRepository>,
    orders: Arc<dyn OrderRepository>,
    preparation: TimeDelta,
}

impl CheckoutService {
    /// Create a new checkout service. `preparation` is added to the checkout
    /// time to compute the order's expected completion.
    #[must_use]
    pub fn new(
        customers: Arc<dyn CustomerRepository>,
        products: Arc<dyn ProductRepository>,
        statuses: Arc<dyn StatusRepository>,
        checkout: Arc<dyn CheckoutRepository>,
        orders: Arc<dyn OrderRepository>,
        preparation: TimeDelta,
    ) -> Self {
        Self {
            customers,
            products,
            statuses,
            checkout,
            orders,
            preparation,
        }
    }

    /// Place an order.
    ///
    /// # Errors
    ///
    /// - `ServiceError::Validation` if there are no lines, a quantity is out
    ///   of range, or a line or basket total does not fit the amount columns
    /// - `ServiceError::NotFound` if the customer or a product does not exist
    /// - `ServiceError::MissingStatus` if the initial status row is missing
    #[instrument(skip(self, request), fields(document = %request.document, lines = request.lines.len()))]
    pub async fn checkout(&self, request: CheckoutRequest) -> Result<OrderDetails, ServiceError> {
        let lines = merge_lines(request.lines)?;

        let customer = self
            .customers
            .get_by_document(&request.document)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("customer {}", request.document)))?;

        let ids: Vec<ProductId> = lines.iter().map(|l| l.product_id).collect();
        let prices: HashMap<ProductId, Money> = self
            .products
            .get_many(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p.price))
            .collect();

        let mut priced = Vec::with_capacity(lines.len());
        for line in lines {
            let unit_price = *prices
                .get(&line.product_id)
                .ok_or_else(|| ServiceError::not_found(format!("product {}", line.product_id)))?;
            priced.push((line, unit_price));
        }
        let (priced, total) = price_lines(priced)?;

        let status = self
            .statuses
            .get_by_code(OrderStatusCode::INITIAL)
            .await?
            .ok_or(ServiceError::MissingStatus(OrderStatusCode::INITIAL))?;

        let order = self
            .checkout
            .place(&NewCheckout {
                customer_id: customer.id,
                lines: priced,
                total,
                nsu: generate_nsu(),
                status_id: status.id,
                order_uuid: Uuid::new_v4(),
                expected: Utc::now() + self.preparation,
            })
            .await?;

        info!(
            order_id = %order.id,
            order_uuid = %order.uuid,
            total = %order.basket.total,
            "Order placed"
        );

        Ok(order)
    }

    /// Orders still waiting for payment, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn pending(&self) -> Result<Vec<OrderDetails>, ServiceError> {
        Ok(self
            .orders
            .list_details(Some(OrderStatusCode::Pending))
            .await?)
    }
}

/// Merge repeated products (summing quantities, first occurrence wins the
/// position) and check quantity bounds.
fn merge_lines(lines: Vec<CheckoutLine>) -> Result<Vec<CheckoutLine>, ValidationErrors> {
    if lines.is_empty() {
        return Err(ValidationErrors::single(
            "items",
            "must contain at least one item",
        ));
    }

    let mut errors = ValidationErrors::new();
    let mut merged: Vec<CheckoutLine> = Vec::with_capacity(lines.len());

    for (index, line) in lines.into_iter().enumerate() {
        if line.quantity == 0 {
            errors.add(format!("items[{index}].quantity"), "must be at least 1");
            continue;
        }
        match merged.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
            None => merged.push(line),
        }
    }

    for line in &merged {
        if line.quantity > MAX_QUANTITY {
            errors.add(
                "items",
                format!(
                    "total quantity of product {} must be at most {MAX_QUANTITY}",
                    line.product_id
                ),
            );
        }
    }

    errors.into_result(merged)
}

/// Compute line totals and the basket total. Every amount must fit the
/// storage columns.
fn price_lines(
    lines: Vec<(CheckoutLine, Money)>,
) -> Result<(Vec<PricedLine>, Money), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let mut priced = Vec::with_capacity(lines.len());
    let mut total = Ok(Money::ZERO);

    for (line, unit_price) in lines {
        match unit_price.times(line.quantity) {
            Ok(line_total) => {
                total = total.and_then(|sum: Money| sum.plus(line_total));
                priced.push(PricedLine {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    unit_price,
                    line_total,
                });
            }
            Err(e) => errors.add(
                "items",
                amount_message(&format!("line total of product {}", line.product_id), &e),
            ),
        }
    }

    if errors.is_empty() {
        match total {
            Ok(total) => return Ok((priced, total)),
            Err(e) => errors.add("items", amount_message("total", &e)),
        }
    }
    Err(errors)
}

fn amount_message(subject: &str, err: &MoneyError) -> String {
    match err {
        MoneyError::TooLarge { max } => format!("{subject} must be less than {max}"),
        other => format!("{subject}: {other}"),
    }
}

/// Reference handed to the payment provider and echoed back in its
/// notifications.
fn generate_nsu() -> String {
    Uuid::new_v4().simple().to_string()
}
