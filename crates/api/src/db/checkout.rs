//! Checkout unit of work: basket, lines, payment and order in one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use storekeep_core::{BasketId, CustomerId, Money, OrderId, PaymentStatus};

use super::payments::PaymentRow;
use super::statuses::fetch_status;
use super::RepositoryError;
use crate::models::{Basket, BasketItem, NewCheckout, OrderDetails};

/// Checkout persistence port.
#[async_trait]
pub trait CheckoutRepository: Send + Sync {
    /// Persist a priced checkout atomically: either every row is written or
    /// none is.
    async fn place(&self, checkout: &NewCheckout) -> Result<OrderDetails, RepositoryError>;
}

#[derive(Debug, sqlx::FromRow)]
struct BasketRow {
    id: BasketId,
    customer_id: CustomerId,
    total: Money,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    uuid: Uuid,
    expected: DateTime<Utc>,
    done_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// `PostgreSQL` checkout repository.
#[derive(Clone)]
pub struct PgCheckoutRepository {
    pool: PgPool,
}

impl PgCheckoutRepository {
    /// Create a new checkout repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CheckoutRepository for PgCheckoutRepository {
    #[tracing::instrument(skip(self, checkout), fields(customer_id = %checkout.customer_id, lines = checkout.lines.len()))]
    async fn place(&self, checkout: &NewCheckout) -> Result<OrderDetails, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let basket = sqlx::query_as::<_, BasketRow>(
            r"
            INSERT INTO storekeep.basket (customer_id, total)
            VALUES ($1, $2)
            RETURNING id, customer_id, total, created_at
            ",
        )
        .bind(checkout.customer_id)
        .bind(checkout.total)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            RepositoryError::from_write(e, "basket conflict", "customer no longer exists")
        })?;

        let mut lines = QueryBuilder::<Postgres>::new(
            "INSERT INTO storekeep.basket_item (basket_id, product_id, quantity, unit_price, line_total) ",
        );
        lines.push_values(&checkout.lines, |mut row, line| {
            row.push_bind(basket.id)
                .push_bind(line.product_id)
                .push_bind(i32::try_from(line.quantity).unwrap_or(i32::MAX))
                .push_bind(line.unit_price)
                .push_bind(line.line_total);
        });
        lines
            .build()
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                RepositoryError::from_write(e, "duplicate basket line", "product no longer exists")
            })?;

        let payment = sqlx::query_as::<_, PaymentRow>(
            r"
            INSERT INTO storekeep.payment (nsu, status, amount)
            VALUES ($1, $2, $3)
            RETURNING id, nsu, status, amount, created_at, updated_at
            ",
        )
        .bind(&checkout.nsu)
        .bind(PaymentStatus::Pending)
        .bind(checkout.total)
        .fetch_one(&mut *tx)
        .await?;

        let order = sqlx::query_as::<_, OrderRow>(
            r#"
            INSERT INTO storekeep."order" (uuid, basket_id, payment_id, status_id, expected)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, uuid, expected, done_at, created_at, updated_at
            "#,
        )
        .bind(checkout.order_uuid)
        .bind(basket.id)
        .bind(payment.id)
        .bind(checkout.status_id)
        .bind(checkout.expected)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            RepositoryError::from_write(e, "order already exists", "status no longer exists")
        })?;

        let status = fetch_status(&mut *tx, checkout.status_id)
            .await?
            .ok_or_else(|| RepositoryError::Conflict("status no longer exists".to_owned()))?;

        tx.commit().await?;

        tracing::info!(order_id = %order.id, basket_id = %basket.id, "Checkout placed");

        Ok(OrderDetails {
            id: order.id,
            uuid: order.uuid,
            expected: order.expected,
            done_at: order.done_at,
            created_at: order.created_at,
            updated_at: order.updated_at,
            basket: Basket {
                id: basket.id,
                customer_id: basket.customer_id,
                total: basket.total,
                items: checkout.lines.iter().map(BasketItem::from).collect(),
                created_at: basket.created_at,
            },
            payment: payment.into(),
            status,
        })
    }
}
