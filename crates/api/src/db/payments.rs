//! Payment repository.
//!
//! Payments are looked up by order and updated by `nsu`, the reference the
//! payment provider sends back in its notifications. `nsu` is not unique in
//! the schema, so an update must first prove that exactly one payment carries
//! it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use storekeep_core::{Money, OrderId, PaymentId, PaymentStatus, StatusId};

use super::RepositoryError;
use crate::models::Payment;

/// Order status change carried by a payment notification. The order only
/// moves when its current status is `from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTransition {
    pub from: StatusId,
    pub to: StatusId,
}

/// Payment persistence port.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// The payment attached to an order, `None` if the order does not exist.
    async fn get_by_order(&self, order_id: OrderId) -> Result<Option<Payment>, RepositoryError>;

    /// Set the status of the single payment carrying `nsu` and, when
    /// `transition` is given and the order is still in `transition.from`,
    /// move its order to `transition.to`. Runs as one atomic step.
    ///
    /// # Errors
    ///
    /// - `NotFound` when no payment carries `nsu`
    /// - `Conflict` when more than one does
    ///
    /// Nothing is written in either case.
    async fn apply_notification(
        &self,
        nsu: &str,
        status: PaymentStatus,
        transition: Option<OrderTransition>,
    ) -> Result<(Payment, OrderId), RepositoryError>;
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct PaymentRow {
    pub(super) id: PaymentId,
    nsu: String,
    status: PaymentStatus,
    amount: Money,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Self {
            id: row.id,
            nsu: row.nsu,
            status: row.status,
            amount: row.amount,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// `PostgreSQL` payment repository.
#[derive(Clone)]
pub struct PgPaymentRepository {
    pool: PgPool,
}

impl PgPaymentRepository {
    /// Create a new payment repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentRepository for PgPaymentRepository {
    async fn get_by_order(&self, order_id: OrderId) -> Result<Option<Payment>, RepositoryError> {
        let row = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT p.id, p.nsu, p.status, p.amount, p.created_at, p.updated_at
            FROM storekeep.payment p
            JOIN storekeep."order" o ON o.payment_id = p.id
            WHERE o.id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    #[tracing::instrument(skip(self))]
    async fn apply_notification(
        &self,
        nsu: &str,
        status: PaymentStatus,
        transition: Option<OrderTransition>,
    ) -> Result<(Payment, OrderId), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let matches: Vec<PaymentId> = sqlx::query_scalar(
            "SELECT id FROM storekeep.payment WHERE nsu = $1 ORDER BY id FOR UPDATE",
        )
        .bind(nsu)
        .fetch_all(&mut *tx)
        .await?;

        let payment_id = match matches.as_slice() {
            [] => return Err(RepositoryError::NotFound),
            [id] => *id,
            many => {
                return Err(RepositoryError::Conflict(format!(
                    "nsu '{nsu}' matches {} payments",
                    many.len()
                )));
            }
        };

        let payment = sqlx::query_as::<_, PaymentRow>(
            r"
            UPDATE storekeep.payment
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, nsu, status, amount, created_at, updated_at
            ",
        )
        .bind(payment_id)
        .bind(status)
        .fetch_one(&mut *tx)
        .await?;

        let order_id: OrderId = sqlx::query_scalar(
            r#"SELECT id FROM storekeep."order" WHERE payment_id = $1 FOR UPDATE"#,
        )
        .bind(payment_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            RepositoryError::DataCorruption(format!("payment {payment_id} has no order"))
        })?;

        if let Some(transition) = transition {
            sqlx::query(
                r#"
                UPDATE storekeep."order"
                SET status_id = $2, updated_at = NOW()
                WHERE id = $1 AND status_id = $3
                "#,
            )
            .bind(order_id)
            .bind(transition.to)
            .bind(transition.from)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                RepositoryError::from_write(e, "order conflict", "status no longer exists")
            })?;
        }

        tx.commit().await?;

        Ok((payment.into(), order_id))
    }
}
