//! Order repository: reads orders with their basket, payment and status
//! resolved, and moves orders between statuses.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use storekeep_core::{
    BasketId, CustomerId, Money, OrderId, OrderStatusCode, PaymentId, PaymentStatus, ProductId,
    StatusId,
};

use super::RepositoryError;
use crate::models::{Basket, BasketItem, OrderDetails, Payment, Status};

/// Order persistence port.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn get_details(&self, id: OrderId) -> Result<Option<OrderDetails>, RepositoryError>;

    /// Orders, oldest first, optionally restricted to one current status.
    async fn list_details(
        &self,
        status: Option<OrderStatusCode>,
    ) -> Result<Vec<OrderDetails>, RepositoryError>;

    /// Point the order at another status row. `done_at` is only written
    /// when `Some`; otherwise the stored value is kept.
    ///
    /// `NotFound` when the order does not exist.
    async fn set_status(
        &self,
        id: OrderId,
        status_id: StatusId,
        done_at: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError>;
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderDetailsRow {
    id: OrderId,
    uuid: Uuid,
    expected: DateTime<Utc>,
    done_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    basket_id: BasketId,
    customer_id: CustomerId,
    total: Money,
    basket_created_at: DateTime<Utc>,
    payment_id: PaymentId,
    nsu: String,
    payment_status: PaymentStatus,
    amount: Money,
    payment_created_at: DateTime<Utc>,
    payment_updated_at: DateTime<Utc>,
    status_id: StatusId,
    status_code: OrderStatusCode,
    status_label: String,
}

impl OrderDetailsRow {
    fn into_details(self, items: Vec<BasketItem>) -> OrderDetails {
        OrderDetails {
            id: self.id,
            uuid: self.uuid,
            expected: self.expected,
            done_at: self.done_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
            basket: Basket {
                id: self.basket_id,
                customer_id: self.customer_id,
                total: self.total,
                items,
                created_at: self.basket_created_at,
            },
            payment: Payment {
                id: self.payment_id,
                nsu: self.nsu,
                status: self.payment_status,
                amount: self.amount,
                created_at: self.payment_created_at,
                updated_at: self.payment_updated_at,
            },
            status: Status {
                id: self.status_id,
                code: self.status_code,
                label: self.status_label,
            },
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BasketItemRow {
    basket_id: BasketId,
    product_id: ProductId,
    quantity: i32,
    unit_price: Money,
    line_total: Money,
}

impl TryFrom<BasketItemRow> for BasketItem {
    type Error = RepositoryError;

    fn try_from(row: BasketItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "negative quantity {} in basket {}",
                row.quantity, row.basket_id
            ))
        })?;

        Ok(Self {
            product_id: row.product_id,
            quantity,
            unit_price: row.unit_price,
            line_total: row.line_total,
        })
    }
}

const DETAILS_SELECT: &str = r#"
    SELECT o.id, o.uuid, o.expected, o.done_at, o.created_at, o.updated_at,
           b.id AS basket_id, b.customer_id, b.total, b.created_at AS basket_created_at,
           p.id AS payment_id, p.nsu, p.status AS payment_status, p.amount,
           p.created_at AS payment_created_at, p.updated_at AS payment_updated_at,
           s.id AS status_id, s.code AS status_code, s.label AS status_label
    FROM storekeep."order" o
    JOIN storekeep.basket b ON b.id = o.basket_id
    JOIN storekeep.payment p ON p.id = o.payment_id
    JOIN storekeep.status s ON s.id = o.status_id
    WHERE TRUE"#;

/// Basket lines for several baskets, grouped by basket.
async fn load_items<'e, E>(
    executor: E,
    basket_ids: &[i32],
) -> Result<HashMap<BasketId, Vec<BasketItem>>, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let mut grouped: HashMap<BasketId, Vec<BasketItem>> = HashMap::new();
    if basket_ids.is_empty() {
        return Ok(grouped);
    }

    let rows = sqlx::query_as::<_, BasketItemRow>(
        r"
        SELECT basket_id, product_id, quantity, unit_price, line_total
        FROM storekeep.basket_item
        WHERE basket_id = ANY($1)
        ORDER BY basket_id, product_id
        ",
    )
    .bind(basket_ids)
    .fetch_all(executor)
    .await?;

    for row in rows {
        let basket_id = row.basket_id;
        grouped.entry(basket_id).or_default().push(row.try_into()?);
    }

    Ok(grouped)
}

// =============================================================================
// PostgreSQL Adapter
// =============================================================================

/// `PostgreSQL` order repository.
#[derive(Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_details(
        &self,
        mut query: QueryBuilder<'_, Postgres>,
    ) -> Result<Vec<OrderDetails>, RepositoryError> {
        let rows = query
            .build_query_as::<OrderDetailsRow>()
            .fetch_all(&self.pool)
            .await?;

        let basket_ids: Vec<i32> = rows.iter().map(|r| r.basket_id.as_i32()).collect();
        let mut items = load_items(&self.pool, &basket_ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let lines = items.remove(&row.basket_id).unwrap_or_default();
                row.into_details(lines)
            })
            .collect())
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn get_details(&self, id: OrderId) -> Result<Option<OrderDetails>, RepositoryError> {
        let mut query = QueryBuilder::<Postgres>::new(DETAILS_SELECT);
        query.push(" AND o.id = ").push_bind(id);

        Ok(self.fetch_details(query).await?.pop())
    }

    async fn list_details(
        &self,
        status: Option<OrderStatusCode>,
    ) -> Result<Vec<OrderDetails>, RepositoryError> {
        let mut query = QueryBuilder::<Postgres>::new(DETAILS_SELECT);
        if let Some(code) = status {
            query.push(" AND s.code = ").push_bind(code);
        }
        query.push(" ORDER BY o.created_at, o.id");

        self.fetch_details(query).await
    }

    #[tracing::instrument(skip(self))]
    async fn set_status(
        &self,
        id: OrderId,
        status_id: StatusId,
        done_at: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE storekeep."order"
            SET status_id = $2, done_at = COALESCE($3, done_at), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status_id)
        .bind(done_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "order conflict", "status no longer exists"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
