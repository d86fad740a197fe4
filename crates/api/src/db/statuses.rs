//! Order status repository.

use async_trait::async_trait;
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};

use storekeep_core::{OrderStatusCode, StatusId};

use super::filter::{FilterField, Filters, ValueKind};
use super::RepositoryError;
use crate::models::{NewStatus, Status};

/// Filterable status fields.
pub static STATUS_FILTERS: &[FilterField] = &[
    FilterField::equals("code", "s.code", ValueKind::OrderStatus),
    FilterField::contains("label", "s.label"),
];

pub(super) const DUPLICATE_CODE: &str = "a status with this code already exists";
pub(super) const STATUS_IN_USE: &str = "status is used by orders and cannot be deleted";

/// Status persistence port.
#[async_trait]
pub trait StatusRepository: Send + Sync {
    /// `Conflict` when a row with the same code exists.
    async fn create(&self, status: &NewStatus) -> Result<Status, RepositoryError>;

    async fn get(&self, id: StatusId) -> Result<Option<Status>, RepositoryError>;

    async fn get_by_code(&self, code: OrderStatusCode) -> Result<Option<Status>, RepositoryError>;

    /// Statuses matching every filter, by id.
    async fn list(&self, filters: &Filters) -> Result<Vec<Status>, RepositoryError>;

    async fn update(&self, id: StatusId, status: &NewStatus) -> Result<Status, RepositoryError>;

    /// Returns `false` if the status does not exist.
    async fn delete(&self, id: StatusId) -> Result<bool, RepositoryError>;
}

#[derive(Debug, sqlx::FromRow)]
struct StatusRow {
    id: StatusId,
    code: OrderStatusCode,
    label: String,
}

impl From<StatusRow> for Status {
    fn from(row: StatusRow) -> Self {
        Self {
            id: row.id,
            code: row.code,
            label: row.label,
        }
    }
}

/// Look up a status row by id on any executor (pool or open transaction).
pub(super) async fn fetch_status<'e, E>(
    executor: E,
    id: StatusId,
) -> Result<Option<Status>, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, StatusRow>(
        "SELECT id, code, label FROM storekeep.status WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(row.map(Into::into))
}

/// `PostgreSQL` status repository.
#[derive(Clone)]
pub struct PgStatusRepository {
    pool: PgPool,
}

impl PgStatusRepository {
    /// Create a new status repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatusRepository for PgStatusRepository {
    #[tracing::instrument(skip(self, status), fields(code = %status.code))]
    async fn create(&self, status: &NewStatus) -> Result<Status, RepositoryError> {
        let row = sqlx::query_as::<_, StatusRow>(
            r"
            INSERT INTO storekeep.status (code, label)
            VALUES ($1, $2)
            RETURNING id, code, label
            ",
        )
        .bind(status.code)
        .bind(&status.label)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, DUPLICATE_CODE, DUPLICATE_CODE))?;

        Ok(row.into())
    }

    async fn get(&self, id: StatusId) -> Result<Option<Status>, RepositoryError> {
        fetch_status(&self.pool, id).await
    }

    async fn get_by_code(&self, code: OrderStatusCode) -> Result<Option<Status>, RepositoryError> {
        let row = sqlx::query_as::<_, StatusRow>(
            "SELECT id, code, label FROM storekeep.status WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list(&self, filters: &Filters) -> Result<Vec<Status>, RepositoryError> {
        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT s.id, s.code, s.label FROM storekeep.status s WHERE TRUE",
        );
        filters.push_conditions(&mut query);
        query.push(" ORDER BY s.id");

        let rows = query
            .build_query_as::<StatusRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[tracing::instrument(skip(self, status))]
    async fn update(&self, id: StatusId, status: &NewStatus) -> Result<Status, RepositoryError> {
        let row = sqlx::query_as::<_, StatusRow>(
            r"
            UPDATE storekeep.status
            SET code = $2, label = $3
            WHERE id = $1
            RETURNING id, code, label
            ",
        )
        .bind(id)
        .bind(status.code)
        .bind(&status.label)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, DUPLICATE_CODE, DUPLICATE_CODE))?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: StatusId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM storekeep.status WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::from_write(e, STATUS_IN_USE, STATUS_IN_USE))?;

        Ok(result.rows_affected() > 0)
    }
}
