//! Address repository. Addresses are always scoped to their customer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};

use storekeep_core::{AddressId, CustomerId};

use super::filter::{FilterField, Filters, ValueKind};
use super::RepositoryError;
use crate::models::{Address, NewAddress};

/// Filterable address fields.
pub static ADDRESS_FILTERS: &[FilterField] = &[
    FilterField::contains("city", "a.city"),
    FilterField::equals("state", "a.state", ValueKind::Text),
    FilterField::equals("zip_code", "a.zip_code", ValueKind::Text),
];

pub(super) const MISSING_CUSTOMER: &str = "customer no longer exists";

/// Address persistence port.
#[async_trait]
pub trait AddressRepository: Send + Sync {
    async fn create(
        &self,
        customer_id: CustomerId,
        address: &NewAddress,
    ) -> Result<Address, RepositoryError>;

    async fn get(
        &self,
        customer_id: CustomerId,
        id: AddressId,
    ) -> Result<Option<Address>, RepositoryError>;

    /// The customer's addresses matching every filter, oldest first.
    async fn list(
        &self,
        customer_id: CustomerId,
        filters: &Filters,
    ) -> Result<Vec<Address>, RepositoryError>;

    /// Replace every field. `NotFound` when the address does not belong to
    /// the customer.
    async fn update(
        &self,
        customer_id: CustomerId,
        id: AddressId,
        address: &NewAddress,
    ) -> Result<Address, RepositoryError>;

    /// Returns `false` if the address does not exist for that customer.
    async fn delete(&self, customer_id: CustomerId, id: AddressId)
    -> Result<bool, RepositoryError>;
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct AddressRow {
    id: AddressId,
    customer_id: CustomerId,
    street: String,
    number: String,
    complement: Option<String>,
    neighborhood: String,
    city: String,
    state: String,
    zip_code: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Self {
            id: row.id,
            customer_id: row.customer_id,
            street: row.street,
            number: row.number,
            complement: row.complement,
            neighborhood: row.neighborhood,
            city: row.city,
            state: row.state,
            zip_code: row.zip_code,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Insert one address. Used on its own and inside the customer transaction.
pub(super) async fn insert_address<'e, E>(
    executor: E,
    customer_id: CustomerId,
    address: &NewAddress,
) -> Result<Address, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, AddressRow>(
        r"
        INSERT INTO storekeep.address
            (customer_id, street, number, complement, neighborhood, city, state, zip_code)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, customer_id, street, number, complement, neighborhood,
                  city, state, zip_code, created_at, updated_at
        ",
    )
    .bind(customer_id)
    .bind(&address.street)
    .bind(&address.number)
    .bind(address.complement.as_deref())
    .bind(&address.neighborhood)
    .bind(&address.city)
    .bind(&address.state)
    .bind(&address.zip_code)
    .fetch_one(executor)
    .await
    .map_err(|e| RepositoryError::from_write(e, "address already exists", MISSING_CUSTOMER))?;

    Ok(row.into())
}

/// Addresses of several customers, ordered by id.
pub(super) async fn load_for_customers<'e, E>(
    executor: E,
    customer_ids: &[i32],
) -> Result<Vec<Address>, RepositoryError>
where
    E: PgExecutor<'e>,
{
    if customer_ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, AddressRow>(
        r"
        SELECT id, customer_id, street, number, complement, neighborhood,
               city, state, zip_code, created_at, updated_at
        FROM storekeep.address
        WHERE customer_id = ANY($1)
        ORDER BY id
        ",
    )
    .bind(customer_ids)
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

// =============================================================================
// PostgreSQL Adapter
// =============================================================================

/// `PostgreSQL` address repository.
#[derive(Clone)]
pub struct PgAddressRepository {
    pool: PgPool,
}

impl PgAddressRepository {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AddressRepository for PgAddressRepository {
    #[tracing::instrument(skip(self, address))]
    async fn create(
        &self,
        customer_id: CustomerId,
        address: &NewAddress,
    ) -> Result<Address, RepositoryError> {
        insert_address(&self.pool, customer_id, address).await
    }

    async fn get(
        &self,
        customer_id: CustomerId,
        id: AddressId,
    ) -> Result<Option<Address>, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(
            r"
            SELECT id, customer_id, street, number, complement, neighborhood,
                   city, state, zip_code, created_at, updated_at
            FROM storekeep.address
            WHERE id = $1 AND customer_id = $2
            ",
        )
        .bind(id)
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list(
        &self,
        customer_id: CustomerId,
        filters: &Filters,
    ) -> Result<Vec<Address>, RepositoryError> {
        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT a.id, a.customer_id, a.street, a.number, a.complement, a.neighborhood, \
             a.city, a.state, a.zip_code, a.created_at, a.updated_at \
             FROM storekeep.address a WHERE a.customer_id = ",
        );
        query.push_bind(customer_id);
        filters.push_conditions(&mut query);
        query.push(" ORDER BY a.id");

        let rows = query
            .build_query_as::<AddressRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[tracing::instrument(skip(self, address))]
    async fn update(
        &self,
        customer_id: CustomerId,
        id: AddressId,
        address: &NewAddress,
    ) -> Result<Address, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(
            r"
            UPDATE storekeep.address
            SET street = $3, number = $4, complement = $5, neighborhood = $6,
                city = $7, state = $8, zip_code = $9, updated_at = NOW()
            WHERE id = $1 AND customer_id = $2
            RETURNING id, customer_id, street, number, complement, neighborhood,
                      city, state, zip_code, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(customer_id)
        .bind(&address.street)
        .bind(&address.number)
        .bind(address.complement.as_deref())
        .bind(&address.neighborhood)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.zip_code)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    #[tracing::instrument(skip(self))]
    async fn delete(
        &self,
        customer_id: CustomerId,
        id: AddressId,
    ) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM storekeep.address WHERE id = $1 AND customer_id = $2")
                .bind(id)
                .bind(customer_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}
