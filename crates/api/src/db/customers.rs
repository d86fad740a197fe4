//! Customer repository.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use storekeep_core::{CustomerId, Document, Email};

use super::addresses::{insert_address, load_for_customers};
use super::filter::{FilterField, Filters, ValueKind};
use super::RepositoryError;
use crate::models::{Address, Customer, CustomerUpdate, NewCustomer};

/// Filterable customer fields.
pub static CUSTOMER_FILTERS: &[FilterField] = &[
    FilterField::contains("name", "c.name"),
    FilterField::equals("document", "c.document", ValueKind::Document),
    FilterField::equals("email", "c.email", ValueKind::Email),
];

pub(super) const DUPLICATE_DOCUMENT: &str = "a customer with this document already exists";
pub(super) const CUSTOMER_IN_USE: &str = "customer has baskets and cannot be deleted";

/// Customer persistence port.
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    /// Create a customer together with their addresses, atomically.
    async fn create(&self, customer: &NewCustomer) -> Result<Customer, RepositoryError>;

    async fn get_by_document(&self, document: &Document)
    -> Result<Option<Customer>, RepositoryError>;

    /// Customers matching every filter, oldest first.
    async fn list(&self, filters: &Filters) -> Result<Vec<Customer>, RepositoryError>;

    /// Replace name and email. `NotFound` when the customer does not exist.
    async fn update(
        &self,
        id: CustomerId,
        update: &CustomerUpdate,
    ) -> Result<Customer, RepositoryError>;

    /// Delete a customer and their addresses. Returns `false` if absent.
    async fn delete(&self, id: CustomerId) -> Result<bool, RepositoryError>;
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: CustomerId,
    name: String,
    document: Document,
    email: Option<Email>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CustomerRow {
    fn with_addresses(self, addresses: Vec<Address>) -> Customer {
        Customer {
            id: self.id,
            name: self.name,
            document: self.document,
            email: self.email,
            addresses,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

// =============================================================================
// PostgreSQL Adapter
// =============================================================================

/// `PostgreSQL` customer repository.
#[derive(Clone)]
pub struct PgCustomerRepository {
    pool: PgPool,
}

impl PgCustomerRepository {
    /// Create a new customer repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn attach_addresses(
        &self,
        rows: Vec<CustomerRow>,
    ) -> Result<Vec<Customer>, RepositoryError> {
        let ids: Vec<i32> = rows.iter().map(|r| r.id.as_i32()).collect();

        let mut by_customer: HashMap<CustomerId, Vec<Address>> = HashMap::new();
        for address in load_for_customers(&self.pool, &ids).await? {
            by_customer
                .entry(address.customer_id)
                .or_default()
                .push(address);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let addresses = by_customer.remove(&row.id).unwrap_or_default();
                row.with_addresses(addresses)
            })
            .collect())
    }
}

#[async_trait]
impl CustomerRepository for PgCustomerRepository {
    #[tracing::instrument(skip(self, customer), fields(document = %customer.document))]
    async fn create(&self, customer: &NewCustomer) -> Result<Customer, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, CustomerRow>(
            r"
            INSERT INTO storekeep.customer (name, document, email)
            VALUES ($1, $2, $3)
            RETURNING id, name, document, email, created_at, updated_at
            ",
        )
        .bind(&customer.name)
        .bind(&customer.document)
        .bind(customer.email.as_ref())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, DUPLICATE_DOCUMENT, DUPLICATE_DOCUMENT))?;

        let mut addresses = Vec::with_capacity(customer.addresses.len());
        for address in &customer.addresses {
            addresses.push(insert_address(&mut *tx, row.id, address).await?);
        }

        tx.commit().await?;

        Ok(row.with_addresses(addresses))
    }

    async fn get_by_document(
        &self,
        document: &Document,
    ) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(
            r"
            SELECT id, name, document, email, created_at, updated_at
            FROM storekeep.customer
            WHERE document = $1
            ",
        )
        .bind(document)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.attach_addresses(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list(&self, filters: &Filters) -> Result<Vec<Customer>, RepositoryError> {
        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT c.id, c.name, c.document, c.email, c.created_at, c.updated_at \
             FROM storekeep.customer c WHERE TRUE",
        );
        filters.push_conditions(&mut query);
        query.push(" ORDER BY c.id");

        let rows = query
            .build_query_as::<CustomerRow>()
            .fetch_all(&self.pool)
            .await?;

        self.attach_addresses(rows).await
    }

    #[tracing::instrument(skip(self, update))]
    async fn update(
        &self,
        id: CustomerId,
        update: &CustomerUpdate,
    ) -> Result<Customer, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(
            r"
            UPDATE storekeep.customer
            SET name = $2, email = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, document, email, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(&update.name)
        .bind(update.email.as_ref())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        self.attach_addresses(vec![row])
            .await?
            .pop()
            .ok_or(RepositoryError::NotFound)
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: CustomerId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM storekeep.customer WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::from_write(e, CUSTOMER_IN_USE, CUSTOMER_IN_USE))?;

        Ok(result.rows_affected() > 0)
    }
}
