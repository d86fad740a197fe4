//! Product repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use storekeep_core::{Money, ProductId};

use super::filter::{FilterField, Filters, ValueKind};
use super::RepositoryError;
use crate::models::{NewProduct, Product};

/// Filterable product fields.
pub static PRODUCT_FILTERS: &[FilterField] = &[
    FilterField::contains("name", "p.name"),
    FilterField::contains("description", "p.description"),
    FilterField::equals("price", "p.price", ValueKind::Decimal),
];

pub(super) const PRODUCT_IN_USE: &str = "product is part of a basket and cannot be deleted";

/// Product persistence port.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Insert a product under a freshly generated id.
    async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError>;

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Products among `ids` that exist. Missing ids are simply absent.
    async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    /// Products matching every filter, oldest first.
    async fn list(&self, filters: &Filters) -> Result<Vec<Product>, RepositoryError>;

    /// Replace the mutable fields; the id is kept.
    async fn update(&self, id: ProductId, product: &NewProduct)
    -> Result<Product, RepositoryError>;

    /// Returns `false` if the product does not exist.
    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError>;
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    image: Option<String>,
    price: Money,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            image: row.image,
            price: row.price,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// =============================================================================
// PostgreSQL Adapter
// =============================================================================

/// `PostgreSQL` product repository.
#[derive(Clone)]
pub struct PgProductRepository {
    pool: PgPool,
}

impl PgProductRepository {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    #[tracing::instrument(skip(self, product), fields(name = %product.name))]
    async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            INSERT INTO storekeep.product (id, name, image, price, description)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, image, price, description, created_at, updated_at
            ",
        )
        .bind(ProductId::generate())
        .bind(&product.name)
        .bind(product.image.as_deref())
        .bind(product.price)
        .bind(&product.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            RepositoryError::from_write(e, "product id already taken", "invalid product reference")
        })?;

        Ok(row.into())
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, image, price, description, created_at, updated_at
            FROM storekeep.product
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = ids.iter().map(ProductId::as_uuid).collect();
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, image, price, description, created_at, updated_at
            FROM storekeep.product
            WHERE id = ANY($1)
            ",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list(&self, filters: &Filters) -> Result<Vec<Product>, RepositoryError> {
        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT p.id, p.name, p.image, p.price, p.description, p.created_at, p.updated_at \
             FROM storekeep.product p WHERE TRUE",
        );
        filters.push_conditions(&mut query);
        query.push(" ORDER BY p.created_at, p.id");

        let rows = query
            .build_query_as::<ProductRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[tracing::instrument(skip(self, product))]
    async fn update(
        &self,
        id: ProductId,
        product: &NewProduct,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            UPDATE storekeep.product
            SET name = $2, image = $3, price = $4, description = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, image, price, description, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(&product.name)
        .bind(product.image.as_deref())
        .bind(product.price)
        .bind(&product.description)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM storekeep.product WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::from_write(e, PRODUCT_IN_USE, PRODUCT_IN_USE))?;

        Ok(result.rows_affected() > 0)
    }
}
