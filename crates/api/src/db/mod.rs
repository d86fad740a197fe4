//! Persistence ports and adapters.
//!
//! # Database: `storekeep` schema
//!
//! ## Tables
//!
//! - `customer` / `address` - Customers and their postal addresses
//! - `product` - Catalog with UUID ids
//! - `status` - One row per order status code
//! - `basket` / `basket_item` - Checkout carts with price snapshots
//! - `payment` - Payment attempts, correlated by `nsu`
//! - `order` - Links a basket, a payment and a status
//!
//! Each entity has a repository trait (the port) with two adapters: a
//! `PostgreSQL` one (`Pg*Repository`) and the in-memory [`MemoryStore`] used
//! by tests.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p storekeep-cli -- migrate
//! ```

pub mod addresses;
pub mod checkout;
pub mod customers;
pub mod filter;
pub mod memory;
pub mod orders;
pub mod payments;
pub mod products;
pub mod statuses;

use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use addresses::{ADDRESS_FILTERS, AddressRepository, PgAddressRepository};
pub use checkout::{CheckoutRepository, PgCheckoutRepository};
pub use customers::{CUSTOMER_FILTERS, CustomerRepository, PgCustomerRepository};
pub use filter::{FilterField, Filters};
pub use memory::MemoryStore;
pub use orders::{OrderRepository, PgOrderRepository};
pub use payments::{OrderTransition, PaymentRepository, PgPaymentRepository};
pub use products::{PRODUCT_FILTERS, PgProductRepository, ProductRepository};
pub use statuses::{PgStatusRepository, STATUS_FILTERS, StatusRepository};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (unique key, foreign key, ambiguous match).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Classify a write error, turning unique and foreign-key violations
    /// into [`RepositoryError::Conflict`].
    pub(crate) fn from_write(e: sqlx::Error, on_unique: &str, on_reference: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return Self::Conflict(on_unique.to_owned());
            }
            if db_err.is_foreign_key_violation() {
                return Self::Conflict(on_reference.to_owned());
            }
        }
        Self::Database(e)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// One adapter per port, shared by the services.
#[derive(Clone)]
pub struct Repositories {
    pub customers: Arc<dyn CustomerRepository>,
    pub addresses: Arc<dyn AddressRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub statuses: Arc<dyn StatusRepository>,
    pub checkout: Arc<dyn CheckoutRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub payments: Arc<dyn PaymentRepository>,
}

impl Repositories {
    /// `PostgreSQL` adapters sharing one pool.
    #[must_use]
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            customers: Arc::new(PgCustomerRepository::new(pool.clone())),
            addresses: Arc::new(PgAddressRepository::new(pool.clone())),
            products: Arc::new(PgProductRepository::new(pool.clone())),
            statuses: Arc::new(PgStatusRepository::new(pool.clone())),
            checkout: Arc::new(PgCheckoutRepository::new(pool.clone())),
            orders: Arc::new(PgOrderRepository::new(pool.clone())),
            payments: Arc::new(PgPaymentRepository::new(pool.clone())),
        }
    }

    /// In-memory adapters over a single store.
    #[must_use]
    pub fn memory(store: &MemoryStore) -> Self {
        Self {
            customers: Arc::new(store.clone()),
            addresses: Arc::new(store.clone()),
            products: Arc::new(store.clone()),
            statuses: Arc::new(store.clone()),
            checkout: Arc::new(store.clone()),
            orders: Arc::new(store.clone()),
            payments: Arc::new(store.clone()),
        }
    }
}
