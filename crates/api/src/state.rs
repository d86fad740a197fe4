//! Application state shared across handlers.
//!
//! This is the composition root: every repository and service is wired here
//! explicitly, either over `PostgreSQL` or over the in-memory store.

use std::sync::Arc;

use chrono::TimeDelta;
use sqlx::PgPool;

use crate::db::{MemoryStore, Repositories};
use crate::services::{
    AddressService, CheckoutService, CustomerService, OrderService, PaymentService,
    ProductService, StatusService,
};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pool: Option<PgPool>,
    customers: CustomerService,
    addresses: AddressService,
    products: ProductService,
    statuses: StatusService,
    checkout: CheckoutService,
    orders: OrderService,
    payments: PaymentService,
}

impl AppState {
    /// State backed by `PostgreSQL`.
    ///
    /// # Arguments
    ///
    /// * `pool` - `PostgreSQL` connection pool
    /// * `preparation` - Offset from checkout to an order's expected completion
    #[must_use]
    pub fn from_pool(pool: PgPool, preparation: TimeDelta) -> Self {
        let repositories = Repositories::postgres(&pool);
        Self::build(&repositories, Some(pool), preparation)
    }

    /// State backed by an in-memory store. Used by tests.
    #[must_use]
    pub fn in_memory(store: &MemoryStore, preparation: TimeDelta) -> Self {
        Self::build(&Repositories::memory(store), None, preparation)
    }

    fn build(repos: &Repositories, pool: Option<PgPool>, preparation: TimeDelta) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                pool,
                customers: CustomerService::new(repos.customers.clone()),
                addresses: AddressService::new(repos.customers.clone(), repos.addresses.clone()),
                products: ProductService::new(repos.products.clone()),
                statuses: StatusService::new(repos.statuses.clone()),
                checkout: CheckoutService::new(
                    repos.customers.clone(),
                    repos.products.clone(),
                    repos.statuses.clone(),
                    repos.checkout.clone(),
                    repos.orders.clone(),
                    preparation,
                ),
                orders: OrderService::new(repos.orders.clone(), repos.statuses.clone()),
                payments: PaymentService::new(
                    repos.payments.clone(),
                    repos.statuses.clone(),
                    repos.orders.clone(),
                ),
            }),
        }
    }

    /// The database pool, `None` for in-memory state.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    #[must_use]
    pub fn customers(&self) -> &CustomerService {
        &self.inner.customers
    }

    #[must_use]
    pub fn addresses(&self) -> &AddressService {
        &self.inner.addresses
    }

    #[must_use]
    pub fn products(&self) -> &ProductService {
        &self.inner.products
    }

    #[must_use]
    pub fn statuses(&self) -> &StatusService {
        &self.inner.statuses
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }

    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    #[must_use]
    pub fn payments(&self) -> &PaymentService {
        &self.inner.payments
    }
}
