//! Order reads and status transitions.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use storekeep_core::{OrderId, OrderStatusCode};

use super::ServiceError;
use crate::db::{OrderRepository, StatusRepository};
use crate::models::OrderDetails;

/// Order queries and status updates.
#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    statuses: Arc<dyn StatusRepository>,
}

impl OrderService {
    /// Create a new order service.
    #[must_use]
    pub fn new(orders: Arc<dyn OrderRepository>, statuses: Arc<dyn StatusRepository>) -> Self {
        Self { orders, statuses }
    }

    /// Fetch an order with its basket, payment and status.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the order does not exist.
    pub async fn get(&self, id: OrderId) -> Result<OrderDetails, ServiceError> {
        self.orders
            .get_details(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("order {id}")))
    }

    /// All orders, oldest first, optionally only those currently in `status`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list(
        &self,
        status: Option<OrderStatusCode>,
    ) -> Result<Vec<OrderDetails>, ServiceError> {
        Ok(self.orders.list_details(status).await?)
    }

    /// Move an order to another status.
    ///
    /// Reaching the completion status stamps `done_at` with the current time;
    /// any other status leaves `done_at` as it was.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the order does not exist or the
    /// status table has no row for `code`.
    #[instrument(skip(self), fields(order_id = %id, code = %code))]
    pub async fn update_status(
        &self,
        id: OrderId,
        code: OrderStatusCode,
    ) -> Result<OrderDetails, ServiceError> {
        let current = self.get(id).await?;

        let status = self
            .statuses
            .get_by_code(code)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("status '{code}'")))?;

        let done_at = code.is_completion().then(Utc::now);
        self.orders
            .set_status(id, status.id, done_at)
            .await
            .map_err(|e| ServiceError::from_repository(e, format!("order {id}")))?;

        info!(from = %current.status.code, to = %code, "Order status changed");

        self.get(id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeDelta;
    use rust_decimal::Decimal;

    use storekeep_core::{Document, Money};

    use super::*;
    use crate::db::{CustomerRepository, MemoryStore, ProductRepository};
    use crate::models::{NewCustomer, NewProduct};
    use crate::services::{CheckoutLine, CheckoutRequest, CheckoutService};

    async fn placed_order(store: &MemoryStore) -> OrderDetails {
        let document = Document::parse("12345678909").unwrap();
        CustomerRepository::create(
            store,
            &NewCustomer {
                name: "Linus".to_owned(),
                document: document.clone(),
                email: None,
                addresses: Vec::new(),
            },
        )
        .await
        .unwrap();
        let product = ProductRepository::create(
            store,
            &NewProduct {
                name: "Coffee".to_owned(),
                image: None,
                price: Money::parse(Decimal::new(450, 2)).unwrap(),
                description: "Espresso".to_owned(),
            },
        )
        .await
        .unwrap();

        CheckoutService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            TimeDelta::minutes(15),
        )
        .checkout(CheckoutRequest {
            document,
            lines: vec![CheckoutLine {
                product_id: product.id,
                quantity: 1,
            }],
        })
        .await
        .unwrap()
    }

    fn service(store: &MemoryStore) -> OrderService {
        OrderService::new(Arc::new(store.clone()), Arc::new(store.clone()))
    }

    #[tokio::test]
    async fn test_completion_sets_done_at() {
        let store = MemoryStore::with_default_statuses();
        let order = placed_order(&store).await;
        let orders = service(&store);

        let preparing = orders
            .update_status(order.id, OrderStatusCode::Preparing)
            .await
            .unwrap();
        assert_eq!(preparing.status.code, OrderStatusCode::Preparing);
        assert_eq!(preparing.done_at, None);

        let completed = orders
            .update_status(order.id, OrderStatusCode::Completed)
            .await
            .unwrap();
        assert_eq!(completed.status.code, OrderStatusCode::Completed);
        assert!(completed.done_at.is_some());
    }

    #[tokio::test]
    async fn test_later_status_keeps_done_at() {
        let store = MemoryStore::with_default_statuses();
        let order = placed_order(&store).await;
        let orders = service(&store);

        let completed = orders
            .update_status(order.id, OrderStatusCode::Completed)
            .await
            .unwrap();
        let cancelled = orders
            .update_status(order.id, OrderStatusCode::Cancelled)
            .await
            .unwrap();

        assert_eq!(cancelled.done_at, completed.done_at);
    }

    #[tokio::test]
    async fn test_unknown_order() {
        let store = MemoryStore::with_default_statuses();
        let err = service(&store)
            .update_status(OrderId::new(404), OrderStatusCode::Paid)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "order 404 not found");
    }

    #[tokio::test]
    async fn test_status_row_missing() {
        let store = MemoryStore::with_default_statuses();
        let order = placed_order(&store).await;
        let ready = store
            .get_by_code(OrderStatusCode::Ready)
            .await
            .unwrap()
            .unwrap();
        StatusRepository::delete(&store, ready.id).await.unwrap();

        let err = service(&store)
            .update_status(order.id, OrderStatusCode::Ready)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "status 'ready' not found");
    }

    #[tokio::test]
    async fn test_list_by_status() {
        let store = MemoryStore::with_default_statuses();
        placed_order(&store).await;
        let orders = service(&store);

        assert_eq!(orders.list(None).await.unwrap().len(), 1);
        assert_eq!(
            orders
                .list(Some(OrderStatusCode::Pending))
                .await
                .unwrap()
                .len(),
            1
        );
        assert!(
            orders
                .list(Some(OrderStatusCode::Ready))
                .await
                .unwrap()
                .is_empty()
        );
    }
}
