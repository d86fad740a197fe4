//! Payment lookup and provider notifications.
//!
//! The provider identifies a payment by its `nsu`. A notification updates the
//! payment and, for terminal payment states, moves the linked order along:
//!
//! | payment    | order       |
//! |------------|-------------|
//! | `pending`  | unchanged   |
//! | `approved` | `paid`      |
//! | `refused`  | `cancelled` |
//!
//! The order only moves while it is still in its initial status. A late or
//! repeated notification for an order that has progressed updates the payment
//! alone.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use storekeep_core::{OrderId, OrderStatusCode, PaymentStatus};

use super::ServiceError;
use crate::db::{
    OrderRepository, OrderTransition, PaymentRepository, RepositoryError, StatusRepository,
};
use crate::models::{Payment, PaymentUpdate};

/// A status change reported by the payment provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentNotification {
    pub nsu: String,
    pub status: PaymentStatus,
}

/// Payment queries and notification handling.
#[derive(Clone)]
pub struct PaymentService {
    payments: Arc<dyn PaymentRepository>,
    statuses: Arc<dyn StatusRepository>,
    orders: Arc<dyn OrderRepository>,
}

impl PaymentService {
    /// Create a new payment service.
    #[must_use]
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        statuses: Arc<dyn StatusRepository>,
        orders: Arc<dyn OrderRepository>,
    ) -> Self {
        Self {
            payments,
            statuses,
            orders,
        }
    }

    /// The payment attached to an order.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the order does not exist.
    pub async fn get_by_order(&self, order_id: OrderId) -> Result<Payment, ServiceError> {
        self.payments
            .get_by_order(order_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("order {order_id}")))
    }

    /// Apply a provider notification to the payment carrying its `nsu`.
    ///
    /// # Errors
    ///
    /// - `ServiceError::NotFound` if no payment carries the `nsu`
    /// - `ServiceError::Conflict` if several payments carry it
    /// - `ServiceError::MissingStatus` if the order status the payment
    ///   cascades to has no row
    ///
    /// Nothing is written when any of these are returned.
    #[instrument(skip(self, notification), fields(nsu = %notification.nsu, status = %notification.status))]
    pub async fn update_status_by_nsu(
        &self,
        notification: &PaymentNotification,
    ) -> Result<PaymentUpdate, ServiceError> {
        let transition = match notification.status.order_transition() {
            Some(code) => {
                let to = self
                    .statuses
                    .get_by_code(code)
                    .await?
                    .ok_or(ServiceError::MissingStatus(code))?
                    .id;
                // Without an initial status row no order can still be waiting.
                self.statuses
                    .get_by_code(OrderStatusCode::INITIAL)
                    .await?
                    .map(|from| OrderTransition { from: from.id, to })
            }
            None => None,
        };

        let (payment, order_id) = self
            .payments
            .apply_notification(&notification.nsu, notification.status, transition)
            .await
            .map_err(|e| {
                if let RepositoryError::Conflict(message) = &e {
                    warn!(%message, "Ambiguous payment notification");
                }
                ServiceError::from_repository(e, format!("payment with nsu '{}'", notification.nsu))
            })?;

        info!(payment_id = %payment.id, order_id = %order_id, "Payment notification applied");

        let order = self
            .orders
            .get_details(order_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("order {order_id}")))?;

        if let Some(transition) = transition
            && order.status.id != transition.to
        {
            info!(
                order_id = %order_id,
                status = %order.status.code,
                "Order already past payment, status kept"
            );
        }

        Ok(PaymentUpdate { payment, order })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeDelta;
    use rust_decimal::Decimal;

    use storekeep_core::{Document, Money, OrderStatusCode};

    use super::*;
    use crate::db::{CustomerRepository, MemoryStore, ProductRepository};
    use crate::models::{NewCustomer, NewProduct, OrderDetails};
    use crate::services::{CheckoutLine, CheckoutRequest, CheckoutService, OrderService};

    async fn checkout(store: &MemoryStore, document: &str) -> OrderDetails {
        let document = Document::parse(document).unwrap();
        CustomerRepository::create(
            store,
            &NewCustomer {
                name: "Grace".to_owned(),
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
                name: "Tea".to_owned(),
                image: None,
                price: Money::parse(Decimal::new(300, 2)).unwrap(),
                description: "Green tea".to_owned(),
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
            TimeDelta::minutes(10),
        )
        .checkout(CheckoutRequest {
            document,
            lines: vec![CheckoutLine {
                product_id: product.id,
                quantity: 2,
            }],
        })
        .await
        .unwrap()
    }

    fn service(store: &MemoryStore) -> PaymentService {
        PaymentService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
        )
    }

    fn notification(nsu: &str, status: PaymentStatus) -> PaymentNotification {
        PaymentNotification {
            nsu: nsu.to_owned(),
            status,
        }
    }

    #[tokio::test]
    async fn test_approved_payment_marks_order_paid() {
        let store = MemoryStore::with_default_statuses();
        let order = checkout(&store, "11144477735").await;

        let update = service(&store)
            .update_status_by_nsu(&notification(&order.payment.nsu, PaymentStatus::Approved))
            .await
            .unwrap();

        assert_eq!(update.payment.status, PaymentStatus::Approved);
        assert_eq!(update.order.id, order.id);
        assert_eq!(update.order.status.code, OrderStatusCode::Paid);
        assert_eq!(update.order.payment, update.payment);
    }

    #[tokio::test]
    async fn test_refused_payment_cancels_order() {
        let store = MemoryStore::with_default_statuses();
        let order = checkout(&store, "11144477735").await;

        let update = service(&store)
            .update_status_by_nsu(&notification(&order.payment.nsu, PaymentStatus::Refused))
            .await
            .unwrap();

        assert_eq!(update.order.status.code, OrderStatusCode::Cancelled);
    }

    #[tokio::test]
    async fn test_pending_payment_leaves_order() {
        let store = MemoryStore::with_default_statuses();
        let order = checkout(&store, "11144477735").await;

        let update = service(&store)
            .update_status_by_nsu(&notification(&order.payment.nsu, PaymentStatus::Pending))
            .await
            .unwrap();

        assert_eq!(update.order.status.code, OrderStatusCode::Pending);
    }

    #[tokio::test]
    async fn test_late_refusal_keeps_completed_order() {
        let store = MemoryStore::with_default_statuses();
        let order = checkout(&store, "11144477735").await;
        let orders = OrderService::new(Arc::new(store.clone()), Arc::new(store.clone()));
        let completed = orders
            .update_status(order.id, OrderStatusCode::Completed)
            .await
            .unwrap();

        let update = service(&store)
            .update_status_by_nsu(&notification(&order.payment.nsu, PaymentStatus::Refused))
            .await
            .unwrap();

        assert_eq!(update.payment.status, PaymentStatus::Refused);
        assert_eq!(update.order.status.code, OrderStatusCode::Completed);
        assert_eq!(update.order.done_at, completed.done_at);
    }

    #[tokio::test]
    async fn test_repeated_approval_keeps_progressed_order() {
        let store = MemoryStore::with_default_statuses();
        let order = checkout(&store, "11144477735").await;
        let payments = service(&store);
        let approved = notification(&order.payment.nsu, PaymentStatus::Approved);

        payments.update_status_by_nsu(&approved).await.unwrap();
        OrderService::new(Arc::new(store.clone()), Arc::new(store.clone()))
            .update_status(order.id, OrderStatusCode::Preparing)
            .await
            .unwrap();

        let update = payments.update_status_by_nsu(&approved).await.unwrap();
        assert_eq!(update.order.status.code, OrderStatusCode::Preparing);
    }

    #[tokio::test]
    async fn test_unknown_nsu() {
        let store = MemoryStore::with_default_statuses();
        checkout(&store, "11144477735").await;

        let err = service(&store)
            .update_status_by_nsu(&notification("nope", PaymentStatus::Approved))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "payment with nsu 'nope' not found");
    }

    #[tokio::test]
    async fn test_duplicate_nsu_changes_nothing() {
        let store = MemoryStore::with_default_statuses();
        let first = checkout(&store, "11144477735").await;
        let second = checkout(&store, "52998224725").await;
        store.set_payment_nsu(first.payment.id, "dup").await;
        store.set_payment_nsu(second.payment.id, "dup").await;
        let payments = service(&store);

        let err = payments
            .update_status_by_nsu(&notification("dup", PaymentStatus::Approved))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        for order in [first, second] {
            let payment = payments.get_by_order(order.id).await.unwrap();
            assert_eq!(payment.status, PaymentStatus::Pending);
            let current = store.get_details(order.id).await.unwrap().unwrap();
            assert_eq!(current.status.code, OrderStatusCode::Pending);
        }
    }

    #[tokio::test]
    async fn test_missing_target_status_changes_nothing() {
        let store = MemoryStore::with_default_statuses();
        let order = checkout(&store, "11144477735").await;
        let paid = store
            .get_by_code(OrderStatusCode::Paid)
            .await
            .unwrap()
            .unwrap();
        StatusRepository::delete(&store, paid.id).await.unwrap();
        let payments = service(&store);

        let err = payments
            .update_status_by_nsu(&notification(&order.payment.nsu, PaymentStatus::Approved))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::MissingStatus(OrderStatusCode::Paid)));

        let payment = payments.get_by_order(order.id).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_get_by_unknown_order() {
        let store = MemoryStore::with_default_statuses();
        let err = service(&store)
            .get_by_order(OrderId::new(9))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "order 9 not found");
    }
}
