//! In-memory adapter for every repository port.
//!
//! All tables live behind one `RwLock`, so each repository call sees and
//! leaves a consistent state, the way a transaction would. Unique keys and
//! foreign keys are checked the same way the `PostgreSQL` schema checks them
//! and produce the same [`RepositoryError`] variants.
//!
//! Used by the service unit tests and the HTTP integration tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use storekeep_core::{
    AddressId, BasketId, CustomerId, Document, OrderId, OrderStatusCode, PaymentId,
    PaymentStatus, ProductId, StatusId,
};

use super::addresses::{AddressRepository, MISSING_CUSTOMER};
use super::checkout::CheckoutRepository;
use super::customers::{CUSTOMER_IN_USE, CustomerRepository, DUPLICATE_DOCUMENT};
use super::filter::{FilterValue, Filters};
use super::orders::OrderRepository;
use super::payments::{OrderTransition, PaymentRepository};
use super::products::{PRODUCT_IN_USE, ProductRepository};
use super::statuses::{DUPLICATE_CODE, STATUS_IN_USE, StatusRepository};
use super::RepositoryError;
use crate::models::{
    Address, Basket, BasketItem, Customer, CustomerUpdate, NewAddress, NewCheckout, NewCustomer,
    NewProduct, NewStatus, Order, OrderDetails, Payment, Product, Status,
};

#[derive(Debug, Default)]
struct Tables {
    sequence: i32,
    /// Stored without addresses; those are joined in on read.
    customers: BTreeMap<CustomerId, Customer>,
    addresses: BTreeMap<AddressId, Address>,
    /// Kept in insertion order.
    products: Vec<Product>,
    statuses: BTreeMap<StatusId, Status>,
    baskets: BTreeMap<BasketId, Basket>,
    payments: BTreeMap<PaymentId, Payment>,
    orders: BTreeMap<OrderId, Order>,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.sequence += 1;
        self.sequence
    }

    fn customer_with_addresses(&self, customer: &Customer) -> Customer {
        let mut customer = customer.clone();
        customer.addresses = self
            .addresses
            .values()
            .filter(|a| a.customer_id == customer.id)
            .cloned()
            .collect();
        customer
    }

    fn insert_address(&mut self, customer_id: CustomerId, address: &NewAddress) -> Address {
        let now = Utc::now();
        let address = Address {
            id: AddressId::new(self.next_id()),
            customer_id,
            street: address.street.clone(),
            number: address.number.clone(),
            complement: address.complement.clone(),
            neighborhood: address.neighborhood.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            zip_code: address.zip_code.clone(),
            created_at: now,
            updated_at: now,
        };
        self.addresses.insert(address.id, address.clone());
        address
    }

    fn details(&self, order: &Order) -> Result<OrderDetails, RepositoryError> {
        let basket = self.baskets.get(&order.basket_id).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("order {} has no basket", order.id))
        })?;
        let payment = self.payments.get(&order.payment_id).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("order {} has no payment", order.id))
        })?;
        let status = self.statuses.get(&order.status_id).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("order {} has no status", order.id))
        })?;

        Ok(OrderDetails {
            id: order.id,
            uuid: order.uuid,
            expected: order.expected,
            done_at: order.done_at,
            created_at: order.created_at,
            updated_at: order.updated_at,
            basket: basket.clone(),
            payment: payment.clone(),
            status: status.clone(),
        })
    }
}

/// Shared in-memory store. Cloning yields another handle to the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose status table holds one row per [`OrderStatusCode`],
    /// like a database after `sk-cli seed statuses`.
    #[must_use]
    pub fn with_default_statuses() -> Self {
        let mut tables = Tables::default();
        for code in OrderStatusCode::ALL {
            let id = StatusId::new(tables.next_id());
            tables.statuses.insert(
                id,
                Status {
                    id,
                    code,
                    label: code.default_label().to_owned(),
                },
            );
        }
        Self {
            tables: Arc::new(RwLock::new(tables)),
        }
    }

    /// Number of stored baskets.
    pub async fn basket_count(&self) -> usize {
        self.tables.read().await.baskets.len()
    }

    /// Number of stored payments.
    pub async fn payment_count(&self) -> usize {
        self.tables.read().await.payments.len()
    }

    /// Number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    /// Overwrite a payment's `nsu`. Returns `false` if the payment does not
    /// exist. Lets tests build payments that share a reference.
    pub async fn set_payment_nsu(&self, id: PaymentId, nsu: &str) -> bool {
        let mut tables = self.tables.write().await;
        let Some(payment) = tables.payments.get_mut(&id) else {
            return false;
        };
        payment.nsu = nsu.to_owned();
        true
    }
}

fn text(value: &str) -> Option<FilterValue> {
    Some(FilterValue::Text(value.to_owned()))
}

// =============================================================================
// Customers and addresses
// =============================================================================

#[async_trait]
impl CustomerRepository for MemoryStore {
    async fn create(&self, customer: &NewCustomer) -> Result<Customer, RepositoryError> {
        let mut tables = self.tables.write().await;

        if tables
            .customers
            .values()
            .any(|c| c.document == customer.document)
        {
            return Err(RepositoryError::Conflict(DUPLICATE_DOCUMENT.to_owned()));
        }

        let now = Utc::now();
        let id = CustomerId::new(tables.next_id());
        let mut created = Customer {
            id,
            name: customer.name.clone(),
            document: customer.document.clone(),
            email: customer.email.clone(),
            addresses: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        tables.customers.insert(id, created.clone());

        created.addresses = customer
            .addresses
            .iter()
            .map(|address| tables.insert_address(id, address))
            .collect();
        Ok(created)
    }

    async fn get_by_document(
        &self,
        document: &Document,
    ) -> Result<Option<Customer>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .customers
            .values()
            .find(|c| &c.document == document)
            .map(|c| tables.customer_with_addresses(c)))
    }

    async fn list(&self, filters: &Filters) -> Result<Vec<Customer>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .customers
            .values()
            .filter(|c| {
                filters.matches(|field| match field {
                    "name" => text(&c.name),
                    "document" => text(c.document.as_str()),
                    "email" => c.email.as_ref().and_then(|e| text(e.as_str())),
                    _ => None,
                })
            })
            .map(|c| tables.customer_with_addresses(c))
            .collect())
    }

    async fn update(
        &self,
        id: CustomerId,
        update: &CustomerUpdate,
    ) -> Result<Customer, RepositoryError> {
        let mut tables = self.tables.write().await;
        let customer = tables
            .customers
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;

        customer.name.clone_from(&update.name);
        customer.email.clone_from(&update.email);
        customer.updated_at = Utc::now();

        let customer = customer.clone();
        Ok(tables.customer_with_addresses(&customer))
    }

    async fn delete(&self, id: CustomerId) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.customers.contains_key(&id) {
            return Ok(false);
        }
        if tables.baskets.values().any(|b| b.customer_id == id) {
            return Err(RepositoryError::Conflict(CUSTOMER_IN_USE.to_owned()));
        }

        tables.customers.remove(&id);
        tables.addresses.retain(|_, a| a.customer_id != id);
        Ok(true)
    }
}

#[async_trait]
impl AddressRepository for MemoryStore {
    async fn create(
        &self,
        customer_id: CustomerId,
        address: &NewAddress,
    ) -> Result<Address, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.customers.contains_key(&customer_id) {
            return Err(RepositoryError::Conflict(MISSING_CUSTOMER.to_owned()));
        }
        Ok(tables.insert_address(customer_id, address))
    }

    async fn get(
        &self,
        customer_id: CustomerId,
        id: AddressId,
    ) -> Result<Option<Address>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .addresses
            .get(&id)
            .filter(|a| a.customer_id == customer_id)
            .cloned())
    }

    async fn list(
        &self,
        customer_id: CustomerId,
        filters: &Filters,
    ) -> Result<Vec<Address>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .addresses
            .values()
            .filter(|a| a.customer_id == customer_id)
            .filter(|a| {
                filters.matches(|field| match field {
                    "city" => text(&a.city),
                    "state" => text(&a.state),
                    "zip_code" => text(&a.zip_code),
                    _ => None,
                })
            })
            .cloned()
            .collect())
    }

    async fn update(
        &self,
        customer_id: CustomerId,
        id: AddressId,
        address: &NewAddress,
    ) -> Result<Address, RepositoryError> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .addresses
            .get_mut(&id)
            .filter(|a| a.customer_id == customer_id)
            .ok_or(RepositoryError::NotFound)?;

        stored.street.clone_from(&address.street);
        stored.number.clone_from(&address.number);
        stored.complement.clone_from(&address.complement);
        stored.neighborhood.clone_from(&address.neighborhood);
        stored.city.clone_from(&address.city);
        stored.state.clone_from(&address.state);
        stored.zip_code.clone_from(&address.zip_code);
        stored.updated_at = Utc::now();

        Ok(stored.clone())
    }

    async fn delete(
        &self,
        customer_id: CustomerId,
        id: AddressId,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .addresses
            .get(&id)
            .is_some_and(|a| a.customer_id == customer_id);
        if owned {
            tables.addresses.remove(&id);
        }
        Ok(owned)
    }
}

// =============================================================================
// Products
// =============================================================================

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let product = Product {
            id: ProductId::generate(),
            name: product.name.clone(),
            image: product.image.clone(),
            price: product.price,
            description: product.description.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.products.push(product.clone());
        Ok(product)
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.products.iter().find(|p| p.id == id).cloned())
    }

    async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn list(&self, filters: &Filters) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .iter()
            .filter(|p| {
                filters.matches(|field| match field {
                    "name" => text(&p.name),
                    "description" => text(&p.description),
                    "price" => Some(FilterValue::Decimal(p.price.amount())),
                    _ => None,
                })
            })
            .cloned()
            .collect())
    }

    async fn update(
        &self,
        id: ProductId,
        product: &NewProduct,
    ) -> Result<Product, RepositoryError> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RepositoryError::NotFound)?;

        stored.name.clone_from(&product.name);
        stored.image.clone_from(&product.image);
        stored.price = product.price;
        stored.description.clone_from(&product.description);
        stored.updated_at = Utc::now();

        Ok(stored.clone())
    }

    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        let Some(index) = tables.products.iter().position(|p| p.id == id) else {
            return Ok(false);
        };
        let in_basket = tables
            .baskets
            .values()
            .any(|b| b.items.iter().any(|item| item.product_id == id));
        if in_basket {
            return Err(RepositoryError::Conflict(PRODUCT_IN_USE.to_owned()));
        }

        tables.products.remove(index);
        Ok(true)
    }
}

// =============================================================================
// Statuses
// =============================================================================

#[async_trait]
impl StatusRepository for MemoryStore {
    async fn create(&self, status: &NewStatus) -> Result<Status, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.statuses.values().any(|s| s.code == status.code) {
            return Err(RepositoryError::Conflict(DUPLICATE_CODE.to_owned()));
        }

        let status = Status {
            id: StatusId::new(tables.next_id()),
            code: status.code,
            label: status.label.clone(),
        };
        tables.statuses.insert(status.id, status.clone());
        Ok(status)
    }

    async fn get(&self, id: StatusId) -> Result<Option<Status>, RepositoryError> {
        Ok(self.tables.read().await.statuses.get(&id).cloned())
    }

    async fn get_by_code(&self, code: OrderStatusCode) -> Result<Option<Status>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.statuses.values().find(|s| s.code == code).cloned())
    }

    async fn list(&self, filters: &Filters) -> Result<Vec<Status>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .statuses
            .values()
            .filter(|s| {
                filters.matches(|field| match field {
                    "code" => Some(FilterValue::OrderStatus(s.code)),
                    "label" => text(&s.label),
                    _ => None,
                })
            })
            .cloned()
            .collect())
    }

    async fn update(&self, id: StatusId, status: &NewStatus) -> Result<Status, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables
            .statuses
            .values()
            .any(|s| s.code == status.code && s.id != id)
        {
            return Err(RepositoryError::Conflict(DUPLICATE_CODE.to_owned()));
        }

        let stored = tables
            .statuses
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        stored.code = status.code;
        stored.label.clone_from(&status.label);
        Ok(stored.clone())
    }

    async fn delete(&self, id: StatusId) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.statuses.contains_key(&id) {
            return Ok(false);
        }
        if tables.orders.values().any(|o| o.status_id == id) {
            return Err(RepositoryError::Conflict(STATUS_IN_USE.to_owned()));
        }

        tables.statuses.remove(&id);
        Ok(true)
    }
}

// =============================================================================
// Checkout, orders and payments
// =============================================================================

#[async_trait]
impl CheckoutRepository for MemoryStore {
    async fn place(&self, checkout: &NewCheckout) -> Result<OrderDetails, RepositoryError> {
        let mut tables = self.tables.write().await;

        // Every reference is checked before the first write.
        if !tables.customers.contains_key(&checkout.customer_id) {
            return Err(RepositoryError::Conflict("customer no longer exists".to_owned()));
        }
        let all_products_exist = checkout
            .lines
            .iter()
            .all(|line| tables.products.iter().any(|p| p.id == line.product_id));
        if !all_products_exist {
            return Err(RepositoryError::Conflict("product no longer exists".to_owned()));
        }
        if !tables.statuses.contains_key(&checkout.status_id) {
            return Err(RepositoryError::Conflict("status no longer exists".to_owned()));
        }

        let now = Utc::now();

        let basket = Basket {
            id: BasketId::new(tables.next_id()),
            customer_id: checkout.customer_id,
            total: checkout.total,
            items: checkout.lines.iter().map(BasketItem::from).collect(),
            created_at: now,
        };
        let payment = Payment {
            id: PaymentId::new(tables.next_id()),
            nsu: checkout.nsu.clone(),
            status: PaymentStatus::Pending,
            amount: checkout.total,
            created_at: now,
            updated_at: now,
        };
        let order = Order {
            id: OrderId::new(tables.next_id()),
            uuid: checkout.order_uuid,
            basket_id: basket.id,
            payment_id: payment.id,
            status_id: checkout.status_id,
            expected: checkout.expected,
            done_at: None,
            created_at: now,
            updated_at: now,
        };

        tables.baskets.insert(basket.id, basket);
        tables.payments.insert(payment.id, payment);
        tables.orders.insert(order.id, order.clone());

        tables.details(&order)
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn get_details(&self, id: OrderId) -> Result<Option<OrderDetails>, RepositoryError> {
        let tables = self.tables.read().await;
        tables
            .orders
            .get(&id)
            .map(|order| tables.details(order))
            .transpose()
    }

    async fn list_details(
        &self,
        status: Option<OrderStatusCode>,
    ) -> Result<Vec<OrderDetails>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut orders: Vec<&Order> = tables
            .orders
            .values()
            .filter(|o| match status {
                Some(code) => tables
                    .statuses
                    .get(&o.status_id)
                    .is_some_and(|s| s.code == code),
                None => true,
            })
            .collect();
        orders.sort_by_key(|o| (o.created_at, o.id));

        orders.into_iter().map(|o| tables.details(o)).collect()
    }

    async fn set_status(
        &self,
        id: OrderId,
        status_id: StatusId,
        done_at: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.statuses.contains_key(&status_id) {
            return Err(RepositoryError::Conflict("status no longer exists".to_owned()));
        }

        let order = tables.orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        order.status_id = status_id;
        if done_at.is_some() {
            order.done_at = done_at;
        }
        order.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl PaymentRepository for MemoryStore {
    async fn get_by_order(&self, order_id: OrderId) -> Result<Option<Payment>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .get(&order_id)
            .and_then(|o| tables.payments.get(&o.payment_id))
            .cloned())
    }

    async fn apply_notification(
        &self,
        nsu: &str,
        status: PaymentStatus,
        transition: Option<OrderTransition>,
    ) -> Result<(Payment, OrderId), RepositoryError> {
        let mut tables = self.tables.write().await;

        let matches: Vec<PaymentId> = tables
            .payments
            .values()
            .filter(|p| p.nsu == nsu)
            .map(|p| p.id)
            .collect();
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

        let order_id = tables
            .orders
            .values()
            .find(|o| o.payment_id == payment_id)
            .map(|o| o.id)
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!("payment {payment_id} has no order"))
            })?;
        if let Some(transition) = transition
            && !tables.statuses.contains_key(&transition.to)
        {
            return Err(RepositoryError::Conflict("status no longer exists".to_owned()));
        }

        let now = Utc::now();
        let payment = tables
            .payments
            .get_mut(&payment_id)
            .ok_or(RepositoryError::NotFound)?;
        payment.status = status;
        payment.updated_at = now;
        let payment = payment.clone();

        if let Some(transition) = transition
            && let Some(order) = tables.orders.get_mut(&order_id)
            && order.status_id == transition.from
        {
            order.status_id = transition.to;
            order.updated_at = now;
        }

        Ok((payment, order_id))
    }
}
