//! Customer service. Customers are addressed by their document number.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, instrument};

use storekeep_core::Document;

use super::ServiceError;
use crate::db::{CUSTOMER_FILTERS, CustomerRepository, Filters};
use crate::models::{Customer, CustomerUpdate, NewCustomer};

/// Customer CRUD.
#[derive(Clone)]
pub struct CustomerService {
    customers: Arc<dyn CustomerRepository>,
}

impl CustomerService {
    /// Create a new customer service.
    #[must_use]
    pub fn new(customers: Arc<dyn CustomerRepository>) -> Self {
        Self { customers }
    }

    /// Register a customer and their addresses in one step.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Conflict` if the document is already registered.
    #[instrument(skip(self, customer), fields(document = %customer.document))]
    pub async fn create(&self, customer: &NewCustomer) -> Result<Customer, ServiceError> {
        let customer = self.customers.create(customer).await?;
        info!(
            customer_id = %customer.id,
            addresses = customer.addresses.len(),
            "Customer created"
        );
        Ok(customer)
    }

    /// Fetch a customer with their addresses.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the document is not registered.
    pub async fn get(&self, document: &Document) -> Result<Customer, ServiceError> {
        self.customers
            .get_by_document(document)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("customer {document}")))
    }

    /// List customers matching the query-string filters.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for unknown filter keys or bad values.
    pub async fn list(
        &self,
        params: &HashMap<String, String>,
    ) -> Result<Vec<Customer>, ServiceError> {
        let filters = Filters::parse(CUSTOMER_FILTERS, params)?;
        Ok(self.customers.list(&filters).await?)
    }

    /// Replace a customer's name and email.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the document is not registered.
    #[instrument(skip(self, update), fields(document = %document))]
    pub async fn update(
        &self,
        document: &Document,
        update: &CustomerUpdate,
    ) -> Result<Customer, ServiceError> {
        let customer = self.get(document).await?;
        self.customers
            .update(customer.id, update)
            .await
            .map_err(|e| ServiceError::from_repository(e, format!("customer {document}")))
    }

    /// Delete a customer and their addresses.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the document is not registered, and
    /// `ServiceError::Conflict` if the customer has already checked out.
    #[instrument(skip(self), fields(document = %document))]
    pub async fn delete(&self, document: &Document) -> Result<(), ServiceError> {
        let customer = self.get(document).await?;
        if self.customers.delete(customer.id).await? {
            info!(customer_id = %customer.id, "Customer deleted");
            Ok(())
        } else {
            Err(ServiceError::not_found(format!("customer {document}")))
        }
    }
}
