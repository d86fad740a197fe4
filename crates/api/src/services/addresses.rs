//! Address service. Every operation first resolves the owning customer by
//! document, so an address is only reachable through its customer.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::instrument;

use storekeep_core::{AddressId, CustomerId, Document};

use super::ServiceError;
use crate::db::{ADDRESS_FILTERS, AddressRepository, CustomerRepository, Filters};
use crate::models::{Address, NewAddress};

/// Address CRUD scoped to a customer.
#[derive(Clone)]
pub struct AddressService {
    customers: Arc<dyn CustomerRepository>,
    addresses: Arc<dyn AddressRepository>,
}

impl AddressService {
    /// Create a new address service.
    #[must_use]
    pub fn new(
        customers: Arc<dyn CustomerRepository>,
        addresses: Arc<dyn AddressRepository>,
    ) -> Self {
        Self {
            customers,
            addresses,
        }
    }

    async fn customer_id(&self, document: &Document) -> Result<CustomerId, ServiceError> {
        self.customers
            .get_by_document(document)
            .await?
            .map(|c| c.id)
            .ok_or_else(|| ServiceError::not_found(format!("customer {document}")))
    }

    /// Add an address to a customer.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the customer does not exist.
    #[instrument(skip(self, address), fields(document = %document))]
    pub async fn create(
        &self,
        document: &Document,
        address: &NewAddress,
    ) -> Result<Address, ServiceError> {
        let customer_id = self.customer_id(document).await?;
        Ok(self.addresses.create(customer_id, address).await?)
    }

    /// Fetch one of the customer's addresses.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the customer or the address does
    /// not exist.
    pub async fn get(&self, document: &Document, id: AddressId) -> Result<Address, ServiceError> {
        let customer_id = self.customer_id(document).await?;
        self.addresses
            .get(customer_id, id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("address {id}")))
    }

    /// List the customer's addresses matching the query-string filters.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for unknown filter keys and
    /// `ServiceError::NotFound` if the customer does not exist.
    pub async fn list(
        &self,
        document: &Document,
        params: &HashMap<String, String>,
    ) -> Result<Vec<Address>, ServiceError> {
        let filters = Filters::parse(ADDRESS_FILTERS, params)?;
        let customer_id = self.customer_id(document).await?;
        Ok(self.addresses.list(customer_id, &filters).await?)
    }

    /// Replace one of the customer's addresses.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the customer or the address does
    /// not exist.
    #[instrument(skip(self, address), fields(document = %document))]
    pub async fn update(
        &self,
        document: &Document,
        id: AddressId,
        address: &NewAddress,
    ) -> Result<Address, ServiceError> {
        let customer_id = self.customer_id(document).await?;
        self.addresses
            .update(customer_id, id, address)
            .await
            .map_err(|e| ServiceError::from_repository(e, format!("address {id}")))
    }

    /// Delete one of the customer's addresses.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the customer or the address does
    /// not exist.
    #[instrument(skip(self), fields(document = %document))]
    pub async fn delete(&self, document: &Document, id: AddressId) -> Result<(), ServiceError> {
        let customer_id = self.customer_id(document).await?;
        if self.addresses.delete(customer_id, id).await? {
            Ok(())
        } else {
            Err(ServiceError::not_found(format!("address {id}")))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::NewCustomer;

    fn address(city: &str, state: &str) -> NewAddress {
        NewAddress {
            street: "Av. Paulista".to_owned(),
            number: "1000".to_owned(),
            complement: None,
            neighborhood: "Bela Vista".to_owned(),
            city: city.to_owned(),
            state: state.to_owned(),
            zip_code: "01310100".to_owned(),
        }
    }

    async fn setup() -> (AddressService, Document, Document) {
        let store = MemoryStore::new();
        let mut documents = Vec::new();
        for raw in ["11111111111", "22222222222"] {
            let document = Document::parse(raw).unwrap();
            CustomerRepository::create(
                &store,
                &NewCustomer {
                    name: "Someone".to_owned(),
                    document: document.clone(),
                    email: None,
                    addresses: Vec::new(),
                },
            )
            .await
            .unwrap();
            documents.push(document);
        }
        let service = AddressService::new(Arc::new(store.clone()), Arc::new(store));
        let second = documents.pop().unwrap();
        let first = documents.pop().unwrap();
        (service, first, second)
    }

    #[tokio::test]
    async fn test_address_is_scoped_to_customer() {
        let (addresses, owner, other) = setup().await;
        let created = addresses
            .create(&owner, &address("São Paulo", "SP"))
            .await
            .unwrap();

        assert_eq!(addresses.get(&owner, created.id).await.unwrap(), created);
        assert!(matches!(
            addresses.get(&other, created.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            addresses.delete(&other, created.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_filters_by_city_and_state() {
        let (addresses, owner, _) = setup().await;
        addresses
            .create(&owner, &address("São Paulo", "SP"))
            .await
            .unwrap();
        addresses
            .create(&owner, &address("Rio de Janeiro", "RJ"))
            .await
            .unwrap();

        let params = HashMap::from([("city".to_owned(), "paulo".to_owned())]);
        assert_eq!(addresses.list(&owner, &params).await.unwrap().len(), 1);

        let params = HashMap::from([("state".to_owned(), "MG".to_owned())]);
        assert!(addresses.list(&owner, &params).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_customer() {
        let (addresses, _, _) = setup().await;
        let err = addresses
            .create(&Document::parse("99999999999").unwrap(), &address("X", "Y"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "customer 99999999999 not found");
    }
}
