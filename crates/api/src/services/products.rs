//! Product catalog service.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, instrument};

use storekeep_core::ProductId;

use super::ServiceError;
use crate::db::{Filters, PRODUCT_FILTERS, ProductRepository};
use crate::models::{NewProduct, Product};

/// Product CRUD.
#[derive(Clone)]
pub struct ProductService {
    products: Arc<dyn ProductRepository>,
}

impl ProductService {
    /// Create a new product service.
    #[must_use]
    pub fn new(products: Arc<dyn ProductRepository>) -> Self {
        Self { products }
    }

    /// Create a product under a newly generated id.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the insert fails.
    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn create(&self, product: &NewProduct) -> Result<Product, ServiceError> {
        let product = self.products.create(product).await?;
        info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    /// Fetch a product.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if no product has this id.
    pub async fn get(&self, id: ProductId) -> Result<Product, ServiceError> {
        self.products
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("product {id}")))
    }

    /// List products matching the query-string filters.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for unknown filter keys or bad values.
    pub async fn list(
        &self,
        params: &HashMap<String, String>,
    ) -> Result<Vec<Product>, ServiceError> {
        let filters = Filters::parse(PRODUCT_FILTERS, params)?;
        Ok(self.products.list(&filters).await?)
    }

    /// Replace a product's fields, keeping its id.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if no product has this id.
    #[instrument(skip(self, product))]
    pub async fn update(
        &self,
        id: ProductId,
        product: &NewProduct,
    ) -> Result<Product, ServiceError> {
        self.products
            .update(id, product)
            .await
            .map_err(|e| ServiceError::from_repository(e, format!("product {id}")))
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if no product has this id, and
    /// `ServiceError::Conflict` if a basket still references it.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<(), ServiceError> {
        if self.products.delete(id).await? {
            info!(product_id = %id, "Product deleted");
            Ok(())
        } else {
            Err(ServiceError::not_found(format!("product {id}")))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use storekeep_core::Money;

    use super::*;
    use crate::db::MemoryStore;

    fn service() -> ProductService {
        ProductService::new(Arc::new(MemoryStore::new()))
    }

    fn burger(cents: i64) -> NewProduct {
        NewProduct {
            name: "Cheeseburger".to_owned(),
            image: Some("https://img.example/burger.png".to_owned()),
            price: Money::parse(Decimal::new(cents, 2)).unwrap(),
            description: "Double beef".to_owned(),
        }
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[tokio::test]
    async fn test_created_products_get_distinct_ids() {
        let products = service();
        let first = products.create(&burger(1990)).await.unwrap();
        let second = products.create(&burger(1990)).await.unwrap();

        assert_ne!(first.id, second.id);
        assert!(!first.id.to_string().is_empty());
    }

    #[tokio::test]
    async fn test_update_keeps_id() {
        let products = service();
        let created = products.create(&burger(1990)).await.unwrap();

        let mut changed = burger(2500);
        changed.name = "Veggie burger".to_owned();
        let updated = products.update(created.id, &changed).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "Veggie burger");
        assert_eq!(products.get(created.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_delete_twice_reports_not_found() {
        let products = service();
        let created = products.create(&burger(1990)).await.unwrap();

        products.delete(created.id).await.unwrap();
        assert!(matches!(
            products.delete(created.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            products.get(created.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let products = service();
        products.create(&burger(1990)).await.unwrap();
        let mut fries = burger(900);
        fries.name = "Fries".to_owned();
        fries.description = "Crispy".to_owned();
        products.create(&fries).await.unwrap();

        let found = products.list(&params(&[("name", "burg")])).await.unwrap();
        assert_eq!(found.len(), 1);

        let found = products.list(&params(&[("price", "9")])).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Fries");

        let none = products.list(&params(&[("name", "pizza")])).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_list_rejects_unknown_filter() {
        let err = service()
            .list(&params(&[("colour", "red")]))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
