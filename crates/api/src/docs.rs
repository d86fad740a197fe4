//! `OpenAPI` document served at `/docs`.

use utoipa::OpenApi;

use storekeep_core::{Document, Email, Money, OrderStatusCode, PaymentStatus};

use crate::error::ErrorBody;
use crate::models::{
    Address, Basket, BasketItem, Customer, OrderDetails, Payment, PaymentUpdate, Product, Status,
};
use crate::routes::{checkout, customers, orders, payments, products, statuses};

#[derive(OpenApi)]
#[openapi(
    info(title = "Storekeep API", description = "Customers, products, checkout, orders and payments"),
    paths(
        customers::create,
        customers::list,
        customers::show,
        customers::update,
        customers::remove,
        customers::create_address,
        customers::list_addresses,
        customers::show_address,
        customers::update_address,
        customers::remove_address,
        products::create,
        products::list,
        products::show,
        products::update,
        products::remove,
        checkout::create,
        checkout::pending,
        orders::list,
        orders::show,
        orders::update_status,
        statuses::create,
        statuses::list,
        statuses::show,
        statuses::update,
        statuses::remove,
        payments::show,
        payments::notify,
    ),
    components(schemas(
        ErrorBody,
        Customer,
        Address,
        Product,
        Status,
        Basket,
        BasketItem,
        Payment,
        PaymentUpdate,
        OrderDetails,
        Document,
        Email,
        Money,
        OrderStatusCode,
        PaymentStatus,
        customers::CustomerRequest,
        customers::CustomerUpdateRequest,
        customers::AddressRequest,
        products::ProductRequest,
        checkout::CheckoutBody,
        checkout::CheckoutItemRequest,
        orders::OrderStatusRequest,
        statuses::StatusRequest,
        payments::NotificationRequest,
    )),
    tags(
        (name = "customers", description = "Customers and their addresses"),
        (name = "products", description = "Product catalog"),
        (name = "checkout", description = "Basket, payment and order creation"),
        (name = "orders", description = "Order tracking"),
        (name = "statuses", description = "Order status values"),
        (name = "payments", description = "Payments and provider notifications"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();

        for expected in [
            "/customers",
            "/customers/{document}",
            "/customers/{document}/addresses/{id}",
            "/products/{id}",
            "/checkout",
            "/checkout/pending",
            "/orders/{id}",
            "/orders/status",
            "/payment/{order_id}",
            "/payment/notifications",
        ] {
            assert!(paths.contains(&expected), "missing {expected}");
        }
    }

    #[test]
    fn test_nested_request_schemas_are_registered() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().unwrap().schemas;

        for expected in [
            "CustomerRequest",
            "AddressRequest",
            "CheckoutBody",
            "CheckoutItemRequest",
        ] {
            assert!(schemas.contains_key(expected), "missing {expected}");
        }

        let body = serde_json::to_value(&schemas["CheckoutBody"]).unwrap();
        assert_eq!(body["properties"]["items"]["type"], "array");
    }
}
