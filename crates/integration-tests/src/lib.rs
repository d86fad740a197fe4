//! Integration tests for Storekeep.
//!
//! Tests drive the complete axum application (routes, extractors, error
//! mapping and middleware) with `tower::ServiceExt::oneshot`, over an
//! in-memory store seeded with the default order statuses. No server or
//! database is needed:
//!
//! ```bash
//! cargo test -p storekeep-integration-tests
//! ```
//!
//! Tests in `tests/postgres.rs` run against a real database and are ignored
//! unless `STOREKEEP_TEST_DATABASE_URL` points at a migrated, seeded one:
//!
//! ```bash
//! cargo test -p storekeep-integration-tests -- --ignored
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use chrono::TimeDelta;
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use storekeep_api::db::{self, MemoryStore};
use storekeep_api::routes;
use storekeep_api::state::AppState;

/// Document of the customer created by [`TestApp::customer`].
pub const DOCUMENT: &str = "12345678909";

/// A response status with its parsed JSON body (`Value::Null` when empty).
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// The messages of an error envelope.
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.body["error"]
            .as_array()
            .map(|errors| {
                errors
                    .iter()
                    .filter_map(|e| e.as_str().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// The application over a fresh in-memory store, or over a database.
pub struct TestApp {
    store: Option<MemoryStore>,
    router: Router,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    /// Application with the default status rows in place.
    #[must_use]
    pub fn new() -> Self {
        Self::with_store(MemoryStore::with_default_statuses())
    }

    /// Application over a caller-prepared store.
    #[must_use]
    pub fn with_store(store: MemoryStore) -> Self {
        let state = AppState::in_memory(&store, TimeDelta::minutes(30));
        Self {
            store: Some(store),
            router: routes::app(state),
        }
    }

    /// Application over a migrated and seeded database.
    pub async fn postgres(database_url: &str) -> Self {
        let url = SecretString::from(database_url.to_owned());
        let pool = db::create_pool(&url).await.unwrap();
        Self {
            store: None,
            router: routes::app(AppState::from_pool(pool, TimeDelta::minutes(30))),
        }
    }

    /// The in-memory store behind the application.
    ///
    /// Panics for database-backed applications.
    #[must_use]
    pub fn store(&self) -> &MemoryStore {
        self.store.as_ref().unwrap()
    }

    /// Send a request, with a JSON body when `body` is given.
    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        self.send_request(request).await
    }

    /// Send a prepared request.
    pub async fn send_request(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::PUT, uri, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::PATCH, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.send(Method::DELETE, uri, None).await
    }

    /// Create the customer identified by [`DOCUMENT`].
    pub async fn customer(&self) -> Value {
        self.customer_with_document(DOCUMENT).await
    }

    pub async fn customer_with_document(&self, document: &str) -> Value {
        let response = self
            .post(
                "/customers",
                json!({
                    "name": "Ada Lovelace",
                    "document": document,
                    "email": "ada@example.com",
                    "addresses": [{
                        "street": "Rua das Flores",
                        "number": "12",
                        "neighborhood": "Boa Viagem",
                        "city": "Recife",
                        "state": "PE",
                        "zip_code": "51020000"
                    }]
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body
    }

    /// Create a product and return its id.
    pub async fn product(&self, name: &str, price: &str) -> String {
        let response = self
            .post(
                "/products",
                json!({
                    "name": name,
                    "price": price,
                    "description": format!("{name} description"),
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["id"].as_str().unwrap().to_owned()
    }

    /// Check out `items` (`(product_id, quantity)`) for [`DOCUMENT`].
    pub async fn checkout(&self, items: &[(&str, i64)]) -> TestResponse {
        self.checkout_for(DOCUMENT, items).await
    }

    pub async fn checkout_for(&self, document: &str, items: &[(&str, i64)]) -> TestResponse {
        let items: Vec<Value> = items
            .iter()
            .map(|(id, quantity)| json!({"product_id": id, "quantity": quantity}))
            .collect();
        self.post("/checkout", json!({"document": document, "items": items}))
            .await
    }

    /// Row counts for baskets, payments and orders.
    pub async fn counts(&self) -> (usize, usize, usize) {
        let store = self.store();
        (
            store.basket_count().await,
            store.payment_count().await,
            store.order_count().await,
        )
    }
}
