//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                              - Liveness
//! GET  /health/ready                        - Database readiness
//! GET  /docs                                - OpenAPI document
//!
//! # Customers
//! GET|POST        /customers
//! GET|PUT|DELETE  /customers/{document}
//! GET|POST        /customers/{document}/addresses
//! GET|PUT|DELETE  /customers/{document}/addresses/{id}
//!
//! # Products
//! GET|POST        /products
//! GET|PUT|DELETE  /products/{id}
//!
//! # Checkout
//! POST /checkout                            - Basket + payment + order
//! GET  /checkout/pending                    - Orders waiting for payment
//!
//! # Orders
//! GET   /orders                             - ?status=<code>
//! GET   /orders/{id}
//! PATCH /orders/{id}                        - {"status": "<code>"}
//! GET|POST        /orders/status
//! GET|PUT|DELETE  /orders/status/{id}
//!
//! # Payments
//! GET  /payment/{order_id}
//! POST /payment/notifications               - {"nsu": "...", "status": "..."}
//! ```

pub mod checkout;
pub mod customers;
pub mod orders;
pub mod payments;
pub mod products;
pub mod statuses;

use axum::{
    Router,
    extract::State,
    http::{StatusCode, Uri},
    middleware::from_fn,
    routing::get,
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;

use crate::docs::ApiDoc;
use crate::error::AppError;
use crate::extract::Json;
use crate::middleware::{panic_response, request_id_middleware, trace_layer};
use crate::state::AppState;

/// Every API route, without middleware.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/docs", get(docs))
        .merge(customers::router())
        .merge(products::router())
        .merge(checkout::router())
        .merge(orders::router())
        .merge(statuses::router())
        .merge(payments::router())
        .fallback(not_found)
}

/// The complete application: routes, state and middleware.
pub fn app(state: AppState) -> Router {
    routes()
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(from_fn(request_id_middleware))
        .layer(trace_layer())
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable. State
/// without a database is always ready.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    let Some(pool) = state.pool() else {
        return StatusCode::OK;
    };
    match sqlx::query("SELECT 1").fetch_one(pool).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

async fn docs() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("no route for {}", uri.path()))
}
