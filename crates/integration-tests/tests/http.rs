//! Health checks, `OpenAPI` document, request ids and unmatched routes.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::Value;

use storekeep_integration_tests::TestApp;

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();

    let live = app.get("/health").await;
    assert_eq!(live.status, StatusCode::OK);
    assert_eq!(live.body, Value::String("ok".to_owned()));

    let ready = app.get("/health/ready").await;
    assert_eq!(ready.status, StatusCode::OK);
}

#[tokio::test]
async fn test_openapi_document_lists_routes() {
    let app = TestApp::new();

    let response = app.get("/docs").await;
    assert_eq!(response.status, StatusCode::OK);

    let paths = response.body["paths"].as_object().unwrap();
    for path in [
        "/customers/{document}/addresses/{id}",
        "/products/{id}",
        "/checkout",
        "/checkout/pending",
        "/orders/{id}",
        "/orders/status",
        "/payment/notifications",
        "/payment/{order_id}",
    ] {
        assert!(paths.contains_key(path), "missing {path}");
    }
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .unwrap();

    let response = app.send_request(request).await;
    assert_eq!(response.headers["x-request-id"], "abc-123");
}

#[tokio::test]
async fn test_request_id_is_generated() {
    let app = TestApp::new();

    let first = app.get("/products").await;
    let second = app.get("/products").await;

    let first = first.headers["x-request-id"].to_str().unwrap().to_owned();
    let second = second.headers["x-request-id"].to_str().unwrap().to_owned();
    assert!(!first.is_empty());
    assert_ne!(first, second);
}

#[tokio::test]
async fn test_unknown_route_uses_error_envelope() {
    let app = TestApp::new();

    let response = app.get("/baskets").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.errors(), vec!["no route for /baskets"]);
}

#[tokio::test]
async fn test_wrong_method_is_rejected() {
    let app = TestApp::new();

    let response = app.delete("/checkout").await;
    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
}
