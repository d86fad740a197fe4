//! Product endpoints.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::json;

use storekeep_integration_tests::TestApp;

#[tokio::test]
async fn test_created_products_get_distinct_ids() {
    let app = TestApp::new();

    let first = app.product("Espresso", "4.50").await;
    let second = app.product("Espresso", "4.50").await;

    assert!(!first.is_empty());
    assert_ne!(first, second);
}

#[tokio::test]
async fn test_get_and_replace_keep_the_id() {
    let app = TestApp::new();
    let id = app.product("Espresso", "4.50").await;

    let fetched = app.get(&format!("/products/{id}")).await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.body["price"], "4.50");

    let replaced = app
        .put(
            &format!("/products/{id}"),
            json!({"name": "Double espresso", "price": "6", "description": "Two shots"}),
        )
        .await;
    assert_eq!(replaced.status, StatusCode::OK);
    assert_eq!(replaced.body["id"], id.as_str());
    assert_eq!(replaced.body["name"], "Double espresso");
    assert_eq!(replaced.body["price"], "6.00");
}

#[tokio::test]
async fn test_delete_twice() {
    let app = TestApp::new();
    let id = app.product("Espresso", "4.50").await;

    let first = app.delete(&format!("/products/{id}")).await;
    assert_eq!(first.status, StatusCode::NO_CONTENT);

    let second = app.delete(&format!("/products/{id}")).await;
    assert_eq!(second.status, StatusCode::NOT_FOUND);
    assert_eq!(second.errors(), vec![format!("product {id} not found")]);

    assert_eq!(
        app.get(&format!("/products/{id}")).await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_list_filters() {
    let app = TestApp::new();
    app.product("Espresso", "4.50").await;
    app.product("Iced latte", "7.00").await;
    app.product("Latte", "6.50").await;

    let all = app.get("/products").await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(all.body.as_array().unwrap().len(), 3);

    let lattes = app.get("/products?name=LATTE").await;
    let names: Vec<&str> = lattes
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Iced latte", "Latte"]);

    let priced = app.get("/products?price=6.5").await;
    assert_eq!(priced.body.as_array().unwrap().len(), 1);
    assert_eq!(priced.body[0]["name"], "Latte");
}

#[tokio::test]
async fn test_filter_matching_nothing_is_empty() {
    let app = TestApp::new();
    app.product("Espresso", "4.50").await;

    let response = app.get("/products?name=tea").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!([]));
}

#[tokio::test]
async fn test_unknown_filter_is_rejected() {
    let app = TestApp::new();

    let response = app.get("/products?colour=red").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.errors().len(), 1);
    assert!(response.errors()[0].starts_with("colour: is not a filterable field"));
}

#[tokio::test]
async fn test_invalid_body_lists_every_field() {
    let app = TestApp::new();

    let response = app
        .post("/products", json!({"name": " ", "price": "-1"}))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let errors = response.errors();
    assert_eq!(errors.len(), 3);
    assert_eq!(errors[0], "name: is required");
    assert_eq!(errors[1], "description: is required");
    assert!(errors[2].starts_with("price: "));
}

#[tokio::test]
async fn test_malformed_json_uses_error_envelope() {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/products")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();

    let response = app.send_request(request).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.errors().len(), 1);
}

#[tokio::test]
async fn test_bad_product_id_is_bad_request() {
    let app = TestApp::new();

    let response = app.get("/products/not-a-uuid").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.errors().len(), 1);
}
