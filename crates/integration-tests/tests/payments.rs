//! Payment lookup and provider notifications.

use axum::http::StatusCode;
use serde_json::{Value, json};

use storekeep_core::PaymentId;
use storekeep_integration_tests::{TestApp, TestResponse};

async fn placed_order(app: &TestApp) -> Value {
    app.customer().await;
    let product = app.product("Espresso", "4.50").await;
    let response = app.checkout(&[(&product, 2)]).await;
    assert_eq!(response.status, StatusCode::CREATED);
    response.body
}

async fn notify(app: &TestApp, nsu: &Value, status: &str) -> TestResponse {
    app.post(
        "/payment/notifications",
        json!({"nsu": nsu, "status": status}),
    )
    .await
}

#[tokio::test]
async fn test_payment_for_order() {
    let app = TestApp::new();
    let order = placed_order(&app).await;

    let response = app.get(&format!("/payment/{}", order["id"])).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, order["payment"]);
    assert_eq!(response.body["amount"], "9.00");

    let missing = app.get("/payment/4242").await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.errors(), vec!["order 4242 not found"]);
}

#[tokio::test]
async fn test_approved_payment_marks_order_paid() {
    let app = TestApp::new();
    let order = placed_order(&app).await;

    let response = notify(&app, &order["payment"]["nsu"], "approved").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["payment"]["status"], "approved");
    assert_eq!(response.body["order"]["id"], order["id"]);
    assert_eq!(response.body["order"]["status"]["code"], "paid");

    let fetched = app.get(&format!("/orders/{}", order["id"])).await;
    assert_eq!(fetched.body["status"]["code"], "paid");
    assert_eq!(fetched.body["payment"]["status"], "approved");

    let pending = app.get("/checkout/pending").await;
    assert_eq!(pending.body, json!([]));
}

#[tokio::test]
async fn test_refused_payment_cancels_order() {
    let app = TestApp::new();
    let order = placed_order(&app).await;

    let response = notify(&app, &order["payment"]["nsu"], "refused").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["payment"]["status"], "refused");
    assert_eq!(response.body["order"]["status"]["code"], "cancelled");
    assert_eq!(response.body["order"]["done_at"], Value::Null);
}

#[tokio::test]
async fn test_pending_notification_leaves_order_alone() {
    let app = TestApp::new();
    let order = placed_order(&app).await;

    let response = notify(&app, &order["payment"]["nsu"], "pending").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["order"]["status"]["code"], "pending");
}

#[tokio::test]
async fn test_late_notification_does_not_rewind_order() {
    let app = TestApp::new();
    let order = placed_order(&app).await;
    let uri = format!("/orders/{}", order["id"]);
    let nsu = &order["payment"]["nsu"];

    assert_eq!(notify(&app, nsu, "approved").await.status, StatusCode::OK);
    let completed = app.patch(&uri, json!({"status": "completed"})).await;
    assert_eq!(completed.status, StatusCode::OK);

    let repeated = notify(&app, nsu, "approved").await;
    assert_eq!(repeated.status, StatusCode::OK);
    assert_eq!(repeated.body["order"]["status"]["code"], "completed");

    let refused = notify(&app, nsu, "refused").await;
    assert_eq!(refused.status, StatusCode::OK);
    assert_eq!(refused.body["payment"]["status"], "refused");
    assert_eq!(refused.body["order"]["status"]["code"], "completed");
    assert_eq!(refused.body["order"]["done_at"], completed.body["done_at"]);
}

#[tokio::test]
async fn test_unknown_nsu() {
    let app = TestApp::new();
    placed_order(&app).await;

    let response = notify(&app, &json!("no-such-nsu"), "approved").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(
        response.errors(),
        vec!["payment with nsu 'no-such-nsu' not found"]
    );
}

#[tokio::test]
async fn test_invalid_notification() {
    let app = TestApp::new();

    let response = app
        .post("/payment/notifications", json!({"status": "settled"}))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let errors = response.errors();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0], "nsu: is required");
    assert!(errors[1].starts_with("status: unknown payment status 'settled'"));
}

#[tokio::test]
async fn test_shared_nsu_is_a_conflict_and_changes_nothing() {
    let app = TestApp::new();
    let first = placed_order(&app).await;
    let product = app.product("Tea", "3.00").await;
    let second = app.checkout(&[(&product, 1)]).await.body;

    for order in [&first, &second] {
        let id = i32::try_from(order["payment"]["id"].as_i64().unwrap()).unwrap();
        assert!(app.store().set_payment_nsu(PaymentId::new(id), "shared").await);
    }

    let response = notify(&app, &json!("shared"), "approved").await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.errors().len(), 1);

    for order in [&first, &second] {
        let fetched = app.get(&format!("/orders/{}", order["id"])).await;
        assert_eq!(fetched.body["status"]["code"], "pending");
        assert_eq!(fetched.body["payment"]["status"], "pending");
    }
}
