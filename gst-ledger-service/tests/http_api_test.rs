//! HTTP API tests against the router over an in-memory store.

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use common::{d, init_tracing};
use gst_ledger_service::services::MemoryStore;
use gst_ledger_service::{build_router, AppState};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::str::FromStr;
use tower::util::ServiceExt;

fn test_router() -> Router {
    init_tracing();
    build_router(AppState::new(MemoryStore::new()))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .expect("Failed to build request");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("Failed to send request");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Response body is not JSON")
    };
    (status, value)
}

fn money(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("Invalid decimal string"),
        other => Decimal::from_str(&other.to_string()).expect("Invalid decimal number"),
    }
}

fn id(value: &Value, field: &str) -> String {
    value[field]
        .as_str()
        .unwrap_or_else(|| panic!("Missing {} in {}", field, value))
        .to_string()
}

/// Business in state 33 and one client in the given state, as `(business_id, client_id)`.
async fn onboard(app: &Router, client_state_code: &str) -> (String, String) {
    let (status, business) = send(
        app,
        "POST",
        "/businesses",
        Some(json!({
            "name": "Sahay Traders",
            "state": "Tamil Nadu",
            "state_code": "33"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let business_id = id(&business, "business_id");

    let (status, client) = send(
        app,
        "POST",
        "/clients",
        Some(json!({
            "business_id": business_id,
            "username": "acme",
            "name": "Acme Corp",
            "email": "billing@acme.example",
            "state": "Somewhere",
            "state_code": client_state_code
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    (business_id, id(&client, "client_id"))
}

fn invoice_body(invoice_date: &str) -> Value {
    json!({
        "invoice_date": invoice_date,
        "items": [
            {"description": "Keyboard", "hsn_code": "8471", "rate": "100", "quantity": 2},
            {"description": "Mouse", "hsn_code": "8471", "rate": "50", "quantity": 1}
        ]
    })
}

#[tokio::test]
async fn health_check_works() {
    let app = test_router();

    let (status, body) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn readiness_check_works() {
    let app = test_router();

    let (status, _) = send(&app, "GET", "/ready", None).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn invoice_lifecycle_over_http() {
    let app = test_router();
    let (business_id, client_id) = onboard(&app, "33").await;

    let (status, created) = send(
        &app,
        "POST",
        &format!("/clients/{}/invoices", client_id),
        Some(invoice_body("2024-06-15")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["invoice_number"], "1/2024-25");
    assert_eq!(money(&created["total_after_tax"]), d("295"));
    assert_eq!(money(&created["cgst"]), d("22.50"));
    assert_eq!(created["items"].as_array().map(Vec::len), Some(2));
    let invoice_id = id(&created, "invoice_id");

    let (status, client) = send(&app, "GET", &format!("/clients/{}", client_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(money(&client["total_billed"]), d("295"));

    let (status, fetched) = send(
        &app,
        "GET",
        &format!("/clients/{}/invoices/{}", client_id, invoice_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["invoice_id"], created["invoice_id"]);

    let (status, page) = send(
        &app,
        "GET",
        &format!("/clients/{}/invoices?financial_year=2024-25", client_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["page"], 1);
    assert_eq!(page["page_size"], 10);
    assert_eq!(page["invoices"].as_array().map(Vec::len), Some(1));

    let (status, summaries) = send(
        &app,
        "GET",
        &format!("/businesses/{}/clients", business_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summaries[0]["last_invoice_number"], "1/2024-25");

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/clients/{}/invoices/{}", client_id, invoice_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, client) = send(&app, "GET", &format!("/clients/{}", client_id), None).await;
    assert_eq!(money(&client["total_billed"]), Decimal::ZERO);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/clients/{}/invoices/{}", client_id, invoice_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn payment_lifecycle_over_http() {
    let app = test_router();
    let (_, client_id) = onboard(&app, "29").await;

    let (status, paid) = send(
        &app,
        "POST",
        &format!("/clients/{}/payments", client_id),
        Some(json!({
            "payment_date": "2024-06-20",
            "amount": "150.25",
            "payee_name": "Accounts Desk"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let payment_id = id(&paid, "payment_id");

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/clients/{}/payments/{}", client_id, payment_id),
        Some(json!({
            "payment_date": "2024-06-21",
            "amount": "200",
            "payee_name": "Accounts Desk"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(money(&updated["amount"]), d("200"));

    let (status, listed) = send(
        &app,
        "GET",
        &format!(
            "/clients/{}/payments?start_date=2024-06-01&end_date=2024-06-30",
            client_id
        ),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["count"], 1);

    let (status, client) = send(&app, "GET", &format!("/clients/{}", client_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(money(&client["total_paid"]), d("200"));

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/clients/{}/payments/{}", client_id, payment_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, client) = send(&app, "GET", &format!("/clients/{}", client_id), None).await;
    assert_eq!(money(&client["total_paid"]), Decimal::ZERO);
}

#[tokio::test]
async fn duplicate_username_returns_conflict() {
    let app = test_router();
    let (business_id, _) = onboard(&app, "33").await;

    let (status, body) = send(
        &app,
        "POST",
        "/clients",
        Some(json!({
            "business_id": business_id,
            "username": "acme",
            "name": "Acme Again",
            "email": "again@acme.example",
            "state": "Tamil Nadu",
            "state_code": "33"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn invoice_without_items_is_unprocessable() {
    let app = test_router();
    let (_, client_id) = onboard(&app, "33").await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/clients/{}/invoices", client_id),
        Some(json!({"invoice_date": "2024-06-15", "items": []})),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Validation error");
}

#[tokio::test]
async fn malformed_financial_year_is_bad_request() {
    let app = test_router();
    let (_, client_id) = onboard(&app, "33").await;

    let (status, _) = send(
        &app,
        "GET",
        &format!("/clients/{}/invoices?financial_year=2024-26", client_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/clients/{}/payments?start_date=2024-06-01", client_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_client_returns_not_found() {
    let app = test_router();

    let (status, _) = send(
        &app,
        "GET",
        &format!("/clients/{}", uuid::Uuid::new_v4()),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn responses_carry_request_id() {
    let app = test_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "test-request-1")
                .body(Body::empty())
                .expect("Failed to build request"),
        )
        .await
        .expect("Failed to send request");

    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("test-request-1")
    );
}

#[tokio::test]
async fn oversized_amounts_are_rejected_over_http() {
    let app = test_router();
    let (_, client_id) = onboard(&app, "33").await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/clients/{}/invoices", client_id),
        Some(json!({
            "invoice_date": "2024-06-15",
            "items": [
                {"description": "Turbine", "hsn_code": "8411", "rate": "10000000000", "quantity": 1}
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Validation error");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/clients/{}/invoices", client_id),
        Some(json!({
            "invoice_date": "2024-06-15",
            "items": [
                {"description": "Turbine", "hsn_code": "8411", "rate": "9999999999.99", "quantity": 2}
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, client) = send(&app, "GET", &format!("/clients/{}", client_id), None).await;
    assert_eq!(money(&client["total_billed"]), Decimal::ZERO);
}
