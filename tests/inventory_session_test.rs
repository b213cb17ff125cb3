//! End-to-end tests for the inventory session lifecycle over HTTP.
//!
//! Covers opening sessions with stock lines, closing them into a
//! sales bill, reconciliation failures and the closed-state rules.

mod common;

use axum::http::{Method, StatusCode};
use backoffice_api::entities::user::UserRole;
use common::{body_json, TestApp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

fn dec_field(value: &Value) -> Decimal {
    value
        .as_str()
        .expect("decimal field serialized as string")
        .parse()
        .expect("decimal field parses")
}

#[tokio::test]
async fn test_open_session_merges_lines_and_tracks_sold_stock() {
    let app = TestApp::new().await;
    let student = app.seed_user("runner", UserRole::Student).await;
    let token = app.token_for(&student);
    let item = app.seed_item("Samosa", dec!(20)).await;

    let payload = json!({
        "outlet": "MOBILE_1",
        "student_ids": [student.id],
        "items": [
            {"item_id": item.id, "quantity_taken": 30, "quantity_returned": 4},
            {"item_id": item.id, "quantity_taken": 10}
        ]
    });
    let response = app
        .request(
            Method::POST,
            "/api/v1/inventory-sessions",
            Some(payload),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let session = &body["data"];
    assert_eq!(session["status"], json!("OPEN"));
    let lines = session["items"].as_array().expect("session lines");
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["quantity_taken"], json!(40));
    assert_eq!(lines[0]["quantity_returned"], json!(4));
    assert_eq!(lines[0]["quantity_sold"], json!(36));
    assert_eq!(dec_field(&session["total_value"]), dec!(720));
    let students = session["students"].as_array().expect("session students");
    assert_eq!(students.len(), 1);
}

#[tokio::test]
async fn test_close_session_converts_it_into_a_sales_bill() {
    let app = TestApp::new().await;
    let admin = app.seed_superuser("admin").await;
    let admin_token = app.token_for(&admin);
    let student = app.seed_user("runner", UserRole::Student).await;
    let token = app.token_for(&student);
    let item = app.seed_item("Cutlet", dec!(25.50)).await;

    // 4 taken, 2 returned: 2 sold, worth 51.00.
    let payload = json!({
        "outlet": "MOBILE_2",
        "payment_status": "PAID",
        "student_ids": [student.id],
        "items": [{"item_id": item.id, "quantity_taken": 4, "quantity_returned": 2}],
        "payments": [{"payment_type": "UPI", "amount": "51.00"}]
    });
    let response = app
        .request(
            Method::POST,
            "/api/v1/inventory-sessions",
            Some(payload),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let session_id = body["data"]["id"].as_str().expect("session id").to_string();

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/inventory-sessions/{}/close", session_id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let closed = &body["data"];
    assert_eq!(closed["session"]["status"], json!("CLOSED"));
    assert!(closed["session"]["closed_at"].is_string());
    assert_eq!(dec_field(&closed["bill_total"]), dec!(51.00));
    let invoice = closed["invoice_number"].as_str().expect("invoice number");
    assert!(invoice.starts_with("SB-"));
    let bill_id = closed["bill_id"].as_str().expect("bill id").to_string();

    // The produced bill carries the session's payments and provenance.
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/bills/{}", bill_id),
            None,
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let bill = &body["data"];
    assert_eq!(bill["bill_type"], json!("SALES"));
    assert_eq!(bill["payment_status"], json!("PAID"));
    assert_eq!(bill["payment_type"], json!("UPI"));
    assert_eq!(
        bill["remarks"],
        json!(format!("Auto-generated from Inventory Session {}", session_id))
    );
    assert_eq!(bill["payments"].as_array().expect("bill payments").len(), 1);
    assert_eq!(bill["students"].as_array().expect("bill students").len(), 1);
}

#[tokio::test]
async fn test_close_rejects_payments_that_do_not_match_sold_stock() {
    let app = TestApp::new().await;
    let admin = app.seed_superuser("admin").await;
    let token = app.token_for(&admin);
    let item = app.seed_item("Cutlet", dec!(25.50)).await;

    let payload = json!({
        "outlet": "BED",
        "items": [{"item_id": item.id, "quantity_taken": 4, "quantity_returned": 2}],
        "payments": [{"payment_type": "CASH", "amount": "50.99"}]
    });
    let response = app
        .request(
            Method::POST,
            "/api/v1/inventory-sessions",
            Some(payload),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let session_id = body["data"]["id"].as_str().expect("session id").to_string();

    // 50.99 against 51.00 of sold stock: off by a paisa, no tolerance.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/inventory-sessions/{}/close", session_id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert!(body["message"]
        .as_str()
        .expect("error message")
        .contains("cannot close until they match"));

    // The failed close must leave the session open.
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/inventory-sessions/{}", session_id),
            None,
            Some(&token),
        )
        .await;
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], json!("OPEN"));
    assert!(body["data"]["bill_id"].is_null());
}

#[tokio::test]
async fn test_returns_exceeding_taken_block_close() {
    let app = TestApp::new().await;
    let admin = app.seed_superuser("admin").await;
    let token = app.token_for(&admin);
    let item = app.seed_item("Vada", dec!(15)).await;

    let payload = json!({
        "outlet": "LIBA",
        "items": [{"item_id": item.id, "quantity_taken": 5, "quantity_returned": 8}]
    });
    let response = app
        .request(
            Method::POST,
            "/api/v1/inventory-sessions",
            Some(payload),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let session_id = body["data"]["id"].as_str().expect("session id").to_string();

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/inventory-sessions/{}/close", session_id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert!(body["message"]
        .as_str()
        .expect("error message")
        .contains("returned 8 exceeds taken 5"));
}

#[tokio::test]
async fn test_closed_sessions_are_immutable() {
    let app = TestApp::new().await;
    let admin = app.seed_superuser("admin").await;
    let token = app.token_for(&admin);
    let item = app.seed_item("Idli", dec!(10)).await;

    let payload = json!({
        "outlet": "EAT_RIGHT",
        "payment_status": "PAID",
        "items": [{"item_id": item.id, "quantity_taken": 3}],
        "payments": [{"payment_type": "CASH", "amount": "30"}]
    });
    let response = app
        .request(
            Method::POST,
            "/api/v1/inventory-sessions",
            Some(payload),
            Some(&token),
        )
        .await;
    let body = body_json(response).await;
    let session_id = body["data"]["id"].as_str().expect("session id").to_string();

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/inventory-sessions/{}/close", session_id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Editing, re-closing and deleting are all rejected afterwards.
    let edit = json!({
        "outlet": "EAT_RIGHT",
        "items": [{"item_id": item.id, "quantity_taken": 5}]
    });
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/inventory-sessions/{}", session_id),
            Some(edit),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/inventory-sessions/{}/close", session_id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert!(body["message"]
        .as_str()
        .expect("error message")
        .contains("already closed"));

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/inventory-sessions/{}", session_id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_open_sessions_can_be_deleted() {
    let app = TestApp::new().await;
    let admin = app.seed_superuser("admin").await;
    let token = app.token_for(&admin);
    let item = app.seed_item("Poori", dec!(35)).await;

    let payload = json!({
        "outlet": "BED",
        "items": [{"item_id": item.id, "quantity_taken": 2}]
    });
    let response = app
        .request(
            Method::POST,
            "/api/v1/inventory-sessions",
            Some(payload),
            Some(&token),
        )
        .await;
    let body = body_json(response).await;
    let session_id = body["data"]["id"].as_str().expect("session id").to_string();

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/inventory-sessions/{}", session_id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/inventory-sessions/{}", session_id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_session_module_access_is_enforced() {
    let app = TestApp::new().await;
    let employee = app.seed_user("emp1", UserRole::Employee).await;
    let student = app.seed_user("stu1", UserRole::Student).await;

    // Employees have no inventory grant at all.
    let response = app
        .request(
            Method::GET,
            "/api/v1/inventory-sessions",
            None,
            Some(&app.token_for(&employee)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Students may view but not delete.
    let response = app
        .request(
            Method::GET,
            "/api/v1/inventory-sessions",
            None,
            Some(&app.token_for(&student)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/inventory-sessions/{}", uuid::Uuid::new_v4()),
            None,
            Some(&app.token_for(&student)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
