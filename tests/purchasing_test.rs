//! End-to-end tests for vendor purchasing and payouts.
//!
//! Covers purchase recording with order-number allocation, goods
//! receipt, settlement updates, vendor payment approval and the
//! vendor removal rule.

mod common;

use axum::http::{Method, StatusCode};
use backoffice_api::entities::{user::UserRole, vendor};
use common::{body_json, TestApp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::{json, Value};

fn dec_field(value: &Value) -> Decimal {
    value
        .as_str()
        .expect("decimal field serialized as string")
        .parse()
        .expect("decimal field parses")
}

#[tokio::test]
async fn test_create_purchase_allocates_order_numbers() {
    let app = TestApp::new().await;
    let accountant = app.seed_user("acc1", UserRole::Accountant).await;
    let token = app.token_for(&accountant);
    let vendor = app.seed_vendor("VEN-001", "Sri Murugan Stores").await;

    let payload = json!({
        "vendor_id": vendor.id,
        "bill_no": "SMS/2026/118",
        "items": [
            {"item_name": "Rice 25kg", "quantity": 2, "price": "1200"},
            {"item_name": "Cooking oil 5l", "quantity": 3, "price": "650"}
        ]
    });
    let response = app
        .request(Method::POST, "/api/v1/purchases", Some(payload), Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let purchase = &body["data"];
    assert_eq!(purchase["vendor_name"], json!("Sri Murugan Stores"));
    assert_eq!(dec_field(&purchase["total_amount"]), dec!(4350));
    assert_eq!(purchase["payment_status"], json!("PENDING"));
    assert!(purchase["received_date"].is_null());
    assert_eq!(purchase["items"].as_array().expect("lines").len(), 2);

    let today = chrono::Utc::now().date_naive().format("%Y%m%d").to_string();
    assert_eq!(
        purchase["purchase_order_id"],
        json!(format!("PO-{}0001", today))
    );

    let payload = json!({
        "vendor_id": vendor.id,
        "items": [{"item_name": "Wheat flour 10kg", "quantity": 1, "price": "480"}]
    });
    let response = app
        .request(Method::POST, "/api/v1/purchases", Some(payload), Some(&token))
        .await;
    let body = body_json(response).await;
    assert_eq!(
        body["data"]["purchase_order_id"],
        json!(format!("PO-{}0002", today))
    );
}

#[tokio::test]
async fn test_purchase_validation_rules() {
    let app = TestApp::new().await;
    let accountant = app.seed_user("acc1", UserRole::Accountant).await;
    let token = app.token_for(&accountant);
    let vendor = app.seed_vendor("VEN-001", "Closed Down Traders").await;

    // Unknown vendor.
    let payload = json!({
        "vendor_id": uuid::Uuid::new_v4(),
        "items": [{"item_name": "Sugar", "quantity": 1, "price": "50"}]
    });
    let response = app
        .request(Method::POST, "/api/v1/purchases", Some(payload), Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert!(body["message"]
        .as_str()
        .expect("error message")
        .contains("does not exist"));

    // No items.
    let payload = json!({"vendor_id": vendor.id, "items": []});
    let response = app
        .request(Method::POST, "/api/v1/purchases", Some(payload), Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Inactive vendor.
    let vendor_id = vendor.id;
    let mut active: vendor::ActiveModel = vendor.into();
    active.is_active = Set(false);
    active
        .update(&*app.state.db)
        .await
        .expect("deactivate vendor for test");

    let payload = json!({
        "vendor_id": vendor_id,
        "items": [{"item_name": "Sugar", "quantity": 1, "price": "50"}]
    });
    let response = app
        .request(Method::POST, "/api/v1/purchases", Some(payload), Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert!(body["message"]
        .as_str()
        .expect("error message")
        .contains("is inactive"));
}

#[tokio::test]
async fn test_goods_are_received_once() {
    let app = TestApp::new().await;
    let accountant = app.seed_user("acc1", UserRole::Accountant).await;
    let token = app.token_for(&accountant);
    let vendor = app.seed_vendor("VEN-002", "Fresh Farm Produce").await;

    let payload = json!({
        "vendor_id": vendor.id,
        "items": [{"item_name": "Vegetables crate", "quantity": 4, "price": "900"}]
    });
    let response = app
        .request(Method::POST, "/api/v1/purchases", Some(payload), Some(&token))
        .await;
    let body = body_json(response).await;
    let purchase_id = body["data"]["id"].as_str().expect("purchase id").to_string();

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchases/{}/receive", purchase_id),
            Some(json!({"received_date": "2026-08-21"})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["received_date"], json!("2026-08-21"));

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchases/{}/receive", purchase_id),
            Some(json!({})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert!(body["message"]
        .as_str()
        .expect("error message")
        .contains("already marked received"));
}

#[tokio::test]
async fn test_purchase_payment_can_be_settled_later() {
    let app = TestApp::new().await;
    let accountant = app.seed_user("acc1", UserRole::Accountant).await;
    let token = app.token_for(&accountant);
    let vendor = app.seed_vendor("VEN-003", "Dairy Cooperative").await;

    let payload = json!({
        "vendor_id": vendor.id,
        "items": [{"item_name": "Milk cans", "quantity": 10, "price": "240"}]
    });
    let response = app
        .request(Method::POST, "/api/v1/purchases", Some(payload), Some(&token))
        .await;
    let body = body_json(response).await;
    let purchase_id = body["data"]["id"].as_str().expect("purchase id").to_string();

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/purchases/{}/payment", purchase_id),
            Some(json!({
                "payment_type": "NEFT",
                "payment_status": "PAID",
                "payment_date": "2026-08-22"
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["payment_type"], json!("NEFT"));
    assert_eq!(body["data"]["payment_status"], json!("PAID"));
    assert_eq!(body["data"]["payment_date"], json!("2026-08-22"));
}

#[tokio::test]
async fn test_vendor_payment_approval_flow() {
    let app = TestApp::new().await;
    let accountant = app.seed_user("acc1", UserRole::Accountant).await;
    let employee = app.seed_user("emp1", UserRole::Employee).await;
    let token = app.token_for(&accountant);
    let vendor = app.seed_vendor("VEN-004", "Gas Agency").await;

    // Amounts must be positive.
    let response = app
        .request(
            Method::POST,
            "/api/v1/vendor-payments",
            Some(json!({"vendor_id": vendor.id, "amount": "0"})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .request(
            Method::POST,
            "/api/v1/vendor-payments",
            Some(json!({
                "vendor_id": vendor.id,
                "amount": "5000",
                "details": "Cylinder refill for August"
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let payment = &body["data"];
    let payment_id = payment["id"].as_str().expect("payment id").to_string();
    assert_eq!(payment["status"], json!("PENDING"));
    assert!(!payment["approval_status"].as_bool().expect("approval flag"));

    // Employees hold no vendor payment grant.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/vendor-payments/{}/approve", payment_id),
            None,
            Some(&app.token_for(&employee)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/vendor-payments/{}/approve", payment_id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], json!("PAID"));
    assert!(body["data"]["approval_status"].as_bool().expect("approval flag"));

    // Approval is final.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/vendor-payments/{}/approve", payment_id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_vendors_with_history_are_deactivated_not_deleted() {
    let app = TestApp::new().await;
    let admin = app.seed_superuser("admin").await;
    let accountant = app.seed_user("acc1", UserRole::Accountant).await;
    let admin_token = app.token_for(&admin);
    let referenced = app.seed_vendor("VEN-005", "Long-term Supplier").await;
    let unused = app.seed_vendor("VEN-006", "One-off Quote").await;

    let payload = json!({
        "vendor_id": referenced.id,
        "items": [{"item_name": "Notebooks", "quantity": 20, "price": "35"}]
    });
    let response = app
        .request(
            Method::POST,
            "/api/v1/purchases",
            Some(payload),
            Some(&app.token_for(&accountant)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/vendors/{}", referenced.id),
            None,
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["outcome"], json!("DEACTIVATED"));

    // Still on file, just inactive.
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/vendors/{}", referenced.id),
            None,
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(!body["data"]["is_active"].as_bool().expect("active flag"));

    // A vendor with no history is removed outright.
    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/vendors/{}", unused.id),
            None,
            Some(&admin_token),
        )
        .await;
    let body = body_json(response).await;
    assert_eq!(body["data"]["outcome"], json!("DELETED"));

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/vendors/{}", unused.id),
            None,
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
