//! End-to-end tests for the bill lifecycle over HTTP.
//!
//! Covers creation across bill types, line merging, paid-bill
//! settlement tolerance, incremental payments, updates and deletion.

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
async fn test_create_sales_bill_paid_within_tolerance() {
    let app = TestApp::new().await;
    let admin = app.seed_superuser("admin").await;
    let token = app.token_for(&admin);
    let item = app.seed_item("Veg Thali", dec!(250)).await;

    // 4 x 250 = 1000; 999.60 is within the 0.50 settlement tolerance.
    let payload = json!({
        "bill_type": "SALES",
        "outlet": "EAT_RIGHT",
        "payment_status": "PAID",
        "items": [{"item_id": item.id, "quantity": 4}],
        "payments": [{"payment_type": "CASH", "amount": "999.60"}]
    });
    let response = app
        .request(Method::POST, "/api/v1/bills", Some(payload), Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    let bill = &body["data"];
    assert!(bill["invoice_number"]
        .as_str()
        .expect("invoice number")
        .starts_with("SB-"));
    assert_eq!(bill["payment_status"], json!("PAID"));
    assert_eq!(dec_field(&bill["total_amount"]), dec!(1000));
    assert_eq!(dec_field(&bill["amount_paid"]), dec!(999.60));
}

#[tokio::test]
async fn test_paid_bill_outside_tolerance_is_rejected_and_not_persisted() {
    let app = TestApp::new().await;
    let admin = app.seed_superuser("admin").await;
    let token = app.token_for(&admin);
    let item = app.seed_item("Veg Thali", dec!(250)).await;

    // 999.40 is 0.60 short of 1000, past the 0.50 tolerance.
    let payload = json!({
        "bill_type": "SALES",
        "outlet": "EAT_RIGHT",
        "payment_status": "PAID",
        "items": [{"item_id": item.id, "quantity": 4}],
        "payments": [{"payment_type": "CASH", "amount": "999.40"}]
    });
    let response = app
        .request(Method::POST, "/api/v1/bills", Some(payload), Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert!(body["message"]
        .as_str()
        .expect("error message")
        .contains("settled in full"));

    // The rejected bill must leave no rows behind.
    let response = app
        .request(Method::GET, "/api/v1/bills", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["total"], json!(0));
}

#[tokio::test]
async fn test_bill_with_no_items_is_rejected() {
    let app = TestApp::new().await;
    let admin = app.seed_superuser("admin").await;
    let token = app.token_for(&admin);

    let payload = json!({
        "bill_type": "SALES",
        "outlet": "EAT_RIGHT",
        "items": []
    });
    let response = app
        .request(Method::POST, "/api/v1/bills", Some(payload), Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert!(body["message"]
        .as_str()
        .expect("error message")
        .contains("no items"));
}

#[tokio::test]
async fn test_duplicate_lines_merge_and_custom_lines_stay_separate() {
    let app = TestApp::new().await;
    let admin = app.seed_superuser("admin").await;
    let token = app.token_for(&admin);
    let item = app.seed_item("Filter Coffee", dec!(30)).await;

    let payload = json!({
        "bill_type": "SALES",
        "outlet": "BED",
        "items": [
            {"item_id": item.id, "quantity": 2},
            {"item_id": item.id, "quantity": 3},
            {"custom_item_name": "Birthday cake", "price": "450", "quantity": 1}
        ]
    });
    let response = app
        .request(Method::POST, "/api/v1/bills", Some(payload), Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let lines = body["data"]["items"].as_array().expect("bill lines");
    assert_eq!(lines.len(), 2);
    let coffee = lines
        .iter()
        .find(|l| l["name"] == json!("Filter Coffee"))
        .expect("merged catalog line");
    assert_eq!(coffee["quantity"], json!(5));
    assert_eq!(dec_field(&body["data"]["total_amount"]), dec!(600));
}

#[tokio::test]
async fn test_invoice_numbers_increment_within_a_day() {
    let app = TestApp::new().await;
    let admin = app.seed_superuser("admin").await;
    let token = app.token_for(&admin);
    let item = app.seed_item("Lime Juice", dec!(40)).await;

    let mut invoices = Vec::new();
    for _ in 0..2 {
        let payload = json!({
            "bill_type": "SALES",
            "outlet": "LIBA",
            "items": [{"item_id": item.id, "quantity": 1}]
        });
        let response = app
            .request(Method::POST, "/api/v1/bills", Some(payload), Some(&token))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        invoices.push(
            body["data"]["invoice_number"]
                .as_str()
                .expect("invoice number")
                .to_string(),
        );
    }

    let today = chrono::Utc::now().date_naive().format("%Y%m%d").to_string();
    assert_eq!(invoices[0], format!("SB-{}0001", today));
    assert_eq!(invoices[1], format!("SB-{}0002", today));
}

#[tokio::test]
async fn test_outer_bill_requires_customer_and_caps_advance() {
    let app = TestApp::new().await;
    let admin = app.seed_superuser("admin").await;
    let token = app.token_for(&admin);
    let customer = app.seed_customer("LIBA Catering Committee").await;
    let item = app.seed_item("Lunch Box", dec!(100)).await;

    // Missing customer and delivery date.
    let payload = json!({
        "bill_type": "OUTER",
        "items": [{"item_id": item.id, "quantity": 10}]
    });
    let response = app
        .request(Method::POST, "/api/v1/bills", Some(payload), Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    let errors = body["details"].as_str().expect("collected violations");
    assert!(errors.contains("Customer is required"));
    assert!(errors.contains("Delivery date is required"));

    // A pending outer bill may carry an advance strictly below the total.
    let payload = json!({
        "bill_type": "OUTER",
        "customer_id": customer.id,
        "delivery_date": "2026-09-01",
        "advance_payment": "200",
        "advance_payment_type": "UPI",
        "items": [{"item_id": item.id, "quantity": 10}]
    });
    let response = app
        .request(Method::POST, "/api/v1/bills", Some(payload), Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["payment_status"], json!("PENDING"));
    assert_eq!(dec_field(&body["data"]["advance_payment"]), dec!(200));
    assert_eq!(body["data"]["customer_name"], json!("LIBA Catering Committee"));

    // An advance covering the whole total must be booked as paid instead.
    let payload = json!({
        "bill_type": "OUTER",
        "customer_id": customer.id,
        "delivery_date": "2026-09-01",
        "advance_payment": "1200",
        "items": [{"item_id": item.id, "quantity": 10}]
    });
    let response = app
        .request(Method::POST, "/api/v1/bills", Some(payload), Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert!(body["message"]
        .as_str()
        .expect("error message")
        .contains("covers the bill total"));
}

#[tokio::test]
async fn test_payments_are_rejected_on_non_sales_bills() {
    let app = TestApp::new().await;
    let admin = app.seed_superuser("admin").await;
    let token = app.token_for(&admin);
    let customer = app.seed_customer("Hostel Mess").await;
    let item = app.seed_item("Snack Tray", dec!(80)).await;

    let payload = json!({
        "bill_type": "INNER",
        "customer_id": customer.id,
        "delivery_date": "2026-09-05",
        "items": [{"item_id": item.id, "quantity": 5}],
        "payments": [{"payment_type": "CASH", "amount": "400"}]
    });
    let response = app
        .request(Method::POST, "/api/v1/bills", Some(payload), Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert!(body["message"]
        .as_str()
        .expect("error message")
        .contains("only be recorded on sales bills"));
}

#[tokio::test]
async fn test_recording_payments_rederives_payment_status() {
    let app = TestApp::new().await;
    let admin = app.seed_superuser("admin").await;
    let token = app.token_for(&admin);
    let item = app.seed_item("Meal Pass", dec!(500)).await;

    let payload = json!({
        "bill_type": "SALES",
        "outlet": "EAT_RIGHT",
        "items": [{"item_id": item.id, "quantity": 2}]
    });
    let response = app
        .request(Method::POST, "/api/v1/bills", Some(payload), Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let bill_id = body["data"]["id"].as_str().expect("bill id").to_string();
    assert_eq!(body["data"]["payment_status"], json!("PENDING"));

    // First payment leaves a balance.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/bills/{}/payments", bill_id),
            Some(json!({"payment_type": "CASH", "amount": "400"})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["payment_status"], json!("PARTIAL"));
    assert_eq!(dec_field(&body["data"]["balance_due"]), dec!(600));

    // Second payment settles within tolerance.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/bills/{}/payments", bill_id),
            Some(json!({"payment_type": "UPI", "amount": "599.80"})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["payment_status"], json!("PAID"));

    // A zero payment is rejected.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/bills/{}/payments", bill_id),
            Some(json!({"payment_type": "CASH", "amount": "0"})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_update_bill_recomputes_totals() {
    let app = TestApp::new().await;
    let admin = app.seed_superuser("admin").await;
    let token = app.token_for(&admin);
    let item = app.seed_item("Veg Biryani", dec!(150)).await;

    let payload = json!({
        "bill_type": "SALES",
        "outlet": "EAT_RIGHT",
        "items": [{"item_id": item.id, "quantity": 2}]
    });
    let response = app
        .request(Method::POST, "/api/v1/bills", Some(payload), Some(&token))
        .await;
    let body = body_json(response).await;
    let bill_id = body["data"]["id"].as_str().expect("bill id").to_string();
    let invoice = body["data"]["invoice_number"].as_str().expect("invoice").to_string();
    assert_eq!(dec_field(&body["data"]["total_amount"]), dec!(300));

    let payload = json!({
        "outlet": "EAT_RIGHT",
        "remarks": "Quantity corrected at the counter",
        "items": [{"item_id": item.id, "quantity": 6}]
    });
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/bills/{}", bill_id),
            Some(payload),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(dec_field(&body["data"]["total_amount"]), dec!(900));
    // The invoice number never changes after allocation.
    assert_eq!(body["data"]["invoice_number"], json!(invoice));
    assert_eq!(body["data"]["remarks"], json!("Quantity corrected at the counter"));
}

#[tokio::test]
async fn test_delete_bill_removes_it_and_its_children() {
    let app = TestApp::new().await;
    let admin = app.seed_superuser("admin").await;
    let token = app.token_for(&admin);
    let item = app.seed_item("Masala Dosa", dec!(60)).await;

    let payload = json!({
        "bill_type": "SALES",
        "outlet": "BED",
        "payment_status": "PAID",
        "items": [{"item_id": item.id, "quantity": 2}],
        "payments": [{"payment_type": "CARD", "amount": "120"}]
    });
    let response = app
        .request(Method::POST, "/api/v1/bills", Some(payload), Some(&token))
        .await;
    let body = body_json(response).await;
    let bill_id = body["data"]["id"].as_str().expect("bill id").to_string();

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/bills/{}", bill_id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/bills/{}", bill_id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_students_cannot_create_bills() {
    let app = TestApp::new().await;
    let student = app.seed_user("stu1", UserRole::Student).await;
    let token = app.token_for(&student);
    let item = app.seed_item("Tea", dec!(15)).await;

    let payload = json!({
        "bill_type": "SALES",
        "outlet": "EAT_RIGHT",
        "items": [{"item_id": item.id, "quantity": 1}]
    });
    let response = app
        .request(Method::POST, "/api/v1/bills", Some(payload), Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_mobile_outlet_sales_require_a_student() {
    let app = TestApp::new().await;
    let admin = app.seed_superuser("admin").await;
    let token = app.token_for(&admin);
    let student = app.seed_user("runner", UserRole::Student).await;
    let item = app.seed_item("Sandwich", dec!(70)).await;

    let payload = json!({
        "bill_type": "SALES",
        "outlet": "MOBILE_1",
        "items": [{"item_id": item.id, "quantity": 3}]
    });
    let response = app
        .request(Method::POST, "/api/v1/bills", Some(payload), Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert!(body["message"]
        .as_str()
        .expect("error message")
        .contains("at least one student"));

    let payload = json!({
        "bill_type": "SALES",
        "outlet": "MOBILE_1",
        "student_ids": [student.id],
        "items": [{"item_id": item.id, "quantity": 3}]
    });
    let response = app
        .request(Method::POST, "/api/v1/bills", Some(payload), Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let students = body["data"]["students"].as_array().expect("credited students");
    assert_eq!(students.len(), 1);
    assert_eq!(students[0]["id"], json!(student.id));
}
