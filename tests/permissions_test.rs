//! End-to-end tests for authentication and permission resolution.
//!
//! Covers login, token validation, role gates on the admin surface,
//! per-user module overrides and account lifecycle rules.

mod common;

use axum::http::{Method, StatusCode};
use backoffice_api::entities::user::UserRole;
use common::{body_json, TestApp};
use serde_json::json;

// ==================== Login and tokens ====================

#[tokio::test]
async fn test_login_issues_a_working_token() {
    let app = TestApp::new().await;
    let employee = app.seed_user("emp1", UserRole::Employee).await;

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({"username": "emp1", "password": "correct-horse-battery"})),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["token_type"], json!("Bearer"));
    assert_eq!(body["data"]["user"]["username"], json!("emp1"));
    let token = body["data"]["access_token"]
        .as_str()
        .expect("access token")
        .to_string();

    let response = app
        .request(Method::GET, "/api/v1/auth/me", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["id"], json!(employee.id));
    assert_eq!(body["data"]["role"], json!("EMPLOYEE"));
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let app = TestApp::new().await;
    app.seed_user("emp1", UserRole::Employee).await;

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({"username": "emp1", "password": "not-the-password"})),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({"username": "nobody", "password": "correct-horse-battery"})),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_routes_require_a_valid_token() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/bills", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(Method::GET, "/api/v1/bills", None, Some("not-a-jwt"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_and_liveness_are_public() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], json!("up"));

    let response = app.request(Method::GET, "/health/ready", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ==================== Role gates ====================

#[tokio::test]
async fn test_user_admin_surface_is_gated_by_module() {
    let app = TestApp::new().await;
    let student = app.seed_user("stu1", UserRole::Student).await;
    let employee = app.seed_user("emp1", UserRole::Employee).await;
    let supervisor = app.seed_user("sup1", UserRole::Supervisor).await;
    let accountant = app.seed_user("acc1", UserRole::Accountant).await;

    let response = app
        .request(Method::GET, "/api/v1/users", None, Some(&app.token_for(&student)))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request(Method::GET, "/api/v1/users", None, Some(&app.token_for(&supervisor)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Purchasing is an accountant concern.
    let response = app
        .request(
            Method::GET,
            "/api/v1/purchases",
            None,
            Some(&app.token_for(&employee)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request(
            Method::GET,
            "/api/v1/purchases",
            None,
            Some(&app.token_for(&accountant)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_module_override_outranks_role_default() {
    let app = TestApp::new().await;
    let admin = app.seed_superuser("admin").await;
    let employee = app.seed_user("emp1", UserRole::Employee).await;
    let admin_token = app.token_for(&admin);
    let employee_token = app.token_for(&employee);

    let response = app
        .request(Method::GET, "/api/v1/users", None, Some(&employee_token))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/users/{}/module-permissions", employee.id),
            Some(json!({"module_permissions": {"users": {"view": true}}})),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // The override applies on the next request; no new token needed.
    let response = app
        .request(Method::GET, "/api/v1/users", None, Some(&employee_token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // View was granted, creation was not.
    let response = app
        .request(
            Method::POST,
            "/api/v1/users",
            Some(json!({
                "username": "newbie",
                "password": "longenoughpass",
                "full_name": "New Person",
                "role": "EMPLOYEE"
            })),
            Some(&employee_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ==================== Account lifecycle ====================

#[tokio::test]
async fn test_change_password_requires_current_password() {
    let app = TestApp::new().await;
    app.seed_user("emp1", UserRole::Employee).await;

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({"username": "emp1", "password": "correct-horse-battery"})),
            None,
        )
        .await;
    let body = body_json(response).await;
    let token = body["data"]["access_token"]
        .as_str()
        .expect("access token")
        .to_string();

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/change-password",
            Some(json!({"current_password": "wrong", "new_password": "a-new-password-1"})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/change-password",
            Some(json!({
                "current_password": "correct-horse-battery",
                "new_password": "a-new-password-1"
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // The old password no longer logs in; the new one does.
    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({"username": "emp1", "password": "correct-horse-battery"})),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({"username": "emp1", "password": "a-new-password-1"})),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_usernames_are_unique() {
    let app = TestApp::new().await;
    let admin = app.seed_superuser("admin").await;
    app.seed_user("emp1", UserRole::Employee).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/users",
            Some(json!({
                "username": "emp1",
                "password": "longenoughpass",
                "full_name": "Duplicate Person",
                "role": "EMPLOYEE"
            })),
            Some(&app.token_for(&admin)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert!(body["message"]
        .as_str()
        .expect("error message")
        .contains("already taken"));
}

#[tokio::test]
async fn test_deactivation_rules_and_token_invalidation() {
    let app = TestApp::new().await;
    let admin = app.seed_superuser("admin").await;
    let employee = app.seed_user("emp1", UserRole::Employee).await;
    let admin_token = app.token_for(&admin);
    let employee_token = app.token_for(&employee);

    // Nobody deactivates their own account.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/users/{}/deactivate", admin.id),
            None,
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/users/{}/deactivate", employee.id),
            None,
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(!body["data"]["is_active"].as_bool().expect("active flag"));

    // Existing tokens die with the account, as does login.
    let response = app
        .request(Method::GET, "/api/v1/auth/me", None, Some(&employee_token))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({"username": "emp1", "password": "correct-horse-battery"})),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Reactivation restores access.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/users/{}/reactivate", employee.id),
            None,
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(Method::GET, "/api/v1/auth/me", None, Some(&employee_token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ==================== Role permission editing ====================

#[tokio::test]
async fn test_role_grants_listing_and_editing() {
    let app = TestApp::new().await;
    let admin = app.seed_superuser("admin").await;
    let supervisor = app.seed_user("sup1", UserRole::Supervisor).await;
    let admin_token = app.token_for(&admin);

    let response = app
        .request(
            Method::GET,
            "/api/v1/roles",
            None,
            Some(&app.token_for(&supervisor)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let roles = body["data"].as_array().expect("role list");
    assert_eq!(roles.len(), 5);
    // Seeding stored a row for every role up front.
    assert!(roles.iter().all(|r| r["stored"] == json!(true)));

    // Supervisors can look but only admins may edit.
    let response = app
        .request(
            Method::PUT,
            "/api/v1/roles/ACCOUNTANT",
            Some(json!({"permissions": {"payroll": true}})),
            Some(&app.token_for(&supervisor)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request(
            Method::PUT,
            "/api/v1/roles/ACCOUNTANT",
            Some(json!({
                "permissions": {"payroll": true, "purchases": {"view": true}},
                "description": "Payroll and purchase viewing only"
            })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["role"], json!("ACCOUNTANT"));
    assert_eq!(body["data"]["permissions"]["payroll"], json!(true));
    assert_eq!(
        body["data"]["description"],
        json!("Payroll and purchase viewing only")
    );

    // The stored row is what resolution now sees: vendors access is gone.
    let response = app
        .request(
            Method::GET,
            "/api/v1/roles/ACCOUNTANT",
            None,
            Some(&admin_token),
        )
        .await;
    let body = body_json(response).await;
    assert!(body["data"]["permissions"]["vendors"].is_null());
}
