use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Back-Office API",
        version = "0.3.0",
        description = r#"
# Small-Business Back-Office API

Operations core for a small retail and training business: billing across three
outlets, stocktake-style inventory sessions, purchasing, vendor payments,
payroll aggregation and workforce records.

## Authentication

All `/api/v1` endpoints require a JWT bearer token obtained from `/auth/login`:

```
Authorization: Bearer <your-jwt-token>
```

Access to each module is resolved per user: explicit per-account overrides
first, stored role grants second, seeded role defaults last.

## Error Handling

Failures use a consistent error envelope with appropriate HTTP status codes:

```json
{
  "error": "Unprocessable Entity",
  "message": "Validation failed: Bill has no items",
  "request_id": "req-abc123xyz",
  "timestamp": "2025-05-23T10:30:00.000Z"
}
```

## Pagination

List endpoints accept `page` (default 1) and `per_page` (default 20, max 100).
        "#,
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Auth", description = "Login and session endpoints"),
        (name = "Bills", description = "Sales, outer and inner bill management"),
        (name = "Inventory Sessions", description = "Stocktake session lifecycle"),
        (name = "Attendance", description = "Employee clock-in and clock-out records"),
        (name = "Work Logs", description = "Student work log lifecycle"),
        (name = "Payroll", description = "Payroll report aggregation"),
        (name = "Purchases", description = "Vendor purchase records"),
        (name = "Vendor Payments", description = "Vendor payment recording and approval"),
        (name = "Catalog", description = "Items, customers and vendors"),
        (name = "Users", description = "Account management"),
        (name = "Roles", description = "Role permission sets"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        // Auth
        crate::handlers::auth::login,
        crate::handlers::auth::me,
        crate::handlers::auth::change_password,

        // Bills
        crate::handlers::bills::list_bills,
        crate::handlers::bills::create_bill,
        crate::handlers::bills::get_bill,
        crate::handlers::bills::update_bill,
        crate::handlers::bills::delete_bill,
        crate::handlers::bills::record_payment,

        // Inventory sessions
        crate::handlers::inventory_sessions::list_sessions,
        crate::handlers::inventory_sessions::open_session,
        crate::handlers::inventory_sessions::get_session,
        crate::handlers::inventory_sessions::update_session,
        crate::handlers::inventory_sessions::close_session,
        crate::handlers::inventory_sessions::delete_session,

        // Attendance
        crate::handlers::attendance::clock_in,
        crate::handlers::attendance::clock_out,
        crate::handlers::attendance::list_attendance,
        crate::handlers::attendance::approve_attendance,

        // Work logs
        crate::handlers::work_logs::open_log,
        crate::handlers::work_logs::close_log,
        crate::handlers::work_logs::submit_log,
        crate::handlers::work_logs::list_work_logs,
        crate::handlers::work_logs::approve_log,
        crate::handlers::work_logs::reject_log,

        // Payroll
        crate::handlers::payroll::generate_report,

        // Purchasing
        crate::handlers::purchasing::create_purchase,
        crate::handlers::purchasing::list_purchases,
        crate::handlers::purchasing::get_purchase,
        crate::handlers::purchasing::mark_received,
        crate::handlers::purchasing::update_payment,
        crate::handlers::purchasing::create_vendor_payment,
        crate::handlers::purchasing::list_vendor_payments,
        crate::handlers::purchasing::approve_vendor_payment,

        // Catalog
        crate::handlers::catalog::list_items,
        crate::handlers::catalog::get_item,
        crate::handlers::catalog::create_item,
        crate::handlers::catalog::update_item,
        crate::handlers::catalog::remove_item,
        crate::handlers::catalog::list_customers,
        crate::handlers::catalog::get_customer,
        crate::handlers::catalog::create_customer,
        crate::handlers::catalog::update_customer,
        crate::handlers::catalog::list_vendors,
        crate::handlers::catalog::get_vendor,
        crate::handlers::catalog::create_vendor,
        crate::handlers::catalog::update_vendor,
        crate::handlers::catalog::remove_vendor,

        // Users and roles
        crate::handlers::users::list_users,
        crate::handlers::users::get_user,
        crate::handlers::users::create_user,
        crate::handlers::users::update_user,
        crate::handlers::users::deactivate_user,
        crate::handlers::users::reactivate_user,
        crate::handlers::users::set_module_permissions,
        crate::handlers::roles::list_roles,
        crate::handlers::roles::get_role,
        crate::handlers::roles::update_role,

        // Health
        crate::handlers::health::health_check,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,
            crate::errors::ErrorResponse,

            // Shared enums
            crate::entities::bill::BillType,
            crate::entities::bill::PaymentStatus,
            crate::entities::bill::PaymentType,
            crate::entities::bill::Outlet,
            crate::entities::inventory_session::SessionStatus,
            crate::entities::work_log::WorkLogStatus,
            crate::entities::user::UserRole,

            // Bill types
            crate::services::bills::BillLineInput,
            crate::services::bills::BillPaymentInput,
            crate::services::bills::BillPayload,
            crate::services::bills::CreateBillRequest,
            crate::services::bills::RecordPaymentRequest,
            crate::services::bills::BillLineResponse,
            crate::services::bills::BillPaymentResponse,
            crate::services::bills::BillStudentResponse,
            crate::services::bills::BillResponse,
            crate::services::bills::BillSummary,
            crate::services::bills::BillListResponse,

            // Inventory session types
            crate::services::inventory_sessions::SessionLineInput,
            crate::services::inventory_sessions::SessionPaymentInput,
            crate::services::inventory_sessions::SessionPayload,
            crate::services::inventory_sessions::SessionLineResponse,
            crate::services::inventory_sessions::SessionPaymentResponse,
            crate::services::inventory_sessions::SessionStudentResponse,
            crate::services::inventory_sessions::SessionResponse,
            crate::services::inventory_sessions::SessionSummary,
            crate::services::inventory_sessions::SessionListResponse,
            crate::services::inventory_sessions::CloseSessionResponse,

            // Workforce types
            crate::services::attendance::ApproveAttendanceRequest,
            crate::services::attendance::AttendanceResponse,
            crate::services::attendance::AttendanceListResponse,
            crate::services::work_logs::SubmitWorkLogRequest,
            crate::services::work_logs::WorkLogResponse,
            crate::services::work_logs::WorkLogListResponse,
            crate::services::payroll::PayrollRow,
            crate::services::payroll::PayrollReport,

            // Purchasing types
            crate::services::purchasing::PurchaseLineInput,
            crate::services::purchasing::CreatePurchaseRequest,
            crate::services::purchasing::MarkReceivedRequest,
            crate::services::purchasing::UpdatePurchasePaymentRequest,
            crate::services::purchasing::CreateVendorPaymentRequest,
            crate::services::purchasing::PurchaseItemResponse,
            crate::services::purchasing::PurchaseResponse,
            crate::services::purchasing::PurchaseSummary,
            crate::services::purchasing::PurchaseListResponse,
            crate::services::purchasing::VendorPaymentResponse,
            crate::services::purchasing::VendorPaymentListResponse,

            // Catalog types
            crate::entities::item::Model,
            crate::entities::customer::Model,
            crate::entities::vendor::Model,
            crate::services::catalog::ItemRequest,
            crate::services::catalog::CustomerRequest,
            crate::services::catalog::VendorRequest,
            crate::services::catalog::ItemListResponse,
            crate::services::catalog::CustomerListResponse,
            crate::services::catalog::VendorListResponse,
            crate::services::catalog::RemovalOutcome,
            crate::services::catalog::RemovalResponse,

            // Account types
            crate::services::users::LoginRequest,
            crate::services::users::LoginResponse,
            crate::services::users::CreateUserRequest,
            crate::services::users::UpdateUserRequest,
            crate::services::users::ChangePasswordRequest,
            crate::services::users::SetModulePermissionsRequest,
            crate::services::users::UserResponse,
            crate::services::users::UserListResponse,
            crate::services::roles::UpdateRolePermissionsRequest,
            crate::services::roles::RolePermissionsResponse,

            // Health
            crate::handlers::health::ComponentStatus,
            crate::handlers::health::ComponentHealth,
            crate::handlers::health::HealthResponse,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

/// Registers the JWT bearer scheme referenced by the protected paths.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Bearer",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_a_document_with_core_paths() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Back-Office API"));
        assert!(json.contains("/api/v1/bills"));
        assert!(json.contains("/api/v1/inventory-sessions"));
        assert!(json.contains("/auth/login"));
    }

    #[test]
    fn registers_the_bearer_scheme() {
        let openapi = ApiDocV1::openapi();
        let schemes = openapi
            .components
            .as_ref()
            .map(|c| c.security_schemes.contains_key("Bearer"))
            .unwrap_or(false);
        assert!(schemes);
    }
}
