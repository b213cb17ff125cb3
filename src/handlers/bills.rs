use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::services::bills::{
    BillListFilter, BillListResponse, BillResponse, BillPayload, CreateBillRequest,
    RecordPaymentRequest,
};
use crate::{ApiResponse, ApiResult, AppState};

/// Bill routes. No static permission gate here: which module applies
/// depends on the bill type in the payload, so the service resolves
/// access itself.
pub fn bill_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_bills))
        .route("/", post(create_bill))
        .route("/:id", get(get_bill))
        .route("/:id", put(update_bill))
        .route("/:id", delete(delete_bill))
        .route("/:id/payments", post(record_payment))
}

#[utoipa::path(
    get,
    path = "/api/v1/bills",
    summary = "List bills",
    description = "Paginated bill list, newest first, scoped to what the caller may see",
    params(
        ("bill_type" = Option<String>, Query, description = "Filter by bill type (SALES, OUTER, INNER)"),
        ("payment_status" = Option<String>, Query, description = "Filter by payment status (PENDING, PARTIAL, PAID)"),
        ("from" = Option<String>, Query, description = "Inclusive creation date lower bound (YYYY-MM-DD)"),
        ("to" = Option<String>, Query, description = "Inclusive creation date upper bound (YYYY-MM-DD)"),
        ("q" = Option<String>, Query, description = "Substring match over invoice number and customer name"),
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("per_page" = Option<u64>, Query, description = "Items per page (default: 20, max: 100)"),
    ),
    responses(
        (status = 200, description = "Bills retrieved", body = ApiResponse<BillListResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Bills"
)]
pub async fn list_bills(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<BillListFilter>,
) -> ApiResult<BillListResponse> {
    let bills = state.services.bills.list_bills(&current_user, filter).await?;
    Ok(Json(ApiResponse::success(bills)))
}

#[utoipa::path(
    post,
    path = "/api/v1/bills",
    summary = "Create a bill",
    description = "Creates a bill with its lines, credited students and payments in one transaction",
    request_body = CreateBillRequest,
    responses(
        (status = 200, description = "Bill created", body = ApiResponse<BillResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation failed", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Bills"
)]
pub async fn create_bill(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<CreateBillRequest>,
) -> ApiResult<BillResponse> {
    let bill = state
        .services
        .bills
        .create_bill(&current_user, request)
        .await?;
    Ok(Json(ApiResponse::success(bill)))
}

#[utoipa::path(
    get,
    path = "/api/v1/bills/{id}",
    summary = "Get a bill",
    params(("id" = Uuid, Path, description = "Bill id")),
    responses(
        (status = 200, description = "Bill retrieved", body = ApiResponse<BillResponse>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Bills"
)]
pub async fn get_bill(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<BillResponse> {
    let bill = state.services.bills.get_bill(&current_user, id).await?;
    Ok(Json(ApiResponse::success(bill)))
}

#[utoipa::path(
    put,
    path = "/api/v1/bills/{id}",
    summary = "Update a bill",
    description = "Replaces the bill header, lines, students and payments. The bill type never changes.",
    params(("id" = Uuid, Path, description = "Bill id")),
    request_body = BillPayload,
    responses(
        (status = 200, description = "Bill updated", body = ApiResponse<BillResponse>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation failed", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Bills"
)]
pub async fn update_bill(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<BillPayload>,
) -> ApiResult<BillResponse> {
    let bill = state
        .services
        .bills
        .update_bill(&current_user, id, request)
        .await?;
    Ok(Json(ApiResponse::success(bill)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/bills/{id}",
    summary = "Delete a bill",
    description = "Removes the bill and everything attached to it",
    params(("id" = Uuid, Path, description = "Bill id")),
    responses(
        (status = 200, description = "Bill deleted", body = ApiResponse<serde_json::Value>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Bills"
)]
pub async fn delete_bill(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    state.services.bills.delete_bill(&current_user, id).await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted": id }),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/bills/{id}/payments",
    summary = "Record a payment",
    description = "Adds a payment to a sales bill and re-derives its payment status",
    params(("id" = Uuid, Path, description = "Bill id")),
    request_body = RecordPaymentRequest,
    responses(
        (status = 200, description = "Payment recorded", body = ApiResponse<BillResponse>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation failed", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Bills"
)]
pub async fn record_payment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<RecordPaymentRequest>,
) -> ApiResult<BillResponse> {
    let bill = state
        .services
        .bills
        .record_payment(&current_user, id, request)
        .await?;
    Ok(Json(ApiResponse::success(bill)))
}
