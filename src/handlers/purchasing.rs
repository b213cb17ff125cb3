use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::auth::permissions::modules;
use crate::auth::{Action, CurrentUser, PermissionRouterExt};
use crate::services::purchasing::{
    CreatePurchaseRequest, CreateVendorPaymentRequest, MarkReceivedRequest, PurchaseListFilter,
    PurchaseListResponse, PurchaseResponse, UpdatePurchasePaymentRequest, VendorPaymentListFilter,
    VendorPaymentListResponse, VendorPaymentResponse,
};
use crate::{ApiResponse, ApiResult, AppState};

pub fn purchase_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_purchases))
        .route("/:id", get(get_purchase))
        .require_module(modules::PURCHASES, Action::View);
    let create = Router::new()
        .route("/", post(create_purchase))
        .require_module(modules::PURCHASES, Action::Create);
    let edit = Router::new()
        .route("/:id/receive", post(mark_received))
        .route("/:id/payment", put(update_payment))
        .require_module(modules::PURCHASES, Action::Edit);
    read.merge(create).merge(edit)
}

pub fn vendor_payment_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_vendor_payments))
        .require_module(modules::VENDOR_PAYMENTS, Action::View);
    let create = Router::new()
        .route("/", post(create_vendor_payment))
        .require_module(modules::VENDOR_PAYMENTS, Action::Create);
    let edit = Router::new()
        .route("/:id/approve", post(approve_vendor_payment))
        .require_module(modules::VENDOR_PAYMENTS, Action::Edit);
    read.merge(create).merge(edit)
}

#[utoipa::path(
    post,
    path = "/api/v1/purchases",
    summary = "Record a purchase",
    description = "Records a vendor purchase with line items; the purchase order number is allocated automatically",
    request_body = CreatePurchaseRequest,
    responses(
        (status = 200, description = "Purchase recorded", body = ApiResponse<PurchaseResponse>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation failed", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Purchasing"
)]
pub async fn create_purchase(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<CreatePurchaseRequest>,
) -> ApiResult<PurchaseResponse> {
    let purchase = state
        .services
        .purchasing
        .create_purchase(&current_user, request)
        .await?;
    Ok(Json(ApiResponse::success(purchase)))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchases",
    summary = "List purchases",
    params(
        ("vendor_id" = Option<Uuid>, Query, description = "Filter by vendor"),
        ("payment_status" = Option<String>, Query, description = "Filter by payment status (PENDING, PARTIAL, PAID)"),
        ("from" = Option<String>, Query, description = "Inclusive ordered-date lower bound (YYYY-MM-DD)"),
        ("to" = Option<String>, Query, description = "Inclusive ordered-date upper bound (YYYY-MM-DD)"),
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("per_page" = Option<u64>, Query, description = "Items per page (default: 20, max: 100)"),
    ),
    responses(
        (status = 200, description = "Purchases retrieved", body = ApiResponse<PurchaseListResponse>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Purchasing"
)]
pub async fn list_purchases(
    State(state): State<AppState>,
    Query(filter): Query<PurchaseListFilter>,
) -> ApiResult<PurchaseListResponse> {
    let purchases = state.services.purchasing.list_purchases(filter).await?;
    Ok(Json(ApiResponse::success(purchases)))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchases/{id}",
    summary = "Get a purchase",
    params(("id" = Uuid, Path, description = "Purchase id")),
    responses(
        (status = 200, description = "Purchase retrieved", body = ApiResponse<PurchaseResponse>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Purchasing"
)]
pub async fn get_purchase(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<PurchaseResponse> {
    let purchase = state.services.purchasing.get_purchase(id).await?;
    Ok(Json(ApiResponse::success(purchase)))
}

#[utoipa::path(
    post,
    path = "/api/v1/purchases/{id}/receive",
    summary = "Mark a purchase received",
    params(("id" = Uuid, Path, description = "Purchase id")),
    request_body = MarkReceivedRequest,
    responses(
        (status = 200, description = "Purchase marked received", body = ApiResponse<PurchaseResponse>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Already received", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Purchasing"
)]
pub async fn mark_received(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<MarkReceivedRequest>,
) -> ApiResult<PurchaseResponse> {
    let purchase = state
        .services
        .purchasing
        .mark_received(&current_user, id, request)
        .await?;
    Ok(Json(ApiResponse::success(purchase)))
}

#[utoipa::path(
    put,
    path = "/api/v1/purchases/{id}/payment",
    summary = "Update purchase payment details",
    params(("id" = Uuid, Path, description = "Purchase id")),
    request_body = UpdatePurchasePaymentRequest,
    responses(
        (status = 200, description = "Payment details updated", body = ApiResponse<PurchaseResponse>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Purchasing"
)]
pub async fn update_payment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePurchasePaymentRequest>,
) -> ApiResult<PurchaseResponse> {
    let purchase = state
        .services
        .purchasing
        .update_payment(&current_user, id, request)
        .await?;
    Ok(Json(ApiResponse::success(purchase)))
}

#[utoipa::path(
    post,
    path = "/api/v1/vendor-payments",
    summary = "Record a vendor payment",
    description = "Records a payout to a vendor; it stays pending until approved",
    request_body = CreateVendorPaymentRequest,
    responses(
        (status = 200, description = "Vendor payment recorded", body = ApiResponse<VendorPaymentResponse>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation failed", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Purchasing"
)]
pub async fn create_vendor_payment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<CreateVendorPaymentRequest>,
) -> ApiResult<VendorPaymentResponse> {
    let payment = state
        .services
        .purchasing
        .create_vendor_payment(&current_user, request)
        .await?;
    Ok(Json(ApiResponse::success(payment)))
}

#[utoipa::path(
    get,
    path = "/api/v1/vendor-payments",
    summary = "List vendor payments",
    params(
        ("vendor_id" = Option<Uuid>, Query, description = "Filter by vendor"),
        ("approved" = Option<bool>, Query, description = "Filter by approval state"),
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("per_page" = Option<u64>, Query, description = "Items per page (default: 20, max: 100)"),
    ),
    responses(
        (status = 200, description = "Vendor payments retrieved", body = ApiResponse<VendorPaymentListResponse>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Purchasing"
)]
pub async fn list_vendor_payments(
    State(state): State<AppState>,
    Query(filter): Query<VendorPaymentListFilter>,
) -> ApiResult<VendorPaymentListResponse> {
    let payments = state
        .services
        .purchasing
        .list_vendor_payments(filter)
        .await?;
    Ok(Json(ApiResponse::success(payments)))
}

#[utoipa::path(
    post,
    path = "/api/v1/vendor-payments/{id}/approve",
    summary = "Approve a vendor payment",
    description = "Marks the payout approved and paid. Accountants, supervisors and admins only.",
    params(("id" = Uuid, Path, description = "Vendor payment id")),
    responses(
        (status = 200, description = "Vendor payment approved", body = ApiResponse<VendorPaymentResponse>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Already approved", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Purchasing"
)]
pub async fn approve_vendor_payment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<VendorPaymentResponse> {
    let payment = state
        .services
        .purchasing
        .approve_vendor_payment(&current_user, id)
        .await?;
    Ok(Json(ApiResponse::success(payment)))
}
