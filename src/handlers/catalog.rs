use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::auth::permissions::modules;
use crate::auth::{Action, CurrentUser, PermissionRouterExt};
use crate::entities::{customer, item, vendor};
use crate::services::catalog::{
    CatalogListFilter, CustomerListResponse, CustomerRequest, ItemListResponse, ItemRequest,
    RemovalResponse, VendorListResponse, VendorRequest,
};
use crate::{ApiResponse, ApiResult, AppState};

pub fn item_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_items))
        .route("/:id", get(get_item))
        .require_module(modules::ITEMS, Action::View);
    let create = Router::new()
        .route("/", post(create_item))
        .require_module(modules::ITEMS, Action::Create);
    let edit = Router::new()
        .route("/:id", put(update_item))
        .require_module(modules::ITEMS, Action::Edit);
    let remove = Router::new()
        .route("/:id", delete(remove_item))
        .require_module(modules::ITEMS, Action::Delete);
    read.merge(create).merge(edit).merge(remove)
}

pub fn customer_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_customers))
        .route("/:id", get(get_customer))
        .require_module(modules::CUSTOMERS, Action::View);
    let create = Router::new()
        .route("/", post(create_customer))
        .require_module(modules::CUSTOMERS, Action::Create);
    let edit = Router::new()
        .route("/:id", put(update_customer))
        .require_module(modules::CUSTOMERS, Action::Edit);
    read.merge(create).merge(edit)
}

pub fn vendor_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_vendors))
        .route("/:id", get(get_vendor))
        .require_module(modules::VENDORS, Action::View);
    let create = Router::new()
        .route("/", post(create_vendor))
        .require_module(modules::VENDORS, Action::Create);
    let edit = Router::new()
        .route("/:id", put(update_vendor))
        .require_module(modules::VENDORS, Action::Edit);
    let remove = Router::new()
        .route("/:id", delete(remove_vendor))
        .require_module(modules::VENDORS, Action::Delete);
    read.merge(create).merge(edit).merge(remove)
}

#[utoipa::path(
    get,
    path = "/api/v1/items",
    summary = "List catalog items",
    params(
        ("q" = Option<String>, Query, description = "Substring match on the name"),
        ("active" = Option<bool>, Query, description = "Filter by active flag"),
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("per_page" = Option<u64>, Query, description = "Items per page (default: 20, max: 100)"),
    ),
    responses(
        (status = 200, description = "Items retrieved", body = ApiResponse<ItemListResponse>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Catalog"
)]
pub async fn list_items(
    State(state): State<AppState>,
    Query(filter): Query<CatalogListFilter>,
) -> ApiResult<ItemListResponse> {
    let items = state.services.catalog.list_items(filter).await?;
    Ok(Json(ApiResponse::success(items)))
}

#[utoipa::path(
    get,
    path = "/api/v1/items/{id}",
    summary = "Get a catalog item",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item retrieved", body = ApiResponse<item::Model>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Catalog"
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<item::Model> {
    let item = state.services.catalog.get_item(id).await?;
    Ok(Json(ApiResponse::success(item)))
}

#[utoipa::path(
    post,
    path = "/api/v1/items",
    summary = "Create a catalog item",
    request_body = ItemRequest,
    responses(
        (status = 200, description = "Item created", body = ApiResponse<item::Model>),
        (status = 422, description = "Validation failed", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Catalog"
)]
pub async fn create_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<ItemRequest>,
) -> ApiResult<item::Model> {
    let item = state
        .services
        .catalog
        .create_item(&current_user, request)
        .await?;
    Ok(Json(ApiResponse::success(item)))
}

#[utoipa::path(
    put,
    path = "/api/v1/items/{id}",
    summary = "Update a catalog item",
    params(("id" = Uuid, Path, description = "Item id")),
    request_body = ItemRequest,
    responses(
        (status = 200, description = "Item updated", body = ApiResponse<item::Model>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation failed", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Catalog"
)]
pub async fn update_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ItemRequest>,
) -> ApiResult<item::Model> {
    let item = state
        .services
        .catalog
        .update_item(&current_user, id, request)
        .await?;
    Ok(Json(ApiResponse::success(item)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/items/{id}",
    summary = "Remove a catalog item",
    description = "Deletes the item, or deactivates it when bills or sessions still reference it",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item removed", body = ApiResponse<RemovalResponse>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Catalog"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<RemovalResponse> {
    let removal = state
        .services
        .catalog
        .remove_item(&current_user, id)
        .await?;
    Ok(Json(ApiResponse::success(removal)))
}

#[utoipa::path(
    get,
    path = "/api/v1/customers",
    summary = "List customers",
    params(
        ("q" = Option<String>, Query, description = "Substring match on name or contact number"),
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("per_page" = Option<u64>, Query, description = "Items per page (default: 20, max: 100)"),
    ),
    responses(
        (status = 200, description = "Customers retrieved", body = ApiResponse<CustomerListResponse>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Catalog"
)]
pub async fn list_customers(
    State(state): State<AppState>,
    Query(filter): Query<CatalogListFilter>,
) -> ApiResult<CustomerListResponse> {
    let customers = state.services.catalog.list_customers(filter).await?;
    Ok(Json(ApiResponse::success(customers)))
}

#[utoipa::path(
    get,
    path = "/api/v1/customers/{id}",
    summary = "Get a customer",
    params(("id" = Uuid, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Customer retrieved", body = ApiResponse<customer::Model>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Catalog"
)]
pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<customer::Model> {
    let customer = state.services.catalog.get_customer(id).await?;
    Ok(Json(ApiResponse::success(customer)))
}

#[utoipa::path(
    post,
    path = "/api/v1/customers",
    summary = "Create a customer",
    request_body = CustomerRequest,
    responses(
        (status = 200, description = "Customer created", body = ApiResponse<customer::Model>),
        (status = 422, description = "Validation failed", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Catalog"
)]
pub async fn create_customer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<CustomerRequest>,
) -> ApiResult<customer::Model> {
    let customer = state
        .services
        .catalog
        .create_customer(&current_user, request)
        .await?;
    Ok(Json(ApiResponse::success(customer)))
}

#[utoipa::path(
    put,
    path = "/api/v1/customers/{id}",
    summary = "Update a customer",
    params(("id" = Uuid, Path, description = "Customer id")),
    request_body = CustomerRequest,
    responses(
        (status = 200, description = "Customer updated", body = ApiResponse<customer::Model>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation failed", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Catalog"
)]
pub async fn update_customer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<CustomerRequest>,
) -> ApiResult<customer::Model> {
    let customer = state
        .services
        .catalog
        .update_customer(&current_user, id, request)
        .await?;
    Ok(Json(ApiResponse::success(customer)))
}

#[utoipa::path(
    get,
    path = "/api/v1/vendors",
    summary = "List vendors",
    params(
        ("q" = Option<String>, Query, description = "Substring match on name or vendor code"),
        ("active" = Option<bool>, Query, description = "Filter by active flag"),
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("per_page" = Option<u64>, Query, description = "Items per page (default: 20, max: 100)"),
    ),
    responses(
        (status = 200, description = "Vendors retrieved", body = ApiResponse<VendorListResponse>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Catalog"
)]
pub async fn list_vendors(
    State(state): State<AppState>,
    Query(filter): Query<CatalogListFilter>,
) -> ApiResult<VendorListResponse> {
    let vendors = state.services.catalog.list_vendors(filter).await?;
    Ok(Json(ApiResponse::success(vendors)))
}

#[utoipa::path(
    get,
    path = "/api/v1/vendors/{id}",
    summary = "Get a vendor",
    params(("id" = Uuid, Path, description = "Vendor id")),
    responses(
        (status = 200, description = "Vendor retrieved", body = ApiResponse<vendor::Model>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Catalog"
)]
pub async fn get_vendor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<vendor::Model> {
    let vendor = state.services.catalog.get_vendor(id).await?;
    Ok(Json(ApiResponse::success(vendor)))
}

#[utoipa::path(
    post,
    path = "/api/v1/vendors",
    summary = "Create a vendor",
    request_body = VendorRequest,
    responses(
        (status = 200, description = "Vendor created", body = ApiResponse<vendor::Model>),
        (status = 409, description = "Vendor code already in use", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation failed", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Catalog"
)]
pub async fn create_vendor(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<VendorRequest>,
) -> ApiResult<vendor::Model> {
    let vendor = state
        .services
        .catalog
        .create_vendor(&current_user, request)
        .await?;
    Ok(Json(ApiResponse::success(vendor)))
}

#[utoipa::path(
    put,
    path = "/api/v1/vendors/{id}",
    summary = "Update a vendor",
    params(("id" = Uuid, Path, description = "Vendor id")),
    request_body = VendorRequest,
    responses(
        (status = 200, description = "Vendor updated", body = ApiResponse<vendor::Model>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Vendor code already in use", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Catalog"
)]
pub async fn update_vendor(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<VendorRequest>,
) -> ApiResult<vendor::Model> {
    let vendor = state
        .services
        .catalog
        .update_vendor(&current_user, id, request)
        .await?;
    Ok(Json(ApiResponse::success(vendor)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/vendors/{id}",
    summary = "Remove a vendor",
    description = "Deletes the vendor, or deactivates it when purchases or payments still reference it",
    params(("id" = Uuid, Path, description = "Vendor id")),
    responses(
        (status = 200, description = "Vendor removed", body = ApiResponse<RemovalResponse>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Catalog"
)]
pub async fn remove_vendor(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<RemovalResponse> {
    let removal = state
        .services
        .catalog
        .remove_vendor(&current_user, id)
        .await?;
    Ok(Json(ApiResponse::success(removal)))
}
