use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::auth::permissions::modules;
use crate::auth::{Action, CurrentUser, PermissionRouterExt};
use crate::services::users::{
    CreateUserRequest, SetModulePermissionsRequest, UpdateUserRequest, UserListFilter,
    UserListResponse, UserResponse,
};
use crate::{ApiResponse, ApiResult, AppState};

pub fn user_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_users))
        .route("/:id", get(get_user))
        .require_module(modules::USERS, Action::View);
    let create = Router::new()
        .route("/", post(create_user))
        .require_module(modules::USERS, Action::Create);
    let edit = Router::new()
        .route("/:id", put(update_user))
        .route("/:id/reactivate", post(reactivate_user))
        .route("/:id/module-permissions", put(set_module_permissions))
        .require_module(modules::USERS, Action::Edit);
    let remove = Router::new()
        .route("/:id/deactivate", post(deactivate_user))
        .require_module(modules::USERS, Action::Delete);
    read.merge(create).merge(edit).merge(remove)
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    summary = "List accounts",
    params(
        ("role" = Option<String>, Query, description = "Filter by role (ADMIN, SUPERVISOR, ACCOUNTANT, EMPLOYEE, STUDENT)"),
        ("active" = Option<bool>, Query, description = "Filter by active flag"),
        ("q" = Option<String>, Query, description = "Substring match on username or full name"),
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("per_page" = Option<u64>, Query, description = "Items per page (default: 20, max: 100)"),
    ),
    responses(
        (status = 200, description = "Accounts retrieved", body = ApiResponse<UserListResponse>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(filter): Query<UserListFilter>,
) -> ApiResult<UserListResponse> {
    let users = state.services.users.list_users(filter).await?;
    Ok(Json(ApiResponse::success(users)))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    summary = "Get an account",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Account retrieved", body = ApiResponse<UserResponse>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<UserResponse> {
    let user = state.services.users.get_user(id).await?;
    Ok(Json(ApiResponse::success(user)))
}

#[utoipa::path(
    post,
    path = "/api/v1/users",
    summary = "Create an account",
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "Account created", body = ApiResponse<UserResponse>),
        (status = 409, description = "Username already taken", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation failed", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<CreateUserRequest>,
) -> ApiResult<UserResponse> {
    let user = state
        .services
        .users
        .create_user(&current_user, request)
        .await?;
    Ok(Json(ApiResponse::success(user)))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    summary = "Update an account",
    description = "Partial update; a role change re-derives staff access",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Account updated", body = ApiResponse<UserResponse>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation failed", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> ApiResult<UserResponse> {
    let user = state
        .services
        .users
        .update_user(&current_user, id, request)
        .await?;
    Ok(Json(ApiResponse::success(user)))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/deactivate",
    summary = "Deactivate an account",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Account deactivated", body = ApiResponse<UserResponse>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Cannot be deactivated", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Users"
)]
pub async fn deactivate_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<UserResponse> {
    let user = state
        .services
        .users
        .deactivate_user(&current_user, id)
        .await?;
    Ok(Json(ApiResponse::success(user)))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/reactivate",
    summary = "Reactivate an account",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Account reactivated", body = ApiResponse<UserResponse>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Already active", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Users"
)]
pub async fn reactivate_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<UserResponse> {
    let user = state
        .services
        .users
        .reactivate_user(&current_user, id)
        .await?;
    Ok(Json(ApiResponse::success(user)))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}/module-permissions",
    summary = "Set per-user module permissions",
    description = "Replaces the account's permission overrides. Admins only.",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = SetModulePermissionsRequest,
    responses(
        (status = 200, description = "Overrides replaced", body = ApiResponse<UserResponse>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Malformed permission document", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Users"
)]
pub async fn set_module_permissions(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<SetModulePermissionsRequest>,
) -> ApiResult<UserResponse> {
    let user = state
        .services
        .users
        .set_module_permissions(&current_user, id, request)
        .await?;
    Ok(Json(ApiResponse::success(user)))
}
