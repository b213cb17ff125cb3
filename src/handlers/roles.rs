use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};

use crate::auth::permissions::modules;
use crate::auth::{Action, CurrentUser, PermissionRouterExt};
use crate::entities::user::UserRole;
use crate::services::roles::{RolePermissionsResponse, UpdateRolePermissionsRequest};
use crate::{ApiResponse, ApiResult, AppState};

pub fn role_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_roles))
        .route("/:role", get(get_role))
        .require_module(modules::USERS, Action::View);
    let edit = Router::new()
        .route("/:role", put(update_role))
        .require_module(modules::USERS, Action::Edit);
    read.merge(edit)
}

#[utoipa::path(
    get,
    path = "/api/v1/roles",
    summary = "List role permission sets",
    description = "Returns every role with its stored grants, falling back to the seeded defaults for roles without a stored row",
    responses(
        (status = 200, description = "Roles retrieved", body = ApiResponse<Vec<RolePermissionsResponse>>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Roles"
)]
pub async fn list_roles(State(state): State<AppState>) -> ApiResult<Vec<RolePermissionsResponse>> {
    let roles = state.services.roles.list_roles().await?;
    Ok(Json(ApiResponse::success(roles)))
}

#[utoipa::path(
    get,
    path = "/api/v1/roles/{role}",
    summary = "Get a role's permission set",
    params(("role" = String, Path, description = "Role name (ADMIN, SUPERVISOR, ACCOUNTANT, EMPLOYEE, STUDENT)")),
    responses(
        (status = 200, description = "Role retrieved", body = ApiResponse<RolePermissionsResponse>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Roles"
)]
pub async fn get_role(
    State(state): State<AppState>,
    Path(role): Path<UserRole>,
) -> ApiResult<RolePermissionsResponse> {
    let response = state.services.roles.get_role(role).await?;
    Ok(Json(ApiResponse::success(response)))
}

#[utoipa::path(
    put,
    path = "/api/v1/roles/{role}",
    summary = "Replace a role's permission set",
    description = "Stores a new grant document for the role. Admins only.",
    params(("role" = String, Path, description = "Role name (ADMIN, SUPERVISOR, ACCOUNTANT, EMPLOYEE, STUDENT)")),
    request_body = UpdateRolePermissionsRequest,
    responses(
        (status = 200, description = "Role updated", body = ApiResponse<RolePermissionsResponse>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 422, description = "Malformed permission document", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Roles"
)]
pub async fn update_role(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(role): Path<UserRole>,
    Json(request): Json<UpdateRolePermissionsRequest>,
) -> ApiResult<RolePermissionsResponse> {
    let response = state
        .services
        .roles
        .update_role(&current_user, role, request)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}
