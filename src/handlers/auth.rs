use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::auth::CurrentUser;
use crate::services::users::{ChangePasswordRequest, LoginRequest, LoginResponse, UserResponse};
use crate::{ApiResponse, ApiResult, AppState};

/// Routes that must stay reachable without a bearer token.
pub fn auth_public_routes() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

/// Routes for the already-authenticated caller.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/change-password", post(change_password))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    summary = "Log in",
    description = "Exchanges a username and password for a bearer token",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse),
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let response = state.services.users.login(request).await?;
    Ok(Json(ApiResponse::success(response)))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    summary = "Current account",
    responses(
        (status = 200, description = "Account retrieved", body = ApiResponse<UserResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Auth"
)]
pub async fn me(current_user: CurrentUser) -> ApiResult<UserResponse> {
    Ok(Json(ApiResponse::success(current_user.user.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/change-password",
    summary = "Change own password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = ApiResponse<UserResponse>),
        (status = 401, description = "Current password is incorrect", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation failed", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Auth"
)]
pub async fn change_password(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<ChangePasswordRequest>,
) -> ApiResult<()> {
    let user = state
        .services
        .users
        .change_password(&current_user, request)
        .await?;
    Ok(Json(ApiResponse::success(user)))
}
