use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::auth::permissions::modules;
use crate::auth::{Action, CurrentUser, PermissionRouterExt};
use crate::services::inventory_sessions::{
    CloseSessionResponse, SessionListFilter, SessionListResponse, SessionPayload, SessionResponse,
};
use crate::{ApiResponse, ApiResult, AppState};

pub fn session_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_sessions))
        .route("/:id", get(get_session))
        .require_module(modules::INVENTORY, Action::View);
    let create = Router::new()
        .route("/", post(open_session))
        .require_module(modules::INVENTORY, Action::Create);
    let edit = Router::new()
        .route("/:id", put(update_session))
        .route("/:id/close", post(close_session))
        .require_module(modules::INVENTORY, Action::Edit);
    let remove = Router::new()
        .route("/:id", delete(delete_session))
        .require_module(modules::INVENTORY, Action::Delete);
    read.merge(create).merge(edit).merge(remove)
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory-sessions",
    summary = "List inventory sessions",
    params(
        ("status" = Option<String>, Query, description = "Filter by status (OPEN, CLOSED)"),
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("per_page" = Option<u64>, Query, description = "Items per page (default: 20, max: 100)"),
    ),
    responses(
        (status = 200, description = "Sessions retrieved", body = ApiResponse<SessionListResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Inventory Sessions"
)]
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(filter): Query<SessionListFilter>,
) -> ApiResult<SessionListResponse> {
    let sessions = state.services.inventory_sessions.list_sessions(filter).await?;
    Ok(Json(ApiResponse::success(sessions)))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory-sessions",
    summary = "Open an inventory session",
    description = "Opens a session recording stock taken out to an outlet",
    request_body = SessionPayload,
    responses(
        (status = 200, description = "Session opened", body = ApiResponse<SessionResponse>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation failed", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Inventory Sessions"
)]
pub async fn open_session(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<SessionPayload>,
) -> ApiResult<SessionResponse> {
    let session = state
        .services
        .inventory_sessions
        .open_session(&current_user, request)
        .await?;
    Ok(Json(ApiResponse::success(session)))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory-sessions/{id}",
    summary = "Get an inventory session",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session retrieved", body = ApiResponse<SessionResponse>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Inventory Sessions"
)]
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<SessionResponse> {
    let session = state.services.inventory_sessions.get_session(id).await?;
    Ok(Json(ApiResponse::success(session)))
}

#[utoipa::path(
    put,
    path = "/api/v1/inventory-sessions/{id}",
    summary = "Update an inventory session",
    description = "Replaces the session's lines, students and payments while it is still open",
    params(("id" = Uuid, Path, description = "Session id")),
    request_body = SessionPayload,
    responses(
        (status = 200, description = "Session updated", body = ApiResponse<SessionResponse>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation failed or session is closed", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Inventory Sessions"
)]
pub async fn update_session(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<SessionPayload>,
) -> ApiResult<SessionResponse> {
    let session = state
        .services
        .inventory_sessions
        .update_session(&current_user, id, request)
        .await?;
    Ok(Json(ApiResponse::success(session)))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory-sessions/{id}/close",
    summary = "Close an inventory session",
    description = "Settles the session and converts the sold stock into a sales bill",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session closed", body = ApiResponse<CloseSessionResponse>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Session is already closed or does not reconcile", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Inventory Sessions"
)]
pub async fn close_session(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<CloseSessionResponse> {
    let closed = state
        .services
        .inventory_sessions
        .close_session(&current_user, id)
        .await?;
    Ok(Json(ApiResponse::success(closed)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/inventory-sessions/{id}",
    summary = "Delete an inventory session",
    description = "Removes an open session outright. Closed sessions stay.",
    params(("id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Session is closed", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Inventory Sessions"
)]
pub async fn delete_session(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    state
        .services
        .inventory_sessions
        .delete_session(&current_user, id)
        .await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted": id }),
    )))
}
