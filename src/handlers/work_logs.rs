use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::services::work_logs::{
    SubmitWorkLogRequest, WorkLogListFilter, WorkLogListResponse, WorkLogResponse,
};
use crate::{ApiResponse, ApiResult, AppState};

/// Work-log routes. Students drive their own logs; review rights are
/// checked inside the service.
pub fn work_log_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_work_logs))
        .route("/open", post(open_log))
        .route("/close", post(close_log))
        .route("/:id/submit", post(submit_log))
        .route("/:id/approve", post(approve_log))
        .route("/:id/reject", post(reject_log))
}

#[utoipa::path(
    post,
    path = "/api/v1/work-logs/open",
    summary = "Open today's work log",
    responses(
        (status = 200, description = "Work log opened", body = ApiResponse<WorkLogResponse>),
        (status = 403, description = "Caller is not a student", body = crate::errors::ErrorResponse),
        (status = 422, description = "A log for today already exists", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Work Logs"
)]
pub async fn open_log(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> ApiResult<WorkLogResponse> {
    let log = state.services.work_logs.open_log(&current_user).await?;
    Ok(Json(ApiResponse::success(log)))
}

#[utoipa::path(
    post,
    path = "/api/v1/work-logs/close",
    summary = "Close the open work log",
    description = "Stamps the exit time on the caller's most recent open log and computes the hours",
    responses(
        (status = 200, description = "Work log closed", body = ApiResponse<WorkLogResponse>),
        (status = 422, description = "No open work log", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Work Logs"
)]
pub async fn close_log(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> ApiResult<WorkLogResponse> {
    let log = state.services.work_logs.close_log(&current_user).await?;
    Ok(Json(ApiResponse::success(log)))
}

#[utoipa::path(
    post,
    path = "/api/v1/work-logs/{id}/submit",
    summary = "Submit a work log for approval",
    params(("id" = Uuid, Path, description = "Work log id")),
    request_body = SubmitWorkLogRequest,
    responses(
        (status = 200, description = "Work log submitted", body = ApiResponse<WorkLogResponse>),
        (status = 403, description = "Not the log's owner", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Log is not in a submittable state", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Work Logs"
)]
pub async fn submit_log(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<SubmitWorkLogRequest>,
) -> ApiResult<WorkLogResponse> {
    let log = state
        .services
        .work_logs
        .submit_log(&current_user, id, request)
        .await?;
    Ok(Json(ApiResponse::success(log)))
}

#[utoipa::path(
    get,
    path = "/api/v1/work-logs",
    summary = "List work logs",
    description = "Reviewers see everyone; students see their own logs only",
    params(
        ("student_id" = Option<Uuid>, Query, description = "Filter by student (reviewers only)"),
        ("status" = Option<String>, Query, description = "Filter by status (OPEN, PENDING, APPROVED, REJECTED)"),
        ("from" = Option<String>, Query, description = "Inclusive date lower bound (YYYY-MM-DD)"),
        ("to" = Option<String>, Query, description = "Inclusive date upper bound (YYYY-MM-DD)"),
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("per_page" = Option<u64>, Query, description = "Items per page (default: 20, max: 100)"),
    ),
    responses(
        (status = 200, description = "Work logs retrieved", body = ApiResponse<WorkLogListResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Work Logs"
)]
pub async fn list_work_logs(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<WorkLogListFilter>,
) -> ApiResult<WorkLogListResponse> {
    let logs = state
        .services
        .work_logs
        .list_work_logs(&current_user, filter)
        .await?;
    Ok(Json(ApiResponse::success(logs)))
}

#[utoipa::path(
    post,
    path = "/api/v1/work-logs/{id}/approve",
    summary = "Approve a work log",
    params(("id" = Uuid, Path, description = "Work log id")),
    responses(
        (status = 200, description = "Work log approved", body = ApiResponse<WorkLogResponse>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Log is not pending", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Work Logs"
)]
pub async fn approve_log(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<WorkLogResponse> {
    let log = state
        .services
        .work_logs
        .approve_log(&current_user, id)
        .await?;
    Ok(Json(ApiResponse::success(log)))
}

#[utoipa::path(
    post,
    path = "/api/v1/work-logs/{id}/reject",
    summary = "Reject a work log",
    params(("id" = Uuid, Path, description = "Work log id")),
    responses(
        (status = 200, description = "Work log rejected", body = ApiResponse<WorkLogResponse>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Log is not pending", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Work Logs"
)]
pub async fn reject_log(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<WorkLogResponse> {
    let log = state
        .services
        .work_logs
        .reject_log(&current_user, id)
        .await?;
    Ok(Json(ApiResponse::success(log)))
}
