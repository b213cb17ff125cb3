use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::services::attendance::{
    ApproveAttendanceRequest, AttendanceListFilter, AttendanceListResponse, AttendanceResponse,
};
use crate::{ApiResponse, ApiResult, AppState};

/// Attendance routes. Clocking in and out is open to every
/// authenticated account; listing and approval are scoped inside the
/// service.
pub fn attendance_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_attendance))
        .route("/clock-in", post(clock_in))
        .route("/clock-out", post(clock_out))
        .route("/:id/approve", post(approve_attendance))
}

#[utoipa::path(
    post,
    path = "/api/v1/attendance/clock-in",
    summary = "Clock in",
    responses(
        (status = 200, description = "Clocked in", body = ApiResponse<AttendanceResponse>),
        (status = 422, description = "Already clocked in", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Attendance"
)]
pub async fn clock_in(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> ApiResult<AttendanceResponse> {
    let row = state.services.attendance.clock_in(&current_user).await?;
    Ok(Json(ApiResponse::success(row)))
}

#[utoipa::path(
    post,
    path = "/api/v1/attendance/clock-out",
    summary = "Clock out",
    description = "Closes the caller's most recent open attendance record",
    responses(
        (status = 200, description = "Clocked out", body = ApiResponse<AttendanceResponse>),
        (status = 422, description = "Nothing to clock out of", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Attendance"
)]
pub async fn clock_out(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> ApiResult<AttendanceResponse> {
    let row = state.services.attendance.clock_out(&current_user).await?;
    Ok(Json(ApiResponse::success(row)))
}

#[utoipa::path(
    get,
    path = "/api/v1/attendance",
    summary = "List attendance records",
    description = "Approvers see everyone; everyone else sees their own records only",
    params(
        ("user_id" = Option<Uuid>, Query, description = "Filter by account (approvers only)"),
        ("from" = Option<String>, Query, description = "Inclusive date lower bound (YYYY-MM-DD)"),
        ("to" = Option<String>, Query, description = "Inclusive date upper bound (YYYY-MM-DD)"),
        ("approved" = Option<bool>, Query, description = "Filter by approval state"),
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("per_page" = Option<u64>, Query, description = "Items per page (default: 20, max: 100)"),
    ),
    responses(
        (status = 200, description = "Attendance retrieved", body = ApiResponse<AttendanceListResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Attendance"
)]
pub async fn list_attendance(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<AttendanceListFilter>,
) -> ApiResult<AttendanceListResponse> {
    let rows = state
        .services
        .attendance
        .list_attendance(&current_user, filter)
        .await?;
    Ok(Json(ApiResponse::success(rows)))
}

#[utoipa::path(
    post,
    path = "/api/v1/attendance/{id}/approve",
    summary = "Approve an attendance record",
    description = "Approves a completed record; a student's first approval of a day also files their work log",
    params(("id" = Uuid, Path, description = "Attendance id")),
    request_body = ApproveAttendanceRequest,
    responses(
        (status = 200, description = "Attendance approved", body = ApiResponse<AttendanceResponse>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Record is open or already approved", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Attendance"
)]
pub async fn approve_attendance(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ApproveAttendanceRequest>,
) -> ApiResult<AttendanceResponse> {
    let row = state
        .services
        .attendance
        .approve(&current_user, id, request)
        .await?;
    Ok(Json(ApiResponse::success(row)))
}
