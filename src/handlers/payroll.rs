use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::auth::permissions::modules;
use crate::auth::{Action, PermissionRouterExt};
use crate::services::payroll::{PayrollQuery, PayrollReport};
use crate::{ApiResponse, ApiResult, AppState};

pub fn payroll_routes() -> Router<AppState> {
    Router::new()
        .route("/report", get(generate_report))
        .require_module(modules::PAYROLL, Action::View)
}

#[utoipa::path(
    get,
    path = "/api/v1/payroll/report",
    summary = "Generate a payroll report",
    description = "Aggregates approved student work logs and employee attendance over a date range",
    params(
        ("from" = String, Query, description = "Inclusive start date (YYYY-MM-DD)"),
        ("to" = String, Query, description = "Inclusive end date (YYYY-MM-DD)"),
    ),
    responses(
        (status = 200, description = "Report generated", body = ApiResponse<PayrollReport>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 422, description = "Invalid date range", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Payroll"
)]
pub async fn generate_report(
    State(state): State<AppState>,
    Query(query): Query<PayrollQuery>,
) -> ApiResult<PayrollReport> {
    let report = state.services.payroll.generate_report(query).await?;
    Ok(Json(ApiResponse::success(report)))
}
