use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::controllers::report_controller::ReportController;
use crate::dto::api_response::ApiResponse;
use crate::dto::repair_dto::RepairQueryParams;
use crate::models::report::{DailyCount, OperatorSummary, RepairSummary};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_report_router() -> Router<AppState> {
    Router::new()
        .route("/summary", get(get_summary))
        .route("/operators", get(get_operator_report))
        .route("/daily", get(get_daily_report))
}

async fn get_summary(
    State(state): State<AppState>,
    Query(params): Query<RepairQueryParams>,
) -> Result<Json<ApiResponse<RepairSummary>>, AppError> {
    let controller = ReportController::new(state.pool.clone());
    let response = controller.summary(params).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn get_operator_report(
    State(state): State<AppState>,
    Query(params): Query<RepairQueryParams>,
) -> Result<Json<ApiResponse<Vec<OperatorSummary>>>, AppError> {
    let controller = ReportController::new(state.pool.clone());
    let response = controller.by_operator(params).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn get_daily_report(
    State(state): State<AppState>,
    Query(params): Query<RepairQueryParams>,
) -> Result<Json<ApiResponse<Vec<DailyCount>>>, AppError> {
    let controller = ReportController::new(state.pool.clone());
    let response = controller.by_date(params).await?;
    Ok(Json(ApiResponse::success(response)))
}
