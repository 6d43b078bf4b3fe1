use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::controllers::repair_controller::RepairController;
use crate::dto::api_response::ApiResponse;
use crate::dto::repair_dto::{
    OpenRepairResponse, OpenRepairsResponse, RepairQueryParams, RepairRecordResponse,
    StartRepairRequest, StopRepairRequest, StopRepairResponse, VinHistoryResponse,
};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_repair_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_repairs))
        .route("/start", post(start_repair))
        .route("/stop", post(stop_repair))
        .route("/open", get(list_open_repairs))
        .route("/open/:vin", get(get_open_repair))
        .route("/vin/:vin", get(get_vin_history))
}

fn controller(state: &AppState) -> RepairController {
    RepairController::new(state.pool.clone(), state.clock.clone())
}

async fn start_repair(
    State(state): State<AppState>,
    payload: Result<Json<StartRepairRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<RepairRecordResponse>>), AppError> {
    let Json(request) = payload?;
    let response = controller(&state).start(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn stop_repair(
    State(state): State<AppState>,
    payload: Result<Json<StopRepairRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<StopRepairResponse>>, AppError> {
    let Json(request) = payload?;
    let response = controller(&state).stop(request).await?;
    Ok(Json(response))
}

async fn get_open_repair(
    State(state): State<AppState>,
    Path(vin): Path<String>,
) -> Result<Json<ApiResponse<OpenRepairResponse>>, AppError> {
    let response = controller(&state).peek_open(&vin).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn list_open_repairs(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<OpenRepairsResponse>>, AppError> {
    let response = controller(&state).list_open().await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn list_repairs(
    State(state): State<AppState>,
    Query(params): Query<RepairQueryParams>,
) -> Result<Json<ApiResponse<Vec<RepairRecordResponse>>>, AppError> {
    let response = controller(&state).query(params).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn get_vin_history(
    State(state): State<AppState>,
    Path(vin): Path<String>,
) -> Result<Json<ApiResponse<VinHistoryResponse>>, AppError> {
    let response = controller(&state).vin_history(&vin).await?;
    Ok(Json(ApiResponse::success(response)))
}
