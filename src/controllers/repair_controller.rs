use sqlx::SqlitePool;
use std::sync::Arc;
use validator::Validate;

use crate::dto::api_response::ApiResponse;
use crate::dto::repair_dto::{
    OpenRepairResponse, OpenRepairsResponse, RepairQueryParams, RepairRecordResponse,
    StartRepairRequest, StopRepairRequest, StopRepairResponse, VinHistoryResponse,
};
use crate::models::repair::normalize_vin;
use crate::repositories::RepairRepository;
use crate::services::{Clock, RepairTracker, ReportAggregator};
use crate::utils::errors::AppError;

pub struct RepairController {
    tracker: RepairTracker,
    repository: RepairRepository,
    aggregator: ReportAggregator,
}

impl RepairController {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self {
            tracker: RepairTracker::with_clock(pool.clone(), clock),
            repository: RepairRepository::new(pool.clone()),
            aggregator: ReportAggregator::new(pool),
        }
    }

    pub async fn start(
        &self,
        request: StartRepairRequest,
    ) -> Result<ApiResponse<RepairRecordResponse>, AppError> {
        request.validate()?;

        let record = self
            .tracker
            .start(
                &request.vin,
                &request.operator_id,
                request.rework_type.as_deref(),
                &request.shop,
            )
            .await?;

        let message = format!(
            "Reparo iniciado con éxito para el VIN {} (operador {}, shop {})",
            record.vin, record.operator_id, record.shop
        );
        Ok(ApiResponse::success_with_message(record.into(), message))
    }

    pub async fn stop(
        &self,
        request: StopRepairRequest,
    ) -> Result<ApiResponse<StopRepairResponse>, AppError> {
        request.validate()?;

        let stopped = self.tracker.stop(&request.vin).await?;
        let response = StopRepairResponse::from(stopped);
        let message = format!(
            "Reparo finalizado con éxito: {} min",
            response.duration_minutes
        );
        Ok(ApiResponse::success_with_message(response, message))
    }

    pub async fn peek_open(&self, vin: &str) -> Result<OpenRepairResponse, AppError> {
        let vin = normalize_vin(vin)?;
        let open = self.tracker.peek_open_elapsed(&vin).await?;
        open.map(OpenRepairResponse::from)
            .ok_or(AppError::NoOpenRepair(vin))
    }

    pub async fn list_open(&self) -> Result<OpenRepairsResponse, AppError> {
        Ok(self.tracker.list_open().await?.into())
    }

    pub async fn query(
        &self,
        params: RepairQueryParams,
    ) -> Result<Vec<RepairRecordResponse>, AppError> {
        let filter = params.into_filter()?;
        let records = self.repository.query(&filter).await?;
        Ok(records.into_iter().map(Into::into).collect())
    }

    pub async fn vin_history(&self, vin: &str) -> Result<VinHistoryResponse, AppError> {
        Ok(self.aggregator.vin_history(vin).await?.into())
    }
}
