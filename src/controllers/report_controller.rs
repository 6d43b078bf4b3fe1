use sqlx::SqlitePool;

use crate::dto::repair_dto::RepairQueryParams;
use crate::models::report::{DailyCount, OperatorSummary, RepairSummary};
use crate::services::ReportAggregator;
use crate::utils::errors::AppError;

pub struct ReportController {
    aggregator: ReportAggregator,
}

impl ReportController {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            aggregator: ReportAggregator::new(pool),
        }
    }

    pub async fn summary(&self, params: RepairQueryParams) -> Result<RepairSummary, AppError> {
        self.aggregator.summary(params.into_filter()?).await
    }

    pub async fn by_operator(
        &self,
        params: RepairQueryParams,
    ) -> Result<Vec<OperatorSummary>, AppError> {
        self.aggregator.by_operator(params.into_filter()?).await
    }

    pub async fn by_date(&self, params: RepairQueryParams) -> Result<Vec<DailyCount>, AppError> {
        self.aggregator.by_date(params.into_filter()?).await
    }
}
