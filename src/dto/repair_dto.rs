use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::repair::{whole_minutes, RecordStatus, RepairFilter, RepairRecord, Shop};
use crate::models::report::{round2, OpenRepair, OpenRepairsOverview, VinHistory};
use crate::services::StoppedRepair;
use crate::utils::errors::AppResult;
use crate::utils::validation::{non_blank, parse_optional_date, validate_not_blank};

// Request para iniciar un reparo
#[derive(Debug, Deserialize, Validate)]
pub struct StartRepairRequest {
    #[serde(default)]
    #[validate(length(max = 64), custom = "validate_not_blank")]
    pub vin: String,

    #[serde(default)]
    #[validate(length(max = 20), custom = "validate_not_blank")]
    pub operator_id: String,

    #[validate(length(max = 200))]
    pub rework_type: Option<String>,

    #[serde(default)]
    #[validate(custom = "validate_not_blank")]
    pub shop: String,
}

// Request para finalizar un reparo
#[derive(Debug, Deserialize, Validate)]
pub struct StopRepairRequest {
    #[serde(default)]
    #[validate(length(max = 64), custom = "validate_not_blank")]
    pub vin: String,
}

/// Filtros recibidos por query string
#[derive(Debug, Default, Deserialize)]
pub struct RepairQueryParams {
    pub operator: Option<String>,
    pub vin: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub status: Option<String>,
}

impl RepairQueryParams {
    pub fn into_filter(self) -> AppResult<RepairFilter> {
        let from = parse_optional_date("from", self.from.as_deref())?;
        let to = parse_optional_date("to", self.to.as_deref())?;
        let status = match non_blank(self.status.as_deref()) {
            Some(raw) => raw.parse::<RecordStatus>()?,
            None => RecordStatus::All,
        };

        RepairFilter::new(
            non_blank(self.operator.as_deref()),
            non_blank(self.vin.as_deref()),
            from,
            to,
            status,
        )
    }
}

// Response de un registro de reparo
#[derive(Debug, Serialize, Deserialize)]
pub struct RepairRecordResponse {
    pub id: Uuid,
    pub vin: String,
    pub operator_id: String,
    pub rework_type: Option<String>,
    pub shop: Shop,
    pub date: NaiveDate,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<f64>,
    pub duration_hours: Option<f64>,
    pub is_open: bool,
}

impl From<RepairRecord> for RepairRecordResponse {
    fn from(record: RepairRecord) -> Self {
        let duration_minutes = record.duration_minutes();
        Self {
            date: record.date(),
            is_open: record.is_open(),
            duration_hours: duration_minutes.map(|m| round2(m / 60.0)),
            duration_minutes,
            id: record.id,
            vin: record.vin,
            operator_id: record.operator_id,
            rework_type: record.rework_type,
            shop: record.shop,
            started_at: record.started_at,
            ended_at: record.ended_at,
        }
    }
}

// Response al finalizar un reparo
#[derive(Debug, Serialize, Deserialize)]
pub struct StopRepairResponse {
    pub id: Uuid,
    pub vin: String,
    pub operator_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_seconds: i64,
    pub duration_minutes: i64,
    pub duration_hours: f64,
}

impl From<StoppedRepair> for StopRepairResponse {
    fn from(stopped: StoppedRepair) -> Self {
        let seconds = stopped.duration.num_seconds();
        Self {
            id: stopped.id,
            vin: stopped.record.vin,
            operator_id: stopped.operator_id,
            started_at: stopped.record.started_at,
            ended_at: stopped.record.ended_at.unwrap_or(stopped.record.started_at),
            duration_seconds: seconds,
            duration_minutes: whole_minutes(stopped.duration),
            duration_hours: round2(seconds as f64 / 3600.0),
        }
    }
}

// Response de un reparo en curso
#[derive(Debug, Serialize, Deserialize)]
pub struct OpenRepairResponse {
    #[serde(flatten)]
    pub record: RepairRecordResponse,
    pub elapsed_minutes: f64,
}

impl From<OpenRepair> for OpenRepairResponse {
    fn from(open: OpenRepair) -> Self {
        Self {
            record: open.record.into(),
            elapsed_minutes: round2(open.elapsed_minutes),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OpenRepairsResponse {
    pub open_count: usize,
    pub total_open_minutes: f64,
    pub total_open_hours: f64,
    pub repairs: Vec<OpenRepairResponse>,
}

impl From<OpenRepairsOverview> for OpenRepairsResponse {
    fn from(overview: OpenRepairsOverview) -> Self {
        Self {
            open_count: overview.open_count,
            total_open_minutes: round2(overview.total_open_minutes),
            total_open_hours: round2(overview.total_open_minutes / 60.0),
            repairs: overview.repairs.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VinHistoryResponse {
    pub vin: String,
    pub repair_count: usize,
    pub total_closed_minutes: f64,
    pub records: Vec<RepairRecordResponse>,
}

impl From<VinHistory> for VinHistoryResponse {
    fn from(history: VinHistory) -> Self {
        Self {
            vin: history.vin,
            repair_count: history.repair_count,
            total_closed_minutes: history.total_closed_minutes,
            records: history.records.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_params_build_normalized_filter() {
        let params = RepairQueryParams {
            operator: Some(" op1 ".into()),
            vin: Some("".into()),
            from: Some("2025-01-01".into()),
            to: None,
            status: Some("CLOSED".into()),
        };
        let filter = params.into_filter().unwrap();
        assert_eq!(filter.operator_id.as_deref(), Some("OP1"));
        assert_eq!(filter.vin, None);
        assert_eq!(filter.from, NaiveDate::from_ymd_opt(2025, 1, 1));
        assert_eq!(filter.status, RecordStatus::Closed);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let params = RepairQueryParams {
            status: Some("pending".into()),
            ..RepairQueryParams::default()
        };
        assert!(params.into_filter().is_err());
    }

    #[test]
    fn blank_start_fields_fail_validation() {
        let request = StartRepairRequest {
            vin: "  ".into(),
            operator_id: "OP1".into(),
            rework_type: None,
            shop: "BS".into(),
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("vin"));
    }
}
