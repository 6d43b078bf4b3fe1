//! Agregación de reportes
//!
//! Cálculos de solo lectura sobre los reparos finalizados. Cada solicitud
//! vuelve a leer el registro y recalcula desde cero.

use sqlx::SqlitePool;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::repair::{normalize_vin, RecordStatus, RepairFilter, RepairRecord};
use crate::models::report::{round2, DailyCount, OperatorSummary, RepairSummary, VinHistory};
use crate::repositories::RepairRepository;
use crate::utils::errors::AppResult;

/// Duraciones en minutos de los registros cerrados
fn closed_minutes(records: &[RepairRecord]) -> impl Iterator<Item = f64> + '_ {
    records.iter().filter_map(RepairRecord::duration_minutes)
}

/// MTTR, tiempo total y cantidad de reparos cerrados
pub fn summarize(records: &[RepairRecord]) -> RepairSummary {
    let minutes: Vec<f64> = closed_minutes(records).collect();
    let total_minutes: f64 = minutes.iter().sum();
    let mttr_minutes = if minutes.is_empty() {
        None
    } else {
        Some(total_minutes / minutes.len() as f64)
    };

    RepairSummary {
        repair_count: minutes.len(),
        mttr_minutes,
        total_minutes,
        total_hours: round2(total_minutes / 60.0),
    }
}

/// Agrupación por operador, ordenada por cantidad de reparos (desc) y operador (asc)
pub fn group_by_operator(records: &[RepairRecord]) -> Vec<OperatorSummary> {
    #[derive(Default)]
    struct Acc<'a> {
        count: usize,
        total_minutes: f64,
        vins: HashSet<&'a str>,
    }

    let mut groups: HashMap<&str, Acc> = HashMap::new();
    for record in records {
        let Some(minutes) = record.duration_minutes() else {
            continue;
        };
        let acc = groups.entry(record.operator_id.as_str()).or_default();
        acc.count += 1;
        acc.total_minutes += minutes;
        acc.vins.insert(record.vin.as_str());
    }

    let mut summaries: Vec<OperatorSummary> = groups
        .into_iter()
        .map(|(operator_id, acc)| OperatorSummary {
            operator_id: operator_id.to_string(),
            repair_count: acc.count,
            mean_minutes: acc.total_minutes / acc.count as f64,
            total_minutes: acc.total_minutes,
            total_hours: round2(acc.total_minutes / 60.0),
            distinct_vins: acc.vins.len(),
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.repair_count
            .cmp(&a.repair_count)
            .then_with(|| a.operator_id.cmp(&b.operator_id))
    });
    summaries
}

/// Cantidad de reparos cerrados por fecha de inicio (UTC), en orden cronológico
pub fn group_by_date(records: &[RepairRecord]) -> Vec<DailyCount> {
    let mut days = BTreeMap::new();
    for record in records.iter().filter(|r| !r.is_open()) {
        *days.entry(record.date()).or_insert(0usize) += 1;
    }

    days.into_iter()
        .map(|(date, repair_count)| DailyCount { date, repair_count })
        .collect()
}

pub struct ReportAggregator {
    repository: RepairRepository,
}

impl ReportAggregator {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            repository: RepairRepository::new(pool),
        }
    }

    async fn closed_records(&self, filter: RepairFilter) -> AppResult<Vec<RepairRecord>> {
        self.repository.query(&filter.only_closed()).await
    }

    pub async fn summary(&self, filter: RepairFilter) -> AppResult<RepairSummary> {
        Ok(summarize(&self.closed_records(filter).await?))
    }

    pub async fn by_operator(&self, filter: RepairFilter) -> AppResult<Vec<OperatorSummary>> {
        Ok(group_by_operator(&self.closed_records(filter).await?))
    }

    pub async fn by_date(&self, filter: RepairFilter) -> AppResult<Vec<DailyCount>> {
        Ok(group_by_date(&self.closed_records(filter).await?))
    }

    /// Historial completo (abiertos y cerrados) de un VIN
    pub async fn vin_history(&self, vin: &str) -> AppResult<VinHistory> {
        let vin = normalize_vin(vin)?;
        let filter = RepairFilter {
            vin: Some(vin.clone()),
            status: RecordStatus::All,
            ..RepairFilter::default()
        };
        let records = self.repository.query(&filter).await?;

        Ok(VinHistory {
            vin,
            repair_count: records.len(),
            total_closed_minutes: closed_minutes(&records).sum(),
            records,
        })
    }
}
