//! Seguimiento de reparos abiertos/cerrados por VIN
//!
//! Garantiza que cada VIN tenga como máximo un reparo abierto y expone
//! las operaciones de inicio y fin del servicio.

use chrono::Duration;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::repair::{
    fractional_minutes, normalize_operator, normalize_rework_type, normalize_vin, whole_minutes,
    RecordStatus, RepairFilter, RepairRecord, Shop,
};
use crate::models::report::{OpenRepair, OpenRepairsOverview};
use crate::repositories::RepairRepository;
use crate::services::clock::{Clock, SystemClock};
use crate::utils::errors::{AppError, AppResult};

/// Resultado de finalizar un reparo
#[derive(Debug, Clone, PartialEq)]
pub struct StoppedRepair {
    pub id: Uuid,
    pub duration: Duration,
    pub operator_id: String,
    pub record: RepairRecord,
}

pub struct RepairTracker {
    repository: RepairRepository,
    clock: Arc<dyn Clock>,
}

impl RepairTracker {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_clock(pool, Arc::new(SystemClock))
    }

    pub fn with_clock(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository: RepairRepository::new(pool),
            clock,
        }
    }

    /// Inicia un reparo para el VIN. Falla con `OpenRepairExists` si ya hay uno abierto.
    pub async fn start(
        &self,
        vin: &str,
        operator_id: &str,
        rework_type: Option<&str>,
        shop: &str,
    ) -> AppResult<RepairRecord> {
        let vin = normalize_vin(vin)?;
        let operator_id = normalize_operator(operator_id)?;
        let shop: Shop = shop.parse()?;
        let rework_type = normalize_rework_type(rework_type);
        let now = self.clock.now();

        if let Some(existing) = self.repository.find_open(&vin).await? {
            let elapsed_minutes = whole_minutes(existing.elapsed_at(now));
            warn!(
                %vin,
                operator_id = %existing.operator_id,
                elapsed_minutes,
                "⚠️ Reparo ya abierto para este VIN"
            );
            return Err(AppError::OpenRepairExists {
                vin,
                operator_id: existing.operator_id,
                elapsed_minutes,
            });
        }

        // El índice único parcial resuelve la carrera entre dos inicios simultáneos
        let record = RepairRecord::open(vin, operator_id, rework_type, shop, now);
        self.repository.insert(&record).await?;

        info!(
            id = %record.id,
            vin = %record.vin,
            operator_id = %record.operator_id,
            shop = %record.shop,
            "▶️ Reparo iniciado"
        );
        Ok(record)
    }

    /// Finaliza el reparo abierto más reciente del VIN
    pub async fn stop(&self, vin: &str) -> AppResult<StoppedRepair> {
        let vin = normalize_vin(vin)?;

        let open = match self.repository.find_open(&vin).await? {
            Some(record) => record,
            None => {
                warn!(%vin, "⚠️ Ningún reparo abierto para este VIN");
                return Err(AppError::NoOpenRepair(vin));
            }
        };

        // Si el reloj retrocedió, el reparo dura cero en lugar de quedar negativo
        let ended_at = self.clock.now().max(open.started_at);

        let closed = match self.repository.close(open.id, ended_at).await {
            Ok(record) => record,
            Err(AppError::AlreadyClosed(_)) | Err(AppError::NotFound(_)) => {
                warn!(%vin, id = %open.id, "⚠️ El reparo fue cerrado por otra solicitud");
                return Err(AppError::NoOpenRepair(vin));
            }
            Err(e) => return Err(e),
        };

        let duration = closed.duration().unwrap_or_else(Duration::zero);
        info!(
            id = %closed.id,
            vin = %closed.vin,
            operator_id = %closed.operator_id,
            minutes = whole_minutes(duration),
            "🛑 Reparo finalizado"
        );

        Ok(StoppedRepair {
            id: closed.id,
            duration,
            operator_id: closed.operator_id.clone(),
            record: closed,
        })
    }

    /// Reparo abierto del VIN, sin efectos secundarios
    pub async fn peek_open(&self, vin: &str) -> AppResult<Option<RepairRecord>> {
        let vin = normalize_vin(vin)?;
        self.repository.find_open(&vin).await
    }

    /// Tiempo transcurrido del reparo abierto, si existe
    pub async fn peek_open_elapsed(&self, vin: &str) -> AppResult<Option<OpenRepair>> {
        let now = self.clock.now();
        Ok(self.peek_open(vin).await?.map(|record| OpenRepair {
            elapsed_minutes: fractional_minutes(record.elapsed_at(now)),
            record,
        }))
    }

    /// Todos los reparos en curso con su tiempo transcurrido
    pub async fn list_open(&self) -> AppResult<OpenRepairsOverview> {
        let now = self.clock.now();
        let filter = RepairFilter {
            status: RecordStatus::Open,
            ..RepairFilter::default()
        };

        let repairs: Vec<OpenRepair> = self
            .repository
            .query(&filter)
            .await?
            .into_iter()
            .map(|record| OpenRepair {
                elapsed_minutes: fractional_minutes(record.elapsed_at(now)),
                record,
            })
            .collect();

        Ok(OpenRepairsOverview {
            open_count: repairs.len(),
            total_open_minutes: repairs.iter().map(|r| r.elapsed_minutes).sum(),
            repairs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseConnection;
    use crate::services::clock::ManualClock;
    use chrono::{TimeZone, Utc};

    async fn tracker() -> (RepairTracker, ManualClock) {
        let connection = DatabaseConnection::in_memory().await.unwrap();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 7, 1, 8, 0, 0).unwrap());
        let tracker = RepairTracker::with_clock(connection.pool().clone(), Arc::new(clock.clone()));
        (tracker, clock)
    }

    async fn open_count(tracker: &RepairTracker, vin: &str) -> usize {
        let filter = RepairFilter::new(None, Some(vin), None, None, RecordStatus::Open).unwrap();
        tracker.repository.query(&filter).await.unwrap().len()
    }

    #[tokio::test]
    async fn start_then_stop_returns_duration_and_operator() {
        let (tracker, clock) = tracker().await;
        let started = tracker
            .start(" vin-1 ", "op1", Some("rework"), "BS")
            .await
            .unwrap();
        assert_eq!(started.vin, "VIN-1");
        assert_eq!(started.operator_id, "OP1");
        assert_eq!(started.rework_type.as_deref(), Some("rework"));

        clock.advance(Duration::minutes(42) + Duration::seconds(7));
        let stopped = tracker.stop("vin-1").await.unwrap();
        assert_eq!(stopped.id, started.id);
        assert_eq!(stopped.operator_id, "OP1");
        assert_eq!(stopped.duration, Duration::seconds(42 * 60 + 7));
        assert_eq!(
            stopped.record.ended_at.unwrap() - stopped.record.started_at,
            stopped.duration
        );
    }

    #[tokio::test]
    async fn second_start_is_blocked_with_elapsed_minutes() {
        let (tracker, clock) = tracker().await;
        tracker.start("VIN1", "OP1", None, "PS").await.unwrap();
        clock.advance(Duration::minutes(12));

        let err = tracker.start("vin1", "OP2", None, "GA").await.unwrap_err();
        match err {
            AppError::OpenRepairExists {
                vin,
                operator_id,
                elapsed_minutes,
            } => {
                assert_eq!(vin, "VIN1");
                assert_eq!(operator_id, "OP1");
                assert_eq!(elapsed_minutes, 12);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(open_count(&tracker, "VIN1").await, 1);
    }

    #[tokio::test]
    async fn stop_without_start_fails() {
        let (tracker, _) = tracker().await;
        let err = tracker.stop("NEVER").await.unwrap_err();
        assert!(matches!(err, AppError::NoOpenRepair(vin) if vin == "NEVER"));
    }

    #[tokio::test]
    async fn closed_repair_cannot_be_stopped_again() {
        let (tracker, clock) = tracker().await;
        tracker.start("VIN1", "OP1", None, "BS").await.unwrap();
        clock.advance(Duration::minutes(5));
        tracker.stop("VIN1").await.unwrap();

        let err = tracker.stop("VIN1").await.unwrap_err();
        assert!(matches!(err, AppError::NoOpenRepair(_)));
    }

    #[tokio::test]
    async fn vin_cycles_through_sequential_repairs() {
        let (tracker, clock) = tracker().await;
        for _ in 0..3 {
            tracker.start("VIN1", "OP1", None, "BS").await.unwrap();
            assert_eq!(open_count(&tracker, "VIN1").await, 1);
            clock.advance(Duration::minutes(10));
            tracker.stop("VIN1").await.unwrap();
            assert_eq!(open_count(&tracker, "VIN1").await, 0);
        }
        let all = RepairFilter::new(None, Some("VIN1"), None, None, RecordStatus::Closed).unwrap();
        assert_eq!(tracker.repository.query(&all).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn invalid_input_is_rejected() {
        let (tracker, _) = tracker().await;
        for (vin, operator, shop) in [("  ", "OP1", "BS"), ("VIN1", " ", "BS"), ("VIN1", "OP1", "")] {
            let err = tracker.start(vin, operator, None, shop).await.unwrap_err();
            assert!(matches!(err, AppError::InvalidInput(_)));
        }
        assert!(matches!(
            tracker.start("VIN1", "OP1", None, "XX").await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(tracker.stop("").await, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn clock_going_backwards_yields_zero_duration() {
        let (tracker, clock) = tracker().await;
        tracker.start("VIN1", "OP1", None, "BS").await.unwrap();
        clock.advance(-Duration::minutes(3));

        let stopped = tracker.stop("VIN1").await.unwrap();
        assert_eq!(stopped.duration, Duration::zero());
    }

    #[tokio::test]
    async fn peek_and_list_open_report_elapsed_time() {
        let (tracker, clock) = tracker().await;
        tracker.start("VIN1", "OP1", None, "BS").await.unwrap();
        clock.advance(Duration::minutes(30));
        tracker.start("VIN2", "OP2", None, "GA").await.unwrap();
        clock.advance(Duration::minutes(15));

        let peek = tracker.peek_open_elapsed("vin1").await.unwrap().unwrap();
        assert_eq!(peek.elapsed_minutes, 45.0);
        assert!(tracker.peek_open("VIN3").await.unwrap().is_none());

        let overview = tracker.list_open().await.unwrap();
        assert_eq!(overview.open_count, 2);
        assert_eq!(overview.total_open_minutes, 60.0);
        assert_eq!(overview.repairs[0].record.vin, "VIN2");
    }
}
