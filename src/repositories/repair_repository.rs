use chrono::{DateTime, NaiveDate, NaiveTime, SubsecRound, TimeZone, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::models::repair::{whole_minutes, RecordStatus, RepairFilter, RepairRecord, Shop};
use crate::utils::errors::{not_found_error, AppError, AppResult};

// Fila tal como se guarda en SQLite
#[derive(Debug, sqlx::FromRow)]
struct RepairRow {
    id: String,
    vin: String,
    operator_id: String,
    rework_type: Option<String>,
    shop: String,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
}

impl RepairRow {
    fn into_record(self) -> AppResult<RepairRecord> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| AppError::Internal(format!("Invalid repair id '{}': {}", self.id, e)))?;
        let shop = self
            .shop
            .parse::<Shop>()
            .map_err(|e| AppError::Internal(format!("Invalid shop for repair {}: {}", id, e)))?;

        Ok(RepairRecord {
            id,
            vin: self.vin,
            operator_id: self.operator_id,
            rework_type: self.rework_type,
            shop,
            started_at: self.started_at,
            ended_at: self.ended_at,
        })
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

// Columna que provocó un `UNIQUE constraint failed`, si es el caso
fn unique_violation_target(error: &sqlx::Error) -> Option<String> {
    match error {
        sqlx::Error::Database(db_err) => db_err
            .message()
            .strip_prefix("UNIQUE constraint failed: ")
            .map(str::to_string),
        _ => None,
    }
}

const INSERT_ATTEMPTS: usize = 2;

/// Registro persistente de reparos.
///
/// Solo se insertan filas y se escribe `ended_at` una vez por registro.
#[derive(Clone)]
pub struct RepairRepository {
    pool: SqlitePool,
}

impl RepairRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserta un registro. Un segundo reparo abierto para el mismo VIN
    /// choca con el índice único parcial y se reporta como `OpenRepairExists`.
    pub async fn insert(&self, record: &RepairRecord) -> AppResult<()> {
        if let Some(ended_at) = record.ended_at {
            if ended_at < record.started_at {
                return Err(AppError::InvalidInput(format!(
                    "Repair {} ends before it starts",
                    record.id
                )));
            }
        }

        // Si el reparo que provocó el choque se cerró antes de poder leerlo,
        // el índice ya está libre y basta con reintentar una vez.
        for attempt in 0..INSERT_ATTEMPTS {
            let error = match self.try_insert(record).await {
                Ok(()) => return Ok(()),
                Err(error) => error,
            };

            match unique_violation_target(&error).as_deref() {
                Some("repair_records.id") => return Err(AppError::DuplicateId(record.id)),
                Some("repair_records.vin") => {
                    if let Some(existing) = self.find_open(&record.vin).await? {
                        return Err(AppError::OpenRepairExists {
                            elapsed_minutes: whole_minutes(existing.elapsed_at(record.started_at)),
                            vin: existing.vin,
                            operator_id: existing.operator_id,
                        });
                    }
                    tracing::warn!(
                        vin = %record.vin,
                        attempt,
                        "⚠️ El reparo abierto en conflicto ya fue cerrado, reintentando"
                    );
                }
                _ => {
                    tracing::error!("❌ Error inserting repair {}: {}", record.id, error);
                    return Err(AppError::Database(error));
                }
            }
        }

        Err(AppError::OpenRepairExists {
            vin: record.vin.clone(),
            operator_id: String::new(),
            elapsed_minutes: 0,
        })
    }

    async fn try_insert(&self, record: &RepairRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO repair_records (id, vin, operator_id, rework_type, shop, started_at, ended_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.vin.as_str())
        .bind(record.operator_id.as_str())
        .bind(record.rework_type.as_deref())
        .bind(record.shop.as_str())
        .bind(record.started_at.trunc_subsecs(0))
        .bind(record.ended_at.map(|ended_at| ended_at.trunc_subsecs(0)))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Escribe `ended_at` en un registro abierto y devuelve el registro cerrado
    pub async fn close(&self, id: Uuid, ended_at: DateTime<Utc>) -> AppResult<RepairRecord> {
        let ended_at = ended_at.trunc_subsecs(0);
        let current = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Repair", &id.to_string()))?;

        if !current.is_open() {
            return Err(AppError::AlreadyClosed(id));
        }
        if ended_at < current.started_at {
            return Err(AppError::InvalidInput(format!(
                "Repair {} cannot end before it starts",
                id
            )));
        }

        let result =
            sqlx::query("UPDATE repair_records SET ended_at = ? WHERE id = ? AND ended_at IS NULL")
                .bind(ended_at)
                .bind(id.to_string())
                .execute(&self.pool)
                .await?;

        // Otro cierre ganó la carrera entre la lectura y el UPDATE
        if result.rows_affected() == 0 {
            return Err(AppError::AlreadyClosed(id));
        }

        Ok(RepairRecord {
            ended_at: Some(ended_at),
            ..current
        })
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<RepairRecord>> {
        let row = sqlx::query_as::<_, RepairRow>(
            r#"
            SELECT id, vin, operator_id, rework_type, shop, started_at, ended_at
            FROM repair_records
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(RepairRow::into_record).transpose()
    }

    /// Último reparo abierto (por `started_at`) para un VIN ya normalizado
    pub async fn find_open(&self, vin: &str) -> AppResult<Option<RepairRecord>> {
        let row = sqlx::query_as::<_, RepairRow>(
            r#"
            SELECT id, vin, operator_id, rework_type, shop, started_at, ended_at
            FROM repair_records
            WHERE vin = ? AND ended_at IS NULL
            ORDER BY started_at DESC, rowid DESC
            LIMIT 1
            "#,
        )
        .bind(vin)
        .fetch_optional(&self.pool)
        .await?;

        row.map(RepairRow::into_record).transpose()
    }

    /// Registros que cumplen el filtro, del más reciente al más antiguo
    pub async fn query(&self, filter: &RepairFilter) -> AppResult<Vec<RepairRecord>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, vin, operator_id, rework_type, shop, started_at, ended_at \
             FROM repair_records WHERE 1=1",
        );

        if let Some(operator_id) = &filter.operator_id {
            builder.push(" AND operator_id = ").push_bind(operator_id.clone());
        }
        if let Some(vin) = &filter.vin {
            builder.push(" AND vin = ").push_bind(vin.clone());
        }
        if let Some(from) = filter.from {
            builder.push(" AND started_at >= ").push_bind(start_of_day(from));
        }
        if let Some(next_day) = filter.to.and_then(|to| to.succ_opt()) {
            builder.push(" AND started_at < ").push_bind(start_of_day(next_day));
        }
        match filter.status {
            RecordStatus::All => {}
            RecordStatus::Open => {
                builder.push(" AND ended_at IS NULL");
            }
            RecordStatus::Closed => {
                builder.push(" AND ended_at IS NOT NULL");
            }
        }
        builder.push(" ORDER BY started_at DESC, rowid DESC");

        let rows = builder
            .build_query_as::<RepairRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(RepairRow::into_record).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseConnection;
    use chrono::Duration;

    async fn repository() -> RepairRepository {
        let connection = DatabaseConnection::in_memory().await.unwrap();
        RepairRepository::new(connection.pool().clone())
    }

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, day, hour, minute, 0).unwrap()
    }

    fn open_record(vin: &str, operator: &str, started_at: DateTime<Utc>) -> RepairRecord {
        RepairRecord::open(vin.into(), operator.into(), None, Shop::Bs, started_at)
    }

    #[tokio::test]
    async fn insert_then_find_open() {
        let repo = repository().await;
        let record = open_record("VIN1", "OP1", at(1, 8, 0));
        repo.insert(&record).await.unwrap();

        let found = repo.find_open("VIN1").await.unwrap().unwrap();
        assert_eq!(found, record);
        assert!(repo.find_open("VIN2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected() {
        let repo = repository().await;
        let record = open_record("VIN1", "OP1", at(1, 8, 0));
        repo.insert(&record).await.unwrap();

        let mut clone = record.clone();
        clone.vin = "VIN2".into();
        let err = repo.insert(&clone).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateId(id) if id == record.id));
    }

    #[tokio::test]
    async fn second_open_repair_for_vin_hits_constraint() {
        let repo = repository().await;
        repo.insert(&open_record("VIN1", "OP1", at(1, 8, 0)))
            .await
            .unwrap();

        let err = repo
            .insert(&open_record("VIN1", "OP2", at(1, 8, 25)))
            .await
            .unwrap_err();
        match err {
            AppError::OpenRepairExists {
                operator_id,
                elapsed_minutes,
                ..
            } => {
                assert_eq!(operator_id, "OP1");
                assert_eq!(elapsed_minutes, 25);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn vin_conflict_without_open_repair_is_retried() {
        let repo = repository().await;
        // El primer INSERT de GHOST choca como si otro reparo abierto lo
        // bloqueara; al leerlo ya no hay ninguno abierto.
        sqlx::query("CREATE TABLE ghost_hits (n INTEGER NOT NULL)")
            .execute(&repo.pool)
            .await
            .unwrap();
        sqlx::query(
            r#"
            CREATE TRIGGER ghost_conflict BEFORE INSERT ON repair_records
            WHEN NEW.vin = 'GHOST' AND (SELECT COUNT(*) FROM ghost_hits) = 0
            BEGIN
                INSERT INTO ghost_hits (n) VALUES (1);
                SELECT RAISE(FAIL, 'UNIQUE constraint failed: repair_records.vin');
            END
            "#,
        )
        .execute(&repo.pool)
        .await
        .unwrap();

        let record = open_record("GHOST", "OP1", at(1, 8, 0));
        repo.insert(&record).await.unwrap();

        assert_eq!(repo.find_open("GHOST").await.unwrap().unwrap().id, record.id);
        let (hits,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM ghost_hits")
            .fetch_one(&repo.pool)
            .await
            .unwrap();
        assert_eq!(hits, 1);
    }

    #[tokio::test]
    async fn close_writes_end_once() {
        let repo = repository().await;
        let record = open_record("VIN1", "OP1", at(1, 8, 0));
        repo.insert(&record).await.unwrap();

        let closed = repo.close(record.id, at(1, 9, 0)).await.unwrap();
        assert_eq!(closed.ended_at, Some(at(1, 9, 0)));
        assert_eq!(closed.duration(), Some(Duration::hours(1)));
        assert!(repo.find_open("VIN1").await.unwrap().is_none());

        let err = repo.close(record.id, at(1, 10, 0)).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyClosed(_)));
        let stored = repo.find_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(stored.ended_at, Some(at(1, 9, 0)));
    }

    #[tokio::test]
    async fn close_unknown_id_is_not_found() {
        let repo = repository().await;
        let err = repo.close(Uuid::new_v4(), at(1, 9, 0)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn close_before_start_is_rejected() {
        let repo = repository().await;
        let record = open_record("VIN1", "OP1", at(1, 8, 0));
        repo.insert(&record).await.unwrap();

        let err = repo.close(record.id, at(1, 7, 0)).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(repo.find_open("VIN1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn closed_vin_can_be_reopened_as_new_record() {
        let repo = repository().await;
        let first = open_record("VIN1", "OP1", at(1, 8, 0));
        repo.insert(&first).await.unwrap();
        repo.close(first.id, at(1, 8, 30)).await.unwrap();

        let second = open_record("VIN1", "OP2", at(1, 9, 0));
        repo.insert(&second).await.unwrap();
        assert_eq!(repo.find_open("VIN1").await.unwrap().unwrap().id, second.id);
    }

    #[tokio::test]
    async fn query_filters_and_orders_newest_first() {
        let repo = repository().await;
        let a = open_record("VIN1", "OP1", at(1, 8, 0));
        let b = open_record("VIN2", "OP2", at(2, 8, 0));
        let c = open_record("VIN3", "OP1", at(3, 8, 0));
        for record in [&a, &b, &c] {
            repo.insert(record).await.unwrap();
        }
        repo.close(a.id, at(1, 8, 20)).await.unwrap();

        let all = repo.query(&RepairFilter::default()).await.unwrap();
        let ids: Vec<Uuid> = all.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![c.id, b.id, a.id]);

        let by_operator = RepairFilter::new(Some("op1"), None, None, None, RecordStatus::All).unwrap();
        assert_eq!(repo.query(&by_operator).await.unwrap().len(), 2);

        let closed = repo.query(&RepairFilter::closed()).await.unwrap();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].id, a.id);

        let open = RepairFilter {
            status: RecordStatus::Open,
            ..RepairFilter::default()
        };
        assert_eq!(repo.query(&open).await.unwrap().len(), 2);

        let range = RepairFilter::new(
            None,
            None,
            NaiveDate::from_ymd_opt(2025, 6, 2),
            NaiveDate::from_ymd_opt(2025, 6, 3),
            RecordStatus::All,
        )
        .unwrap();
        let in_range: Vec<Uuid> = repo.query(&range).await.unwrap().iter().map(|r| r.id).collect();
        assert_eq!(in_range, vec![c.id, b.id]);
    }

    #[tokio::test]
    async fn query_by_vin_ignores_case_and_whitespace() {
        let repo = repository().await;
        repo.insert(&open_record("ABC123", "OP1", at(1, 8, 0)))
            .await
            .unwrap();

        let filter = RepairFilter::new(None, Some("  abc123 "), None, None, RecordStatus::All).unwrap();
        let found = repo.query(&filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].vin, "ABC123");
    }
}
