//! Modelo de RepairRecord
//!
//! Un registro de reparo nace abierto (`ended_at = None`) al iniciar el
//! servicio sobre un VIN y se cierra una única vez al finalizarlo.
//! Nunca se reabre ni se elimina.

use chrono::{DateTime, Duration, NaiveDate, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::utils::errors::{AppError, AppResult};

/// Área de trabajo donde se realiza el reparo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shop {
    #[serde(rename = "BS")]
    Bs,
    #[serde(rename = "PS")]
    Ps,
    #[serde(rename = "GA")]
    Ga,
}

impl Shop {
    pub const ALL: [Shop; 3] = [Shop::Bs, Shop::Ps, Shop::Ga];

    pub fn as_str(&self) -> &'static str {
        match self {
            Shop::Bs => "BS",
            Shop::Ps => "PS",
            Shop::Ga => "GA",
        }
    }
}

impl fmt::Display for Shop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Shop {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_uppercase();
        if normalized.is_empty() {
            return Err(AppError::InvalidInput("Shop es obligatorio".to_string()));
        }
        Shop::ALL
            .into_iter()
            .find(|shop| shop.as_str() == normalized)
            .ok_or_else(|| {
                AppError::InvalidInput(format!(
                    "Shop '{}' inválido, valores permitidos: BS, PS, GA",
                    value.trim()
                ))
            })
    }
}

/// VIN en mayúsculas y sin espacios en los extremos
pub fn normalize_vin(raw: &str) -> AppResult<String> {
    let vin = raw.trim().to_uppercase();
    if vin.is_empty() {
        return Err(AppError::InvalidInput("VIN no puede estar vacío".to_string()));
    }
    Ok(vin)
}

/// ID de operador en mayúsculas y sin espacios en los extremos
pub fn normalize_operator(raw: &str) -> AppResult<String> {
    let operator_id = raw.trim().to_uppercase();
    if operator_id.is_empty() {
        return Err(AppError::InvalidInput(
            "ID del operador es obligatorio".to_string(),
        ));
    }
    Ok(operator_id)
}

/// Tipo de retrabajo opcional; un texto vacío equivale a ausente
pub fn normalize_rework_type(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Minutos enteros transcurridos (truncados), nunca negativos
pub fn whole_minutes(duration: Duration) -> i64 {
    duration.num_minutes().max(0)
}

/// Minutos con fracción
pub fn fractional_minutes(duration: Duration) -> f64 {
    duration.num_seconds() as f64 / 60.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairRecord {
    pub id: Uuid,
    pub vin: String,
    pub operator_id: String,
    pub rework_type: Option<String>,
    pub shop: Shop,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl RepairRecord {
    /// Nuevo registro abierto; espera valores ya normalizados
    pub fn open(
        vin: String,
        operator_id: String,
        rework_type: Option<String>,
        shop: Shop,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            vin,
            operator_id,
            rework_type,
            shop,
            started_at: started_at.trunc_subsecs(0),
            ended_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.ended_at.map(|ended_at| ended_at - self.started_at)
    }

    pub fn duration_minutes(&self) -> Option<f64> {
        self.duration().map(fractional_minutes)
    }

    /// Tiempo transcurrido desde el inicio hasta `now`
    pub fn elapsed_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.started_at).max(Duration::zero())
    }

    /// Fecha (UTC) en que comenzó el reparo
    pub fn date(&self) -> NaiveDate {
        self.started_at.date_naive()
    }
}

/// Estado de los registros a incluir en una consulta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    All,
    Open,
    Closed,
}

impl FromStr for RecordStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "" | "all" => Ok(RecordStatus::All),
            "open" => Ok(RecordStatus::Open),
            "closed" => Ok(RecordStatus::Closed),
            other => Err(AppError::InvalidInput(format!(
                "Estado '{}' inválido, valores permitidos: all, open, closed",
                other
            ))),
        }
    }
}

/// Filtros para consultar el registro de reparos
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepairFilter {
    pub operator_id: Option<String>,
    pub vin: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub status: RecordStatus,
}

impl RepairFilter {
    /// Construye el filtro normalizando operador y VIN
    pub fn new(
        operator_id: Option<&str>,
        vin: Option<&str>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        status: RecordStatus,
    ) -> AppResult<Self> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(AppError::InvalidInput(format!(
                    "Rango de fechas inválido: {} es posterior a {}",
                    from, to
                )));
            }
        }

        Ok(Self {
            operator_id: operator_id.map(normalize_operator).transpose()?,
            vin: vin.map(normalize_vin).transpose()?,
            from,
            to,
            status,
        })
    }

    pub fn closed() -> Self {
        Self {
            status: RecordStatus::Closed,
            ..Self::default()
        }
    }

    /// Mismo filtro restringido a reparos finalizados
    pub fn only_closed(mut self) -> Self {
        self.status = RecordStatus::Closed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn vin_is_trimmed_and_uppercased() {
        assert_eq!(normalize_vin("  abc123 ").unwrap(), "ABC123");
        assert!(matches!(normalize_vin("   "), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn operator_is_required() {
        assert_eq!(normalize_operator(" op1").unwrap(), "OP1");
        assert!(normalize_operator("").is_err());
    }

    #[test]
    fn shop_accepts_only_known_codes() {
        assert_eq!("bs".parse::<Shop>().unwrap(), Shop::Bs);
        assert_eq!(" GA ".parse::<Shop>().unwrap(), Shop::Ga);
        assert!("XX".parse::<Shop>().is_err());
        assert!("".parse::<Shop>().is_err());
    }

    #[test]
    fn blank_rework_type_becomes_none() {
        assert_eq!(normalize_rework_type(Some("  ")), None);
        assert_eq!(
            normalize_rework_type(Some(" pintura ")),
            Some("pintura".to_string())
        );
    }

    #[test]
    fn duration_is_end_minus_start() {
        let start = Utc.with_ymd_and_hms(2025, 5, 2, 8, 0, 0).unwrap();
        let mut record = RepairRecord::open(
            "VIN1".into(),
            "OP1".into(),
            None,
            Shop::Ps,
            start,
        );
        assert!(record.is_open());
        assert_eq!(record.duration(), None);

        record.ended_at = Some(start + Duration::minutes(45) + Duration::seconds(30));
        assert_eq!(record.duration(), Some(Duration::seconds(45 * 60 + 30)));
        assert_eq!(record.duration_minutes(), Some(45.5));
        assert_eq!(record.date(), NaiveDate::from_ymd_opt(2025, 5, 2).unwrap());
    }

    #[test]
    fn filter_rejects_inverted_date_range() {
        let from = NaiveDate::from_ymd_opt(2025, 2, 1);
        let to = NaiveDate::from_ymd_opt(2025, 1, 1);
        assert!(RepairFilter::new(None, None, from, to, RecordStatus::All).is_err());

        let filter =
            RepairFilter::new(Some(" op9 "), Some("abc123"), None, None, RecordStatus::Open)
                .unwrap();
        assert_eq!(filter.operator_id.as_deref(), Some("OP9"));
        assert_eq!(filter.vin.as_deref(), Some("ABC123"));
    }
}
