//! Modelos de reportes
//!
//! Métricas derivadas de los reparos finalizados: MTTR, tiempo total,
//! agrupación por operador y por fecha.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::repair::RepairRecord;

/// Resumen general sobre un conjunto de reparos finalizados
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairSummary {
    pub repair_count: usize,
    /// Mean Time To Repair en minutos; `None` si no hay reparos
    pub mttr_minutes: Option<f64>,
    pub total_minutes: f64,
    pub total_hours: f64,
}

/// Resumen por operador
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorSummary {
    pub operator_id: String,
    pub repair_count: usize,
    pub mean_minutes: f64,
    pub total_minutes: f64,
    pub total_hours: f64,
    pub distinct_vins: usize,
}

/// Cantidad de reparos iniciados en una fecha
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub repair_count: usize,
}

/// Reparo en curso con su tiempo transcurrido
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenRepair {
    pub record: RepairRecord,
    pub elapsed_minutes: f64,
}

/// Vista general de los reparos en curso
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenRepairsOverview {
    pub open_count: usize,
    pub total_open_minutes: f64,
    pub repairs: Vec<OpenRepair>,
}

/// Historial completo de un VIN
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VinHistory {
    pub vin: String,
    pub repair_count: usize,
    pub total_closed_minutes: f64,
    pub records: Vec<RepairRecord>,
}

/// Redondeo a dos decimales para presentar horas
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
