//! Servicios del sistema
//!
//! Este módulo contiene la lógica de negocio: el seguimiento de reparos
//! por VIN, la agregación de reportes y la fuente de tiempo.

pub mod clock;
pub mod repair_tracker;
pub mod report_aggregator;

pub use clock::{Clock, ManualClock, SystemClock};
pub use repair_tracker::{RepairTracker, StoppedRepair};
pub use report_aggregator::ReportAggregator;
