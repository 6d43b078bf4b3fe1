//! Modelos de datos
//!
//! Este módulo contiene los modelos del registro de reparos y de los
//! reportes derivados.

pub mod repair;
pub mod report;

pub use repair::*;
pub use report::*;
