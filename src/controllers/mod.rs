pub mod repair_controller;
pub mod report_controller;
