pub mod repair_routes;
pub mod report_routes;
