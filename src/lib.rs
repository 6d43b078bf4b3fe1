//! Registro de tiempos de reparo por VIN
//!
//! API HTTP que registra el inicio y fin de reparos de vehículos,
//! garantiza un único reparo abierto por VIN y deriva métricas (MTTR,
//! resúmenes por operador y por fecha) a partir del registro.

pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

use axum::{extract::State, response::Json, routing::get, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use middleware::cors::cors_for;
use state::AppState;
use utils::errors::AppResult;

/// Router completo de la aplicación
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/repairs", routes::repair_routes::create_repair_router())
        .nest("/api/reports", routes::report_routes::create_report_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors_for(&state.config))
        .with_state(state)
}

/// Estado del servicio y de la base de datos
async fn health_check(State(state): State<AppState>) -> AppResult<Json<serde_json::Value>> {
    database::ping_pool(&state.pool).await?;
    Ok(Json(json!({
        "status": "ok",
        "database": "ok",
        "timestamp": state.clock.now().to_rfc3339(),
    })))
}
