//! Sistema de manejo de errores
//!
//! Este módulo define todos los tipos de errores del sistema
//! y su conversión a respuestas HTTP apropiadas.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Open repair already exists for VIN {vin} (operator {operator_id}, started {elapsed_minutes} min ago)")]
    OpenRepairExists {
        vin: String,
        operator_id: String,
        elapsed_minutes: i64,
    },

    #[error("No open repair found for VIN {0}")]
    NoOpenRepair(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Repair {0} is already closed")]
    AlreadyClosed(Uuid),

    #[error("Repair id {0} already exists")]
    DuplicateId(Uuid),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Cuerpos JSON mal formados, con tipos incorrectos o sin content-type
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

/// Respuesta de error para la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl AppError {
    /// Código estable que viaja en el cuerpo de error
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "DB_ERROR",
            AppError::Migration(_) => "MIGRATION_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::OpenRepairExists { .. } => "OPEN_REPAIR_EXISTS",
            AppError::NoOpenRepair(_) => "NO_OPEN_REPAIR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::AlreadyClosed(_) => "ALREADY_CLOSED",
            AppError::DuplicateId(_) => "DUPLICATE_ID",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Migration(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Validation(_) | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::OpenRepairExists { .. }
            | AppError::AlreadyClosed(_)
            | AppError::DuplicateId(_) => StatusCode::CONFLICT,
            AppError::NoOpenRepair(_) | AppError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = Some(self.code().to_string());

        let error_response = match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                ErrorResponse {
                    error: "Database Error".to_string(),
                    message: "An error occurred while accessing the database".to_string(),
                    details: Some(json!({ "sql_error": e.to_string() })),
                    code,
                }
            }

            AppError::Migration(e) => {
                tracing::error!("Migration error: {}", e);
                ErrorResponse {
                    error: "Migration Error".to_string(),
                    message: "The database schema could not be migrated".to_string(),
                    details: Some(json!({ "migration_error": e.to_string() })),
                    code,
                }
            }

            AppError::Validation(e) => {
                tracing::warn!("Validation error: {}", e);
                ErrorResponse {
                    error: "Validation Error".to_string(),
                    message: "The provided data is invalid".to_string(),
                    details: Some(json!(e)),
                    code,
                }
            }

            AppError::InvalidInput(msg) => {
                tracing::warn!("Invalid input: {}", msg);
                ErrorResponse {
                    error: "Bad Request".to_string(),
                    message: msg,
                    details: None,
                    code,
                }
            }

            AppError::OpenRepairExists {
                vin,
                operator_id,
                elapsed_minutes,
            } => {
                tracing::warn!(%vin, %operator_id, elapsed_minutes, "Start blocked: open repair exists");
                ErrorResponse {
                    error: "Conflict".to_string(),
                    message: format!(
                        "Ya existe un reparo abierto para el VIN {} iniciado hace {} minutos. Finalice el reparo anterior primero.",
                        vin, elapsed_minutes
                    ),
                    details: Some(json!({
                        "vin": vin,
                        "operator_id": operator_id,
                        "elapsed_minutes": elapsed_minutes,
                    })),
                    code,
                }
            }

            AppError::NoOpenRepair(vin) => {
                tracing::warn!(%vin, "Stop blocked: no open repair");
                ErrorResponse {
                    error: "Not Found".to_string(),
                    message: format!("No se encontró ningún reparo abierto para el VIN {}", vin),
                    details: Some(json!({ "vin": vin })),
                    code,
                }
            }

            AppError::NotFound(msg) => {
                tracing::warn!("Resource not found: {}", msg);
                ErrorResponse {
                    error: "Not Found".to_string(),
                    message: msg,
                    details: None,
                    code,
                }
            }

            AppError::AlreadyClosed(id) => {
                tracing::warn!(%id, "Repair already closed");
                ErrorResponse {
                    error: "Conflict".to_string(),
                    message: format!("El reparo {} ya fue finalizado", id),
                    details: Some(json!({ "id": id })),
                    code,
                }
            }

            AppError::DuplicateId(id) => {
                tracing::error!(%id, "Duplicate repair id");
                ErrorResponse {
                    error: "Conflict".to_string(),
                    message: format!("El reparo {} ya existe", id),
                    details: Some(json!({ "id": id })),
                    code,
                }
            }

            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ErrorResponse {
                    error: "Internal Server Error".to_string(),
                    message: "An unexpected error occurred".to_string(),
                    details: Some(json!({ "internal_error": msg })),
                    code,
                }
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

/// Función helper para crear errores de recurso no encontrado
pub fn not_found_error(resource: &str, id: &str) -> AppError {
    AppError::NotFound(format!("{} with id '{}' not found", resource, id))
}

/// Función helper para crear errores de entrada inválida
pub fn invalid_input_error(message: &str) -> AppError {
    AppError::InvalidInput(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_domain_errors_to_status_codes() {
        let open = AppError::OpenRepairExists {
            vin: "ABC123".into(),
            operator_id: "OP1".into(),
            elapsed_minutes: 5,
        };
        assert_eq!(open.status(), StatusCode::CONFLICT);
        assert_eq!(open.code(), "OPEN_REPAIR_EXISTS");
        assert_eq!(
            AppError::NoOpenRepair("ABC123".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            invalid_input_error("VIN vacío").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::AlreadyClosed(Uuid::new_v4()).status(),
            StatusCode::CONFLICT
        );
    }
}
