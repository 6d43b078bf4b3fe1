//! Utilidades de validación
//!
//! Este módulo contiene funciones helper para validación de datos
//! y conversión de tipos recibidos por la API.

use chrono::NaiveDate;
use validator::ValidationError;

use crate::utils::errors::{AppError, AppResult};

/// Validar y convertir string a fecha (YYYY-MM-DD)
pub fn validate_date(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        let mut error = ValidationError::new("date");
        error.add_param("value".into(), &value.to_string());
        error.add_param("format".into(), &"YYYY-MM-DD".to_string());
        error
    })
}

/// Validar que un string no esté vacío (ignorando espacios)
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("not_blank");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Parámetro opcional de query: vacío equivale a ausente
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Fecha opcional de un filtro
pub fn parse_optional_date(field: &str, value: Option<&str>) -> AppResult<Option<NaiveDate>> {
    match non_blank(value) {
        Some(raw) => validate_date(raw).map(Some).map_err(|_| {
            AppError::InvalidInput(format!(
                "'{}' debe tener el formato YYYY-MM-DD (recibido '{}')",
                field, raw
            ))
        }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso_dates() {
        let date = validate_date("2025-03-14").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 3, 14).unwrap());
        assert!(validate_date("14/03/2025").is_err());
    }

    #[test]
    fn blank_strings_are_rejected() {
        assert!(validate_not_blank("   ").is_err());
        assert!(validate_not_blank(" OP1 ").is_ok());
    }

    #[test]
    fn optional_dates_treat_blank_as_absent() {
        assert_eq!(parse_optional_date("from", Some("  ")).unwrap(), None);
        assert_eq!(parse_optional_date("from", None).unwrap(), None);
        assert!(matches!(
            parse_optional_date("from", Some("2025-13-01")),
            Err(AppError::InvalidInput(_))
        ));
    }
}
