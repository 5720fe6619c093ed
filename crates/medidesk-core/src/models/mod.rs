//! Domain models for the clinic records system.

mod appointment;
mod audit;
mod billing;
mod consultation;
mod patient;
mod prescription;
mod staff;
mod supplier;

pub use appointment::*;
pub use audit::*;
pub use billing::*;
pub use consultation::*;
pub use patient::*;
pub use prescription::*;
pub use staff::*;
pub use supplier::*;

use thiserror::Error;

/// Rejected payload, raised before anything reaches the database.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("{0} is required for update")]
    MissingId(&'static str),

    #[error("{field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

pub(crate) fn require_opt_text(
    field: &'static str,
    value: Option<&str>,
) -> Result<(), ValidationError> {
    require_text(field, value.unwrap_or_default())
}

pub(crate) fn require_id(field: &'static str, id: Option<i64>) -> Result<i64, ValidationError> {
    id.ok_or(ValidationError::MissingId(field))
}

pub(crate) fn require_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::Invalid {
            field,
            reason: format!("not a number: {}", value),
        });
    }
    Ok(())
}

/// Accept an optional `YYYY-MM-DD` date; blank counts as absent.
pub(crate) fn check_date(field: &'static str, value: Option<&str>) -> Result<(), ValidationError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => chrono::NaiveDate::parse_from_str(v, "%Y-%m-%d")
            .map(|_| ())
            .map_err(|e| ValidationError::Invalid {
                field,
                reason: format!("expected YYYY-MM-DD, got {:?} ({})", v, e),
            }),
        None => Ok(()),
    }
}

/// `Some(value)` unless the value is missing or blank.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
