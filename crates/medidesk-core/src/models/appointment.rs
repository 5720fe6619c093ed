//! Appointment models.

use serde::{Deserialize, Serialize};

use super::{check_date, non_blank, ValidationError};

/// Time used when an appointment is booked without one.
pub const DEFAULT_APPOINTMENT_TIME: &str = "08:00";

/// Status used when an appointment is booked without one.
///
/// Statuses are free text (`Planifié`, `Confirmé`, `Annulé`, ...); no
/// transition rules are enforced.
pub const DEFAULT_APPOINTMENT_STATUS: &str = "Planifié";

/// An appointment. `patient_id` is `None` for walk-ins.
///
/// Name, email and CIN are a snapshot taken at booking time and are not
/// re-synced when the patient record changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, uniffi::Record)]
pub struct Appointment {
    #[serde(rename = "IDRv", default)]
    pub id: Option<i64>,
    #[serde(rename = "IDP", default)]
    pub patient_id: Option<i64>,
    /// YYYY-MM-DD
    #[serde(rename = "DateRv", default)]
    pub date: Option<String>,
    /// HH:MM
    #[serde(rename = "HeureRv", default)]
    pub time: Option<String>,
    #[serde(rename = "Statut", default)]
    pub status: Option<String>,
    #[serde(rename = "TypePatient", default)]
    pub patient_type: Option<String>,
    #[serde(rename = "NomPrenom", default)]
    pub full_name: Option<String>,
    #[serde(rename = "Email", default)]
    pub email: Option<String>,
    #[serde(rename = "CIN", default)]
    pub cin: Option<String>,
}

impl Appointment {
    pub fn new(patient_id: Option<i64>, date: impl Into<String>) -> Self {
        Self {
            patient_id,
            date: Some(date.into()),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_date("DateRv", self.date.as_deref())?;
        if let Some(time) = non_blank(self.time.as_deref()) {
            chrono::NaiveTime::parse_from_str(time.trim(), "%H:%M").map_err(|_| {
                ValidationError::Invalid {
                    field: "HeureRv",
                    reason: format!("expected HH:MM, got {:?}", time),
                }
            })?;
        }
        Ok(())
    }

    /// Fill every blank field with its booking default.
    ///
    /// Blank strings count as missing, so `""` for the time still yields
    /// [`DEFAULT_APPOINTMENT_TIME`].
    pub fn with_defaults(&self, today: &str) -> Appointment {
        let or = |value: &Option<String>, default: &str| {
            Some(
                non_blank(value.as_deref())
                    .unwrap_or(default)
                    .to_string(),
            )
        };
        Appointment {
            id: self.id,
            patient_id: self.patient_id,
            date: or(&self.date, today),
            time: or(&self.time, DEFAULT_APPOINTMENT_TIME),
            status: or(&self.status, DEFAULT_APPOINTMENT_STATUS),
            patient_type: or(&self.patient_type, ""),
            full_name: or(&self.full_name, ""),
            email: or(&self.email, ""),
            cin: or(&self.cin, ""),
        }
    }
}
