//! Billing models: fees charged for a visit and payments received.

use serde::{Deserialize, Serialize};

use super::{check_date, require_finite, ValidationError};

/// A fee (honoraire) charged for a service.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, uniffi::Record)]
pub struct Fee {
    #[serde(rename = "IDH", default)]
    pub id: Option<i64>,
    #[serde(rename = "IDC", default)]
    pub consultation_id: Option<i64>,
    #[serde(rename = "IDP", default)]
    pub patient_id: Option<i64>,
    /// Amount charged. Sign is not checked.
    #[serde(rename = "Montant")]
    pub amount: f64,
    /// Service label (consultation, follow-up, ...)
    #[serde(rename = "TypePrestation", default)]
    pub service_type: Option<String>,
}

impl Fee {
    pub fn new(amount: f64) -> Self {
        Self {
            amount,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_finite("Montant", self.amount)
    }
}

/// A payment (reglement) received from a patient.
///
/// Contact fields are a snapshot taken when the payment is recorded.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, uniffi::Record)]
pub struct Payment {
    #[serde(rename = "IDR", default)]
    pub id: Option<i64>,
    #[serde(rename = "IDP")]
    pub patient_id: i64,
    #[serde(rename = "DateReglement", default)]
    pub date: Option<String>,
    #[serde(rename = "Montant")]
    pub amount: f64,
    #[serde(rename = "Tel", default)]
    pub phone: Option<String>,
    #[serde(rename = "Email", default)]
    pub email: Option<String>,
    #[serde(rename = "Adresse", default)]
    pub address: Option<String>,
    #[serde(rename = "ModePaiement", default)]
    pub payment_mode: Option<String>,
    /// Remaining balance
    #[serde(rename = "Solde", default)]
    pub balance: Option<f64>,
    #[serde(rename = "Ville", default)]
    pub city: Option<String>,
    #[serde(rename = "CodePostal", default)]
    pub postal_code: Option<String>,
    #[serde(rename = "Statut", default)]
    pub status: Option<String>,
    #[serde(rename = "Remarques", default)]
    pub remarks: Option<String>,
    #[serde(rename = "NomMedecin", default)]
    pub doctor_name: Option<String>,
    #[serde(rename = "Allergies", default)]
    pub allergies: Option<String>,
    #[serde(rename = "PiècesJointes_FileName", default)]
    pub attachment_name: Option<String>,
    #[serde(rename = "PiècesJointes_FileType", default)]
    pub attachment_type: Option<String>,
}

impl Payment {
    pub fn new(patient_id: i64, amount: f64) -> Self {
        Self {
            patient_id,
            amount,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.patient_id <= 0 {
            return Err(ValidationError::MissingField("IDP"));
        }
        require_finite("Montant", self.amount)?;
        if let Some(balance) = self.balance {
            require_finite("Solde", balance)?;
        }
        check_date("DateReglement", self.date.as_deref())
    }
}
