//! Patient models.

use serde::{Deserialize, Serialize};

use super::{require_text, ValidationError};

/// A patient record as captured by the intake form.
///
/// Serialized names match the persisted `Patients` columns so payloads from
/// the desktop shell deserialize directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, uniffi::Record)]
pub struct Patient {
    /// Database-assigned identifier - `None` until inserted
    #[serde(rename = "IDP", default)]
    pub id: Option<i64>,
    /// Family name
    #[serde(rename = "Nom")]
    pub last_name: String,
    /// Given name
    #[serde(rename = "Prenom")]
    pub first_name: String,
    /// National identity card number. Not unique in the schema.
    #[serde(rename = "CIN", default)]
    pub cin: Option<String>,
    /// Date of birth (YYYY-MM-DD)
    #[serde(rename = "DateNaissance", default)]
    pub date_of_birth: Option<String>,
    /// Phone number
    #[serde(rename = "Tel", default)]
    pub phone: Option<String>,
    /// Email address
    #[serde(rename = "Email", default)]
    pub email: Option<String>,
    /// Street address
    #[serde(rename = "Adresse", default)]
    pub address: Option<String>,
    /// City
    #[serde(rename = "Ville", default)]
    pub city: Option<String>,
    /// Known allergies (free text)
    #[serde(rename = "Allergies", default)]
    pub allergies: Option<String>,
    /// Free-text remarks
    #[serde(rename = "Remarques", default)]
    pub remarks: Option<String>,
}

impl Patient {
    /// Create a new patient with required fields.
    pub fn new(last_name: impl Into<String>, first_name: impl Into<String>) -> Self {
        Self {
            last_name: last_name.into(),
            first_name: first_name.into(),
            ..Default::default()
        }
    }

    /// Builder-style setter for the national ID.
    pub fn with_cin(mut self, cin: impl Into<String>) -> Self {
        self.cin = Some(cin.into());
        self
    }

    /// "Nom Prenom", as shown in appointment snapshots.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
            .trim()
            .to_string()
    }

    /// Check required fields before a write.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("Nom", &self.last_name)?;
        require_text("Prenom", &self.first_name)?;
        Ok(())
    }
}
