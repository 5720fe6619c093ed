//! Consultation models.

use serde::{Deserialize, Serialize};

use super::{require_text, ValidationError};

/// Motive given to consultations opened implicitly by a prescription.
pub const DEFAULT_CONSULTATION_MOTIVE: &str = "Consultation médicale";

/// A consultation (one visit of one patient).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, uniffi::Record)]
pub struct Consultation {
    /// Database-assigned identifier
    #[serde(rename = "IDC", default)]
    pub id: Option<i64>,
    /// Patient the visit belongs to
    #[serde(rename = "IDP")]
    pub patient_id: i64,
    /// Copy of the patient's national ID at the time of the visit
    #[serde(rename = "CIN", default)]
    pub cin: Option<String>,
    /// Reason for the visit
    #[serde(rename = "Motif", default)]
    pub motive: Option<String>,
    #[serde(rename = "Diagnostic", default)]
    pub diagnosis: Option<String>,
    #[serde(rename = "Observations", default)]
    pub observations: Option<String>,
    #[serde(rename = "Remarques", default)]
    pub remarks: Option<String>,
    /// Attending staff name. Free text, not a reference to `Personnel`.
    #[serde(rename = "NomMedecin", default)]
    pub doctor_name: Option<String>,
    /// Stored attachment filename inside the asset directory
    #[serde(rename = "PiècesJointes_FileName", default)]
    pub attachment_name: Option<String>,
    /// Attachment MIME type
    #[serde(rename = "PiècesJointes_FileType", default)]
    pub attachment_type: Option<String>,
    /// Unique external reference; generated on insert when absent
    #[serde(rename = "ConsultationID", default)]
    pub reference: Option<String>,
    /// Database-assigned creation timestamp (UTC, `YYYY-MM-DD HH:MM:SS`)
    #[serde(rename = "DateCreation", default)]
    pub created_at: Option<String>,
}

impl Consultation {
    pub fn new(patient_id: i64) -> Self {
        Self {
            patient_id,
            ..Default::default()
        }
    }

    /// Consultation opened implicitly for `date` by `doctor_name`.
    pub fn for_visit(patient_id: i64, cin: &str, doctor_name: &str, date: &str) -> Self {
        Self {
            patient_id,
            cin: Some(cin.to_string()),
            motive: Some(DEFAULT_CONSULTATION_MOTIVE.to_string()),
            diagnosis: Some(String::new()),
            observations: Some(String::new()),
            remarks: Some(format!("Consultation du {}", date)),
            doctor_name: Some(doctor_name.to_string()),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.patient_id <= 0 {
            return Err(ValidationError::Invalid {
                field: "IDP",
                reason: format!("invalid patient id {}", self.patient_id),
            });
        }
        if let Some(reference) = &self.reference {
            require_text("ConsultationID", reference)?;
        }
        Ok(())
    }
}

/// Attachment bytes sent by the shell alongside a record.
///
/// The boundary writes the bytes to the asset directory and keeps only the
/// resulting filename on the record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, uniffi::Record)]
pub struct AttachmentUpload {
    /// Base64-encoded file content
    #[serde(rename = "FileData")]
    pub data_base64: String,
    /// Original filename; only its extension is kept
    #[serde(rename = "FileName")]
    pub file_name: String,
    #[serde(rename = "FileType", default)]
    pub file_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_visit_defaults() {
        let c = Consultation::for_visit(3, "AB1234", "Dr. X", "2024-01-10");
        assert_eq!(c.motive.as_deref(), Some("Consultation médicale"));
        assert_eq!(c.remarks.as_deref(), Some("Consultation du 2024-01-10"));
        assert_eq!(c.doctor_name.as_deref(), Some("Dr. X"));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_attachment_columns_roundtrip_names() {
        let mut c = Consultation::new(1);
        c.attachment_name = Some("AB1234-consultation.pdf".into());
        let value = serde_json::to_value(&c).unwrap();
        assert_eq!(
            value["PiècesJointes_FileName"],
            serde_json::json!("AB1234-consultation.pdf")
        );
    }

    #[test]
    fn test_invalid_patient_id() {
        assert!(Consultation::new(0).validate().is_err());
    }
}
