//! Prescription (ordonnance) models.

use serde::{Deserialize, Serialize};

use super::{require_opt_text, ValidationError};

/// One medication line of a prescription.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, uniffi::Record)]
pub struct MedicationLine {
    pub medication: String,
    pub dosage: Option<String>,
    pub duration: Option<String>,
}

/// A prescription. Always the child of exactly one consultation.
///
/// Holds up to three medication/dosage/duration triples. The shell sends
/// them either as `Medicament1/Posologie1/Duree1` or as `M1/P1/D1`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, uniffi::Record)]
pub struct Prescription {
    #[serde(rename = "IDR", default)]
    pub id: Option<i64>,
    #[serde(rename = "IDC")]
    pub consultation_id: i64,
    #[serde(rename = "IDP")]
    pub patient_id: i64,
    #[serde(rename = "Medicament1", alias = "M1", default)]
    pub medication1: Option<String>,
    #[serde(rename = "Posologie1", alias = "P1", default)]
    pub dosage1: Option<String>,
    #[serde(rename = "Duree1", alias = "D1", default)]
    pub duration1: Option<String>,
    #[serde(rename = "Medicament2", alias = "M2", default)]
    pub medication2: Option<String>,
    #[serde(rename = "Posologie2", alias = "P2", default)]
    pub dosage2: Option<String>,
    #[serde(rename = "Duree2", alias = "D2", default)]
    pub duration2: Option<String>,
    #[serde(rename = "Medicament3", alias = "M3", default)]
    pub medication3: Option<String>,
    #[serde(rename = "Posologie3", alias = "P3", default)]
    pub dosage3: Option<String>,
    #[serde(rename = "Duree3", alias = "D3", default)]
    pub duration3: Option<String>,
    #[serde(rename = "Remarques", default)]
    pub remarks: Option<String>,
}

impl Prescription {
    pub fn new(consultation_id: i64, patient_id: i64) -> Self {
        Self {
            consultation_id,
            patient_id,
            ..Default::default()
        }
    }

    /// Non-empty medication lines, in slot order.
    pub fn medications(&self) -> Vec<MedicationLine> {
        medication_lines([
            (&self.medication1, &self.dosage1, &self.duration1),
            (&self.medication2, &self.dosage2, &self.duration2),
            (&self.medication3, &self.dosage3, &self.duration3),
        ])
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.consultation_id <= 0 {
            return Err(ValidationError::MissingField("IDC"));
        }
        if self.patient_id <= 0 {
            return Err(ValidationError::MissingField("IDP"));
        }
        Ok(())
    }
}

fn medication_lines(
    slots: [(&Option<String>, &Option<String>, &Option<String>); 3],
) -> Vec<MedicationLine> {
    slots
        .into_iter()
        .filter_map(|(m, p, d)| {
            let medication = m.as_deref().map(str::trim).filter(|m| !m.is_empty())?;
            Some(MedicationLine {
                medication: medication.to_string(),
                dosage: p.clone(),
                duration: d.clone(),
            })
        })
        .collect()
}

/// Prescription request addressed by patient national ID instead of row ids.
///
/// Used by the doctor screen: the consultation is resolved (or opened) by
/// [`crate::workflow`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, uniffi::Record)]
pub struct PrescriptionByCin {
    /// Target prescription, for updates only
    #[serde(rename = "IDR", default)]
    pub id: Option<i64>,
    #[serde(rename = "patientCIN", default)]
    pub patient_cin: Option<String>,
    /// Prescribing staff member; required when a consultation may be opened
    #[serde(rename = "medecinName", default)]
    pub doctor_name: Option<String>,
    #[serde(rename = "Medicament1", alias = "M1", default)]
    pub medication1: Option<String>,
    #[serde(rename = "Posologie1", alias = "P1", default)]
    pub dosage1: Option<String>,
    #[serde(rename = "Duree1", alias = "D1", default)]
    pub duration1: Option<String>,
    #[serde(rename = "Medicament2", alias = "M2", default)]
    pub medication2: Option<String>,
    #[serde(rename = "Posologie2", alias = "P2", default)]
    pub dosage2: Option<String>,
    #[serde(rename = "Duree2", alias = "D2", default)]
    pub duration2: Option<String>,
    #[serde(rename = "Medicament3", alias = "M3", default)]
    pub medication3: Option<String>,
    #[serde(rename = "Posologie3", alias = "P3", default)]
    pub dosage3: Option<String>,
    #[serde(rename = "Duree3", alias = "D3", default)]
    pub duration3: Option<String>,
    #[serde(rename = "Remarques", default)]
    pub remarks: Option<String>,
}

impl PrescriptionByCin {
    pub fn new(patient_cin: impl Into<String>, doctor_name: impl Into<String>) -> Self {
        Self {
            patient_cin: Some(patient_cin.into()),
            doctor_name: Some(doctor_name.into()),
            ..Default::default()
        }
    }

    /// Checks for a new prescription: CIN first, then prescriber.
    pub fn validate_new(&self) -> Result<(), ValidationError> {
        require_opt_text("patientCIN", self.patient_cin.as_deref())?;
        require_opt_text("medecinName", self.doctor_name.as_deref())?;
        Ok(())
    }

    pub fn validate_update(&self) -> Result<i64, ValidationError> {
        require_opt_text("patientCIN", self.patient_cin.as_deref())?;
        super::require_id("IDR", self.id)
    }

    /// Concrete prescription row for the resolved consultation and patient.
    pub fn to_prescription(&self, consultation_id: i64, patient_id: i64) -> Prescription {
        Prescription {
            id: self.id,
            consultation_id,
            patient_id,
            medication1: self.medication1.clone(),
            dosage1: self.dosage1.clone(),
            duration1: self.duration1.clone(),
            medication2: self.medication2.clone(),
            dosage2: self.dosage2.clone(),
            duration2: self.duration2.clone(),
            medication3: self.medication3.clone(),
            dosage3: self.dosage3.clone(),
            duration3: self.duration3.clone(),
            remarks: self.remarks.clone(),
        }
    }
}

/// Identifiers produced by a CIN-addressed prescription.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, uniffi::Record)]
pub struct PrescriptionLink {
    #[serde(rename = "IDR")]
    pub prescription_id: i64,
    #[serde(rename = "IDC")]
    pub consultation_id: i64,
    #[serde(rename = "IDP")]
    pub patient_id: i64,
}

/// Prescription joined with the visit it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, uniffi::Record)]
pub struct PrescriptionWithVisit {
    #[serde(flatten)]
    pub prescription: Prescription,
    #[serde(rename = "DateConsultation")]
    pub consultation_date: Option<String>,
    #[serde(rename = "NomMedecin")]
    pub doctor_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_and_long_field_names() {
        let short: PrescriptionByCin = serde_json::from_str(
            r#"{"patientCIN":"AB1234","medecinName":"Dr. X","M1":"Paracetamol","P1":"1x/day","D1":"5 days"}"#,
        )
        .unwrap();
        let long: PrescriptionByCin = serde_json::from_str(
            r#"{"patientCIN":"AB1234","medecinName":"Dr. X","Medicament1":"Paracetamol","Posologie1":"1x/day","Duree1":"5 days"}"#,
        )
        .unwrap();
        assert_eq!(short, long);
        assert_eq!(short.medication1.as_deref(), Some("Paracetamol"));
    }

    #[test]
    fn test_validate_new_order() {
        let mut input = PrescriptionByCin::default();
        assert_eq!(
            input.validate_new(),
            Err(ValidationError::MissingField("patientCIN"))
        );
        input.patient_cin = Some("AB1234".into());
        assert_eq!(
            input.validate_new(),
            Err(ValidationError::MissingField("medecinName"))
        );
    }

    #[test]
    fn test_medications_skip_empty_slots() {
        let mut p = Prescription::new(1, 1);
        p.medication1 = Some("Paracetamol".into());
        p.medication2 = Some("  ".into());
        p.medication3 = Some("Ibuprofen".into());
        p.dosage3 = Some("2x/day".into());

        let lines = p.medications();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].medication, "Ibuprofen");
        assert_eq!(lines[1].dosage.as_deref(), Some("2x/day"));
    }
}
