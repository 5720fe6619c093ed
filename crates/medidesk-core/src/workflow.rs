//! Consultation/prescription linking by patient national ID.
//!
//! The doctor screen only knows a patient's CIN. A prescription must still
//! hang off a consultation, so the visit of the day is looked up and opened
//! on demand. Lookup, creation and the prescription insert share one
//! `BEGIN IMMEDIATE` transaction.

use rusqlite::Connection;

use crate::db::consultations::{find_consultation_on, insert_consultation_row};
use crate::db::patients::find_patient_by_cin;
use crate::db::prescriptions::{insert_prescription_row, update_prescription_lines};
use crate::db::{today, Database, DbError, DbResult};
use crate::models::{
    check_date, require_text, Consultation, PrescriptionByCin, PrescriptionLink,
};

/// Resolve the patient id for `cin`, or fail with `PatientNotFound`.
fn resolve_patient(conn: &Connection, cin: &str) -> DbResult<i64> {
    find_patient_by_cin(conn, cin)?
        .and_then(|p| p.id)
        .ok_or_else(|| DbError::PatientNotFound(cin.to_string()))
}

/// Find the patient's consultation on `date`, opening one if there is none.
fn find_or_open(
    conn: &Connection,
    patient_id: i64,
    cin: &str,
    doctor_name: &str,
    date: &str,
) -> DbResult<i64> {
    if let Some(idc) = find_consultation_on(conn, patient_id, date)? {
        tracing::debug!(idc, patient_id, date, "Reusing consultation");
        return Ok(idc);
    }

    let mut visit = Consultation::for_visit(patient_id, cin, doctor_name, date);
    if date != today() {
        // Keep the row on the requested day so later lookups find it.
        visit.created_at = Some(format!("{} 00:00:00", date));
    }
    let idc = insert_consultation_row(conn, &visit)?;
    tracing::info!(idc, patient_id, date, "Opened consultation");
    Ok(idc)
}

impl Database {
    /// Id of today's consultation for the patient holding `cin`, created if needed.
    pub fn get_or_create_current_consultation(
        &self,
        cin: &str,
        staff_name: &str,
    ) -> DbResult<i64> {
        self.get_or_create_current_consultation_on(cin, staff_name, &today())
    }

    /// Same as [`Self::get_or_create_current_consultation`] for an explicit
    /// `YYYY-MM-DD` day.
    pub fn get_or_create_current_consultation_on(
        &self,
        cin: &str,
        staff_name: &str,
        date: &str,
    ) -> DbResult<i64> {
        require_text("CIN", cin)?;
        require_text("medecinName", staff_name)?;
        check_date("date", Some(date))?;

        self.write_tx("get_or_create_current_consultation", |conn| {
            let patient_id = resolve_patient(conn, cin)?;
            find_or_open(conn, patient_id, cin, staff_name, date)
        })
    }

    /// Insert a prescription under today's consultation of the patient
    /// holding `input.patient_cin`.
    pub fn add_prescription_by_cin(&self, input: &PrescriptionByCin) -> DbResult<PrescriptionLink> {
        self.add_prescription_by_cin_on(input, &today())
    }

    pub fn add_prescription_by_cin_on(
        &self,
        input: &PrescriptionByCin,
        date: &str,
    ) -> DbResult<PrescriptionLink> {
        input.validate_new()?;
        check_date("date", Some(date))?;
        let cin = input.patient_cin.as_deref().unwrap_or_default().trim();
        let doctor = input.doctor_name.as_deref().unwrap_or_default().trim();

        let link = self.write_tx("add_prescription_by_cin", |conn| {
            let patient_id = resolve_patient(conn, cin)?;
            let consultation_id = find_or_open(conn, patient_id, cin, doctor, date)?;
            let prescription = input.to_prescription(consultation_id, patient_id);
            let prescription_id = insert_prescription_row(conn, &prescription)?;
            Ok(PrescriptionLink {
                prescription_id,
                consultation_id,
                patient_id,
            })
        })?;

        tracing::info!(
            idr = link.prescription_id,
            idc = link.consultation_id,
            idp = link.patient_id,
            "Prescription added"
        );
        Ok(link)
    }

    /// Rewrite a prescription's medication lines and reattach it to the
    /// patient holding `input.patient_cin`.
    pub fn update_prescription_by_cin(&self, input: &PrescriptionByCin) -> DbResult<bool> {
        let id = input.validate_update()?;
        let cin = input.patient_cin.as_deref().unwrap_or_default().trim();

        let rows_affected = self.write_tx("update_prescription_by_cin", |conn| {
            let patient_id = resolve_patient(conn, cin)?;
            let prescription = input.to_prescription(0, patient_id);
            update_prescription_lines(conn, id, Some(patient_id), &prescription)
        })?;
        Ok(rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Patient, ValidationError};

    fn setup_db() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let idp = db
            .insert_patient(&Patient::new("Ben Ali", "Sami").with_cin("AB1234"))
            .unwrap();
        (db, idp)
    }

    fn consultation_count(db: &Database) -> i64 {
        db.conn()
            .query_row("SELECT COUNT(*) FROM Consultation", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_same_day_reuses_consultation() {
        let (db, idp) = setup_db();

        let first = db
            .get_or_create_current_consultation("AB1234", "Dr. Haddad")
            .unwrap();
        let second = db
            .get_or_create_current_consultation("AB1234", "Dr. Other")
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(consultation_count(&db), 1);

        let visit = db.get_consultation(first).unwrap().unwrap();
        assert_eq!(visit.patient_id, idp);
        assert_eq!(visit.motive.as_deref(), Some("Consultation médicale"));
        assert_eq!(visit.doctor_name.as_deref(), Some("Dr. Haddad"));
        assert_eq!(
            visit.remarks,
            Some(format!("Consultation du {}", today()))
        );
    }

    #[test]
    fn test_yesterday_does_not_count() {
        let (db, idp) = setup_db();
        let mut old = Consultation::new(idp);
        old.created_at = Some("2024-01-09 17:00:00".into());
        let old_id = db.insert_consultation(&old).unwrap();

        let idc = db
            .get_or_create_current_consultation_on("AB1234", "Dr. Haddad", "2024-01-10")
            .unwrap();
        assert_ne!(idc, old_id);
        assert_eq!(consultation_count(&db), 2);

        let again = db
            .get_or_create_current_consultation_on("AB1234", "Dr. Haddad", "2024-01-10")
            .unwrap();
        assert_eq!(again, idc);
    }

    #[test]
    fn test_unknown_cin_creates_nothing() {
        let (db, _) = setup_db();
        let err = db
            .get_or_create_current_consultation("ZZ0000", "Dr. Haddad")
            .unwrap_err();
        assert!(matches!(err, DbError::PatientNotFound(ref cin) if cin == "ZZ0000"));

        let input = PrescriptionByCin::new("ZZ0000", "Dr. Haddad");
        assert!(matches!(
            db.add_prescription_by_cin(&input),
            Err(DbError::PatientNotFound(_))
        ));
        assert_eq!(consultation_count(&db), 0);
        assert!(db.list_prescriptions().unwrap().is_empty());
    }

    #[test]
    fn test_blank_inputs_rejected() {
        let (db, _) = setup_db();
        assert!(matches!(
            db.get_or_create_current_consultation("", "Dr. Haddad"),
            Err(DbError::Validation(_))
        ));
        assert!(matches!(
            db.get_or_create_current_consultation("AB1234", "  "),
            Err(DbError::Validation(_))
        ));

        let mut input = PrescriptionByCin::default();
        assert!(matches!(
            db.add_prescription_by_cin(&input),
            Err(DbError::Validation(ValidationError::MissingField("patientCIN")))
        ));
        input.patient_cin = Some("AB1234".into());
        assert!(matches!(
            db.add_prescription_by_cin(&input),
            Err(DbError::Validation(ValidationError::MissingField("medecinName")))
        ));
        assert_eq!(consultation_count(&db), 0);
    }

    #[test]
    fn test_add_prescription_links_ids() {
        let (db, idp) = setup_db();
        let mut input = PrescriptionByCin::new("AB1234", "Dr. Haddad");
        input.medication1 = Some("Paracetamol".into());
        input.dosage1 = Some("1g x3".into());
        input.duration1 = Some("5 jours".into());

        let link = db.add_prescription_by_cin(&input).unwrap();
        assert_eq!(link.patient_id, idp);

        let second = db.add_prescription_by_cin(&input).unwrap();
        assert_eq!(second.consultation_id, link.consultation_id);
        assert_ne!(second.prescription_id, link.prescription_id);

        let stored = db.get_prescription(link.prescription_id).unwrap().unwrap();
        assert_eq!(stored.consultation_id, link.consultation_id);
        assert_eq!(stored.medication1.as_deref(), Some("Paracetamol"));
        assert_eq!(stored.duration1.as_deref(), Some("5 jours"));
    }

    #[test]
    fn test_update_by_cin() {
        let (db, _) = setup_db();
        let other = db
            .insert_patient(&Patient::new("Trabelsi", "Nour").with_cin("CD5678"))
            .unwrap();

        let mut input = PrescriptionByCin::new("AB1234", "Dr. Haddad");
        input.medication1 = Some("Paracetamol".into());
        let link = db.add_prescription_by_cin(&input).unwrap();

        let mut update = PrescriptionByCin::default();
        update.id = Some(link.prescription_id);
        update.patient_cin = Some("CD5678".into());
        update.medication1 = Some("Ibuprofen".into());
        assert!(db.update_prescription_by_cin(&update).unwrap());

        let stored = db.get_prescription(link.prescription_id).unwrap().unwrap();
        assert_eq!(stored.patient_id, other);
        assert_eq!(stored.consultation_id, link.consultation_id);
        assert_eq!(stored.medication1.as_deref(), Some("Ibuprofen"));

        update.patient_cin = Some("ZZ0000".into());
        assert!(matches!(
            db.update_prescription_by_cin(&update),
            Err(DbError::PatientNotFound(_))
        ));

        update.patient_cin = Some("AB1234".into());
        update.id = Some(999);
        assert!(!db.update_prescription_by_cin(&update).unwrap());
    }
}
