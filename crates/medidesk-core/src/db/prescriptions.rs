//! Prescription (ordonnance) database operations.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{require_id, Prescription, PrescriptionWithVisit};

const SELECT_PRESCRIPTION: &str = r#"
    SELECT IDR, IDC, IDP,
           Medicament1, Posologie1, Duree1,
           Medicament2, Posologie2, Duree2,
           Medicament3, Posologie3, Duree3,
           Remarques
    FROM Ordonnance
"#;

fn prescription_from_row(row: &Row<'_>) -> rusqlite::Result<Prescription> {
    Ok(Prescription {
        id: row.get(0)?,
        consultation_id: row.get::<_, Option<i64>>(1)?.unwrap_or_default(),
        patient_id: row.get::<_, Option<i64>>(2)?.unwrap_or_default(),
        medication1: row.get(3)?,
        dosage1: row.get(4)?,
        duration1: row.get(5)?,
        medication2: row.get(6)?,
        dosage2: row.get(7)?,
        duration2: row.get(8)?,
        medication3: row.get(9)?,
        dosage3: row.get(10)?,
        duration3: row.get(11)?,
        remarks: row.get(12)?,
    })
}

pub(crate) fn insert_prescription_row(conn: &Connection, p: &Prescription) -> DbResult<i64> {
    conn.execute(
        r#"
        INSERT INTO Ordonnance (
            IDC, IDP,
            Medicament1, Posologie1, Duree1,
            Medicament2, Posologie2, Duree2,
            Medicament3, Posologie3, Duree3,
            Remarques
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
        params![
            p.consultation_id,
            p.patient_id,
            p.medication1,
            p.dosage1,
            p.duration1,
            p.medication2,
            p.dosage2,
            p.duration2,
            p.medication3,
            p.dosage3,
            p.duration3,
            p.remarks,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Rewrite the medication lines and remarks of prescription `id`, moving it
/// to `patient_id` when one is given.
pub(crate) fn update_prescription_lines(
    conn: &Connection,
    id: i64,
    patient_id: Option<i64>,
    p: &Prescription,
) -> DbResult<usize> {
    Ok(conn.execute(
        r#"
        UPDATE Ordonnance SET
            Medicament1 = ?2, Posologie1 = ?3, Duree1 = ?4,
            Medicament2 = ?5, Posologie2 = ?6, Duree2 = ?7,
            Medicament3 = ?8, Posologie3 = ?9, Duree3 = ?10,
            Remarques = ?11, IDP = COALESCE(?12, IDP)
        WHERE IDR = ?1
        "#,
        params![
            id,
            p.medication1,
            p.dosage1,
            p.duration1,
            p.medication2,
            p.dosage2,
            p.duration2,
            p.medication3,
            p.dosage3,
            p.duration3,
            p.remarks,
            patient_id,
        ],
    )?)
}

impl Database {
    /// Insert a prescription under an existing consultation.
    pub fn insert_prescription(&self, prescription: &Prescription) -> DbResult<i64> {
        prescription.validate()?;
        self.write("insert_prescription", |conn| {
            insert_prescription_row(conn, prescription)
        })
    }

    /// Update a prescription's medication lines. Its parent ids never change.
    pub fn update_prescription(&self, prescription: &Prescription) -> DbResult<bool> {
        let id = require_id("IDR", prescription.id)?;
        let rows_affected = self.write("update_prescription", |conn| {
            update_prescription_lines(conn, id, None, prescription)
        })?;
        Ok(rows_affected > 0)
    }

    pub fn delete_prescription(&self, id: i64) -> DbResult<bool> {
        let rows_affected = self.write("delete_prescription", |conn| {
            Ok(conn.execute("DELETE FROM Ordonnance WHERE IDR = ?1", [id])?)
        })?;
        Ok(rows_affected > 0)
    }

    pub fn get_prescription(&self, id: i64) -> DbResult<Option<Prescription>> {
        self.conn
            .query_row(
                &format!("{} WHERE IDR = ?1", SELECT_PRESCRIPTION),
                [id],
                prescription_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_prescriptions(&self) -> DbResult<Vec<Prescription>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY IDR", SELECT_PRESCRIPTION))?;
        let rows = stmt.query_map([], prescription_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Prescriptions written under one consultation.
    pub fn list_prescriptions_for_consultation(
        &self,
        consultation_id: i64,
    ) -> DbResult<Vec<Prescription>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE IDC = ?1 ORDER BY IDR",
            SELECT_PRESCRIPTION
        ))?;
        let rows = stmt.query_map([consultation_id], prescription_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Prescription history of the patient holding `cin`, newest visit first.
    pub fn list_prescriptions_for_cin(&self, cin: &str) -> DbResult<Vec<PrescriptionWithVisit>> {
        let patient_id = self
            .get_patient_by_cin(cin)?
            .and_then(|p| p.id)
            .ok_or_else(|| DbError::PatientNotFound(cin.to_string()))?;

        let mut stmt = self.conn.prepare(
            r#"
            SELECT o.IDR, o.IDC, o.IDP,
                   o.Medicament1, o.Posologie1, o.Duree1,
                   o.Medicament2, o.Posologie2, o.Duree2,
                   o.Medicament3, o.Posologie3, o.Duree3,
                   o.Remarques,
                   c.DateCreation, c.NomMedecin
            FROM Ordonnance o
            JOIN Consultation c ON c.IDC = o.IDC
            WHERE o.IDP = ?1
            ORDER BY c.DateCreation DESC, o.IDR DESC
            "#,
        )?;
        let rows = stmt.query_map([patient_id], |row| {
            Ok(PrescriptionWithVisit {
                prescription: prescription_from_row(row)?,
                consultation_date: row.get(13)?,
                doctor_name: row.get(14)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Consultation, Patient};

    fn setup_db() -> (Database, i64, i64) {
        let db = Database::open_in_memory().unwrap();
        let idp = db
            .insert_patient(&Patient::new("Ben Ali", "Sami").with_cin("AB1234"))
            .unwrap();
        let idc = db
            .insert_consultation(&Consultation::for_visit(idp, "AB1234", "Dr. X", "2024-01-10"))
            .unwrap();
        (db, idp, idc)
    }

    #[test]
    fn test_insert_and_get() {
        let (db, idp, idc) = setup_db();
        let mut p = Prescription::new(idc, idp);
        p.medication1 = Some("Paracetamol".into());
        p.dosage1 = Some("1g x3".into());

        let id = db.insert_prescription(&p).unwrap();
        p.id = Some(id);
        assert_eq!(db.get_prescription(id).unwrap().unwrap(), p);
        assert_eq!(db.list_prescriptions_for_consultation(idc).unwrap().len(), 1);
    }

    #[test]
    fn test_orphan_rejected() {
        let (db, idp, _) = setup_db();
        assert!(db.insert_prescription(&Prescription::new(999, idp)).is_err());
        assert!(db.insert_prescription(&Prescription::new(0, idp)).is_err());
        assert!(db.list_prescriptions().unwrap().is_empty());
    }

    #[test]
    fn test_update_keeps_parents() {
        let (db, idp, idc) = setup_db();
        let id = db.insert_prescription(&Prescription::new(idc, idp)).unwrap();

        let mut p = db.get_prescription(id).unwrap().unwrap();
        p.medication2 = Some("Ibuprofen".into());
        p.consultation_id = 42;
        assert!(db.update_prescription(&p).unwrap());

        let updated = db.get_prescription(id).unwrap().unwrap();
        assert_eq!(updated.medication2.as_deref(), Some("Ibuprofen"));
        assert_eq!(updated.consultation_id, idc);
    }

    #[test]
    fn test_deleting_consultation_cascades() {
        let (db, idp, idc) = setup_db();
        let id = db.insert_prescription(&Prescription::new(idc, idp)).unwrap();
        db.delete_consultation(idc).unwrap();
        assert!(db.get_prescription(id).unwrap().is_none());
    }

    #[test]
    fn test_history_by_cin() {
        let (db, idp, idc) = setup_db();
        let mut later = Consultation::new(idp);
        later.doctor_name = Some("Dr. Y".into());
        later.created_at = Some("2099-01-01 09:00:00".into());
        let later_idc = db.insert_consultation(&later).unwrap();

        db.insert_prescription(&Prescription::new(idc, idp)).unwrap();
        db.insert_prescription(&Prescription::new(later_idc, idp)).unwrap();

        let history = db.list_prescriptions_for_cin("AB1234").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].prescription.consultation_id, later_idc);
        assert_eq!(history[0].doctor_name.as_deref(), Some("Dr. Y"));
        assert_eq!(
            history[0].consultation_date.as_deref(),
            Some("2099-01-01 09:00:00")
        );

        assert!(matches!(
            db.list_prescriptions_for_cin("NOPE"),
            Err(DbError::PatientNotFound(_))
        ));
    }
}
