//! Patient database operations.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{Database, DbResult};
use crate::models::{require_id, Patient};

const SELECT_PATIENT: &str = r#"
    SELECT IDP, Nom, Prenom, CIN, DateNaissance, Tel, Email,
           Adresse, Ville, Allergies, Remarques
    FROM Patients
"#;

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        last_name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        first_name: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        cin: row.get(3)?,
        date_of_birth: row.get(4)?,
        phone: row.get(5)?,
        email: row.get(6)?,
        address: row.get(7)?,
        city: row.get(8)?,
        allergies: row.get(9)?,
        remarks: row.get(10)?,
    })
}

/// First patient carrying `cin`, lowest id first.
///
/// CIN is not unique in the schema; the oldest record wins.
pub(crate) fn find_patient_by_cin(conn: &Connection, cin: &str) -> DbResult<Option<Patient>> {
    conn.query_row(
        &format!("{} WHERE CIN = ?1 ORDER BY IDP LIMIT 1", SELECT_PATIENT),
        [cin],
        patient_from_row,
    )
    .optional()
    .map_err(Into::into)
}

impl Database {
    /// Insert a new patient, returning its id.
    pub fn insert_patient(&self, patient: &Patient) -> DbResult<i64> {
        patient.validate()?;
        self.write("insert_patient", |conn| {
            conn.execute(
                r#"
                INSERT INTO Patients (
                    Nom, Prenom, CIN, DateNaissance, Tel, Email,
                    Adresse, Ville, Allergies, Remarques
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
                params![
                    patient.last_name,
                    patient.first_name,
                    patient.cin,
                    patient.date_of_birth,
                    patient.phone,
                    patient.email,
                    patient.address,
                    patient.city,
                    patient.allergies,
                    patient.remarks,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Update an existing patient.
    pub fn update_patient(&self, patient: &Patient) -> DbResult<bool> {
        patient.validate()?;
        let id = require_id("IDP", patient.id)?;
        let rows_affected = self.write("update_patient", |conn| {
            Ok(conn.execute(
                r#"
                UPDATE Patients SET
                    Nom = ?2, Prenom = ?3, CIN = ?4, DateNaissance = ?5,
                    Tel = ?6, Email = ?7, Adresse = ?8, Ville = ?9,
                    Allergies = ?10, Remarques = ?11
                WHERE IDP = ?1
                "#,
                params![
                    id,
                    patient.last_name,
                    patient.first_name,
                    patient.cin,
                    patient.date_of_birth,
                    patient.phone,
                    patient.email,
                    patient.address,
                    patient.city,
                    patient.allergies,
                    patient.remarks,
                ],
            )?)
        })?;
        Ok(rows_affected > 0)
    }

    /// Get a patient by id.
    pub fn get_patient(&self, id: i64) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("{} WHERE IDP = ?1", SELECT_PATIENT),
                [id],
                patient_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get a patient by national ID.
    pub fn get_patient_by_cin(&self, cin: &str) -> DbResult<Option<Patient>> {
        find_patient_by_cin(&self.conn, cin)
    }

    /// Search patients by name or CIN (prefix match).
    pub fn search_patients(&self, query: &str, limit: usize) -> DbResult<Vec<Patient>> {
        let pattern = format!("{}%", query.trim());
        let mut stmt = self.conn.prepare(&format!(
            r#"{}
            WHERE Nom LIKE ?1 OR Prenom LIKE ?1 OR CIN LIKE ?1
            ORDER BY Nom, Prenom
            LIMIT ?2
            "#,
            SELECT_PATIENT
        ))?;

        let rows = stmt.query_map(params![pattern, limit as i64], patient_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// List all patients in insertion order.
    pub fn list_patients(&self) -> DbResult<Vec<Patient>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY IDP", SELECT_PATIENT))?;
        let rows = stmt.query_map([], patient_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Number of patient records.
    pub fn count_patients(&self) -> DbResult<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM Patients", [], |row| row.get(0))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let db = setup_db();

        let mut patient = Patient::new("Ben Ali", "Sami").with_cin("AB1234");
        patient.allergies = Some("Penicillin".into());

        let id = db.insert_patient(&patient).unwrap();
        assert_eq!(id, 1);

        let retrieved = db.get_patient(id).unwrap().unwrap();
        patient.id = Some(id);
        assert_eq!(retrieved, patient);
    }

    #[test]
    fn test_get_missing_is_none() {
        let db = setup_db();
        assert!(db.get_patient(99).unwrap().is_none());
        assert!(db.get_patient_by_cin("NOPE").unwrap().is_none());
    }

    #[test]
    fn test_update_patient() {
        let db = setup_db();

        let mut patient = Patient::new("Ben Ali", "Sami");
        patient.id = Some(db.insert_patient(&patient).unwrap());

        patient.city = Some("Tunis".into());
        patient.remarks = Some("Diabetic".into());
        assert!(db.update_patient(&patient).unwrap());

        let retrieved = db.get_patient(patient.id.unwrap()).unwrap().unwrap();
        assert_eq!(retrieved.city.as_deref(), Some("Tunis"));
        assert_eq!(retrieved.remarks.as_deref(), Some("Diabetic"));
    }

    #[test]
    fn test_update_requires_id() {
        let db = setup_db();
        let patient = Patient::new("Ben Ali", "Sami");
        assert!(db.update_patient(&patient).is_err());
    }

    #[test]
    fn test_update_unknown_returns_false() {
        let db = setup_db();
        let mut patient = Patient::new("Ben Ali", "Sami");
        patient.id = Some(42);
        assert!(!db.update_patient(&patient).unwrap());
    }

    #[test]
    fn test_blank_name_rejected_before_insert() {
        let db = setup_db();
        assert!(db.insert_patient(&Patient::new("", "Sami")).is_err());
        assert_eq!(db.count_patients().unwrap(), 0);
    }

    #[test]
    fn test_search_patients() {
        let db = setup_db();

        db.insert_patient(&Patient::new("Ben Ali", "Sami").with_cin("AB1234"))
            .unwrap();
        db.insert_patient(&Patient::new("Ben Salah", "Amira").with_cin("CD5678"))
            .unwrap();
        db.insert_patient(&Patient::new("Trabelsi", "Nour").with_cin("AB9999"))
            .unwrap();

        let results = db.search_patients("Ben", 10).unwrap();
        assert_eq!(results.len(), 2);

        let by_cin = db.search_patients("AB", 10).unwrap();
        assert_eq!(by_cin.len(), 2);

        let limited = db.search_patients("Ben", 1).unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].last_name, "Ben Ali");
    }

    #[test]
    fn test_duplicate_cin_resolves_to_oldest() {
        let db = setup_db();
        let first = db
            .insert_patient(&Patient::new("Ben Ali", "Sami").with_cin("AB1234"))
            .unwrap();
        db.insert_patient(&Patient::new("Ben Ali", "Sana").with_cin("AB1234"))
            .unwrap();

        let found = db.get_patient_by_cin("AB1234").unwrap().unwrap();
        assert_eq!(found.id, Some(first));
        assert_eq!(db.count_patients().unwrap(), 2);
    }
}
