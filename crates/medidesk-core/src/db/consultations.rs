//! Consultation database operations.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{Database, DbResult};
use crate::models::{require_id, Consultation};

const SELECT_CONSULTATION: &str = r#"
    SELECT IDC, IDP, CIN, Motif, Diagnostic, Observations, Remarques, NomMedecin,
           "PiècesJointes_FileName", "PiècesJointes_FileType", ConsultationID, DateCreation
    FROM Consultation
"#;

fn consultation_from_row(row: &Row<'_>) -> rusqlite::Result<Consultation> {
    Ok(Consultation {
        id: row.get(0)?,
        patient_id: row.get::<_, Option<i64>>(1)?.unwrap_or_default(),
        cin: row.get(2)?,
        motive: row.get(3)?,
        diagnosis: row.get(4)?,
        observations: row.get(5)?,
        remarks: row.get(6)?,
        doctor_name: row.get(7)?,
        attachment_name: row.get(8)?,
        attachment_type: row.get(9)?,
        reference: row.get(10)?,
        created_at: row.get(11)?,
    })
}

/// Insert a consultation row on `conn`, generating a reference when absent.
///
/// `created_at` is kept when supplied, otherwise the database stamps it.
pub(crate) fn insert_consultation_row(
    conn: &Connection,
    consultation: &Consultation,
) -> DbResult<i64> {
    let reference = consultation
        .reference
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    conn.execute(
        r#"
        INSERT INTO Consultation (
            IDP, CIN, Motif, Diagnostic, Observations, Remarques, NomMedecin,
            "PiècesJointes_FileName", "PiècesJointes_FileType", ConsultationID,
            DateCreation
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, COALESCE(?11, CURRENT_TIMESTAMP))
        "#,
        params![
            consultation.patient_id,
            consultation.cin,
            consultation.motive,
            consultation.diagnosis,
            consultation.observations,
            consultation.remarks,
            consultation.doctor_name,
            consultation.attachment_name,
            consultation.attachment_type,
            reference,
            consultation.created_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Newest consultation of patient `patient_id` created on `date` (`YYYY-MM-DD`).
pub(crate) fn find_consultation_on(
    conn: &Connection,
    patient_id: i64,
    date: &str,
) -> DbResult<Option<i64>> {
    conn.query_row(
        r#"
        SELECT IDC FROM Consultation
        WHERE IDP = ?1 AND date(DateCreation) = date(?2)
        ORDER BY IDC DESC
        LIMIT 1
        "#,
        params![patient_id, date],
        |row| row.get(0),
    )
    .optional()
    .map_err(Into::into)
}

impl Database {
    /// Record a consultation, returning its id.
    pub fn insert_consultation(&self, consultation: &Consultation) -> DbResult<i64> {
        consultation.validate()?;
        self.write("insert_consultation", |conn| {
            insert_consultation_row(conn, consultation)
        })
    }

    /// Rewrite the clinical fields of a consultation.
    ///
    /// The patient, reference and creation timestamp are fixed at creation.
    pub fn update_consultation(&self, consultation: &Consultation) -> DbResult<bool> {
        let id = require_id("IDC", consultation.id)?;
        let rows_affected = self.write("update_consultation", |conn| {
            Ok(conn.execute(
                r#"
                UPDATE Consultation SET
                    CIN = ?2, Motif = ?3, Diagnostic = ?4, Observations = ?5,
                    Remarques = ?6, NomMedecin = ?7,
                    "PiècesJointes_FileName" = ?8, "PiècesJointes_FileType" = ?9
                WHERE IDC = ?1
                "#,
                params![
                    id,
                    consultation.cin,
                    consultation.motive,
                    consultation.diagnosis,
                    consultation.observations,
                    consultation.remarks,
                    consultation.doctor_name,
                    consultation.attachment_name,
                    consultation.attachment_type,
                ],
            )?)
        })?;
        Ok(rows_affected > 0)
    }

    /// Delete a consultation. Its prescriptions go with it; fees are detached.
    /// Delete a consultation with its prescriptions; its fees are kept and
    /// detached.
    ///
    /// Dependents are handled here rather than left to the foreign keys:
    /// databases created before the keys carried ON DELETE actions would
    /// otherwise reject the delete.
    pub fn delete_consultation(&self, id: i64) -> DbResult<bool> {
        let rows_affected = self.write_tx("delete_consultation", |conn| {
            conn.execute("DELETE FROM Ordonnance WHERE IDC = ?1", [id])?;
            conn.execute("UPDATE Honoraire SET IDC = NULL WHERE IDC = ?1", [id])?;
            Ok(conn.execute("DELETE FROM Consultation WHERE IDC = ?1", [id])?)
        })?;
        Ok(rows_affected > 0)
    }

    pub fn get_consultation(&self, id: i64) -> DbResult<Option<Consultation>> {
        self.conn
            .query_row(
                &format!("{} WHERE IDC = ?1", SELECT_CONSULTATION),
                [id],
                consultation_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_consultations(&self) -> DbResult<Vec<Consultation>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY IDC", SELECT_CONSULTATION))?;
        let rows = stmt.query_map([], consultation_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// A patient's consultations, newest first.
    pub fn list_consultations_for_patient(&self, patient_id: i64) -> DbResult<Vec<Consultation>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE IDP = ?1 ORDER BY DateCreation DESC, IDC DESC",
            SELECT_CONSULTATION
        ))?;
        let rows = stmt.query_map([patient_id], consultation_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Most recent consultation of the patient holding `cin`.
    ///
    /// `None` when the CIN is unknown or the patient has no consultation.
    pub fn latest_consultation_for_cin(&self, cin: &str) -> DbResult<Option<Consultation>> {
        let patient = match self.get_patient_by_cin(cin)? {
            Some(patient) => patient,
            None => return Ok(None),
        };
        let Some(patient_id) = patient.id else {
            return Ok(None);
        };
        self.conn
            .query_row(
                &format!(
                    "{} WHERE IDP = ?1 ORDER BY IDC DESC LIMIT 1",
                    SELECT_CONSULTATION
                ),
                [patient_id],
                consultation_from_row,
            )
            .optional()
            .map_err(Into::into)
    }
}
