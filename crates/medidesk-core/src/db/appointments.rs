//! Appointment database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{today, Database, DbResult};
use crate::models::{require_id, Appointment};

const SELECT_APPOINTMENT: &str = r#"
    SELECT IDRv, IDP, DateRv, HeureRv, Statut, TypePatient, NomPrenom, Email, CIN
    FROM RendezVous
"#;

fn appointment_from_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        date: row.get(2)?,
        time: row.get(3)?,
        status: row.get(4)?,
        patient_type: row.get(5)?,
        full_name: row.get(6)?,
        email: row.get(7)?,
        cin: row.get(8)?,
    })
}

impl Database {
    /// Book an appointment, filling blank fields with booking defaults.
    pub fn insert_appointment(&self, appointment: &Appointment) -> DbResult<i64> {
        appointment.validate()?;
        let appt = appointment.with_defaults(&today());
        self.write("insert_appointment", |conn| {
            conn.execute(
                r#"
                INSERT INTO RendezVous (
                    IDP, DateRv, HeureRv, Statut, TypePatient, NomPrenom, Email, CIN
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    appt.patient_id,
                    appt.date,
                    appt.time,
                    appt.status,
                    appt.patient_type,
                    appt.full_name,
                    appt.email,
                    appt.cin,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Rewrite an appointment. Blank fields fall back to booking defaults.
    pub fn update_appointment(&self, appointment: &Appointment) -> DbResult<bool> {
        appointment.validate()?;
        let id = require_id("IDRv", appointment.id)?;
        let appt = appointment.with_defaults(&today());
        let rows_affected = self.write("update_appointment", |conn| {
            Ok(conn.execute(
                r#"
                UPDATE RendezVous SET
                    IDP = ?2, DateRv = ?3, HeureRv = ?4, Statut = ?5,
                    TypePatient = ?6, NomPrenom = ?7, Email = ?8, CIN = ?9
                WHERE IDRv = ?1
                "#,
                params![
                    id,
                    appt.patient_id,
                    appt.date,
                    appt.time,
                    appt.status,
                    appt.patient_type,
                    appt.full_name,
                    appt.email,
                    appt.cin,
                ],
            )?)
        })?;
        Ok(rows_affected > 0)
    }

    /// Delete an appointment.
    pub fn delete_appointment(&self, id: i64) -> DbResult<bool> {
        let rows_affected = self.write("delete_appointment", |conn| {
            Ok(conn.execute("DELETE FROM RendezVous WHERE IDRv = ?1", [id])?)
        })?;
        Ok(rows_affected > 0)
    }

    /// Get an appointment by id.
    pub fn get_appointment(&self, id: i64) -> DbResult<Option<Appointment>> {
        self.conn
            .query_row(
                &format!("{} WHERE IDRv = ?1", SELECT_APPOINTMENT),
                [id],
                appointment_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Appointments on one day.
    pub fn list_appointments_by_date(&self, date: &str) -> DbResult<Vec<Appointment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE DateRv = ?1 ORDER BY HeureRv, IDRv",
            SELECT_APPOINTMENT
        ))?;
        let rows = stmt.query_map([date], appointment_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Appointments within `[start, end]` (inclusive), by date then time.
    pub fn list_appointments_between(&self, start: &str, end: &str) -> DbResult<Vec<Appointment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE DateRv BETWEEN ?1 AND ?2 ORDER BY DateRv, HeureRv",
            SELECT_APPOINTMENT
        ))?;
        let rows = stmt.query_map([start, end], appointment_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Today's appointments (UTC date).
    pub fn list_appointments_today(&self) -> DbResult<Vec<Appointment>> {
        self.list_appointments_by_date(&today())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Patient;

    fn setup_db() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let idp = db
            .insert_patient(&Patient::new("Ben Ali", "Sami").with_cin("AB1234"))
            .unwrap();
        (db, idp)
    }

    #[test]
    fn test_insert_applies_defaults() {
        let (db, idp) = setup_db();

        let id = db
            .insert_appointment(&Appointment::new(Some(idp), "2024-01-10"))
            .unwrap();
        let appt = db.get_appointment(id).unwrap().unwrap();

        assert_eq!(appt.date.as_deref(), Some("2024-01-10"));
        assert_eq!(appt.time.as_deref(), Some("08:00"));
        assert_eq!(appt.status.as_deref(), Some("Planifié"));
        assert_eq!(appt.cin.as_deref(), Some(""));
    }

    #[test]
    fn test_missing_date_defaults_to_today() {
        let (db, _) = setup_db();
        let id = db.insert_appointment(&Appointment::default()).unwrap();
        let appt = db.get_appointment(id).unwrap().unwrap();
        assert_eq!(appt.date, Some(today()));
        assert_eq!(db.list_appointments_today().unwrap().len(), 1);
    }

    #[test]
    fn test_walk_in_without_patient() {
        let (db, _) = setup_db();
        let mut walk_in = Appointment::new(None, "2024-01-10");
        walk_in.full_name = Some("Walk In".into());
        let id = db.insert_appointment(&walk_in).unwrap();
        let appt = db.get_appointment(id).unwrap().unwrap();
        assert_eq!(appt.patient_id, None);
        assert_eq!(appt.full_name.as_deref(), Some("Walk In"));
    }

    #[test]
    fn test_update_and_delete() {
        let (db, idp) = setup_db();
        let id = db
            .insert_appointment(&Appointment::new(Some(idp), "2024-01-10"))
            .unwrap();

        let mut appt = db.get_appointment(id).unwrap().unwrap();
        appt.status = Some("Confirmé".into());
        appt.time = Some("10:30".into());
        assert!(db.update_appointment(&appt).unwrap());

        let updated = db.get_appointment(id).unwrap().unwrap();
        assert_eq!(updated.status.as_deref(), Some("Confirmé"));
        assert_eq!(updated.time.as_deref(), Some("10:30"));

        assert!(db.delete_appointment(id).unwrap());
        assert!(db.get_appointment(id).unwrap().is_none());
        assert!(!db.delete_appointment(id).unwrap());
    }

    #[test]
    fn test_between_is_ordered() {
        let (db, idp) = setup_db();
        for (date, time) in [
            ("2024-01-12", "09:00"),
            ("2024-01-10", "11:00"),
            ("2024-01-10", "08:30"),
            ("2024-02-01", "08:00"),
        ] {
            let mut appt = Appointment::new(Some(idp), date);
            appt.time = Some(time.into());
            db.insert_appointment(&appt).unwrap();
        }

        let week = db
            .list_appointments_between("2024-01-08", "2024-01-14")
            .unwrap();
        let slots: Vec<_> = week
            .iter()
            .map(|a| (a.date.clone().unwrap(), a.time.clone().unwrap()))
            .collect();
        assert_eq!(
            slots,
            vec![
                ("2024-01-10".to_string(), "08:30".to_string()),
                ("2024-01-10".to_string(), "11:00".to_string()),
                ("2024-01-12".to_string(), "09:00".to_string()),
            ]
        );

        assert_eq!(db.list_appointments_by_date("2024-01-10").unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_patient_rejected() {
        let (db, _) = setup_db();
        assert!(db
            .insert_appointment(&Appointment::new(Some(999), "2024-01-10"))
            .is_err());
    }
}
