//! Fee (honoraire) and payment (règlement) database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbResult};
use crate::models::{require_id, Fee, Payment};

const SELECT_FEE: &str = "SELECT IDH, IDC, IDP, Montant, TypePrestation FROM Honoraire";

const SELECT_PAYMENT: &str = r#"
    SELECT IDR, IDP, DateReglement, Montant, Tel, Email, Adresse, ModePaiement,
           Solde, Ville, CodePostal, Statut, Remarques, NomMedecin, Allergies,
           "PiècesJointes_FileName", "PiècesJointes_FileType"
    FROM Reglement
"#;

fn fee_from_row(row: &Row<'_>) -> rusqlite::Result<Fee> {
    Ok(Fee {
        id: row.get(0)?,
        consultation_id: row.get(1)?,
        patient_id: row.get(2)?,
        amount: row.get::<_, Option<f64>>(3)?.unwrap_or_default(),
        service_type: row.get(4)?,
    })
}

fn payment_from_row(row: &Row<'_>) -> rusqlite::Result<Payment> {
    Ok(Payment {
        id: row.get(0)?,
        patient_id: row.get::<_, Option<i64>>(1)?.unwrap_or_default(),
        date: row.get(2)?,
        amount: row.get::<_, Option<f64>>(3)?.unwrap_or_default(),
        phone: row.get(4)?,
        email: row.get(5)?,
        address: row.get(6)?,
        payment_mode: row.get(7)?,
        balance: row.get(8)?,
        city: row.get(9)?,
        postal_code: row.get(10)?,
        status: row.get(11)?,
        remarks: row.get(12)?,
        doctor_name: row.get(13)?,
        allergies: row.get(14)?,
        attachment_name: row.get(15)?,
        attachment_type: row.get(16)?,
    })
}

impl Database {
    // ========== Fees ==========

    pub fn insert_fee(&self, fee: &Fee) -> DbResult<i64> {
        fee.validate()?;
        self.write("insert_fee", |conn| {
            conn.execute(
                "INSERT INTO Honoraire (IDC, IDP, Montant, TypePrestation) VALUES (?1, ?2, ?3, ?4)",
                params![fee.consultation_id, fee.patient_id, fee.amount, fee.service_type],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn update_fee(&self, fee: &Fee) -> DbResult<bool> {
        fee.validate()?;
        let id = require_id("IDH", fee.id)?;
        let rows_affected = self.write("update_fee", |conn| {
            Ok(conn.execute(
                r#"
                UPDATE Honoraire SET IDC = ?2, IDP = ?3, Montant = ?4, TypePrestation = ?5
                WHERE IDH = ?1
                "#,
                params![
                    id,
                    fee.consultation_id,
                    fee.patient_id,
                    fee.amount,
                    fee.service_type
                ],
            )?)
        })?;
        Ok(rows_affected > 0)
    }

    pub fn delete_fee(&self, id: i64) -> DbResult<bool> {
        let rows_affected = self.write("delete_fee", |conn| {
            Ok(conn.execute("DELETE FROM Honoraire WHERE IDH = ?1", [id])?)
        })?;
        Ok(rows_affected > 0)
    }

    pub fn get_fee(&self, id: i64) -> DbResult<Option<Fee>> {
        self.conn
            .query_row(&format!("{} WHERE IDH = ?1", SELECT_FEE), [id], fee_from_row)
            .optional()
            .map_err(Into::into)
    }

    pub fn list_fees(&self) -> DbResult<Vec<Fee>> {
        let mut stmt = self.conn.prepare(&format!("{} ORDER BY IDH", SELECT_FEE))?;
        let rows = stmt.query_map([], fee_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Sum of all fee amounts; 0 when there are none.
    pub fn total_income(&self) -> DbResult<f64> {
        Ok(self.conn.query_row(
            "SELECT COALESCE(SUM(Montant), 0.0) FROM Honoraire",
            [],
            |row| row.get(0),
        )?)
    }

    // ========== Payments ==========

    pub fn insert_payment(&self, payment: &Payment) -> DbResult<i64> {
        payment.validate()?;
        self.write("insert_payment", |conn| {
            conn.execute(
                r#"
                INSERT INTO Reglement (
                    IDP, DateReglement, Montant, Tel, Email, Adresse, ModePaiement,
                    Solde, Ville, CodePostal, Statut, Remarques, NomMedecin, Allergies,
                    "PiècesJointes_FileName", "PiècesJointes_FileType"
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
                "#,
                params![
                    payment.patient_id,
                    payment.date,
                    payment.amount,
                    payment.phone,
                    payment.email,
                    payment.address,
                    payment.payment_mode,
                    payment.balance,
                    payment.city,
                    payment.postal_code,
                    payment.status,
                    payment.remarks,
                    payment.doctor_name,
                    payment.allergies,
                    payment.attachment_name,
                    payment.attachment_type,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn update_payment(&self, payment: &Payment) -> DbResult<bool> {
        payment.validate()?;
        let id = require_id("IDR", payment.id)?;
        let rows_affected = self.write("update_payment", |conn| {
            Ok(conn.execute(
                r#"
                UPDATE Reglement SET
                    IDP = ?2, DateReglement = ?3, Montant = ?4, Tel = ?5, Email = ?6,
                    Adresse = ?7, ModePaiement = ?8, Solde = ?9, Ville = ?10,
                    CodePostal = ?11, Statut = ?12, Remarques = ?13, NomMedecin = ?14,
                    Allergies = ?15,
                    "PiècesJointes_FileName" = ?16, "PiècesJointes_FileType" = ?17
                WHERE IDR = ?1
                "#,
                params![
                    id,
                    payment.patient_id,
                    payment.date,
                    payment.amount,
                    payment.phone,
                    payment.email,
                    payment.address,
                    payment.payment_mode,
                    payment.balance,
                    payment.city,
                    payment.postal_code,
                    payment.status,
                    payment.remarks,
                    payment.doctor_name,
                    payment.allergies,
                    payment.attachment_name,
                    payment.attachment_type,
                ],
            )?)
        })?;
        Ok(rows_affected > 0)
    }

    pub fn delete_payment(&self, id: i64) -> DbResult<bool> {
        let rows_affected = self.write("delete_payment", |conn| {
            Ok(conn.execute("DELETE FROM Reglement WHERE IDR = ?1", [id])?)
        })?;
        Ok(rows_affected > 0)
    }

    pub fn get_payment(&self, id: i64) -> DbResult<Option<Payment>> {
        self.conn
            .query_row(
                &format!("{} WHERE IDR = ?1", SELECT_PAYMENT),
                [id],
                payment_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_payments(&self) -> DbResult<Vec<Payment>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY IDR", SELECT_PAYMENT))?;
        let rows = stmt.query_map([], payment_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// A patient's payments, most recent payment date first.
    pub fn list_payments_for_patient(&self, patient_id: i64) -> DbResult<Vec<Payment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE IDP = ?1 ORDER BY DateReglement DESC, IDR DESC",
            SELECT_PAYMENT
        ))?;
        let rows = stmt.query_map([patient_id], payment_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
