//! Supplier document tracking (`Suivi_doc`) and procurement (`Approvisionnement`).

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbResult};
use crate::models::{require_id, Procurement, SupplierDocument};

const SELECT_SUPPLIER_DOC: &str = r#"
    SELECT IDSuivi, RefDocument, Fournisseur, Date_S, Date_R, Mode_R, Montant,
           Saisie, Compatibilite, ImageDoc_FileName, ImageDoc_FileType,
           ImageJustificatif_FileName, ImageJustificatif_FileType, Observation
    FROM Suivi_doc
"#;

const SELECT_PROCUREMENT: &str = r#"
    SELECT ID_App, DateApp, Fournisseur, IFF, Produit, Quantite, PrixUnitaire
    FROM Approvisionnement
"#;

fn supplier_doc_from_row(row: &Row<'_>) -> rusqlite::Result<SupplierDocument> {
    Ok(SupplierDocument {
        id: row.get(0)?,
        reference: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        supplier: row.get(2)?,
        sent_date: row.get(3)?,
        received_date: row.get(4)?,
        receipt_mode: row.get(5)?,
        amount: row.get(6)?,
        entered_by: row.get(7)?,
        compatibility: row.get(8)?,
        document_file_name: row.get(9)?,
        document_file_type: row.get(10)?,
        receipt_file_name: row.get(11)?,
        receipt_file_type: row.get(12)?,
        observation: row.get(13)?,
    })
}

fn procurement_from_row(row: &Row<'_>) -> rusqlite::Result<Procurement> {
    Ok(Procurement {
        id: row.get(0)?,
        date: row.get(1)?,
        supplier: row.get(2)?,
        supplier_tax_id: row.get(3)?,
        product: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        quantity: row.get(5)?,
        unit_price: row.get(6)?,
    })
}

impl Database {
    // ========== Supplier documents ==========

    pub fn insert_supplier_doc(&self, doc: &SupplierDocument) -> DbResult<i64> {
        doc.validate()?;
        self.write("insert_supplier_doc", |conn| {
            conn.execute(
                r#"
                INSERT INTO Suivi_doc (
                    RefDocument, Fournisseur, Date_S, Date_R, Mode_R, Montant,
                    Saisie, Compatibilite, ImageDoc_FileName, ImageDoc_FileType,
                    ImageJustificatif_FileName, ImageJustificatif_FileType, Observation
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                "#,
                params![
                    doc.reference,
                    doc.supplier,
                    doc.sent_date,
                    doc.received_date,
                    doc.receipt_mode,
                    doc.amount,
                    doc.entered_by,
                    doc.compatibility,
                    doc.document_file_name,
                    doc.document_file_type,
                    doc.receipt_file_name,
                    doc.receipt_file_type,
                    doc.observation,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn update_supplier_doc(&self, doc: &SupplierDocument) -> DbResult<bool> {
        doc.validate()?;
        let id = require_id("IDSuivi", doc.id)?;
        let rows_affected = self.write("update_supplier_doc", |conn| {
            Ok(conn.execute(
                r#"
                UPDATE Suivi_doc SET
                    RefDocument = ?2, Fournisseur = ?3, Date_S = ?4, Date_R = ?5,
                    Mode_R = ?6, Montant = ?7, Saisie = ?8, Compatibilite = ?9,
                    ImageDoc_FileName = ?10, ImageDoc_FileType = ?11,
                    ImageJustificatif_FileName = ?12, ImageJustificatif_FileType = ?13,
                    Observation = ?14
                WHERE IDSuivi = ?1
                "#,
                params![
                    id,
                    doc.reference,
                    doc.supplier,
                    doc.sent_date,
                    doc.received_date,
                    doc.receipt_mode,
                    doc.amount,
                    doc.entered_by,
                    doc.compatibility,
                    doc.document_file_name,
                    doc.document_file_type,
                    doc.receipt_file_name,
                    doc.receipt_file_type,
                    doc.observation,
                ],
            )?)
        })?;
        Ok(rows_affected > 0)
    }

    pub fn delete_supplier_doc(&self, id: i64) -> DbResult<bool> {
        let rows_affected = self.write("delete_supplier_doc", |conn| {
            Ok(conn.execute("DELETE FROM Suivi_doc WHERE IDSuivi = ?1", [id])?)
        })?;
        Ok(rows_affected > 0)
    }

    pub fn get_supplier_doc(&self, id: i64) -> DbResult<Option<SupplierDocument>> {
        self.conn
            .query_row(
                &format!("{} WHERE IDSuivi = ?1", SELECT_SUPPLIER_DOC),
                [id],
                supplier_doc_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_supplier_docs(&self) -> DbResult<Vec<SupplierDocument>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY IDSuivi", SELECT_SUPPLIER_DOC))?;
        let rows = stmt.query_map([], supplier_doc_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ========== Procurement ==========

    pub fn insert_procurement(&self, item: &Procurement) -> DbResult<i64> {
        item.validate()?;
        self.write("insert_procurement", |conn| {
            conn.execute(
                r#"
                INSERT INTO Approvisionnement (
                    DateApp, Fournisseur, IFF, Produit, Quantite, PrixUnitaire
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    item.date,
                    item.supplier,
                    item.supplier_tax_id,
                    item.product,
                    item.quantity,
                    item.unit_price,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn update_procurement(&self, item: &Procurement) -> DbResult<bool> {
        item.validate()?;
        let id = require_id("ID_App", item.id)?;
        let rows_affected = self.write("update_procurement", |conn| {
            Ok(conn.execute(
                r#"
                UPDATE Approvisionnement SET
                    DateApp = ?2, Fournisseur = ?3, IFF = ?4, Produit = ?5,
                    Quantite = ?6, PrixUnitaire = ?7
                WHERE ID_App = ?1
                "#,
                params![
                    id,
                    item.date,
                    item.supplier,
                    item.supplier_tax_id,
                    item.product,
                    item.quantity,
                    item.unit_price,
                ],
            )?)
        })?;
        Ok(rows_affected > 0)
    }

    pub fn delete_procurement(&self, id: i64) -> DbResult<bool> {
        let rows_affected = self.write("delete_procurement", |conn| {
            Ok(conn.execute("DELETE FROM Approvisionnement WHERE ID_App = ?1", [id])?)
        })?;
        Ok(rows_affected > 0)
    }

    pub fn get_procurement(&self, id: i64) -> DbResult<Option<Procurement>> {
        self.conn
            .query_row(
                &format!("{} WHERE ID_App = ?1", SELECT_PROCUREMENT),
                [id],
                procurement_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_procurements(&self) -> DbResult<Vec<Procurement>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY DateApp DESC, ID_App DESC", SELECT_PROCUREMENT))?;
        let rows = stmt.query_map([], procurement_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
