//! Append-only audit log (`HistoriqueDate`).

use rusqlite::{params, Row};

use super::{Database, DbResult};
use crate::models::{non_blank, AuditEntry};

const SELECT_AUDIT: &str = "SELECT IDDate, Date_E, Mat, Action FROM HistoriqueDate";

fn audit_from_row(row: &Row<'_>) -> rusqlite::Result<AuditEntry> {
    Ok(AuditEntry {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        staff_id: row.get(2)?,
        action: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
    })
}

impl Database {
    /// Append an audit entry. A missing timestamp is set to now (RFC 3339, UTC).
    pub fn append_audit(&self, entry: &AuditEntry) -> DbResult<i64> {
        entry.validate()?;
        let timestamp = non_blank(entry.timestamp.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| chrono::Utc::now().to_rfc3339());

        let id = self.write("append_audit", |conn| {
            conn.execute(
                "INSERT INTO HistoriqueDate (Date_E, Mat, Action) VALUES (?1, ?2, ?3)",
                params![timestamp, entry.staff_id, entry.action],
            )?;
            Ok(conn.last_insert_rowid())
        })?;
        tracing::debug!(id, staff_id = ?entry.staff_id, action = %entry.action, "Audit entry");
        Ok(id)
    }

    /// Most recent entries first.
    pub fn list_audit(&self, limit: usize) -> DbResult<Vec<AuditEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} ORDER BY IDDate DESC LIMIT ?1",
            SELECT_AUDIT
        ))?;
        let rows = stmt.query_map([limit as i64], audit_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Entries recorded for one staff member, most recent first.
    pub fn list_audit_for_staff(&self, staff_id: i64) -> DbResult<Vec<AuditEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE Mat = ?1 ORDER BY IDDate DESC",
            SELECT_AUDIT
        ))?;
        let rows = stmt.query_map([staff_id], audit_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
