//! Staff account database operations.

use rusqlite::{params, ErrorCode, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::auth::{self, Verification};
use crate::models::{non_blank, require_id, Staff, ADMIN_LOGIN};

const SELECT_STAFF: &str = r#"
    SELECT ID, Mie, Nom, Prenom, Tel, Mail, Adresse, Photo_FileName, Photo_FileType,
           Type, Specialite, Login, DateEntree, Droit, CIN, NbreEntree
    FROM Personnel
"#;

fn staff_from_row(row: &Row<'_>) -> rusqlite::Result<Staff> {
    Ok(Staff {
        id: row.get(0)?,
        title: row.get(1)?,
        last_name: row.get(2)?,
        first_name: row.get(3)?,
        phone: row.get(4)?,
        email: row.get(5)?,
        address: row.get(6)?,
        photo_file_name: row.get(7)?,
        photo_file_type: row.get(8)?,
        role: row.get(9)?,
        specialty: row.get(10)?,
        login: row.get::<_, Option<String>>(11)?.unwrap_or_default(),
        password: None,
        entry_date: row.get(12)?,
        permission: row.get(13)?,
        cin: row.get(14)?,
        login_count: row.get::<_, Option<i64>>(15)?.unwrap_or(0),
    })
}

/// Turn a UNIQUE(Login) violation into a readable constraint error.
fn map_duplicate_login(e: DbError, login: &str) -> DbError {
    match &e {
        DbError::Sqlite(inner) if inner.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) => {
            DbError::Constraint(format!("login {:?} already exists", login))
        }
        _ => e,
    }
}

impl Database {
    /// Create a staff account. The password is stored hashed.
    pub fn insert_staff(&self, staff: &Staff) -> DbResult<i64> {
        staff.validate_new()?;
        let password = staff.password.as_deref().unwrap_or_default();
        let hash = auth::hash_password(password, self.password_iterations());
        let entry_date = non_blank(staff.entry_date.as_deref())
            .map(str::to_string)
            .unwrap_or_else(super::today);

        self.write("insert_staff", |conn| {
            conn.execute(
                r#"
                INSERT INTO Personnel (
                    Mie, Nom, Prenom, Tel, Mail, Adresse, Type, Specialite,
                    Login, MotPasse, DateEntree, Droit, CIN,
                    Photo_FileName, Photo_FileType, NbreEntree
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, 0)
                "#,
                params![
                    staff.title,
                    staff.last_name,
                    staff.first_name,
                    staff.phone,
                    staff.email,
                    staff.address,
                    staff.role,
                    staff.specialty,
                    staff.login,
                    hash,
                    entry_date,
                    staff.permission,
                    staff.cin,
                    staff.photo_file_name,
                    staff.photo_file_type,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .map_err(|e| map_duplicate_login(e, &staff.login))
    }

    /// Update a staff account. The login is immutable; the password is only
    /// replaced when a non-blank one is supplied.
    pub fn update_staff(&self, staff: &Staff) -> DbResult<bool> {
        let id = require_id("ID", staff.id)?;
        let new_hash = non_blank(staff.password.as_deref())
            .map(|pw| auth::hash_password(pw, self.password_iterations()));

        let rows_affected = self.write("update_staff", |conn| {
            Ok(conn.execute(
                r#"
                UPDATE Personnel SET
                    Mie = ?2, Nom = ?3, Prenom = ?4, Tel = ?5, Mail = ?6, Adresse = ?7,
                    Type = ?8, Specialite = ?9, Droit = ?10, CIN = ?11,
                    Photo_FileName = ?12, Photo_FileType = ?13,
                    MotPasse = COALESCE(?14, MotPasse)
                WHERE ID = ?1
                "#,
                params![
                    id,
                    staff.title,
                    staff.last_name,
                    staff.first_name,
                    staff.phone,
                    staff.email,
                    staff.address,
                    staff.role,
                    staff.specialty,
                    staff.permission,
                    staff.cin,
                    staff.photo_file_name,
                    staff.photo_file_type,
                    new_hash,
                ],
            )?)
        })?;
        Ok(rows_affected > 0)
    }

    /// Delete a staff account. The seed administrator cannot be deleted.
    pub fn delete_staff(&self, id: i64) -> DbResult<bool> {
        if let Some(staff) = self.get_staff(id)? {
            if staff.is_admin() {
                return Err(DbError::Constraint(
                    "the administrator account cannot be deleted".into(),
                ));
            }
        }
        // Audit rows outlive the account; older schemas have no ON DELETE action.
        let rows_affected = self.write_tx("delete_staff", |conn| {
            conn.execute("UPDATE HistoriqueDate SET Mat = NULL WHERE Mat = ?1", [id])?;
            Ok(conn.execute("DELETE FROM Personnel WHERE ID = ?1", [id])?)
        })?;
        Ok(rows_affected > 0)
    }

    /// Get a staff account by id (including the administrator).
    pub fn get_staff(&self, id: i64) -> DbResult<Option<Staff>> {
        self.conn
            .query_row(
                &format!("{} WHERE ID = ?1", SELECT_STAFF),
                [id],
                staff_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get a staff account by login.
    pub fn get_staff_by_login(&self, login: &str) -> DbResult<Option<Staff>> {
        self.conn
            .query_row(
                &format!("{} WHERE Login = ?1", SELECT_STAFF),
                [login],
                staff_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// All staff except the seed administrator, by id.
    pub fn list_staff(&self) -> DbResult<Vec<Staff>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE Login IS NULL OR Login != ?1 ORDER BY ID",
            SELECT_STAFF
        ))?;
        let rows = stmt.query_map([ADMIN_LOGIN], staff_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Check credentials. On success the login counter is incremented and
    /// legacy plain-text passwords are replaced by a hash.
    pub fn authenticate(&self, login: &str, password: &str) -> DbResult<Option<Staff>> {
        let stored: Option<(i64, Option<String>)> = self
            .conn
            .query_row(
                "SELECT ID, MotPasse FROM Personnel WHERE Login = ?1",
                [login],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let (id, stored) = match stored {
            Some((id, Some(stored))) => (id, stored),
            _ => {
                tracing::info!(login, "Login failed: unknown account");
                return Ok(None);
            }
        };

        match auth::verify_password(password, &stored)? {
            Verification::Invalid => {
                tracing::info!(login, "Login failed: wrong password");
                return Ok(None);
            }
            Verification::ValidLegacy => {
                let hash = auth::hash_password(password, self.password_iterations());
                self.write("rehash_password", |conn| {
                    Ok(conn.execute(
                        "UPDATE Personnel SET MotPasse = ?2 WHERE ID = ?1",
                        params![id, hash],
                    )?)
                })?;
                tracing::info!(login, "Upgraded plain-text password to hash");
            }
            Verification::Valid => {}
        }

        self.record_login(id)?;
        tracing::info!(login, staff_id = id, "Login succeeded");
        self.get_staff(id)
    }

    /// Increment the login counter.
    pub fn record_login(&self, id: i64) -> DbResult<bool> {
        let rows_affected = self.write("record_login", |conn| {
            Ok(conn.execute(
                "UPDATE Personnel SET NbreEntree = COALESCE(NbreEntree, 0) + 1 WHERE ID = ?1",
                [id],
            )?)
        })?;
        Ok(rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doctor(login: &str) -> Staff {
        let mut staff = Staff::new(login, "pw123");
        staff.title = Some("Dr.".into());
        staff.last_name = Some("Haddad".into());
        staff.first_name = Some("Leila".into());
        staff.role = Some("doctor".into());
        staff
    }

    #[test]
    fn test_insert_and_list_excludes_admin() {
        let db = Database::open_in_memory().unwrap();
        let id = db.insert_staff(&doctor("leila")).unwrap();

        let staff = db.list_staff().unwrap();
        assert_eq!(staff.len(), 1);
        assert_eq!(staff[0].id, Some(id));
        assert_eq!(staff[0].login, "leila");
        assert!(staff[0].password.is_none());

        assert!(db.get_staff_by_login("admin").unwrap().is_some());
    }

    #[test]
    fn test_password_stored_hashed() {
        let db = Database::open_in_memory().unwrap();
        let id = db.insert_staff(&doctor("leila")).unwrap();
        let stored: String = db
            .conn()
            .query_row("SELECT MotPasse FROM Personnel WHERE ID = ?1", [id], |row| {
                row.get(0)
            })
            .unwrap();
        assert!(auth::is_hashed(&stored));
        assert!(!stored.contains("pw123"));
    }

    #[test]
    fn test_duplicate_login_rejected() {
        let db = Database::open_in_memory().unwrap();
        let id = db.insert_staff(&doctor("leila")).unwrap();

        let mut other = doctor("leila");
        other.last_name = Some("Other".into());
        let err = db.insert_staff(&other).unwrap_err();
        assert!(matches!(err, DbError::Constraint(_)), "{:?}", err);

        let kept = db.get_staff(id).unwrap().unwrap();
        assert_eq!(kept.last_name.as_deref(), Some("Haddad"));
        assert_eq!(db.list_staff().unwrap().len(), 1);
    }

    #[test]
    fn test_authenticate() {
        let db = Database::open_in_memory().unwrap();
        db.insert_staff(&doctor("leila")).unwrap();

        assert!(db.authenticate("leila", "wrong").unwrap().is_none());
        assert!(db.authenticate("nobody", "pw123").unwrap().is_none());

        let staff = db.authenticate("leila", "pw123").unwrap().unwrap();
        assert_eq!(staff.login_count, 1);
        let again = db.authenticate("leila", "pw123").unwrap().unwrap();
        assert_eq!(again.login_count, 2);
    }

    #[test]
    fn test_legacy_password_upgraded() {
        let db = Database::open_in_memory().unwrap();
        db.conn()
            .execute(
                "INSERT INTO Personnel (Login, MotPasse) VALUES ('old', 'plain')",
                [],
            )
            .unwrap();

        assert!(db.authenticate("old", "plain").unwrap().is_some());
        let stored: String = db
            .conn()
            .query_row("SELECT MotPasse FROM Personnel WHERE Login = 'old'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert!(auth::is_hashed(&stored));
        assert!(db.authenticate("old", "plain").unwrap().is_some());
    }

    #[test]
    fn test_update_keeps_password_unless_given() {
        let db = Database::open_in_memory().unwrap();
        let id = db.insert_staff(&doctor("leila")).unwrap();

        let mut staff = db.get_staff(id).unwrap().unwrap();
        staff.specialty = Some("Cardiology".into());
        assert!(db.update_staff(&staff).unwrap());
        assert!(db.authenticate("leila", "pw123").unwrap().is_some());

        staff.password = Some("new-pw".into());
        db.update_staff(&staff).unwrap();
        assert!(db.authenticate("leila", "pw123").unwrap().is_none());
        let updated = db.authenticate("leila", "new-pw").unwrap().unwrap();
        assert_eq!(updated.specialty.as_deref(), Some("Cardiology"));
    }

    #[test]
    fn test_delete_staff() {
        let db = Database::open_in_memory().unwrap();
        let id = db.insert_staff(&doctor("leila")).unwrap();
        assert!(db.delete_staff(id).unwrap());
        assert!(db.get_staff(id).unwrap().is_none());

        let admin = db.get_staff_by_login("admin").unwrap().unwrap();
        assert!(db.delete_staff(admin.id.unwrap()).is_err());
    }
}
