//! Database layer for medidesk.

mod appointments;
mod audit;
mod billing;
pub(crate) mod consultations;
pub(crate) mod patients;
pub(crate) mod prescriptions;
mod retry;
mod schema;
mod staff;
mod supplier;

pub use retry::*;
pub use schema::*;

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, TransactionBehavior};
use thiserror::Error;

use crate::auth::PasswordError;
use crate::config::{ClinicConfig, DEFAULT_ADMIN_PASSWORD, DEFAULT_BUSY_TIMEOUT_MS};
use crate::models::ValidationError;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Patient with CIN {0} not found")]
    PatientNotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Password error: {0}")]
    Password(#[from] PasswordError),
}

pub type DbResult<T> = Result<T, DbError>;

/// Connection settings applied at open.
#[derive(Debug, Clone)]
pub struct DbOptions {
    pub busy_timeout: Duration,
    pub retry: RetryPolicy,
    pub password_iterations: u32,
    pub seed_admin_password: String,
}

impl Default for DbOptions {
    fn default() -> Self {
        Self::from(&ClinicConfig::with_root("."))
    }
}

impl From<&ClinicConfig> for DbOptions {
    fn from(config: &ClinicConfig) -> Self {
        Self {
            busy_timeout: Duration::from_millis(config.busy_timeout_ms),
            retry: config.retry,
            password_iterations: config.password_iterations,
            seed_admin_password: config.seed_admin_password.clone(),
        }
    }
}

impl DbOptions {
    /// Cheap password hashing, for tests and scratch databases.
    pub fn for_testing() -> Self {
        Self {
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            retry: RetryPolicy::default(),
            password_iterations: 1_000,
            seed_admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
        }
    }
}

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
    retry: RetryPolicy,
    password_iterations: u32,
    schema: SchemaReport,
}

impl Database {
    /// Open database at path with default options, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Self::open_with(path, DbOptions::default())
    }

    /// Open database at path.
    pub fn open_with<P: AsRef<Path>>(path: P, options: DbOptions) -> DbResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        tracing::debug!(path = %path.as_ref().display(), journal_mode = %mode, "Opened database");
        Self::initialize(conn, options)
    }

    /// Open the database described by a [`ClinicConfig`], creating its directories.
    pub fn open_config(config: &ClinicConfig) -> DbResult<Self> {
        config.ensure_dirs().map_err(|e| {
            DbError::Constraint(format!(
                "cannot create {}: {}",
                config.db_path.display(),
                e
            ))
        })?;
        Self::open_with(&config.db_path, DbOptions::from(config))
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(conn, DbOptions::for_testing())
    }

    /// Configure pragmas and run startup schema management.
    fn initialize(conn: Connection, options: DbOptions) -> DbResult<Self> {
        conn.busy_timeout(options.busy_timeout)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let schema = initialize_schema(
            &conn,
            &options.seed_admin_password,
            options.password_iterations,
        );
        Ok(Self {
            conn,
            retry: options.retry,
            password_iterations: options.password_iterations,
            schema,
        })
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Result of startup schema management.
    pub fn schema_report(&self) -> &SchemaReport {
        &self.schema
    }

    /// Tables currently present in the database file.
    pub fn schema_status(&self) -> DbResult<Vec<String>> {
        existing_tables(&self.conn)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub(crate) fn password_iterations(&self) -> u32 {
        self.password_iterations
    }

    /// Begin a transaction.
    pub fn transaction(&mut self) -> DbResult<rusqlite::Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }

    /// Run a write under the retry policy.
    pub(crate) fn write<T, F>(&self, op: &str, mut f: F) -> DbResult<T>
    where
        F: FnMut(&Connection) -> DbResult<T>,
    {
        self.retry.run(op, || f(&self.conn))
    }

    /// Run a multi-statement write inside `BEGIN IMMEDIATE`, under the retry policy.
    ///
    /// The write lock is taken up front, so a concurrent writer waits (or gets
    /// SQLITE_BUSY and is retried) instead of interleaving with `f`.
    pub(crate) fn write_tx<T, F>(&self, op: &str, mut f: F) -> DbResult<T>
    where
        F: FnMut(&Connection) -> DbResult<T>,
    {
        self.retry.run(op, || {
            let tx = rusqlite::Transaction::new_unchecked(
                &self.conn,
                TransactionBehavior::Immediate,
            )?;
            let value = f(&tx)?;
            tx.commit()?;
            Ok(value)
        })
    }
}

/// Today's date (UTC) as stored in date columns.
pub(crate) fn today() -> String {
    chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_schema_initialized() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.schema_report().is_complete());

        let tables = existing_tables(db.conn()).unwrap();
        assert!(tables.contains(&"Patients".to_string()));
        assert!(tables.contains(&"RendezVous".to_string()));
        assert!(tables.contains(&"Consultation".to_string()));
        assert!(tables.contains(&"Ordonnance".to_string()));
        assert!(tables.contains(&"HistoriqueDate".to_string()));
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let db = Database::open_in_memory().unwrap();
        let fk: i64 = db
            .conn()
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn test_write_tx_rolls_back_on_error() {
        let db = Database::open_in_memory().unwrap();
        let result: DbResult<()> = db.write_tx("test", |conn| {
            conn.execute("INSERT INTO Patients (Nom, Prenom) VALUES ('A', 'B')", [])?;
            Err(DbError::NotFound("abort".into()))
        });
        assert!(result.is_err());
        assert_eq!(db.count_patients().unwrap(), 0);
    }

    #[test]
    fn test_file_database_uses_wal() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_with(dir.path().join("clinic.db"), DbOptions::for_testing())
            .unwrap();
        let mode: String = db
            .conn()
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }
}
