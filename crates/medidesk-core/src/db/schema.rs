//! SQLite schema definition and startup schema management.
//!
//! Table and column names match the clinic database as deployed so existing
//! files open unchanged. Each table is created independently: a failure is
//! logged and the remaining tables are still created.

use rusqlite::{params, Connection, OptionalExtension};

use super::DbResult;
use crate::auth;
use crate::models::ADMIN_LOGIN;

/// Every table, in creation order (referenced tables first).
pub const TABLES: &[(&str, &str)] = &[
    (
        "Patients",
        r#"
        CREATE TABLE IF NOT EXISTS Patients (
            IDP INTEGER PRIMARY KEY AUTOINCREMENT,
            Nom TEXT, Prenom TEXT, CIN TEXT, DateNaissance TEXT,
            Tel TEXT, Email TEXT, Adresse TEXT, Ville TEXT,
            Allergies TEXT, Remarques TEXT
        )
        "#,
    ),
    (
        "RendezVous",
        r#"
        CREATE TABLE IF NOT EXISTS RendezVous (
            IDRv INTEGER PRIMARY KEY AUTOINCREMENT,
            IDP INTEGER REFERENCES Patients(IDP) ON DELETE SET NULL,
            DateRv TEXT, HeureRv TEXT, Statut TEXT,
            TypePatient TEXT, NomPrenom TEXT, Email TEXT, CIN TEXT
        )
        "#,
    ),
    (
        "Personnel",
        r#"
        CREATE TABLE IF NOT EXISTS Personnel (
            ID INTEGER PRIMARY KEY AUTOINCREMENT,
            Mie TEXT, Nom TEXT, Prenom TEXT, Tel TEXT, Mail TEXT, Adresse TEXT,
            Photo_FileName TEXT, Photo_FileType TEXT,
            Type TEXT, Specialite TEXT,
            Login TEXT UNIQUE, MotPasse TEXT,
            DateEntree TEXT, Droit TEXT, CIN TEXT,
            NbreEntree INTEGER NOT NULL DEFAULT 0
        )
        "#,
    ),
    (
        "Consultation",
        r#"
        CREATE TABLE IF NOT EXISTS Consultation (
            IDC INTEGER PRIMARY KEY AUTOINCREMENT,
            IDP INTEGER REFERENCES Patients(IDP),
            CIN TEXT, Motif TEXT, Diagnostic TEXT,
            Observations TEXT, Remarques TEXT, NomMedecin TEXT,
            "PiècesJointes_FileName" TEXT, "PiècesJointes_FileType" TEXT,
            ConsultationID TEXT UNIQUE,
            DateCreation DATETIME DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    ),
    (
        "Ordonnance",
        r#"
        CREATE TABLE IF NOT EXISTS Ordonnance (
            IDR INTEGER PRIMARY KEY AUTOINCREMENT,
            IDC INTEGER REFERENCES Consultation(IDC) ON DELETE CASCADE,
            IDP INTEGER REFERENCES Patients(IDP),
            Medicament1 TEXT, Posologie1 TEXT, Duree1 TEXT,
            Medicament2 TEXT, Posologie2 TEXT, Duree2 TEXT,
            Medicament3 TEXT, Posologie3 TEXT, Duree3 TEXT,
            Remarques TEXT
        )
        "#,
    ),
    (
        "Honoraire",
        r#"
        CREATE TABLE IF NOT EXISTS Honoraire (
            IDH INTEGER PRIMARY KEY AUTOINCREMENT,
            IDC INTEGER REFERENCES Consultation(IDC) ON DELETE SET NULL,
            IDP INTEGER REFERENCES Patients(IDP),
            Montant REAL, TypePrestation TEXT
        )
        "#,
    ),
    (
        "Reglement",
        r#"
        CREATE TABLE IF NOT EXISTS Reglement (
            IDR INTEGER PRIMARY KEY AUTOINCREMENT,
            IDP INTEGER REFERENCES Patients(IDP),
            DateReglement TEXT, Montant REAL,
            Tel TEXT, Email TEXT, Adresse TEXT, ModePaiement TEXT,
            Solde REAL, Ville TEXT, CodePostal TEXT, Statut TEXT,
            Remarques TEXT, NomMedecin TEXT, Allergies TEXT,
            "PiècesJointes_FileName" TEXT, "PiècesJointes_FileType" TEXT
        )
        "#,
    ),
    (
        "HistoriqueDate",
        r#"
        CREATE TABLE IF NOT EXISTS HistoriqueDate (
            IDDate INTEGER PRIMARY KEY AUTOINCREMENT,
            Date_E TEXT,
            Mat INTEGER REFERENCES Personnel(ID) ON DELETE SET NULL,
            Action TEXT
        )
        "#,
    ),
    (
        "Suivi_doc",
        r#"
        CREATE TABLE IF NOT EXISTS Suivi_doc (
            IDSuivi INTEGER PRIMARY KEY AUTOINCREMENT,
            RefDocument TEXT, Fournisseur TEXT, Date_S TEXT, Date_R TEXT,
            Mode_R TEXT, Montant REAL, Saisie TEXT, Compatibilite TEXT,
            ImageDoc_FileName TEXT, ImageDoc_FileType TEXT,
            ImageJustificatif_FileName TEXT, ImageJustificatif_FileType TEXT,
            Observation TEXT
        )
        "#,
    ),
    (
        "Approvisionnement",
        r#"
        CREATE TABLE IF NOT EXISTS Approvisionnement (
            ID_App INTEGER PRIMARY KEY AUTOINCREMENT,
            DateApp TEXT, Fournisseur TEXT, IFF TEXT, Produit TEXT,
            Quantite INTEGER, PrixUnitaire REAL
        )
        "#,
    ),
];

/// Lookup indexes. Created after the tables; failures are logged only.
pub const INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_patients_cin ON Patients(CIN);
CREATE INDEX IF NOT EXISTS idx_rendezvous_date ON RendezVous(DateRv, HeureRv);
CREATE INDEX IF NOT EXISTS idx_consultation_patient ON Consultation(IDP, DateCreation);
CREATE INDEX IF NOT EXISTS idx_ordonnance_patient ON Ordonnance(IDP);
CREATE INDEX IF NOT EXISTS idx_historique_mat ON HistoriqueDate(Mat);
"#;

/// What startup schema management did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaReport {
    /// Tables whose creation statement failed
    pub failed_tables: Vec<String>,
    /// `HistoriqueDate.Action` was missing and has been added
    pub action_column_added: bool,
    /// The seed administrator was inserted
    pub admin_seeded: bool,
}

impl SchemaReport {
    pub fn is_complete(&self) -> bool {
        self.failed_tables.is_empty()
    }
}

/// Create missing tables, apply the additive migration, seed the admin.
///
/// Never fails: every error is logged and reflected in the report, and later
/// operations on a missing table fail on their own.
pub fn initialize_schema(
    conn: &Connection,
    admin_password: &str,
    password_iterations: u32,
) -> SchemaReport {
    let mut report = SchemaReport::default();

    for (table, ddl) in TABLES {
        if let Err(e) = conn.execute_batch(ddl) {
            tracing::error!(table, error = %e, "Failed to create table");
            report.failed_tables.push((*table).to_string());
        }
    }

    if let Err(e) = conn.execute_batch(INDEXES) {
        tracing::error!(error = %e, "Failed to create indexes");
    }

    match ensure_audit_action_column(conn) {
        Ok(added) => report.action_column_added = added,
        Err(e) => tracing::error!(error = %e, "Failed to migrate HistoriqueDate"),
    }

    match seed_admin(conn, admin_password, password_iterations) {
        Ok(seeded) => report.admin_seeded = seeded,
        Err(e) => tracing::error!(error = %e, "Failed to seed admin account"),
    }

    if report.is_complete() {
        tracing::debug!(
            action_column_added = report.action_column_added,
            admin_seeded = report.admin_seeded,
            "Schema ready"
        );
    }
    report
}

/// Column names of `table`, in declaration order.
pub fn table_columns(conn: &Connection, table: &str) -> DbResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
    let rows = stmt.query_map([table], |row| row.get(0))?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

/// Add `HistoriqueDate.Action` to databases created before it existed.
pub fn ensure_audit_action_column(conn: &Connection) -> DbResult<bool> {
    let columns = table_columns(conn, "HistoriqueDate")?;
    if columns.iter().any(|c| c == "Action") {
        return Ok(false);
    }
    conn.execute_batch("ALTER TABLE HistoriqueDate ADD COLUMN Action TEXT")?;
    tracing::info!("Added column Action to HistoriqueDate");
    Ok(true)
}

/// Insert the administrator account if no row has its login.
pub fn seed_admin(conn: &Connection, password: &str, iterations: u32) -> DbResult<bool> {
    let exists = conn
        .query_row(
            "SELECT 1 FROM Personnel WHERE Login = ?1",
            [ADMIN_LOGIN],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if exists {
        return Ok(false);
    }

    let today = chrono::Utc::now().date_naive().to_string();
    conn.execute(
        r#"
        INSERT INTO Personnel (
            Mie, Nom, Prenom, Tel, Mail, Adresse,
            Type, Specialite, Login, MotPasse, DateEntree, Droit, CIN, NbreEntree
        ) VALUES ('M.', 'Admin', '', '', '', '', 'Admin', 'General', ?1, ?2, ?3, 'admin', '', 0)
        "#,
        params![ADMIN_LOGIN, auth::hash_password(password, iterations), today],
    )?;
    tracing::info!("Default admin user created");
    Ok(true)
}

/// Names of the application tables present in the database.
pub fn existing_tables(conn: &Connection) -> DbResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}
