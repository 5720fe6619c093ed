//! Medidesk Core Library
//!
//! Local clinic records: patients, appointments, staff accounts,
//! consultations, prescriptions, billing, supplier documents and an
//! append-only audit log, stored in one SQLite file.
//!
//! # Architecture
//!
//! ```text
//!        Desktop shell (UI)
//!               │  typed calls / invoke(command, json)
//!               ▼
//!     ┌───────────────────────┐        ┌──────────────┐
//!     │      ClinicCore       │───────▶│  AssetStore  │  photos, attachments
//!     │  Arc<Mutex<Database>> │        └──────────────┘
//!     └───────────┬───────────┘
//!                 │
//!     ┌───────────▼───────────┐
//!     │  workflow (by CIN)    │  find-or-open today's consultation
//!     └───────────┬───────────┘
//!                 │
//!     ┌───────────▼───────────┐
//!     │  db: one impl block   │  retry on SQLITE_BUSY, IMMEDIATE tx
//!     │  per table            │
//!     └───────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`db`]: SQLite access layer and schema management
//! - [`models`]: Record types and their validation
//! - [`workflow`]: Prescriptions addressed by patient national ID
//! - [`auth`]: Password hashing and login sessions
//! - [`assets`]: On-disk photos and attachments
//! - [`config`]: Paths and tunables
//! - [`logging`]: `tracing` subscriber setup

pub mod assets;
pub mod auth;
mod commands;
pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod workflow;

// Re-export commonly used types
pub use assets::{AssetInfo, AssetStore};
pub use auth::Session;
pub use config::ClinicConfig;
pub use db::{Database, DbError, RetryPolicy};
pub use models::{
    Appointment, AttachmentUpload, AuditEntry, Consultation, Fee, Patient, Payment,
    Prescription, PrescriptionByCin, PrescriptionLink, PrescriptionWithVisit, Procurement,
    Staff, SupplierDocument,
};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::path::Path;
use std::sync::{Arc, Mutex};

/// Suffixes of generated attachment filenames.
const CONSULTATION_SUFFIX: &str = "consultation";
const PAYMENT_SUFFIX: &str = "reglement";
const SUPPLIER_DOC_SUFFIX: &str = "document";
const SUPPLIER_RECEIPT_SUFFIX: &str = "justificatif";

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum ClinicError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<db::DbError> for ClinicError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::Validation(e) => {
                tracing::warn!(error = %e, "Rejected invalid input");
                ClinicError::InvalidInput(e.to_string())
            }
            db::DbError::NotFound(_) | db::DbError::PatientNotFound(_) => {
                tracing::warn!(error = %e, "Record not found");
                ClinicError::NotFound(e.to_string())
            }
            other => {
                tracing::error!(error = %other, "Database operation failed");
                ClinicError::DatabaseError(other.to_string())
            }
        }
    }
}

impl From<serde_json::Error> for ClinicError {
    fn from(e: serde_json::Error) -> Self {
        ClinicError::SerializationError(e.to_string())
    }
}

impl From<std::io::Error> for ClinicError {
    fn from(e: std::io::Error) -> Self {
        ClinicError::Io(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for ClinicError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        ClinicError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open the clinic stored under `root` (`db/clinic.db`, `assets/`), or under
/// the install directory when `root` is `None`.
///
/// Installs the tracing subscriber if the host has not done so already.
#[uniffi::export]
pub fn open_clinic(root: Option<String>) -> Result<Arc<ClinicCore>, ClinicError> {
    logging::init();
    let config = match root {
        Some(root) => ClinicConfig::with_root(root),
        None => ClinicConfig::from_env(),
    };
    ClinicCore::open(&config)
}

/// Install the tracing subscriber. `RUST_LOG` overrides the default filter;
/// later calls are no-ops.
#[uniffi::export]
pub fn init_logging() {
    logging::init();
}

/// In-memory database with attachments under `assets_dir` (for testing).
#[uniffi::export]
pub fn open_clinic_in_memory(assets_dir: String) -> Result<Arc<ClinicCore>, ClinicError> {
    let db = Database::open_in_memory()?;
    Ok(Arc::new(ClinicCore::new(db, AssetStore::new(assets_dir))))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe clinic handle for FFI.
#[derive(uniffi::Object)]
pub struct ClinicCore {
    db: Arc<Mutex<Database>>,
    assets: AssetStore,
}

impl ClinicCore {
    pub fn new(db: Database, assets: AssetStore) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            assets,
        }
    }

    /// Open the database and asset directory described by `config`.
    pub fn open(config: &ClinicConfig) -> Result<Arc<Self>, ClinicError> {
        let db = Database::open_config(config)?;
        tracing::info!(
            db = %config.db_path.display(),
            assets = %config.assets_dir.display(),
            "Clinic opened"
        );
        Ok(Arc::new(Self::new(db, AssetStore::new(&config.assets_dir))))
    }

    pub fn asset_store(&self) -> &AssetStore {
        &self.assets
    }

    /// The session must still belong to an existing account.
    fn check_session(&self, db: &Database, session: &Session) -> Result<(), ClinicError> {
        match db.get_staff(session.staff_id)? {
            Some(staff) if staff.login == session.login => Ok(()),
            _ => Err(ClinicError::Unauthorized(format!(
                "session for {} is no longer valid",
                session.login
            ))),
        }
    }

    /// Write `upload` to disk next to `previous` without removing anything.
    ///
    /// `None` when there is nothing to store or storing failed.
    fn stage_attachment(
        &self,
        upload: Option<&AttachmentUpload>,
        previous: Option<&str>,
        key: &str,
        suffix: &str,
    ) -> Option<StagedAttachment> {
        let upload = upload?;
        let name = self.assets.store_upload(upload, key, suffix)?;
        Some(StagedAttachment {
            name,
            mime: upload.file_type.clone(),
            previous: models::non_blank(previous).map(str::to_string),
        })
    }

    /// Resolve staged files once the row write is known: on success the
    /// replaced files go, otherwise the new ones do.
    fn settle_attachments(&self, staged: &[StagedAttachment], saved: bool) {
        for attachment in staged {
            let stale = if saved {
                attachment.previous.as_deref()
            } else {
                Some(attachment.name.as_str())
            };
            if let Some(stale) = stale.filter(|_| !attachment.overwrote_previous()) {
                self.assets.delete(stale);
            }
        }
    }

    /// Attachment key for a patient: their CIN, else their id.
    fn patient_key(db: &Database, patient_id: i64, cin: Option<&str>) -> Result<String, ClinicError> {
        if let Some(cin) = models::non_blank(cin) {
            return Ok(cin.to_string());
        }
        let cin = db.get_patient(patient_id)?.and_then(|p| p.cin);
        Ok(models::non_blank(cin.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| patient_id.to_string()))
    }

    fn audit(&self, db: &Database, session: &Session, action: String) -> Result<(), ClinicError> {
        db.append_audit(&AuditEntry::new(Some(session.staff_id), action))?;
        Ok(())
    }
}

#[uniffi::export]
impl ClinicCore {
    // =========================================================================
    // Patient Operations
    // =========================================================================

    pub fn list_patients(&self) -> Result<Vec<Patient>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.list_patients()?)
    }

    pub fn get_patient(&self, id: i64) -> Result<Option<Patient>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.get_patient(id)?)
    }

    pub fn get_patient_by_cin(&self, cin: String) -> Result<Option<Patient>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.get_patient_by_cin(&cin)?)
    }

    /// Search patients by name or CIN prefix.
    pub fn search_patients(&self, query: String, limit: u32) -> Result<Vec<Patient>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.search_patients(&query, limit as usize)?)
    }

    pub fn add_patient(&self, patient: Patient) -> Result<i64, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.insert_patient(&patient)?)
    }

    pub fn update_patient(&self, patient: Patient) -> Result<bool, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.update_patient(&patient)?)
    }

    pub fn patients_count(&self) -> Result<i64, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.count_patients()?)
    }

    // =========================================================================
    // Appointment Operations
    // =========================================================================

    pub fn list_appointments_by_date(&self, date: String) -> Result<Vec<Appointment>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.list_appointments_by_date(&date)?)
    }

    pub fn list_appointments_between(
        &self,
        start: String,
        end: String,
    ) -> Result<Vec<Appointment>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.list_appointments_between(&start, &end)?)
    }

    pub fn list_appointments_today(&self) -> Result<Vec<Appointment>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.list_appointments_today()?)
    }

    pub fn get_appointment(&self, id: i64) -> Result<Option<Appointment>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.get_appointment(id)?)
    }

    pub fn add_appointment(&self, appointment: Appointment) -> Result<i64, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.insert_appointment(&appointment)?)
    }

    pub fn update_appointment(&self, appointment: Appointment) -> Result<bool, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.update_appointment(&appointment)?)
    }

    pub fn delete_appointment(&self, id: i64) -> Result<bool, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.delete_appointment(id)?)
    }

    // =========================================================================
    // Staff & Login
    // =========================================================================

    /// Check credentials. `None` on unknown login or wrong password.
    pub fn login(&self, login: String, password: String) -> Result<Option<Session>, ClinicError> {
        let db = self.db.lock()?;
        let staff = db.authenticate(&login, &password)?;
        Ok(staff.and_then(|s| s.id.map(|id| Session::for_staff(id, &s))))
    }

    /// Staff accounts, without the administrator.
    pub fn list_staff(&self) -> Result<Vec<Staff>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.list_staff()?)
    }

    pub fn get_staff(&self, id: i64) -> Result<Option<Staff>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.get_staff(id)?)
    }

    pub fn add_staff(&self, session: Session, staff: Staff) -> Result<i64, ClinicError> {
        let db = self.db.lock()?;
        self.check_session(&db, &session)?;
        let id = db.insert_staff(&staff)?;
        self.audit(&db, &session, format!("Ajout personnel {}", staff.display_name()))?;
        Ok(id)
    }

    pub fn update_staff(&self, session: Session, staff: Staff) -> Result<bool, ClinicError> {
        let db = self.db.lock()?;
        self.check_session(&db, &session)?;
        let updated = db.update_staff(&staff)?;
        if updated {
            let id = staff.id.unwrap_or_default();
            self.audit(&db, &session, format!("Modification personnel ID {}", id))?;
        }
        Ok(updated)
    }

    pub fn delete_staff(&self, session: Session, id: i64) -> Result<bool, ClinicError> {
        let db = self.db.lock()?;
        self.check_session(&db, &session)?;
        let photo = db.get_staff(id)?.and_then(|s| s.photo_file_name);
        let deleted = db.delete_staff(id)?;
        if deleted {
            self.audit(&db, &session, format!("Suppression personnel ID {}", id))?;
            if let Some(photo) = photo.filter(|p| !p.is_empty()) {
                self.assets.delete(&photo);
            }
        }
        Ok(deleted)
    }

    // =========================================================================
    // Consultation Operations
    // =========================================================================

    pub fn list_consultations(&self) -> Result<Vec<Consultation>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.list_consultations()?)
    }

    pub fn get_consultation(&self, id: i64) -> Result<Option<Consultation>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.get_consultation(id)?)
    }

    pub fn list_consultations_for_patient(
        &self,
        patient_id: i64,
    ) -> Result<Vec<Consultation>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.list_consultations_for_patient(patient_id)?)
    }

    pub fn latest_consultation_for_cin(
        &self,
        cin: String,
    ) -> Result<Option<Consultation>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.latest_consultation_for_cin(&cin)?)
    }

    /// Record a consultation; an attachment upload is stored as
    /// `<CIN>-consultation<ext>`.
    pub fn add_consultation(
        &self,
        mut consultation: Consultation,
        upload: Option<AttachmentUpload>,
    ) -> Result<i64, ClinicError> {
        let db = self.db.lock()?;
        consultation.validate().map_err(db::DbError::from)?;
        let mut staged = None;
        if upload.is_some() {
            let key = Self::patient_key(&db, consultation.patient_id, consultation.cin.as_deref())?;
            staged = self.stage_attachment(upload.as_ref(), None, &key, CONSULTATION_SUFFIX);
        }
        if let Some(attachment) = &staged {
            consultation.attachment_name = Some(attachment.name.clone());
            consultation.attachment_type = attachment.mime.clone();
        }
        let inserted = db.insert_consultation(&consultation);
        self.settle_attachments(staged.as_slice(), inserted.is_ok());
        Ok(inserted?)
    }

    /// Update a consultation; a new upload replaces the stored attachment.
    pub fn update_consultation(
        &self,
        mut consultation: Consultation,
        upload: Option<AttachmentUpload>,
    ) -> Result<bool, ClinicError> {
        let db = self.db.lock()?;
        consultation.validate().map_err(db::DbError::from)?;
        let id = models::require_id("IDC", consultation.id).map_err(db::DbError::from)?;
        let mut staged = None;
        if upload.is_some() {
            let previous = db.get_consultation(id)?.and_then(|c| c.attachment_name);
            let key = Self::patient_key(&db, consultation.patient_id, consultation.cin.as_deref())?;
            staged = self.stage_attachment(
                upload.as_ref(),
                previous.as_deref(),
                &key,
                CONSULTATION_SUFFIX,
            );
        }
        if let Some(attachment) = &staged {
            consultation.attachment_name = Some(attachment.name.clone());
            consultation.attachment_type = attachment.mime.clone();
        }
        let updated = db.update_consultation(&consultation);
        self.settle_attachments(staged.as_slice(), matches!(updated, Ok(true)));
        Ok(updated?)
    }

    pub fn delete_consultation(&self, id: i64) -> Result<bool, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.delete_consultation(id)?)
    }

    /// Id of today's consultation for the patient holding `cin`, opened if needed.
    pub fn get_or_create_current_consultation(
        &self,
        cin: String,
        staff_name: String,
    ) -> Result<i64, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.get_or_create_current_consultation(&cin, &staff_name)?)
    }

    // =========================================================================
    // Prescription Operations
    // =========================================================================

    pub fn list_prescriptions(&self) -> Result<Vec<Prescription>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.list_prescriptions()?)
    }

    pub fn get_prescription(&self, id: i64) -> Result<Option<Prescription>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.get_prescription(id)?)
    }

    pub fn add_prescription(&self, prescription: Prescription) -> Result<i64, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.insert_prescription(&prescription)?)
    }

    pub fn update_prescription(&self, prescription: Prescription) -> Result<bool, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.update_prescription(&prescription)?)
    }

    pub fn delete_prescription(&self, id: i64) -> Result<bool, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.delete_prescription(id)?)
    }

    pub fn add_prescription_by_cin(
        &self,
        input: PrescriptionByCin,
    ) -> Result<PrescriptionLink, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.add_prescription_by_cin(&input)?)
    }

    pub fn update_prescription_by_cin(&self, input: PrescriptionByCin) -> Result<bool, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.update_prescription_by_cin(&input)?)
    }

    pub fn list_prescriptions_for_cin(
        &self,
        cin: String,
    ) -> Result<Vec<PrescriptionWithVisit>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.list_prescriptions_for_cin(&cin)?)
    }

    // =========================================================================
    // Billing
    // =========================================================================

    pub fn list_fees(&self) -> Result<Vec<Fee>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.list_fees()?)
    }

    pub fn get_fee(&self, id: i64) -> Result<Option<Fee>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.get_fee(id)?)
    }

    pub fn add_fee(&self, fee: Fee) -> Result<i64, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.insert_fee(&fee)?)
    }

    pub fn update_fee(&self, fee: Fee) -> Result<bool, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.update_fee(&fee)?)
    }

    pub fn delete_fee(&self, id: i64) -> Result<bool, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.delete_fee(id)?)
    }

    /// Sum of all fees.
    pub fn income(&self) -> Result<f64, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.total_income()?)
    }

    pub fn list_payments(&self) -> Result<Vec<Payment>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.list_payments()?)
    }

    pub fn list_payments_for_patient(&self, patient_id: i64) -> Result<Vec<Payment>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.list_payments_for_patient(patient_id)?)
    }

    pub fn get_payment(&self, id: i64) -> Result<Option<Payment>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.get_payment(id)?)
    }

    pub fn add_payment(
        &self,
        mut payment: Payment,
        upload: Option<AttachmentUpload>,
    ) -> Result<i64, ClinicError> {
        let db = self.db.lock()?;
        payment.validate().map_err(db::DbError::from)?;
        let mut staged = None;
        if upload.is_some() {
            let key = Self::patient_key(&db, payment.patient_id, None)?;
            staged = self.stage_attachment(upload.as_ref(), None, &key, PAYMENT_SUFFIX);
        }
        if let Some(attachment) = &staged {
            payment.attachment_name = Some(attachment.name.clone());
            payment.attachment_type = attachment.mime.clone();
        }
        let inserted = db.insert_payment(&payment);
        self.settle_attachments(staged.as_slice(), inserted.is_ok());
        Ok(inserted?)
    }

    pub fn update_payment(
        &self,
        mut payment: Payment,
        upload: Option<AttachmentUpload>,
    ) -> Result<bool, ClinicError> {
        let db = self.db.lock()?;
        payment.validate().map_err(db::DbError::from)?;
        let id = models::require_id("IDR", payment.id).map_err(db::DbError::from)?;
        let mut staged = None;
        if upload.is_some() {
            let previous = db.get_payment(id)?.and_then(|p| p.attachment_name);
            let key = Self::patient_key(&db, payment.patient_id, None)?;
            staged = self.stage_attachment(upload.as_ref(), previous.as_deref(), &key, PAYMENT_SUFFIX);
        }
        if let Some(attachment) = &staged {
            payment.attachment_name = Some(attachment.name.clone());
            payment.attachment_type = attachment.mime.clone();
        }
        let updated = db.update_payment(&payment);
        self.settle_attachments(staged.as_slice(), matches!(updated, Ok(true)));
        Ok(updated?)
    }

    pub fn delete_payment(&self, id: i64) -> Result<bool, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.delete_payment(id)?)
    }

    // =========================================================================
    // Audit Log
    // =========================================================================

    /// Append an entry to the audit log.
    pub fn log_operation(&self, entry: AuditEntry) -> Result<i64, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.append_audit(&entry)?)
    }

    pub fn list_audit(&self, limit: u32) -> Result<Vec<AuditEntry>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.list_audit(limit as usize)?)
    }

    pub fn list_audit_for_staff(&self, staff_id: i64) -> Result<Vec<AuditEntry>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.list_audit_for_staff(staff_id)?)
    }

    // =========================================================================
    // Supplier Documents & Procurement
    // =========================================================================

    pub fn list_supplier_docs(&self) -> Result<Vec<SupplierDocument>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.list_supplier_docs()?)
    }

    pub fn get_supplier_doc(&self, id: i64) -> Result<Option<SupplierDocument>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.get_supplier_doc(id)?)
    }

    /// Record a supplier document with optional scans of the document and
    /// of its receipt.
    pub fn add_supplier_doc(
        &self,
        doc: SupplierDocument,
        document: Option<AttachmentUpload>,
        receipt: Option<AttachmentUpload>,
    ) -> Result<i64, ClinicError> {
        let db = self.db.lock()?;
        doc.validate().map_err(db::DbError::from)?;
        let (doc, staged) = self.attach_supplier_files(doc, None, document, receipt);
        let inserted = db.insert_supplier_doc(&doc);
        self.settle_attachments(&staged, inserted.is_ok());
        Ok(inserted?)
    }

    pub fn update_supplier_doc(
        &self,
        doc: SupplierDocument,
        document: Option<AttachmentUpload>,
        receipt: Option<AttachmentUpload>,
    ) -> Result<bool, ClinicError> {
        let db = self.db.lock()?;
        doc.validate().map_err(db::DbError::from)?;
        let id = models::require_id("IDSuivi", doc.id).map_err(db::DbError::from)?;
        let previous = if document.is_some() || receipt.is_some() {
            db.get_supplier_doc(id)?
        } else {
            None
        };
        let (doc, staged) = self.attach_supplier_files(doc, previous.as_ref(), document, receipt);
        let updated = db.update_supplier_doc(&doc);
        self.settle_attachments(&staged, matches!(updated, Ok(true)));
        Ok(updated?)
    }

    pub fn delete_supplier_doc(&self, id: i64) -> Result<bool, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.delete_supplier_doc(id)?)
    }

    pub fn list_procurements(&self) -> Result<Vec<Procurement>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.list_procurements()?)
    }

    pub fn get_procurement(&self, id: i64) -> Result<Option<Procurement>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.get_procurement(id)?)
    }

    pub fn add_procurement(&self, item: Procurement) -> Result<i64, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.insert_procurement(&item)?)
    }

    pub fn update_procurement(&self, item: Procurement) -> Result<bool, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.update_procurement(&item)?)
    }

    pub fn delete_procurement(&self, id: i64) -> Result<bool, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.delete_procurement(id)?)
    }

    // =========================================================================
    // Assets
    // =========================================================================

    /// Copy a picture into the asset directory as `<CIN><ext>`.
    pub fn save_photo(&self, source_path: String, cin: String) -> Option<String> {
        self.assets.save_photo(Path::new(&source_path), &cin)
    }

    pub fn delete_asset(&self, file_name: String) -> bool {
        self.assets.delete(&file_name)
    }

    pub fn describe_asset(&self, file_name: String) -> AssetInfo {
        self.assets.describe(&file_name)
    }

    // =========================================================================
    // Diagnostics & Dispatch
    // =========================================================================

    /// Tables present in the database file.
    pub fn schema_status(&self) -> Result<Vec<String>, ClinicError> {
        let db = self.db.lock()?;
        Ok(db.schema_status()?)
    }

    /// Run a named operation with a JSON payload, returning JSON.
    pub fn invoke(&self, command: String, payload_json: String) -> Result<String, ClinicError> {
        let payload = if payload_json.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&payload_json)
                .map_err(|e| ClinicError::InvalidInput(format!("malformed payload: {}", e)))?
        };
        let result = commands::dispatch(self, &command, payload)?;
        Ok(serde_json::to_string(&result)?)
    }
}

impl ClinicCore {
    fn attach_supplier_files(
        &self,
        mut doc: SupplierDocument,
        previous: Option<&SupplierDocument>,
        document: Option<AttachmentUpload>,
        receipt: Option<AttachmentUpload>,
    ) -> (SupplierDocument, Vec<StagedAttachment>) {
        let key = doc.reference.clone();
        let mut staged = Vec::new();
        if let Some(attachment) = self.stage_attachment(
            document.as_ref(),
            previous.and_then(|p| p.document_file_name.as_deref()),
            &key,
            SUPPLIER_DOC_SUFFIX,
        ) {
            doc.document_file_name = Some(attachment.name.clone());
            doc.document_file_type = attachment.mime.clone();
            staged.push(attachment);
        }
        if let Some(attachment) = self.stage_attachment(
            receipt.as_ref(),
            previous.and_then(|p| p.receipt_file_name.as_deref()),
            &key,
            SUPPLIER_RECEIPT_SUFFIX,
        ) {
            doc.receipt_file_name = Some(attachment.name.clone());
            doc.receipt_file_type = attachment.mime.clone();
            staged.push(attachment);
        }
        (doc, staged)
    }
}

/// An upload written to disk whose row has not been saved yet.
struct StagedAttachment {
    name: String,
    mime: Option<String>,
    /// File the row referenced before this upload
    previous: Option<String>,
}

impl StagedAttachment {
    /// The upload landed on the previous file's name, so there is nothing
    /// separate to keep or remove.
    fn overwrote_previous(&self) -> bool {
        self.previous.as_deref() == Some(self.name.as_str())
    }
}
