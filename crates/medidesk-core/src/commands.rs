//! Named-command dispatcher behind [`ClinicCore::invoke`].
//!
//! Command names and payload shapes are the ones the desktop shell already
//! sends (`add-patient`, `add-ordonnance-by-cin`, ...). Payloads are decoded
//! into typed records before any database access; a decode failure is
//! `InvalidInput`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::Session;
use crate::models::{
    Appointment, AttachmentUpload, AuditEntry, Consultation, Fee, Patient, Payment, Prescription,
    PrescriptionByCin, Procurement, Staff, SupplierDocument,
};
use crate::{ClinicCore, ClinicError};

const DEFAULT_AUDIT_LIMIT: u32 = 100;
const DEFAULT_SEARCH_LIMIT: u32 = 50;

#[derive(Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct PhotoRequest {
    file: Option<String>,
    #[serde(rename = "CIN")]
    cin: String,
}

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(default)]
    limit: Option<u32>,
}

#[derive(Deserialize)]
struct DateRange {
    #[serde(rename = "startDate")]
    start: String,
    #[serde(rename = "endDate")]
    end: String,
}

#[derive(Deserialize)]
struct CurrentConsultationRequest {
    cin: String,
    #[serde(rename = "medecinName")]
    doctor_name: String,
}

#[derive(Deserialize)]
struct StaffRequest {
    session: Session,
    staff: Staff,
}

#[derive(Deserialize)]
struct StaffDeleteRequest {
    session: Session,
    #[serde(rename = "ID")]
    id: i64,
}

#[derive(Deserialize)]
struct AuditQuery {
    #[serde(default)]
    limit: Option<u32>,
    #[serde(rename = "Mat", default)]
    staff_id: Option<i64>,
}

/// Record plus the inline base64 attachment the shell sends with it.
#[derive(Deserialize)]
struct WithAttachment<T> {
    #[serde(flatten)]
    record: T,
    #[serde(rename = "PiècesJointes_FileData", default)]
    file_data: Option<String>,
}

#[derive(Deserialize)]
struct SupplierDocRequest {
    #[serde(flatten)]
    doc: SupplierDocument,
    #[serde(rename = "ImageDoc_FileData", default)]
    document_data: Option<String>,
    #[serde(rename = "ImageJustificatif_FileData", default)]
    receipt_data: Option<String>,
}

/// Upload built from inline data and the record's filename columns.
fn inline_upload(
    data: Option<String>,
    file_name: Option<&str>,
    file_type: Option<&str>,
) -> Option<AttachmentUpload> {
    let data = data.filter(|d| !d.is_empty())?;
    Some(AttachmentUpload {
        data_base64: data,
        file_name: file_name.unwrap_or_default().to_string(),
        file_type: file_type.map(str::to_string),
    })
}

fn parse<T: DeserializeOwned>(command: &str, payload: Value) -> Result<T, ClinicError> {
    serde_json::from_value(payload)
        .map_err(|e| ClinicError::InvalidInput(format!("{}: {}", command, e)))
}

fn to_json<T: Serialize>(value: T) -> Result<Value, ClinicError> {
    Ok(serde_json::to_value(value)?)
}

/// Run `command` against `core`.
pub(crate) fn dispatch(core: &ClinicCore, command: &str, payload: Value) -> Result<Value, ClinicError> {
    tracing::debug!(command, "Dispatching command");
    match command {
        // Login & assets
        "check-login" => {
            let creds: Credentials = parse(command, payload)?;
            match core.login(creds.username, creds.password)? {
                Some(session) => Ok(json!({ "success": true, "user": session })),
                None => Ok(json!({
                    "success": false,
                    "message": "Identifiant ou mot de passe incorrect."
                })),
            }
        }
        "save-photo" => {
            let req: PhotoRequest = parse(command, payload)?;
            match req.file {
                Some(file) => to_json(core.save_photo(file, req.cin)),
                None => Ok(Value::Null),
            }
        }
        "delete-photo" => to_json(core.delete_asset(parse(command, payload)?)),
        "get-consultation-file" => to_json(core.describe_asset(parse(command, payload)?)),

        // Staff
        "get-personnels" => to_json(core.list_staff()?),
        "add-personnel" => {
            let req: StaffRequest = parse(command, payload)?;
            to_json(core.add_staff(req.session, req.staff)?)
        }
        "update-personnel" => {
            let req: StaffRequest = parse(command, payload)?;
            to_json(core.update_staff(req.session, req.staff)?)
        }
        "delete-personnel" => {
            let req: StaffDeleteRequest = parse(command, payload)?;
            to_json(core.delete_staff(req.session, req.id)?)
        }

        // Patients
        "get-patients" => to_json(core.list_patients()?),
        "add-patient" => to_json(core.add_patient(parse(command, payload)?)?),
        "update-patient" => to_json(core.update_patient(parse(command, payload)?)?),
        "get-patient-by-cin" => to_json(core.get_patient_by_cin(parse(command, payload)?)?),
        "get-patient-for-doc" => to_json(core.get_patient(parse(command, payload)?)?),
        "search-patients" => {
            let req: SearchRequest = parse(command, payload)?;
            let limit = req.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
            to_json(core.search_patients(req.query, limit)?)
        }
        "get-patients-count" => to_json(core.patients_count()?),

        // Appointments
        "get-appointments-by-date" => {
            to_json(core.list_appointments_by_date(parse(command, payload)?)?)
        }
        "get-appointments" => {
            let range: DateRange = parse(command, payload)?;
            to_json(core.list_appointments_between(range.start, range.end)?)
        }
        "get-today-appointments" => to_json(core.list_appointments_today()?),
        "get-appointment" => to_json(core.get_appointment(parse(command, payload)?)?),
        "add-appointment" | "create-appointment" => {
            let appt: Appointment = parse(command, payload)?;
            to_json(core.add_appointment(appt)?)
        }
        "update-appointment" => to_json(core.update_appointment(parse(command, payload)?)?),
        "delete-appointment" => to_json(core.delete_appointment(parse(command, payload)?)?),

        // Consultations
        "get-consultations" => to_json(core.list_consultations()?),
        "get-consultation-by-id" => to_json(core.get_consultation(parse(command, payload)?)?),
        "get-consultations-by-patient" => {
            to_json(core.list_consultations_for_patient(parse(command, payload)?)?)
        }
        "get-patient-latest-consultation" => {
            to_json(core.latest_consultation_for_cin(parse(command, payload)?)?)
        }
        "add-consultation" | "update-consultation" => {
            let req: WithAttachment<Consultation> = parse(command, payload)?;
            let upload = inline_upload(
                req.file_data,
                req.record.attachment_name.as_deref(),
                req.record.attachment_type.as_deref(),
            );
            if command == "add-consultation" {
                to_json(core.add_consultation(req.record, upload)?)
            } else {
                to_json(core.update_consultation(req.record, upload)?)
            }
        }
        "delete-consultation" => to_json(core.delete_consultation(parse(command, payload)?)?),
        "get-or-create-current-consultation" => {
            let req: CurrentConsultationRequest = parse(command, payload)?;
            to_json(core.get_or_create_current_consultation(req.cin, req.doctor_name)?)
        }

        // Prescriptions
        "get-ordonnances" => to_json(core.list_prescriptions()?),
        "get-ordonnance-by-id" => to_json(core.get_prescription(parse(command, payload)?)?),
        "add-ordonnance" => {
            let p: Prescription = parse(command, payload)?;
            to_json(core.add_prescription(p)?)
        }
        "update-ordonnance" => {
            let p: Prescription = parse(command, payload)?;
            to_json(core.update_prescription(p)?)
        }
        "delete-ordonnance" => to_json(core.delete_prescription(parse(command, payload)?)?),
        "add-ordonnance-by-cin" => {
            let input: PrescriptionByCin = parse(command, payload)?;
            to_json(core.add_prescription_by_cin(input)?)
        }
        "update-ordonnance-by-cin" => {
            let input: PrescriptionByCin = parse(command, payload)?;
            to_json(core.update_prescription_by_cin(input)?)
        }
        "get-ordonnances-by-patient-cin" => {
            to_json(core.list_prescriptions_for_cin(parse(command, payload)?)?)
        }

        // Billing
        "get-honoraires" => to_json(core.list_fees()?),
        "add-honoraire" => {
            let fee: Fee = parse(command, payload)?;
            to_json(core.add_fee(fee)?)
        }
        "update-honoraire" => {
            let fee: Fee = parse(command, payload)?;
            to_json(core.update_fee(fee)?)
        }
        "delete-honoraire" => to_json(core.delete_fee(parse(command, payload)?)?),
        "get-income" => to_json(core.income()?),
        "get-reglements" => to_json(core.list_payments()?),
        "get-reglements-by-patient" => {
            to_json(core.list_payments_for_patient(parse(command, payload)?)?)
        }
        "add-reglement" | "update-reglement" => {
            let req: WithAttachment<Payment> = parse(command, payload)?;
            let upload = inline_upload(
                req.file_data,
                req.record.attachment_name.as_deref(),
                req.record.attachment_type.as_deref(),
            );
            if command == "add-reglement" {
                to_json(core.add_payment(req.record, upload)?)
            } else {
                to_json(core.update_payment(req.record, upload)?)
            }
        }
        "delete-reglement" => to_json(core.delete_payment(parse(command, payload)?)?),

        // Audit
        "log-operation" => {
            let entry: AuditEntry = parse(command, payload)?;
            to_json(core.log_operation(entry)?)
        }
        "get-historique" => {
            let query: AuditQuery = if payload.is_null() {
                AuditQuery {
                    limit: None,
                    staff_id: None,
                }
            } else {
                parse(command, payload)?
            };
            match query.staff_id {
                Some(staff_id) => to_json(core.list_audit_for_staff(staff_id)?),
                None => to_json(core.list_audit(query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT))?),
            }
        }

        // Supplier documents & procurement
        "get-suivi-docs" => to_json(core.list_supplier_docs()?),
        "get-suivi-doc" => to_json(core.get_supplier_doc(parse(command, payload)?)?),
        "add-suivi-doc" | "update-suivi-doc" => {
            let req: SupplierDocRequest = parse(command, payload)?;
            let document = inline_upload(
                req.document_data,
                req.doc.document_file_name.as_deref(),
                req.doc.document_file_type.as_deref(),
            );
            let receipt = inline_upload(
                req.receipt_data,
                req.doc.receipt_file_name.as_deref(),
                req.doc.receipt_file_type.as_deref(),
            );
            if command == "add-suivi-doc" {
                to_json(core.add_supplier_doc(req.doc, document, receipt)?)
            } else {
                to_json(core.update_supplier_doc(req.doc, document, receipt)?)
            }
        }
        "delete-suivi-doc" => to_json(core.delete_supplier_doc(parse(command, payload)?)?),
        "get-approvisionnements" => to_json(core.list_procurements()?),
        "get-approvisionnement" => to_json(core.get_procurement(parse(command, payload)?)?),
        "add-approvisionnement" => {
            let item: Procurement = parse(command, payload)?;
            to_json(core.add_procurement(item)?)
        }
        "update-approvisionnement" => {
            let item: Procurement = parse(command, payload)?;
            to_json(core.update_procurement(item)?)
        }
        "delete-approvisionnement" => {
            to_json(core.delete_procurement(parse(command, payload)?)?)
        }

        "get-schema-status" => to_json(core.schema_status()?),

        _ => {
            tracing::warn!(command, "Unknown command");
            Err(ClinicError::InvalidInput(format!("unknown command {}", command)))
        }
    }
}
