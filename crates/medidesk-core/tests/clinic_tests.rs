//! End-to-end tests through the `ClinicCore` boundary.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use medidesk_core::config::ClinicConfig;
use medidesk_core::{
    init_logging, open_clinic, open_clinic_in_memory, Appointment, AttachmentUpload, ClinicCore,
    ClinicError, Consultation, Patient, PrescriptionByCin, PrescriptionLink, Staff,
};
use tempfile::TempDir;

fn clinic() -> (Arc<ClinicCore>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let core = open_clinic_in_memory(dir.path().to_string_lossy().into_owned()).unwrap();
    (core, dir)
}

fn register_sami(core: &ClinicCore) -> i64 {
    core.add_patient(Patient::new("Ben Ali", "Sami").with_cin("AB1234"))
        .unwrap()
}

fn upload(bytes: &[u8], name: &str) -> AttachmentUpload {
    AttachmentUpload {
        data_base64: STANDARD.encode(bytes),
        file_name: name.to_string(),
        file_type: Some("application/pdf".to_string()),
    }
}

#[test]
fn test_prescription_day_scenario() {
    let (core, _dir) = clinic();

    let idp = register_sami(&core);
    assert_eq!(idp, 1);

    let idc = core
        .get_or_create_current_consultation("AB1234".into(), "Dr. Haddad".into())
        .unwrap();
    assert_eq!(idc, 1);
    let again = core
        .get_or_create_current_consultation("AB1234".into(), "Dr. Haddad".into())
        .unwrap();
    assert_eq!(again, 1);

    let mut input = PrescriptionByCin::new("AB1234", "Dr. Haddad");
    input.medication1 = Some("Amoxicilline".into());
    input.dosage1 = Some("1g matin et soir".into());
    input.duration1 = Some("7 jours".into());
    let link = core.add_prescription_by_cin(input).unwrap();
    assert_eq!(
        link,
        PrescriptionLink {
            prescription_id: 1,
            consultation_id: 1,
            patient_id: 1,
        }
    );

    let latest = core
        .latest_consultation_for_cin("AB1234".into())
        .unwrap()
        .unwrap();
    assert_eq!(latest.id, Some(1));

    let history = core.list_prescriptions_for_cin("AB1234".into()).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].doctor_name.as_deref(), Some("Dr. Haddad"));
}

#[test]
fn test_unknown_cin_leaves_no_rows() {
    let (core, _dir) = clinic();
    register_sami(&core);

    let err = core
        .get_or_create_current_consultation("ZZ0000".into(), "Dr. Haddad".into())
        .unwrap_err();
    assert!(matches!(err, ClinicError::NotFound(_)), "{:?}", err);

    let err = core
        .add_prescription_by_cin(PrescriptionByCin::new("ZZ0000", "Dr. Haddad"))
        .unwrap_err();
    assert!(matches!(err, ClinicError::NotFound(_)));

    assert!(core.list_consultations().unwrap().is_empty());
    assert!(core.list_prescriptions().unwrap().is_empty());
}

#[test]
fn test_missing_prescriber_is_invalid_input() {
    let (core, _dir) = clinic();
    register_sami(&core);

    let mut input = PrescriptionByCin::default();
    input.patient_cin = Some("AB1234".into());
    assert!(matches!(
        core.add_prescription_by_cin(input),
        Err(ClinicError::InvalidInput(_))
    ));
    assert!(core.list_consultations().unwrap().is_empty());
}

#[test]
fn test_appointment_defaults() {
    let (core, _dir) = clinic();
    let idp = register_sami(&core);

    let id = core
        .add_appointment(Appointment::new(Some(idp), "2024-01-10"))
        .unwrap();
    let appt = core.get_appointment(id).unwrap().unwrap();
    assert_eq!(appt.time.as_deref(), Some("08:00"));
    assert_eq!(appt.status.as_deref(), Some("Planifié"));
    assert_eq!(appt.patient_type.as_deref(), Some(""));
}

#[test]
fn test_dashboard_counters() {
    let (core, _dir) = clinic();
    assert_eq!(core.patients_count().unwrap(), 0);
    assert_eq!(core.income().unwrap(), 0.0);

    register_sami(&core);
    core.add_fee(medidesk_core::Fee::new(40.0)).unwrap();
    core.add_fee(medidesk_core::Fee::new(35.0)).unwrap();
    assert_eq!(core.patients_count().unwrap(), 1);
    assert_eq!(core.income().unwrap(), 75.0);
}

#[test]
fn test_login_and_duplicate_staff() {
    let (core, _dir) = clinic();
    let admin = core
        .login("admin".into(), "admin".into())
        .unwrap()
        .expect("seed admin can log in");
    assert!(core.login("admin".into(), "wrong".into()).unwrap().is_none());

    let mut leila = Staff::new("leila", "s3cret");
    leila.last_name = Some("Haddad".into());
    leila.first_name = Some("Leila".into());
    let id = core.add_staff(admin.clone(), leila.clone()).unwrap();

    let mut clash = Staff::new("leila", "other");
    clash.last_name = Some("Imposter".into());
    assert!(matches!(
        core.add_staff(admin.clone(), clash),
        Err(ClinicError::DatabaseError(_))
    ));

    let staff = core.list_staff().unwrap();
    assert_eq!(staff.len(), 1);
    assert_eq!(staff[0].id, Some(id));
    assert_eq!(staff[0].last_name.as_deref(), Some("Haddad"));

    let session = core
        .login("leila".into(), "s3cret".into())
        .unwrap()
        .unwrap();
    assert_eq!(session.staff_id, id);
    assert_eq!(session.display_name, "Haddad Leila");

    let audit = core.list_audit_for_staff(admin.staff_id).unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].action, "Ajout personnel Haddad Leila");
}

#[test]
fn test_stale_session_is_unauthorized() {
    let (core, _dir) = clinic();
    let admin = core.login("admin".into(), "admin".into()).unwrap().unwrap();
    let id = core.add_staff(admin.clone(), Staff::new("leila", "pw")).unwrap();
    let leila = core.login("leila".into(), "pw".into()).unwrap().unwrap();

    assert!(core.delete_staff(admin, id).unwrap());
    assert!(matches!(
        core.add_staff(leila, Staff::new("nour", "pw")),
        Err(ClinicError::Unauthorized(_))
    ));
}

#[test]
fn test_consultation_attachment_lifecycle() {
    let (core, dir) = clinic();
    let idp = register_sami(&core);

    let mut consultation = Consultation::new(idp);
    consultation.cin = Some("AB1234".into());
    let idc = core
        .add_consultation(consultation, Some(upload(b"first", "scan.pdf")))
        .unwrap();

    let stored = core.get_consultation(idc).unwrap().unwrap();
    assert_eq!(
        stored.attachment_name.as_deref(),
        Some("AB1234-consultation.pdf")
    );
    assert_eq!(stored.attachment_type.as_deref(), Some("application/pdf"));

    core.update_consultation(stored.clone(), Some(upload(b"second", "scan.pdf")))
        .unwrap();
    let path = dir.path().join("AB1234-consultation.pdf");
    assert_eq!(std::fs::read(&path).unwrap(), b"second");

    core.update_consultation(stored, Some(upload(b"image", "photo.png")))
        .unwrap();
    let updated = core.get_consultation(idc).unwrap().unwrap();
    assert_eq!(
        updated.attachment_name.as_deref(),
        Some("AB1234-consultation.png")
    );
    assert!(!path.exists());
    assert!(core.describe_asset("AB1234-consultation.png".into()).exists);
}

#[test]
fn test_bad_upload_still_saves_consultation() {
    let (core, dir) = clinic();
    let idp = register_sami(&core);

    let bad = AttachmentUpload {
        data_base64: "%%% not base64 %%%".into(),
        file_name: "scan.pdf".into(),
        file_type: None,
    };
    let idc = core.add_consultation(Consultation::new(idp), Some(bad)).unwrap();

    let stored = core.get_consultation(idc).unwrap().unwrap();
    assert_eq!(stored.attachment_name, None);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_payment_attachment_uses_patient_cin() {
    let (core, _dir) = clinic();
    let idp = register_sami(&core);

    let id = core
        .add_payment(
            medidesk_core::Payment::new(idp, 80.0),
            Some(upload(b"receipt", "recu.jpg")),
        )
        .unwrap();
    let payment = core.get_payment(id).unwrap().unwrap();
    assert_eq!(
        payment.attachment_name.as_deref(),
        Some("AB1234-reglement.jpg")
    );
}

#[test]
fn test_rejected_payment_update_keeps_attachment() {
    let (core, dir) = clinic();
    let idp = register_sami(&core);

    let id = core
        .add_payment(
            medidesk_core::Payment::new(idp, 80.0),
            Some(upload(b"first receipt", "a.pdf")),
        )
        .unwrap();
    let mut payment = core.get_payment(id).unwrap().unwrap();
    payment.date = Some("10/01/2024".into());

    let err = core
        .update_payment(payment, Some(upload(b"second receipt", "b.jpg")))
        .unwrap_err();
    assert!(matches!(err, ClinicError::InvalidInput(_)), "{:?}", err);

    let stored = core.get_payment(id).unwrap().unwrap();
    assert_eq!(
        stored.attachment_name.as_deref(),
        Some("AB1234-reglement.pdf")
    );
    assert_eq!(
        std::fs::read(dir.path().join("AB1234-reglement.pdf")).unwrap(),
        b"first receipt"
    );
    assert!(!dir.path().join("AB1234-reglement.jpg").exists());
}

#[test]
fn test_update_of_missing_consultation_discards_upload() {
    let (core, dir) = clinic();
    let idp = register_sami(&core);

    let mut ghost = Consultation::new(idp);
    ghost.id = Some(99);
    ghost.cin = Some("AB1234".into());
    assert!(!core
        .update_consultation(ghost, Some(upload(b"scan", "scan.pdf")))
        .unwrap());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_replaced_attachment_removed_after_save() {
    let (core, dir) = clinic();
    let idp = register_sami(&core);

    let id = core
        .add_payment(
            medidesk_core::Payment::new(idp, 80.0),
            Some(upload(b"first receipt", "a.pdf")),
        )
        .unwrap();
    let payment = core.get_payment(id).unwrap().unwrap();
    assert!(core
        .update_payment(payment, Some(upload(b"second receipt", "b.jpg")))
        .unwrap());

    assert!(!dir.path().join("AB1234-reglement.pdf").exists());
    assert_eq!(
        std::fs::read(dir.path().join("AB1234-reglement.jpg")).unwrap(),
        b"second receipt"
    );
}

#[test]
fn test_invoke_round_trip() {
    let (core, _dir) = clinic();
    let id = core
        .invoke(
            "add-patient".into(),
            r#"{"Nom":"Ben Ali","Prenom":"Sami","CIN":"AB1234"}"#.into(),
        )
        .unwrap();
    assert_eq!(id, "1");

    let err = core
        .invoke("add-patient".into(), r#"{"Prenom":"Sami"}"#.into())
        .unwrap_err();
    assert!(matches!(err, ClinicError::InvalidInput(_)));

    let err = core.invoke("add-patient".into(), "{not json".into()).unwrap_err();
    assert!(matches!(err, ClinicError::InvalidInput(_)));

    assert_eq!(
        core.invoke("get-patients-count".into(), String::new()).unwrap(),
        "1"
    );
}

#[test]
fn test_reopen_file_database() {
    let root = tempfile::tempdir().unwrap();
    let mut config = ClinicConfig::with_root(root.path());
    config.password_iterations = 1_000;

    {
        let core = ClinicCore::open(&config).unwrap();
        register_sami(&core);
    }

    let core = open_clinic(Some(root.path().to_string_lossy().into_owned())).unwrap();
    assert_eq!(core.patients_count().unwrap(), 1);
    assert!(root.path().join("db").join("clinic.db").exists());
    assert!(root.path().join("assets").is_dir());
    assert!(core.schema_status().unwrap().contains(&"Consultation".to_string()));
    assert!(core.login("admin".into(), "admin".into()).unwrap().is_some());
}

#[test]
fn test_host_logging_then_open() {
    init_logging();
    init_logging();

    let root = tempfile::tempdir().unwrap();
    let core = open_clinic(Some(root.path().to_string_lossy().into_owned())).unwrap();
    assert_eq!(core.patients_count().unwrap(), 0);
}
