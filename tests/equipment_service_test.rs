//! Tests for EquipmentService

use std::sync::Arc;

use serde_json::json;

use mxlab::application::services::EquipmentService;
use mxlab::application::ApplicationError;
use mxlab::config::Settings;
use mxlab::domain::{
    AssetRef, Edit, EditSession, EquipmentRecord, EquipmentUpsert, NodeField, NodePath,
    PendingAsset, PersistedModel, ValidationError,
};
use mxlab::infrastructure::traits::BackendError;
use mxlab::util::testing::{BackendCall, FakeBackend};

fn service(backend: &Arc<FakeBackend>) -> EquipmentService {
    EquipmentService::new(backend.clone(), Arc::new(Settings::default()))
}

fn stored_pump() -> EquipmentRecord {
    serde_json::from_value(json!({
        "tag": "POMP-001",
        "qr_image_url": "/qr/pomp-001.png",
        "created_at": "2024-03-01T10:00:00Z",
        "model": {
            "id": "Vanne_1",
            "modelFileUrl": "/models/files/vanne.glb",
            "parts": [{"id": "Actuator", "buttons": [{"id": "A1", "imageFileName": "a1.png"}]}]
        }
    }))
    .unwrap()
}

fn new_session(identity: &str, tag: &str) -> EditSession {
    let mut session = EditSession::new("draft", tag, 10);
    session
        .editor
        .apply(&Edit::SetField {
            path: NodePath::Root,
            field: NodeField::Identity(identity.into()),
        })
        .unwrap();
    session.editor.apply(&Edit::AddPart).unwrap();
    session
}

// ============================================================
// list / open
// ============================================================

#[test]
fn given_stored_equipment_when_listing_then_summary_returned() {
    let backend = Arc::new(FakeBackend::new().with_equipment(stored_pump()));

    let equipments = service(&backend).list().unwrap();

    assert_eq!(equipments.len(), 1);
    assert_eq!(equipments[0].tag, "POMP-001");
    assert_eq!(equipments[0].name, "Vanne_1");
}

#[test]
fn given_stored_equipment_when_opening_then_session_hydrated_with_origin() {
    let backend = Arc::new(FakeBackend::new().with_equipment(stored_pump()));

    let session = service(&backend).open("POMP-001", "pump").unwrap();

    assert!(session.is_update());
    assert_eq!(session.name, "pump");
    assert_eq!(session.tag, "POMP-001");
    assert_eq!(session.qr_image, AssetRef::uploaded("/qr/pomp-001.png"));
    assert_eq!(session.root().identity(), "Vanne_1");
    assert_eq!(session.root().parts()[0].buttons()[0].image_file_name, "a1.png");
}

#[test]
fn given_unknown_tag_when_opening_then_fetch_error() {
    let backend = Arc::new(FakeBackend::new());

    let result = service(&backend).open("NOPE", "nope");

    assert!(matches!(
        result,
        Err(ApplicationError::Fetch {
            source: BackendError::Status { status: 404, .. },
            ..
        })
    ));
}

// ============================================================
// submit
// ============================================================

#[test]
fn given_new_session_when_submitting_then_model_created_before_equipment() {
    let backend = Arc::new(FakeBackend::new());
    let session = new_session("Vanne_2", "pomp-002");

    let outcome = service(&backend).submit(&session).unwrap();

    assert!(!outcome.updated);
    assert_eq!(outcome.tag, "POMP-002");
    let calls = backend.calls();
    assert!(matches!(calls[0], BackendCall::CreateModel(ref m) if m.id == "Vanne_2"));
    assert_eq!(
        calls[1],
        BackendCall::CreateEquipment(EquipmentUpsert {
            name: "Vanne_2".into(),
            tag: "POMP-002".into()
        })
    );
    assert_eq!(backend.equipment("POMP-002").unwrap().model.parts.len(), 1);
}

#[test]
fn given_hydrated_session_when_renamed_then_updates_under_original_keys() {
    let backend = Arc::new(FakeBackend::new().with_equipment(stored_pump()));
    let service = service(&backend);
    let mut session = service.open("POMP-001", "pump").unwrap();
    session
        .editor
        .apply(&Edit::SetField {
            path: NodePath::Root,
            field: NodeField::Identity("Vanne 1 Bis".into()),
        })
        .unwrap();
    session.set_tag("pomp-001b");

    let outcome = service.submit(&session).unwrap();

    assert!(outcome.updated);
    let calls = backend.calls();
    assert!(calls.contains(&BackendCall::UpdateEquipment {
        tag: "POMP-001".into(),
        equipment: EquipmentUpsert {
            name: "Vanne_1_Bis".into(),
            tag: "POMP-001B".into()
        }
    }));
    assert!(calls
        .iter()
        .any(|c| matches!(c, BackendCall::UpdateModel { identity, .. } if identity == "Vanne_1")));
    assert!(backend.model("Vanne_1").is_none());
    assert!(backend.model("Vanne_1_Bis").is_some());
    assert!(backend.equipment("POMP-001B").is_some());
}

#[test]
fn given_missing_tag_when_submitting_then_rejected_without_calls() {
    let backend = Arc::new(FakeBackend::new());
    let session = new_session("Vanne_3", "");

    let result = service(&backend).submit(&session);

    assert!(matches!(
        result,
        Err(ApplicationError::Validation(ValidationError::MissingRequired {
            tag_missing: true,
            ..
        }))
    ));
    assert!(backend.calls().is_empty());
}

#[test]
fn given_pending_upload_when_submitting_then_refused() {
    let backend = Arc::new(FakeBackend::new());
    let mut session = new_session("Vanne_4", "POMP-004");
    session
        .editor
        .apply(&Edit::SetModelAsset(
            AssetRef::default().with_pending(PendingAsset::new("/tmp/vanne.glb")),
        ))
        .unwrap();

    let result = service(&backend).submit(&session);

    assert!(matches!(result, Err(ApplicationError::PendingUploads(1))));
    assert!(backend.calls().is_empty());
}

#[test]
fn given_equipment_step_fails_when_submitting_then_persistence_error_names_step() {
    let backend = Arc::new(FakeBackend::new().fail_on("create_equipment"));
    let session = new_session("Vanne_5", "POMP-005");

    let err = service(&backend).submit(&session).unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Persistence {
            step: "create equipment",
            ..
        }
    ));
    // the model went through; nothing is rolled back
    assert!(backend.model("Vanne_5").is_some());
}

#[test]
fn given_pending_qr_image_when_submitting_then_uploaded_after_equipment() {
    let backend = Arc::new(FakeBackend::new());
    let mut session = new_session("Vanne_6", "POMP-006");
    session.qr_image = session
        .qr_image
        .with_pending(PendingAsset::new("/tmp/qr.png"));

    let outcome = service(&backend).submit(&session).unwrap();

    assert_eq!(outcome.qr_image_url.as_deref(), Some("/qr/qr.png"));
    assert_eq!(
        backend.calls().last(),
        Some(&BackendCall::UploadQrImage {
            tag: "POMP-006".into(),
            file: "/tmp/qr.png".into()
        })
    );
    assert_eq!(
        backend.equipment("POMP-006").unwrap().qr_image_url.as_deref(),
        Some("/qr/qr.png")
    );
}

#[test]
fn given_duplicate_part_names_when_submitting_then_reported_not_rejected() {
    let backend = Arc::new(FakeBackend::new());
    let mut session = new_session("Vanne_7", "POMP-007");
    session.editor.apply(&Edit::AddPart).unwrap();
    for index in 0..2 {
        session
            .editor
            .apply(&Edit::SetField {
                path: NodePath::Part(index),
                field: NodeField::Identity("Lid".into()),
            })
            .unwrap();
    }

    let outcome = service(&backend).submit(&session).unwrap();

    assert_eq!(outcome.duplicate_parts, vec!["Lid".to_string()]);
    assert_eq!(
        backend.model("Vanne_7").map(|m: PersistedModel| m.parts.len()),
        Some(2)
    );
}
