//! Tests for DraftStore

use std::fs;
use std::sync::Arc;

use tempfile::TempDir;

use mxlab::application::services::DraftStore;
use mxlab::application::ApplicationError;
use mxlab::domain::{AssetRef, DomainError, Edit, EditSession, NodeField, NodePath, PendingAsset};
use mxlab::infrastructure::traits::RealFileSystem;

fn store(temp: &TempDir) -> DraftStore {
    DraftStore::new(Arc::new(RealFileSystem), temp.path().join("drafts"))
}

fn edited_session(name: &str) -> EditSession {
    let mut session = EditSession::new(name, "pomp-001", 10);
    session
        .editor
        .apply(&Edit::SetField {
            path: NodePath::Root,
            field: NodeField::Identity("Vanne_1".into()),
        })
        .unwrap();
    session.editor.apply(&Edit::AddPart).unwrap();
    session
        .editor
        .apply(&Edit::SetField {
            path: NodePath::Part(0),
            field: NodeField::Video(
                AssetRef::default().with_pending(PendingAsset::new("/tmp/intro.mp4")),
            ),
        })
        .unwrap();
    session
}

#[test]
fn given_session_when_saved_and_loaded_then_identical_including_history() {
    let temp = TempDir::new().unwrap();
    let store = store(&temp);
    let session = edited_session("pump");

    let path = store.save(&session).unwrap();
    let mut loaded = store.load("pump").unwrap();

    assert_eq!(path, temp.path().join("drafts").join("pump.json"));
    assert_eq!(loaded, session);
    assert!(loaded.root().parts()[0].video().is_pending());
    assert!(loaded.editor.undo());
}

#[test]
fn given_existing_draft_when_creating_then_draft_exists_error() {
    let temp = TempDir::new().unwrap();
    let store = store(&temp);
    store.create(&edited_session("pump")).unwrap();

    let result = store.create(&EditSession::new("pump", "", 10));

    assert!(matches!(result, Err(ApplicationError::DraftExists(_))));
    // original draft untouched
    assert_eq!(store.load("pump").unwrap().root().identity(), "Vanne_1");
}

#[test]
fn given_unknown_name_when_loading_then_draft_not_found() {
    let temp = TempDir::new().unwrap();

    let result = store(&temp).load("missing");

    assert!(matches!(result, Err(ApplicationError::DraftNotFound(name)) if name == "missing"));
}

#[test]
fn given_drafts_when_listing_then_sorted_names_of_json_files_only() {
    let temp = TempDir::new().unwrap();
    let store = store(&temp);
    store.save(&edited_session("zeta")).unwrap();
    store.save(&edited_session("alpha")).unwrap();
    fs::write(store.dir().join("notes.txt"), "ignore me").unwrap();

    assert_eq!(store.list().unwrap(), vec!["alpha", "zeta"]);
}

#[test]
fn given_missing_directory_when_listing_then_empty() {
    let temp = TempDir::new().unwrap();
    assert!(store(&temp).list().unwrap().is_empty());
}

#[test]
fn given_draft_when_deleted_then_gone() {
    let temp = TempDir::new().unwrap();
    let store = store(&temp);
    store.save(&edited_session("pump")).unwrap();

    store.delete("pump").unwrap();

    assert!(!store.exists("pump"));
    assert!(matches!(
        store.delete("pump"),
        Err(ApplicationError::DraftNotFound(_))
    ));
}

#[test]
fn given_name_with_separators_then_stays_inside_draft_dir() {
    let temp = TempDir::new().unwrap();
    let store = store(&temp);

    let path = store.path_for("../etc/passwd");

    assert_eq!(path.parent(), Some(store.dir()));
    assert_eq!(path.file_name().unwrap(), ".._etc_passwd.json");
}

#[test]
fn given_hand_edited_draft_with_nested_parts_when_loading_then_rejected() {
    let temp = TempDir::new().unwrap();
    let store = store(&temp);
    let path = store.save(&edited_session("pump")).unwrap();
    let content = fs::read_to_string(&path).unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&content).unwrap();
    value["editor"]["root"]["parts"][0]["parts"] = serde_json::json!([{"identity": "Gear"}]);
    fs::write(&path, value.to_string()).unwrap();

    let result = store.load("pump");

    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::DepthExceeded { .. }))
    ));
}

#[test]
fn given_hand_edited_undo_snapshot_with_nested_parts_when_loading_then_rejected() {
    let temp = TempDir::new().unwrap();
    let store = store(&temp);
    let path = store.save(&edited_session("pump")).unwrap();
    let content = fs::read_to_string(&path).unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&content).unwrap();
    value["editor"]["undo"][0] = serde_json::json!({
        "identity": "Vanne_1",
        "parts": [{"identity": "Lid", "parts": [{"identity": "Gear"}]}]
    });
    fs::write(&path, value.to_string()).unwrap();

    let result = store.load("pump");

    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::DepthExceeded { identity })) if identity == "Lid"
    ));
}

#[test]
fn given_corrupt_draft_when_loading_then_error_names_file() {
    let temp = TempDir::new().unwrap();
    let store = store(&temp);
    let path = store.save(&edited_session("pump")).unwrap();
    fs::write(&path, "{ not json").unwrap();

    let err = store.load("pump").unwrap_err();

    assert!(err.to_string().contains("pump.json"), "{}", err);
}
