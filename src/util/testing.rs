//! Test support: logging setup and an in-memory backend.

use std::collections::{BTreeMap, HashSet};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, Once, PoisonError};

use tracing::{debug, info};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::domain::{EquipmentRecord, EquipmentSummary, EquipmentUpsert, PersistedModel};
use crate::infrastructure::traits::{Backend, BackendError, UploadedAsset};

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "trace");
        }
        // global logging subscriber, used by all tracing log macros
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    debug!("INIT: Attempting logger init from testing.rs");

    let noisy_modules = ["hyper", "reqwest", "rustls"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    // Only set if we haven't already set a global subscriber
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

// ============================================================
// FakeBackend
// ============================================================

/// One request received by [`FakeBackend`], in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    ListEquipments,
    GetEquipment(String),
    CreateModel(PersistedModel),
    UpdateModel {
        identity: String,
        model: PersistedModel,
    },
    CreateEquipment(EquipmentUpsert),
    UpdateEquipment {
        tag: String,
        equipment: EquipmentUpsert,
    },
    UploadModel {
        name: String,
        file: PathBuf,
    },
    UploadAsset(PathBuf),
    UploadQrImage {
        tag: String,
        file: PathBuf,
    },
}

/// In-memory backend keyed like the real one: models by identity,
/// equipments by tag.
///
/// Operations listed with [`FakeBackend::fail_on`] and uploads of files
/// listed with [`FakeBackend::fail_upload`] answer with HTTP 500.
#[derive(Debug, Default)]
pub struct FakeBackend {
    models: Mutex<BTreeMap<String, PersistedModel>>,
    equipments: Mutex<BTreeMap<String, EquipmentRecord>>,
    calls: Mutex<Vec<BackendCall>>,
    failing_ops: Mutex<HashSet<&'static str>>,
    failing_files: Mutex<HashSet<PathBuf>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn file_name(file: &Path) -> String {
    file.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn not_found(what: &str) -> BackendError {
    BackendError::Status {
        status: 404,
        detail: format!("{what} not found"),
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing equipment and its model.
    pub fn with_equipment(self, record: EquipmentRecord) -> Self {
        lock(&self.models).insert(record.model.id.clone(), record.model.clone());
        lock(&self.equipments).insert(record.tag.clone(), record);
        self
    }

    /// Make `op` (a [`Backend`] method name, e.g. `"create_model"`) fail.
    pub fn fail_on(self, op: &'static str) -> Self {
        lock(&self.failing_ops).insert(op);
        self
    }

    /// Make uploads of `file` fail.
    pub fn fail_upload(self, file: impl Into<PathBuf>) -> Self {
        lock(&self.failing_files).insert(file.into());
        self
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        lock(&self.calls).clone()
    }

    pub fn model(&self, identity: &str) -> Option<PersistedModel> {
        lock(&self.models).get(identity).cloned()
    }

    pub fn equipment(&self, tag: &str) -> Option<EquipmentRecord> {
        lock(&self.equipments).get(tag).cloned()
    }

    fn record(&self, call: BackendCall) {
        lock(&self.calls).push(call);
    }

    fn check(&self, op: &'static str) -> Result<(), BackendError> {
        if lock(&self.failing_ops).contains(op) {
            return Err(BackendError::Status {
                status: 500,
                detail: format!("{op} rejected"),
            });
        }
        Ok(())
    }

    fn check_file(&self, op: &'static str, file: &Path) -> Result<(), BackendError> {
        self.check(op)?;
        if lock(&self.failing_files).contains(file) {
            return Err(BackendError::Status {
                status: 500,
                detail: format!("upload of {} rejected", file.display()),
            });
        }
        Ok(())
    }

    fn link(&self, equipment: &EquipmentUpsert) -> Result<EquipmentRecord, BackendError> {
        let model = self
            .model(&equipment.name)
            .ok_or_else(|| not_found(&format!("model {}", equipment.name)))?;
        Ok(EquipmentRecord {
            tag: equipment.tag.clone(),
            qr_image_url: None,
            created_at: None,
            model,
        })
    }
}

impl Backend for FakeBackend {
    fn list_equipments(&self) -> Result<Vec<EquipmentSummary>, BackendError> {
        self.record(BackendCall::ListEquipments);
        self.check("list_equipments")?;
        Ok(lock(&self.equipments)
            .values()
            .map(|r| EquipmentSummary {
                name: r.model.id.clone(),
                tag: r.tag.clone(),
                qr_image_url: r.qr_image_url.clone(),
                created_at: r.created_at,
            })
            .collect())
    }

    fn get_equipment(&self, tag: &str) -> Result<EquipmentRecord, BackendError> {
        self.record(BackendCall::GetEquipment(tag.to_string()));
        self.check("get_equipment")?;
        self.equipment(tag)
            .ok_or_else(|| not_found(&format!("equipment {tag}")))
    }

    fn create_model(&self, model: &PersistedModel) -> Result<(), BackendError> {
        self.record(BackendCall::CreateModel(model.clone()));
        self.check("create_model")?;
        let mut models = lock(&self.models);
        if models.contains_key(&model.id) {
            return Err(BackendError::Status {
                status: 409,
                detail: format!("model {} already exists", model.id),
            });
        }
        models.insert(model.id.clone(), model.clone());
        Ok(())
    }

    fn update_model(&self, identity: &str, model: &PersistedModel) -> Result<(), BackendError> {
        self.record(BackendCall::UpdateModel {
            identity: identity.to_string(),
            model: model.clone(),
        });
        self.check("update_model")?;
        let mut models = lock(&self.models);
        if models.remove(identity).is_none() {
            return Err(not_found(&format!("model {identity}")));
        }
        models.insert(model.id.clone(), model.clone());
        Ok(())
    }

    fn create_equipment(&self, equipment: &EquipmentUpsert) -> Result<(), BackendError> {
        self.record(BackendCall::CreateEquipment(equipment.clone()));
        self.check("create_equipment")?;
        let record = self.link(equipment)?;
        lock(&self.equipments).insert(record.tag.clone(), record);
        Ok(())
    }

    fn update_equipment(&self, tag: &str, equipment: &EquipmentUpsert) -> Result<(), BackendError> {
        self.record(BackendCall::UpdateEquipment {
            tag: tag.to_string(),
            equipment: equipment.clone(),
        });
        self.check("update_equipment")?;
        let mut record = self.link(equipment)?;
        let mut equipments = lock(&self.equipments);
        let previous = equipments
            .remove(tag)
            .ok_or_else(|| not_found(&format!("equipment {tag}")))?;
        record.qr_image_url = previous.qr_image_url;
        record.created_at = previous.created_at;
        equipments.insert(record.tag.clone(), record);
        Ok(())
    }

    fn upload_model(&self, name: &str, file: &Path) -> Result<UploadedAsset, BackendError> {
        self.record(BackendCall::UploadModel {
            name: name.to_string(),
            file: file.to_path_buf(),
        });
        self.check_file("upload_model", file)?;
        let filename = file_name(file);
        Ok(UploadedAsset {
            url: format!("/models/files/{filename}"),
            filename,
        })
    }

    fn upload_asset(&self, file: &Path) -> Result<UploadedAsset, BackendError> {
        self.record(BackendCall::UploadAsset(file.to_path_buf()));
        self.check_file("upload_asset", file)?;
        let filename = file_name(file);
        Ok(UploadedAsset {
            url: format!("/assets/files/{filename}"),
            filename,
        })
    }

    fn upload_qr_image(&self, tag: &str, file: &Path) -> Result<EquipmentSummary, BackendError> {
        self.record(BackendCall::UploadQrImage {
            tag: tag.to_string(),
            file: file.to_path_buf(),
        });
        self.check_file("upload_qr_image", file)?;
        let mut equipments = lock(&self.equipments);
        let record = equipments
            .get_mut(tag)
            .ok_or_else(|| not_found(&format!("equipment {tag}")))?;
        record.qr_image_url = Some(format!("/qr/{}", file_name(file)));
        Ok(EquipmentSummary {
            name: record.model.id.clone(),
            tag: record.tag.clone(),
            qr_image_url: record.qr_image_url.clone(),
            created_at: record.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_test_setup() {
        init_test_setup();
    }

    #[test]
    fn given_failing_op_when_called_then_returns_status_and_records_call() {
        let backend = FakeBackend::new().fail_on("create_model");

        let result = backend.create_model(&PersistedModel::default());

        assert!(matches!(result, Err(BackendError::Status { status: 500, .. })));
        assert_eq!(backend.calls().len(), 1);
    }
}
