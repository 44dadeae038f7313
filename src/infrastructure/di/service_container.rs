//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::{DraftStore, EquipmentService, UploadService};
use crate::config::Settings;
use crate::infrastructure::error::InfraResult;
use crate::infrastructure::http::HttpBackend;
use crate::infrastructure::traits::{Backend, FileSystem, RealFileSystem};

/// Container holding the collaborators every service is built from.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction (drafts)
    pub fs: Arc<dyn FileSystem>,

    /// Backend collaborator (persistence and uploads)
    pub backend: Arc<dyn Backend>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> InfraResult<Self> {
        let backend = HttpBackend::new(&settings.api_base_url, settings.timeout())?;
        Ok(Self::with_deps(
            settings,
            Arc::new(RealFileSystem),
            Arc::new(backend),
        ))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        backend: Arc<dyn Backend>,
    ) -> Self {
        let settings = Arc::new(settings);

        Self {
            settings,
            fs,
            backend,
        }
    }

    pub fn drafts(&self) -> DraftStore {
        DraftStore::new(Arc::clone(&self.fs), self.settings.draft_dir.clone())
    }

    pub fn equipment(&self) -> EquipmentService {
        EquipmentService::new(Arc::clone(&self.backend), Arc::clone(&self.settings))
    }

    pub fn uploads(&self) -> UploadService {
        UploadService::new(Arc::clone(&self.backend))
    }
}
