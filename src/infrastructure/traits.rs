//! I/O boundary traits for testability
//!
//! These traits abstract the filesystem and the backend collaborator,
//! allowing services to be tested with in-memory implementations.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::{EquipmentRecord, EquipmentSummary, EquipmentUpsert, PersistedModel};

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write string content to file, replacing any previous content atomically.
    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Check if path is a file.
    fn is_file(&self, path: &Path) -> bool;

    /// Create directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Remove a file.
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Create parent directories if needed.
    fn ensure_parent(&self, path: &Path) -> io::Result<()>;
}

/// Failure talking to the backend.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("HTTP {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("cannot read {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Reference returned by a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    /// Stored file name (what buttons persist)
    pub filename: String,
    /// Served URL (what 3D models, videos and datasheets persist)
    pub url: String,
}

/// The persistence and upload collaborator.
///
/// Implementations receive derived payloads only, never the live tree.
pub trait Backend: Send + Sync {
    /// List all AR equipments.
    fn list_equipments(&self) -> Result<Vec<EquipmentSummary>, BackendError>;

    /// Fetch one equipment with its full model hierarchy.
    fn get_equipment(&self, tag: &str) -> Result<EquipmentRecord, BackendError>;

    /// Create a model hierarchy.
    fn create_model(&self, model: &PersistedModel) -> Result<(), BackendError>;

    /// Replace the model hierarchy stored under `identity`.
    fn update_model(&self, identity: &str, model: &PersistedModel) -> Result<(), BackendError>;

    /// Create an equipment linking a tag to a model name.
    fn create_equipment(&self, equipment: &EquipmentUpsert) -> Result<(), BackendError>;

    /// Rename/retag the equipment currently stored under `tag`.
    fn update_equipment(&self, tag: &str, equipment: &EquipmentUpsert) -> Result<(), BackendError>;

    /// Upload the main 3D model file for the model named `name`.
    fn upload_model(&self, name: &str, file: &Path) -> Result<UploadedAsset, BackendError>;

    /// Upload a video, datasheet or button image.
    fn upload_asset(&self, file: &Path) -> Result<UploadedAsset, BackendError>;

    /// Upload the QR code image of an existing equipment; returns the
    /// equipment row with its new `qr_image_url`.
    fn upload_qr_image(&self, tag: &str, file: &Path) -> Result<EquipmentSummary, BackendError>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                self.create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}
