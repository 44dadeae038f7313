//! Asset upload resolution service
//!
//! Walks a model tree, uploads every pending local file and swaps it for the
//! reference the backend returns. Uploads run one at a time in tree order, so
//! two uploads for the same field never overlap; a field holds at most one
//! pending file, and selecting a new one replaces the old (last selection wins).

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::ApplicationError;
use crate::domain::editor::{self, NodeField, NodePath};
use crate::domain::{AssetRef, ButtonDescriptor, ModelNode, PendingAsset};
use crate::infrastructure::traits::Backend;

/// Location of one uploadable asset in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetSlot {
    Model,
    Video(NodePath),
    Datasheet(NodePath),
    ButtonImage { path: NodePath, index: usize },
}

impl fmt::Display for AssetSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetSlot::Model => write!(f, "3D model"),
            AssetSlot::Video(path) => write!(f, "video of {}", path),
            AssetSlot::Datasheet(path) => write!(f, "datasheet of {}", path),
            AssetSlot::ButtonImage { path, index } => {
                write!(f, "image of button {} on {}", index, path)
            }
        }
    }
}

/// One upload that did not go through. The field keeps its previous value.
#[derive(Debug)]
pub struct UploadFailure {
    pub slot: AssetSlot,
    pub file: PathBuf,
    pub error: ApplicationError,
}

/// Outcome of resolving a tree's pending uploads.
#[derive(Debug, Default)]
pub struct UploadReport {
    pub uploaded: Vec<AssetSlot>,
    pub failures: Vec<UploadFailure>,
}

impl UploadReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Service uploading pending assets through the backend.
pub struct UploadService {
    backend: Arc<dyn Backend>,
}

impl UploadService {
    /// Create a new upload service.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Every pending file in `root`, in tree order: the 3D model first, then
    /// each node's video, datasheet and button images, root before parts.
    pub fn pending_slots(root: &ModelNode) -> Vec<(AssetSlot, PendingAsset)> {
        let mut slots = Vec::new();
        if let Some(p) = &root.model_asset().pending {
            slots.push((AssetSlot::Model, p.clone()));
        }
        let nodes = std::iter::once((NodePath::Root, root)).chain(
            root.parts()
                .iter()
                .enumerate()
                .map(|(i, part)| (NodePath::Part(i), part)),
        );
        for (path, node) in nodes {
            if let Some(p) = &node.video().pending {
                slots.push((AssetSlot::Video(path), p.clone()));
            }
            if let Some(p) = &node.datasheet().pending {
                slots.push((AssetSlot::Datasheet(path), p.clone()));
            }
            for (index, button) in node.buttons().iter().enumerate() {
                if let Some(p) = &button.pending {
                    slots.push((AssetSlot::ButtonImage { path, index }, p.clone()));
                }
            }
        }
        slots
    }

    /// Upload every pending file and return the resolved tree.
    ///
    /// Failures are collected, not raised: the affected field keeps its prior
    /// reference and its pending file, so a later call can retry it.
    pub fn resolve(&self, root: &ModelNode) -> (ModelNode, UploadReport) {
        let mut current = root.clone();
        let mut report = UploadReport::default();

        for (slot, pending) in Self::pending_slots(root) {
            debug!(slot = %slot, file = %pending.path().display(), "uploading");
            match self.upload_one(&current, slot, &pending) {
                Ok(next) => {
                    current = next;
                    report.uploaded.push(slot);
                }
                Err(error) => {
                    warn!(slot = %slot, error = %error, "upload failed");
                    report.failures.push(UploadFailure {
                        slot,
                        file: pending.path().to_path_buf(),
                        error,
                    });
                }
            }
        }

        info!(
            uploaded = report.uploaded.len(),
            failed = report.failures.len(),
            "resolved pending uploads"
        );
        (current, report)
    }

    fn upload_one(
        &self,
        root: &ModelNode,
        slot: AssetSlot,
        pending: &PendingAsset,
    ) -> Result<ModelNode, ApplicationError> {
        let upload_err = |source| ApplicationError::Upload {
            field: slot.to_string(),
            source,
        };
        let file = pending.path();

        let next = match slot {
            AssetSlot::Model => {
                if root.identity().trim().is_empty() {
                    return Err(ApplicationError::ModelNameRequired);
                }
                let uploaded = self
                    .backend
                    .upload_model(root.identity(), file)
                    .map_err(upload_err)?;
                editor::set_model_asset(root, AssetRef::resolved(uploaded.url))
            }
            AssetSlot::Video(path) => {
                let uploaded = self.backend.upload_asset(file).map_err(upload_err)?;
                editor::set_field(root, path, NodeField::Video(AssetRef::resolved(uploaded.url)))?
            }
            AssetSlot::Datasheet(path) => {
                let uploaded = self.backend.upload_asset(file).map_err(upload_err)?;
                editor::set_field(
                    root,
                    path,
                    NodeField::Datasheet(AssetRef::resolved(uploaded.url)),
                )?
            }
            AssetSlot::ButtonImage { path, index } => {
                let uploaded = self.backend.upload_asset(file).map_err(upload_err)?;
                let id = editor::node_at(root, path)?
                    .buttons()
                    .get(index)
                    .map(|b| b.id.clone())
                    .unwrap_or_default();
                editor::update_button(
                    root,
                    path,
                    index,
                    ButtonDescriptor::new(id, uploaded.filename),
                )?
            }
        };
        Ok(next)
    }
}
