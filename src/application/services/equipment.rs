//! Equipment listing, hydration and submission
//!
//! Submission order: model hierarchy, then the equipment `{name, tag}` link,
//! then the QR image. A failure at any step stops the sequence and names the
//! step; nothing already persisted is rolled back.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::application::{ApplicationError, ApplicationResult};
use crate::config::Settings;
use crate::domain::{
    build, duplicate_part_identities, validate_submission, EditSession, EquipmentSummary,
    EquipmentUpsert,
};
use crate::infrastructure::traits::Backend;

/// What a successful submission did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// Tag the equipment is stored under now
    pub tag: String,
    /// Root identity the model hierarchy is stored under now
    pub identity: String,
    /// `true` when an existing equipment was updated
    pub updated: bool,
    /// Stored QR image URL when one was uploaded as part of the submission
    pub qr_image_url: Option<String>,
    /// Part identities used more than once (reported, not rejected)
    pub duplicate_parts: Vec<String>,
}

/// Service talking to the equipment and model endpoints.
pub struct EquipmentService {
    backend: Arc<dyn Backend>,
    settings: Arc<Settings>,
}

impl EquipmentService {
    /// Create a new equipment service.
    pub fn new(backend: Arc<dyn Backend>, settings: Arc<Settings>) -> Self {
        Self { backend, settings }
    }

    /// All equipments known to the backend.
    pub fn list(&self) -> ApplicationResult<Vec<EquipmentSummary>> {
        let equipments = self.backend.list_equipments()?;
        debug!(count = equipments.len(), "listed equipments");
        Ok(equipments)
    }

    /// Fetch the equipment stored under `tag` and open it for editing.
    #[instrument(level = "debug", skip(self))]
    pub fn open(&self, tag: &str, draft_name: &str) -> ApplicationResult<EditSession> {
        let record = self
            .backend
            .get_equipment(tag)
            .map_err(|source| ApplicationError::Fetch {
                tag: tag.to_string(),
                source,
            })?;
        let session = EditSession::hydrated(draft_name, &record, self.settings.history_limit)?;
        info!(
            tag = %record.tag,
            identity = %record.model.id,
            parts = session.root().parts().len(),
            "hydrated equipment"
        );
        Ok(session)
    }

    /// Persist `session`: create when new, update under its original keys
    /// when it was hydrated from an existing equipment.
    ///
    /// The tree must have no pending uploads left apart from the QR image,
    /// which can only be sent once the equipment exists.
    #[instrument(level = "debug", skip(self, session), fields(draft = %session.name))]
    pub fn submit(&self, session: &EditSession) -> ApplicationResult<SubmitOutcome> {
        let root = session.root();
        validate_submission(root, &session.tag)?;

        let pending = root.pending_count();
        if pending > 0 {
            return Err(ApplicationError::PendingUploads(pending));
        }

        let duplicate_parts = duplicate_part_identities(root);
        for identity in &duplicate_parts {
            warn!(identity = %identity, "part identity used more than once");
        }

        let model = build(root);
        let equipment = EquipmentUpsert {
            name: root.identity().to_string(),
            tag: session.tag.clone(),
        };

        match &session.origin {
            Some(origin) => {
                self.backend
                    .update_model(&origin.identity, &model)
                    .map_err(|source| ApplicationError::Persistence {
                        step: "update model",
                        source,
                    })?;
                self.backend
                    .update_equipment(&origin.tag, &equipment)
                    .map_err(|source| ApplicationError::Persistence {
                        step: "update equipment",
                        source,
                    })?;
            }
            None => {
                self.backend
                    .create_model(&model)
                    .map_err(|source| ApplicationError::Persistence {
                        step: "create model",
                        source,
                    })?;
                self.backend
                    .create_equipment(&equipment)
                    .map_err(|source| ApplicationError::Persistence {
                        step: "create equipment",
                        source,
                    })?;
            }
        }

        let qr_image_url = match &session.qr_image.pending {
            Some(file) => {
                let stored = self
                    .backend
                    .upload_qr_image(&equipment.tag, file.path())
                    .map_err(|source| ApplicationError::Persistence {
                        step: "upload QR image",
                        source,
                    })?;
                Some(stored.qr_image_url.unwrap_or_default())
            }
            None => None,
        };

        info!(
            tag = %equipment.tag,
            identity = %equipment.name,
            updated = session.is_update(),
            "equipment saved"
        );
        Ok(SubmitOutcome {
            tag: equipment.tag,
            identity: equipment.name,
            updated: session.is_update(),
            qr_image_url,
            duplicate_parts,
        })
    }
}
