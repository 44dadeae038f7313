//! Editing session: one equipment's tag, QR image and model tree.

use serde::{Deserialize, Serialize};

use crate::domain::editor::TreeEditor;
use crate::domain::entities::{AssetRef, ModelNode};
use crate::domain::error::DomainResult;
use crate::domain::payload::{hydrate, EquipmentRecord};
use crate::domain::validation::normalize_tag;

/// Keys under which a hydrated equipment is currently stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    pub tag: String,
    pub identity: String,
}

/// State of one editor view, from opening to submission.
///
/// `origin` is set when the session was hydrated from an existing equipment;
/// submission then updates instead of creating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditSession {
    pub name: String,
    #[serde(default)]
    pub origin: Option<Origin>,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub qr_image: AssetRef,
    #[serde(default)]
    pub editor: TreeEditor,
}

impl EditSession {
    /// New equipment: empty main model.
    pub fn new(name: impl Into<String>, tag: &str, history_limit: usize) -> Self {
        Self {
            name: name.into(),
            origin: None,
            tag: normalize_tag(tag),
            qr_image: AssetRef::default(),
            editor: TreeEditor::new(ModelNode::new(), history_limit),
        }
    }

    /// Existing equipment fetched for editing.
    pub fn hydrated(
        name: impl Into<String>,
        record: &EquipmentRecord,
        history_limit: usize,
    ) -> DomainResult<Self> {
        let root = hydrate(&record.model)?;
        Ok(Self {
            name: name.into(),
            origin: Some(Origin {
                tag: record.tag.clone(),
                identity: record.model.id.clone(),
            }),
            tag: record.tag.clone(),
            qr_image: AssetRef::uploaded(record.qr_image_url.clone().unwrap_or_default()),
            editor: TreeEditor::new(root, history_limit),
        })
    }

    pub fn root(&self) -> &ModelNode {
        self.editor.root()
    }

    pub fn is_update(&self) -> bool {
        self.origin.is_some()
    }

    pub fn set_tag(&mut self, raw: &str) {
        self.tag = normalize_tag(raw);
    }
}
