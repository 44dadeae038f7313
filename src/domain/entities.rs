//! Domain entities: the model tree and the records that travel with it

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::error::{DomainError, DomainResult};

/// Local file selected for upload but not yet sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PendingAsset(PathBuf);

impl PendingAsset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// File name component, used as the fallback reference for button images.
    pub fn file_name(&self) -> String {
        self.0
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Uploaded asset reference plus an optional local file awaiting upload.
///
/// Only `asset_url` is ever persisted. A pending file stays pending until an
/// upload succeeds and replaces it with the resolved reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetRef {
    pub asset_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingAsset>,
}

impl AssetRef {
    pub fn uploaded(url: impl Into<String>) -> Self {
        Self {
            asset_url: url.into(),
            pending: None,
        }
    }

    /// Select a new local file, keeping the current reference until upload.
    pub fn with_pending(&self, asset: PendingAsset) -> Self {
        Self {
            asset_url: self.asset_url.clone(),
            pending: Some(asset),
        }
    }

    /// Replace the pending file with the reference returned by the upload.
    pub fn resolved(url: impl Into<String>) -> Self {
        Self::uploaded(url)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// One key/value property. Duplicate keys are allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionItem {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
}

impl DescriptionItem {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Which half of a description pair an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionField {
    Key,
    Value,
}

/// Interactive button shown next to the model in the AR view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonDescriptor {
    pub id: String,
    pub image_file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingAsset>,
}

impl ButtonDescriptor {
    pub fn new(id: impl Into<String>, image_file_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            image_file_name: image_file_name.into(),
            pending: None,
        }
    }
}

pub type DescriptionList = Vec<DescriptionItem>;
pub type ButtonSet = Vec<ButtonDescriptor>;

/// Node of an equipment model tree: the main model (depth 0) or one of its
/// parts (depth 1).
///
/// Fields are only writable from the domain layer, so a tree built through
/// [`crate::domain::editor`] never has parts below depth 1 and never carries a
/// 3D model on a part.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelNode {
    pub(super) identity: String,
    pub(super) model_asset: AssetRef,
    pub(super) description: DescriptionList,
    pub(super) video: AssetRef,
    pub(super) datasheet: AssetRef,
    pub(super) buttons: ButtonSet,
    pub(super) parts: Vec<ModelNode>,
}

impl ModelNode {
    /// Empty main model, as shown when the editor opens on a new equipment.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn model_asset(&self) -> &AssetRef {
        &self.model_asset
    }

    pub fn description(&self) -> &[DescriptionItem] {
        &self.description
    }

    pub fn video(&self) -> &AssetRef {
        &self.video
    }

    pub fn datasheet(&self) -> &AssetRef {
        &self.datasheet
    }

    pub fn buttons(&self) -> &[ButtonDescriptor] {
        &self.buttons
    }

    pub fn parts(&self) -> &[ModelNode] {
        &self.parts
    }

    /// Count of local files still waiting for upload anywhere in the tree.
    pub fn pending_count(&self) -> usize {
        let own = [&self.model_asset, &self.video, &self.datasheet]
            .iter()
            .filter(|a| a.is_pending())
            .count()
            + self.buttons.iter().filter(|b| b.pending.is_some()).count();
        own + self.parts.iter().map(ModelNode::pending_count).sum::<usize>()
    }

    /// Check the two-level shape of a tree that did not come from the editor
    /// (e.g. a draft read back from disk).
    pub fn check_shape(&self) -> DomainResult<()> {
        for part in &self.parts {
            if !part.parts.is_empty() {
                return Err(DomainError::DepthExceeded {
                    identity: part.identity.clone(),
                });
            }
            if !part.model_asset.asset_url.is_empty() || part.model_asset.is_pending() {
                return Err(DomainError::PartModelAsset {
                    identity: part.identity.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Row of the equipment listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentSummary {
    pub name: String,
    pub tag: String,
    #[serde(default)]
    pub qr_image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Creation timestamps arrive with or without an offset; naive values are
/// taken as UTC and anything unparseable is dropped.
pub(crate) fn lenient_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(stamp.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Name/tag pair sent when creating or renaming an equipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentUpsert {
    pub name: String,
    pub tag: String,
}
