//! Conversion between the model tree and the backend's persisted shape.
//!
//! `build` flattens a tree into the exact JSON structure the backend stores;
//! `hydrate` goes the other way for records fetched for editing.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::entities::{
    lenient_timestamp, AssetRef, ButtonDescriptor, DescriptionItem, ModelNode,
};
use crate::domain::error::{DomainError, DomainResult};

/// Button as persisted: pending local files are never part of it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedButton {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub image_file_name: String,
}

/// Normalized, upload-resolved model hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedModel {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub model_file_url: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Vec<DescriptionItem>,
    #[serde(default, deserialize_with = "nullable")]
    pub video: String,
    #[serde(default, deserialize_with = "nullable")]
    pub datasheet_url: String,
    #[serde(default, deserialize_with = "nullable")]
    pub buttons: Vec<PersistedButton>,
    #[serde(default, deserialize_with = "nullable")]
    pub parts: Vec<PersistedModel>,
}

/// Equipment as returned for editing: tag, QR image and the full model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentRecord {
    pub tag: String,
    #[serde(default)]
    pub qr_image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub model: PersistedModel,
}

/// The backend sends `null` for unset strings and lists; treat it as empty.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Flatten `node` and its parts, depth first and in order.
///
/// Only uploaded references are emitted; a pending file with no completed
/// upload leaves its field empty. Never fails and performs no I/O.
pub fn build(node: &ModelNode) -> PersistedModel {
    PersistedModel {
        id: node.identity.clone(),
        model_file_url: node.model_asset.asset_url.clone(),
        description: node.description.clone(),
        video: node.video.asset_url.clone(),
        datasheet_url: node.datasheet.asset_url.clone(),
        buttons: node
            .buttons
            .iter()
            .map(|b| PersistedButton {
                id: b.id.clone(),
                image_file_name: b.image_file_name.clone(),
            })
            .collect(),
        parts: node.parts.iter().map(build).collect(),
    }
}

/// Rebuild an editable tree from a persisted model.
///
/// Parts of parts are rejected; a part's `modelFileUrl` is ignored.
pub fn hydrate(record: &PersistedModel) -> DomainResult<ModelNode> {
    let mut root = hydrate_node(record);
    root.model_asset = AssetRef::uploaded(record.model_file_url.clone());
    root.parts = record
        .parts
        .iter()
        .map(|part| {
            if part.parts.is_empty() {
                Ok(hydrate_node(part))
            } else {
                Err(DomainError::DepthExceeded {
                    identity: part.id.clone(),
                })
            }
        })
        .collect::<DomainResult<Vec<_>>>()?;
    Ok(root)
}

fn hydrate_node(record: &PersistedModel) -> ModelNode {
    ModelNode {
        identity: record.id.clone(),
        model_asset: AssetRef::default(),
        description: record.description.clone(),
        video: AssetRef::uploaded(record.video.clone()),
        datasheet: AssetRef::uploaded(record.datasheet_url.clone()),
        buttons: record
            .buttons
            .iter()
            .map(|b| ButtonDescriptor::new(b.id.clone(), image_file_name(&b.image_file_name)))
            .collect(),
        parts: Vec::new(),
    }
}

/// The equipment endpoint may hand back `/models/files/x.png`; only the file
/// name is stored.
fn image_file_name(raw: &str) -> String {
    if raw.starts_with('/') {
        Path::new(raw)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    } else {
        raw.to_string()
    }
}
