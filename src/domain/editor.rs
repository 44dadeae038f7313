//! Pure edit operations over a model tree.
//!
//! Every operation takes the current root and returns a new one; the input is
//! never touched. Depth is explicit: a [`NodePath`] can only name the root or
//! one of its direct parts, and the root-only edits (adding a part, setting
//! the 3D model) take no path at all, so no sequence of edits reaches depth 2.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::entities::{
    AssetRef, ButtonDescriptor, DescriptionField, DescriptionItem, ModelNode,
};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::validation::normalize_identity;

/// Address of a node in a two-level model tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodePath {
    Root,
    Part(usize),
}

impl From<Option<usize>> for NodePath {
    fn from(part: Option<usize>) -> Self {
        part.map(NodePath::Part).unwrap_or(NodePath::Root)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodePath::Root => write!(f, "main model"),
            NodePath::Part(i) => write!(f, "part {}", i),
        }
    }
}

/// Scalar field editable at any depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeField {
    /// Name of the node; whitespace runs are replaced by `_`.
    Identity(String),
    Video(AssetRef),
    Datasheet(AssetRef),
}

/// One atomic user edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    SetField {
        path: NodePath,
        field: NodeField,
    },
    SetModelAsset(AssetRef),
    AddDescriptionItem {
        path: NodePath,
    },
    UpdateDescriptionItem {
        path: NodePath,
        index: usize,
        field: DescriptionField,
        value: String,
    },
    RemoveDescriptionItem {
        path: NodePath,
        index: usize,
    },
    AddButton {
        path: NodePath,
    },
    UpdateButton {
        path: NodePath,
        index: usize,
        button: ButtonDescriptor,
    },
    RemoveButton {
        path: NodePath,
        index: usize,
    },
    AddPart,
    UpdatePart {
        index: usize,
        node: ModelNode,
    },
    RemovePart {
        index: usize,
    },
}

/// Apply one edit to `root`, returning the new root.
pub fn apply_edit(root: &ModelNode, edit: &Edit) -> DomainResult<ModelNode> {
    match edit {
        Edit::SetField { path, field } => set_field(root, *path, field.clone()),
        Edit::SetModelAsset(asset) => Ok(set_model_asset(root, asset.clone())),
        Edit::AddDescriptionItem { path } => add_description_item(root, *path),
        Edit::UpdateDescriptionItem {
            path,
            index,
            field,
            value,
        } => update_description_item(root, *path, *index, *field, value),
        Edit::RemoveDescriptionItem { path, index } => {
            remove_description_item(root, *path, *index)
        }
        Edit::AddButton { path } => add_button(root, *path),
        Edit::UpdateButton {
            path,
            index,
            button,
        } => update_button(root, *path, *index, button.clone()),
        Edit::RemoveButton { path, index } => remove_button(root, *path, *index),
        Edit::AddPart => Ok(add_part(root)),
        Edit::UpdatePart { index, node } => update_part(root, *index, node.clone()),
        Edit::RemovePart { index } => remove_part(root, *index),
    }
}

/// Clone `root` and run `f` on the node at `path`.
fn edit_node<F>(root: &ModelNode, path: NodePath, f: F) -> DomainResult<ModelNode>
where
    F: FnOnce(&mut ModelNode) -> DomainResult<()>,
{
    let mut next = root.clone();
    let target = match path {
        NodePath::Root => &mut next,
        NodePath::Part(index) => {
            let len = next.parts.len();
            next.parts
                .get_mut(index)
                .ok_or(DomainError::IndexOutOfRange {
                    path: NodePath::Root,
                    what: "part",
                    index,
                    len,
                })?
        }
    };
    f(target)?;
    Ok(next)
}

/// Node addressed by `path`.
pub fn node_at(root: &ModelNode, path: NodePath) -> DomainResult<&ModelNode> {
    match path {
        NodePath::Root => Ok(root),
        NodePath::Part(index) => root.parts.get(index).ok_or(DomainError::IndexOutOfRange {
            path: NodePath::Root,
            what: "part",
            index,
            len: root.parts.len(),
        }),
    }
}

fn check_index(path: NodePath, what: &'static str, index: usize, len: usize) -> DomainResult<()> {
    if index < len {
        Ok(())
    } else {
        Err(DomainError::IndexOutOfRange {
            path,
            what,
            index,
            len,
        })
    }
}

pub fn set_field(root: &ModelNode, path: NodePath, field: NodeField) -> DomainResult<ModelNode> {
    edit_node(root, path, |node| {
        match field {
            NodeField::Identity(name) => node.identity = normalize_identity(&name),
            NodeField::Video(asset) => node.video = asset,
            NodeField::Datasheet(asset) => node.datasheet = asset,
        }
        Ok(())
    })
}

/// Set the main model's 3D asset. Parts have no 3D model.
pub fn set_model_asset(root: &ModelNode, asset: AssetRef) -> ModelNode {
    let mut next = root.clone();
    next.model_asset = asset;
    next
}

pub fn add_description_item(root: &ModelNode, path: NodePath) -> DomainResult<ModelNode> {
    edit_node(root, path, |node| {
        node.description.push(DescriptionItem::default());
        Ok(())
    })
}

pub fn update_description_item(
    root: &ModelNode,
    path: NodePath,
    index: usize,
    field: DescriptionField,
    value: &str,
) -> DomainResult<ModelNode> {
    edit_node(root, path, |node| {
        check_index(path, "description", index, node.description.len())?;
        let item = &mut node.description[index];
        match field {
            DescriptionField::Key => item.key = value.to_string(),
            DescriptionField::Value => item.value = value.to_string(),
        }
        Ok(())
    })
}

pub fn remove_description_item(
    root: &ModelNode,
    path: NodePath,
    index: usize,
) -> DomainResult<ModelNode> {
    edit_node(root, path, |node| {
        check_index(path, "description", index, node.description.len())?;
        node.description.remove(index);
        Ok(())
    })
}

pub fn add_button(root: &ModelNode, path: NodePath) -> DomainResult<ModelNode> {
    edit_node(root, path, |node| {
        node.buttons.push(ButtonDescriptor::default());
        Ok(())
    })
}

pub fn update_button(
    root: &ModelNode,
    path: NodePath,
    index: usize,
    button: ButtonDescriptor,
) -> DomainResult<ModelNode> {
    edit_node(root, path, |node| {
        check_index(path, "button", index, node.buttons.len())?;
        node.buttons[index] = button;
        Ok(())
    })
}

pub fn remove_button(root: &ModelNode, path: NodePath, index: usize) -> DomainResult<ModelNode> {
    edit_node(root, path, |node| {
        check_index(path, "button", index, node.buttons.len())?;
        node.buttons.remove(index);
        Ok(())
    })
}

/// Append an empty part to the main model.
pub fn add_part(root: &ModelNode) -> ModelNode {
    let mut next = root.clone();
    next.parts.push(ModelNode::default());
    next
}

/// Replace a direct part. A replacement with parts of its own is rejected;
/// a 3D model on it is dropped.
pub fn update_part(root: &ModelNode, index: usize, node: ModelNode) -> DomainResult<ModelNode> {
    if !node.parts.is_empty() {
        return Err(DomainError::DepthExceeded {
            identity: node.identity,
        });
    }
    check_index(NodePath::Root, "part", index, root.parts.len())?;
    let mut next = root.clone();
    next.parts[index] = ModelNode {
        model_asset: AssetRef::default(),
        ..node
    };
    Ok(next)
}

pub fn remove_part(root: &ModelNode, index: usize) -> DomainResult<ModelNode> {
    check_index(NodePath::Root, "part", index, root.parts.len())?;
    let mut next = root.clone();
    next.parts.remove(index);
    Ok(next)
}

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

/// Current root plus the snapshots needed for undo/redo.
///
/// Each edit pushes the previous root onto the undo stack (bounded by
/// `history_limit`, oldest dropped first) and clears the redo stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEditor {
    root: ModelNode,
    #[serde(default)]
    undo: VecDeque<ModelNode>,
    #[serde(default)]
    redo: Vec<ModelNode>,
    #[serde(default = "default_history_limit")]
    history_limit: usize,
}

impl Default for TreeEditor {
    fn default() -> Self {
        Self::new(ModelNode::new(), DEFAULT_HISTORY_LIMIT)
    }
}

impl TreeEditor {
    pub fn new(root: ModelNode, history_limit: usize) -> Self {
        Self {
            root,
            undo: VecDeque::new(),
            redo: Vec::new(),
            history_limit,
        }
    }

    pub fn root(&self) -> &ModelNode {
        &self.root
    }

    /// Apply `edit`. On error the current root is kept as is.
    pub fn apply(&mut self, edit: &Edit) -> DomainResult<()> {
        let next = apply_edit(&self.root, edit)?;
        self.commit(next);
        Ok(())
    }

    /// Make `next` the current root, recording the old one for undo.
    pub fn commit(&mut self, next: ModelNode) {
        if next == self.root {
            return;
        }
        let previous = std::mem::replace(&mut self.root, next);
        if self.history_limit > 0 {
            if self.undo.len() == self.history_limit {
                self.undo.pop_front();
            }
            self.undo.push_back(previous);
        }
        self.redo.clear();
    }

    pub fn undo(&mut self) -> bool {
        match self.undo.pop_back() {
            Some(previous) => {
                let current = std::mem::replace(&mut self.root, previous);
                self.redo.push(current);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.redo.pop() {
            Some(next) => {
                let current = std::mem::replace(&mut self.root, next);
                self.undo.push_back(current);
                true
            }
            None => false,
        }
    }

    /// Check the current root and every undo/redo snapshot, for editors
    /// read back from disk.
    pub fn check_shape(&self) -> DomainResult<()> {
        std::iter::once(&self.root)
            .chain(self.undo.iter())
            .chain(self.redo.iter())
            .try_for_each(ModelNode::check_shape)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_part_path_when_displayed_then_names_index() {
        assert_eq!(NodePath::Part(2).to_string(), "part 2");
        assert_eq!(NodePath::Root.to_string(), "main model");
        assert_eq!(NodePath::from(Some(1)), NodePath::Part(1));
        assert_eq!(NodePath::from(None), NodePath::Root);
    }

    #[test]
    fn given_history_limit_when_exceeded_then_oldest_snapshot_dropped() {
        let mut editor = TreeEditor::new(ModelNode::new(), 2);
        editor.apply(&Edit::AddPart).unwrap();
        editor.apply(&Edit::AddPart).unwrap();
        editor.apply(&Edit::AddPart).unwrap();

        assert!(editor.undo());
        assert!(editor.undo());
        assert!(!editor.undo());
        assert_eq!(editor.root().parts().len(), 1);
    }

    #[test]
    fn given_nested_part_only_in_redo_history_when_checking_shape_then_rejected() {
        let nested: ModelNode = serde_json::from_value(serde_json::json!({
            "identity": "A",
            "parts": [{"identity": "P", "parts": [{"identity": "G"}]}]
        }))
        .unwrap();
        let mut editor = TreeEditor::new(ModelNode::new(), 5);
        editor.redo.push(nested);

        assert!(editor.root().check_shape().is_ok());
        assert!(matches!(
            editor.check_shape(),
            Err(DomainError::DepthExceeded { identity }) if identity == "P"
        ));
    }

    #[test]
    fn given_noop_edit_when_committed_then_history_unchanged() {
        let mut editor = TreeEditor::default();
        editor.commit(ModelNode::new());
        assert!(!editor.can_undo());
    }
}
