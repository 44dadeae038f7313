//! Domain layer: the model tree, its edit algebra and its persisted shape
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod editor;
pub mod entities;
pub mod error;
pub mod payload;
pub mod session;
pub mod validation;

pub use editor::{apply_edit, node_at, Edit, NodeField, NodePath, TreeEditor, DEFAULT_HISTORY_LIMIT};
pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use payload::{build, hydrate, EquipmentRecord, PersistedButton, PersistedModel};
pub use session::{EditSession, Origin};
pub use validation::{
    duplicate_part_identities, normalize_identity, normalize_tag, validate_submission,
    ValidationError,
};
