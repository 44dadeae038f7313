//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::editor::NodePath;

/// Domain errors are addressing and shape violations of the model tree.
/// Every other failure originates at the I/O boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("{what} index {index} out of range at {path} (len {len})")]
    IndexOutOfRange {
        path: NodePath,
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("part '{identity}' has parts of its own: models allow a single level of parts")]
    DepthExceeded { identity: String },

    #[error("part '{identity}' carries a 3D model: only the main model may")]
    PartModelAsset { identity: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
