//! Application-level errors (wraps domain errors)

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::{DomainError, ValidationError};
use crate::infrastructure::traits::BackendError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("upload of {field} failed: {source}")]
    Upload {
        field: String,
        #[source]
        source: BackendError,
    },

    #[error("{step} failed: {source}")]
    Persistence {
        step: &'static str,
        #[source]
        source: BackendError,
    },

    #[error("could not load equipment {tag}: {source}")]
    Fetch {
        tag: String,
        #[source]
        source: BackendError,
    },

    #[error("backend request failed: {0}")]
    Backend(#[from] BackendError),

    #[error("enter a model name before uploading the 3D model")]
    ModelNameRequired,

    #[error("{0} asset(s) still waiting for upload")]
    PendingUploads(usize),

    #[error("draft not found: {0}")]
    DraftNotFound(String),

    #[error("draft already exists: {0}")]
    DraftExists(PathBuf),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
