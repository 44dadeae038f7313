//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

impl From<DomainError> for CliError {
    fn from(e: DomainError) -> Self {
        ApplicationError::from(e).into()
    }
}

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => crate::exitcode::USAGE,
            CliError::Infra(e) => match e {
                InfraError::Io { .. } => crate::exitcode::IOERR,
                InfraError::Backend(_) => crate::exitcode::UNAVAILABLE,
                InfraError::Application(e) => match e {
                    ApplicationError::Domain(DomainError::IndexOutOfRange { .. }) => {
                        crate::exitcode::USAGE
                    }
                    ApplicationError::Domain(_)
                    | ApplicationError::Validation(_)
                    | ApplicationError::ModelNameRequired
                    | ApplicationError::PendingUploads(_) => crate::exitcode::DATAERR,
                    ApplicationError::Upload { .. }
                    | ApplicationError::Persistence { .. }
                    | ApplicationError::Fetch { .. }
                    | ApplicationError::Backend(_) => crate::exitcode::UNAVAILABLE,
                    ApplicationError::DraftNotFound(_) => crate::exitcode::NOINPUT,
                    ApplicationError::DraftExists(_) => crate::exitcode::CANTCREAT,
                    ApplicationError::Config { .. } => crate::exitcode::CONFIG,
                    ApplicationError::OperationFailed { .. } => crate::exitcode::IOERR,
                },
            },
        }
    }
}
