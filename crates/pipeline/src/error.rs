//! Pipeline error type and its classification.

use bibflow_core::retry::RetryError;
use bibflow_core::schema::SchemaError;
use bibflow_core::CoreError;
use bibflow_remote::RemoteError;

/// Closed classification of pipeline failures.
///
/// Only [`ErrorKind::Transient`] failures are ever retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    Transient,
    RemoteOther,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Conflict => "conflict",
            Self::Transient => "transient",
            Self::RemoteOther => "remote_other",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// A transient remote failure persisted through every retry.
    #[error("Remote record service still failing after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: RemoteError },

    #[error("Unknown workflow: {0}")]
    UnknownWorkflow(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Schema(_) | Self::UnknownWorkflow(_) => ErrorKind::Validation,
            Self::Core(CoreError::Conflict(_)) => ErrorKind::Conflict,
            Self::Core(_) => ErrorKind::Validation,
            Self::Database(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                ErrorKind::Conflict
            }
            Self::Database(sqlx::Error::RowNotFound) => ErrorKind::Validation,
            Self::Database(_) => ErrorKind::Transient,
            Self::Remote(RemoteError::Conflict { .. }) => ErrorKind::Conflict,
            Self::Remote(e) if e.is_transient() || e.is_connection() => ErrorKind::Transient,
            Self::Remote(_) => ErrorKind::RemoteOther,
            Self::RetriesExhausted { .. } => ErrorKind::Transient,
        }
    }
}

impl From<RetryError<RemoteError>> for PipelineError {
    fn from(e: RetryError<RemoteError>) -> Self {
        match e {
            RetryError::Exhausted { attempts, last } => Self::RetriesExhausted { attempts, last },
            RetryError::Permanent(e) => Self::Remote(e),
        }
    }
}
