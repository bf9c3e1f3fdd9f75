//! Error types for bzk.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("failed to provision {}: {source}", .path.display())]
    Provisioning {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a provisioning error for a failed filesystem operation on `path`.
    pub fn provisioning(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Provisioning {
            path: path.into(),
            source,
        }
    }

    /// Whether the error was caused by the caller (4xx-equivalent).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidPayload(_)
                | Error::InvalidArgument(_)
                | Error::NotFound(_)
                | Error::Conflict(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
