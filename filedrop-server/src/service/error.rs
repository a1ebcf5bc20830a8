//! File service errors

use std::io;

use filedrop_common::ErrorKind;
use filedrop_common::validators::FileNameError;

use crate::admission::OperationClass;

/// Failure of a file service operation
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// No admission slot was free for the operation class
    #[error("too many concurrent {0} requests, try again later")]
    ResourceExhausted(OperationClass),

    /// Download of a name that was never uploaded
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("invalid file name: {0}")]
    InvalidName(#[from] FileNameError),

    #[error("upload of {size} bytes exceeds the {max} byte limit")]
    TooLarge { size: u64, max: u64 },

    #[error("upload declared {declared} bytes but carried {actual}")]
    SizeMismatch { declared: u64, actual: u64 },

    /// Storage read or write failure
    #[error("storage error: {0}")]
    Internal(#[from] io::Error),
}

impl ServiceError {
    /// Wire-level error kind for this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::ResourceExhausted(_) => ErrorKind::ResourceExhausted,
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::InvalidName(_)
            | ServiceError::TooLarge { .. }
            | ServiceError::SizeMismatch { .. } => ErrorKind::Invalid,
            ServiceError::Internal(_) => ErrorKind::Internal,
        }
    }
}
