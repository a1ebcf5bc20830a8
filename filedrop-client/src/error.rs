//! Client errors

use std::io;

use filedrop_common::ErrorKind;
use filedrop_common::validators::FileNameError;

/// Failure of a client request
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to connect: {0}")]
    Connect(#[source] io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("timed out waiting for the server")]
    Timeout,

    #[error("server closed the connection")]
    ConnectionClosed,

    /// The server answered with an `Error` frame
    #[error("server rejected request ({kind}): {message}")]
    Rejected { kind: ErrorKind, message: String },

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("invalid file name: {0}")]
    InvalidName(#[from] FileNameError),

    /// A previous download was abandoned mid-stream or a read failed, so
    /// frames on this connection can no longer be matched to requests
    #[error("connection is out of sync; reconnect to continue")]
    Desynchronized,
}

impl ClientError {
    /// Error kind reported by the server, if this is a rejection
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ClientError::Rejected { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Whether retrying the same request later may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind().is_some_and(|kind| kind.is_retryable())
    }
}
