//! Machine-readable error kinds for file service operations
//!
//! These error kinds are serialized to strings in `Error` messages,
//! allowing clients to make decisions based on the error type
//! (e.g., retrying later after `resource_exhausted`).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error kinds reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No admission slot was free for the operation
    ///
    /// The request was rejected rather than queued. Clients may retry.
    ResourceExhausted,

    /// Requested file has never been uploaded
    NotFound,

    /// Request failed validation (bad file name, upload too large)
    Invalid,

    /// Storage I/O failure on the server
    Internal,

    /// Frames arrived out of order or were malformed
    ProtocolError,
}

impl ErrorKind {
    /// Convert to the string representation used in protocol messages
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResourceExhausted => "resource_exhausted",
            Self::NotFound => "not_found",
            Self::Invalid => "invalid",
            Self::Internal => "internal",
            Self::ProtocolError => "protocol_error",
        }
    }

    /// Parse from string (for client-side handling)
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "resource_exhausted" => Some(Self::ResourceExhausted),
            "not_found" => Some(Self::NotFound),
            "invalid" => Some(Self::Invalid),
            "internal" => Some(Self::Internal),
            "protocol_error" => Some(Self::ProtocolError),
            _ => None,
        }
    }

    /// Whether retrying the same request later may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ResourceExhausted)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
