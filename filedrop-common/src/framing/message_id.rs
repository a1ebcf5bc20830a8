//! Message IDs for request/response correlation

use std::fmt;

use uuid::Uuid;

use super::MSG_ID_LENGTH;
use super::error::FrameError;

/// 12-character lowercase hex identifier carried by every frame
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId([u8; MSG_ID_LENGTH]);

impl MessageId {
    /// Generate a new random message ID
    #[must_use]
    pub fn new() -> Self {
        let uuid = Uuid::new_v4();
        let hex = uuid.simple().to_string();
        let mut bytes = [0u8; MSG_ID_LENGTH];
        bytes.copy_from_slice(&hex.as_bytes()[..MSG_ID_LENGTH]);
        Self(bytes)
    }

    /// Parse a message ID from its wire bytes
    ///
    /// # Errors
    ///
    /// Returns `FrameError::InvalidMessageId` unless `bytes` is exactly
    /// 12 lowercase hex characters.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() != MSG_ID_LENGTH {
            return Err(FrameError::InvalidMessageId);
        }
        if !bytes
            .iter()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(b))
        {
            return Err(FrameError::InvalidMessageId);
        }
        let mut id = [0u8; MSG_ID_LENGTH];
        id.copy_from_slice(bytes);
        Ok(Self(id))
    }

    /// Wire representation
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; MSG_ID_LENGTH] {
        &self.0
    }

    /// String representation (always valid ASCII)
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Constructors only admit ASCII hex digits
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({})", self.as_str())
    }
}
