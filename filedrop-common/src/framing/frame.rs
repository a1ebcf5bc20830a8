//! In-memory representation of a complete frame

use super::message_id::MessageId;
use super::{DELIMITER, MAGIC, TERMINATOR};

/// A fully read frame: header fields plus the whole payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub message_id: MessageId,
    pub message_type: String,
    pub payload: Vec<u8>,
}

impl RawFrame {
    /// Create a new frame
    pub fn new(message_id: MessageId, message_type: String, payload: Vec<u8>) -> Self {
        Self {
            message_id,
            message_type,
            payload,
        }
    }

    /// Serialize the frame to its wire form
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let type_len = self.message_type.len().to_string();
        let payload_len = self.payload.len().to_string();

        let mut bytes = Vec::with_capacity(
            MAGIC.len()
                + type_len.len()
                + self.message_type.len()
                + self.message_id.as_bytes().len()
                + payload_len.len()
                + self.payload.len()
                + 5,
        );
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(type_len.as_bytes());
        bytes.push(DELIMITER);
        bytes.extend_from_slice(self.message_type.as_bytes());
        bytes.push(DELIMITER);
        bytes.extend_from_slice(self.message_id.as_bytes());
        bytes.push(DELIMITER);
        bytes.extend_from_slice(payload_len.as_bytes());
        bytes.push(DELIMITER);
        bytes.extend_from_slice(&self.payload);
        bytes.push(TERMINATOR);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_bytes() {
        let id = MessageId::from_bytes(b"a1b2c3d4e5f6").unwrap();
        let frame = RawFrame::new(id, "FileChunk".to_string(), vec![1, 2, 3]);

        let mut expected = b"FD|9|FileChunk|a1b2c3d4e5f6|3|".to_vec();
        expected.extend_from_slice(&[1, 2, 3]);
        expected.push(b'\n');
        assert_eq!(frame.to_bytes(), expected);
    }

    #[test]
    fn test_to_bytes_empty_payload() {
        let id = MessageId::from_bytes(b"000000000000").unwrap();
        let frame = RawFrame::new(id, "GetFileList".to_string(), Vec::new());
        assert_eq!(frame.to_bytes(), b"FD|11|GetFileList|000000000000|0|\n");
    }
}
