//! Frame parsing errors

use std::io;

use thiserror::Error;

/// Errors produced while reading or writing frames
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("I/O error: {0}")]
    Io(String),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("invalid magic bytes")]
    InvalidMagic,
    #[error("invalid type length")]
    InvalidTypeLength,
    #[error("type length has too many digits")]
    TypeLengthTooManyDigits,
    #[error("type length out of range")]
    TypeLengthOutOfRange,
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),
    /// A known type that is not allowed at this point in the exchange
    #[error("unexpected message type: {0}")]
    UnexpectedMessageType(String),
    #[error("missing delimiter")]
    MissingDelimiter,
    #[error("invalid message ID")]
    InvalidMessageId,
    #[error("invalid payload length")]
    InvalidPayloadLength,
    #[error("payload length has too many digits")]
    PayloadLengthTooManyDigits,
    #[error("payload length {length} exceeds maximum {max} for {message_type}")]
    PayloadLengthExceedsTypeMax {
        message_type: String,
        length: u64,
        max: u64,
    },
    #[error("missing frame terminator")]
    MissingTerminator,
    #[error("frame timed out")]
    FrameTimeout,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(String),
}

impl From<io::Error> for FrameError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            FrameError::ConnectionClosed
        } else {
            FrameError::Io(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_eof_is_connection_closed() {
        let err = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        assert_eq!(FrameError::from(err), FrameError::ConnectionClosed);
    }

    #[test]
    fn test_other_io_errors_keep_message() {
        let err = io::Error::other("disk on fire");
        assert!(matches!(FrameError::from(err), FrameError::Io(msg) if msg == "disk on fire"));
    }
}
