//! Incremental frame decoding from an async byte stream

use std::io;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::time::timeout;

use super::error::FrameError;
use super::frame::RawFrame;
use super::limits::{is_known_message_type, max_payload_for_type};
use super::message_id::MessageId;
use super::{
    DELIMITER, MAGIC, MAX_PAYLOAD_LENGTH_DIGITS, MAX_TYPE_LENGTH, MAX_TYPE_LENGTH_DIGITS,
    MSG_ID_LENGTH, TERMINATOR,
};

/// How long a frame may take to arrive once its first byte has been read
pub const DEFAULT_FRAME_TIMEOUT: Duration = Duration::from_secs(60);

/// Upper bound on the buffer reserved before any payload byte arrives
const INITIAL_PAYLOAD_CAPACITY: usize = 64 * 1024;

/// Header fields of a frame whose payload has not been read yet
///
/// Callers decide from the header whether to read or skip the payload. The
/// server checks a `FileData` length against its upload limit this way
/// before buffering anything.
#[derive(Debug, Clone)]
pub struct FrameHeader {
    /// The message type (e.g., "FileData", "UploadFile")
    pub message_type: String,
    /// Echoed by every response to the request
    pub message_id: MessageId,
    /// Declared payload size in bytes
    pub payload_length: u64,
}

/// Decodes frames from `R`, one at a time
pub struct FrameReader<R> {
    reader: R,
}

impl<R> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: AsyncReadExt + Unpin> FrameReader<R> {
    /// Next complete frame
    ///
    /// Returns `Ok(None)` if the connection is cleanly closed.
    ///
    /// No deadline applies; a stalled peer blocks this call forever. Servers
    /// use [`read_frame_with_timeout`](Self::read_frame_with_timeout).
    pub async fn read_frame(&mut self) -> Result<Option<RawFrame>, FrameError> {
        let Some(first_byte) = self.read_byte_allow_eof().await? else {
            return Ok(None);
        };
        self.read_frame_after_first_byte(first_byte).await.map(Some)
    }

    /// Next complete frame, bounded by `frame_timeout` once it has started
    ///
    /// Waits indefinitely for the first byte (idle connections are fine
    /// between requests), but once it arrives the whole frame must complete
    /// within `frame_timeout`.
    ///
    /// Returns `Ok(None)` if the connection is cleanly closed.
    pub async fn read_frame_with_timeout(
        &mut self,
        frame_timeout: Duration,
    ) -> Result<Option<RawFrame>, FrameError> {
        let Some(first_byte) = self.read_byte_allow_eof().await? else {
            return Ok(None);
        };

        match timeout(frame_timeout, self.read_frame_after_first_byte(first_byte)).await {
            Ok(result) => result.map(Some),
            Err(_) => Err(FrameError::FrameTimeout),
        }
    }

    /// Header of the next frame; the payload stays in the stream
    ///
    /// The caller must then call either [`read_payload_into_vec`](Self::read_payload_into_vec)
    /// or [`discard_payload`](Self::discard_payload).
    ///
    /// Returns `Ok(None)` if the connection is cleanly closed.
    pub async fn read_frame_header(&mut self) -> Result<Option<FrameHeader>, FrameError> {
        let Some(first_byte) = self.read_byte_allow_eof().await? else {
            return Ok(None);
        };
        self.read_frame_header_after_first_byte(first_byte)
            .await
            .map(Some)
    }

    /// Header of the next frame, bounded by `frame_timeout` once it has started
    ///
    /// Like [`read_frame_with_timeout`](Self::read_frame_with_timeout) but
    /// stops after the header, so the caller can refuse a frame by its type
    /// or declared length before any payload byte is read.
    ///
    /// Returns `Ok(None)` if the connection is cleanly closed.
    pub async fn read_frame_header_after_idle(
        &mut self,
        frame_timeout: Duration,
    ) -> Result<Option<FrameHeader>, FrameError> {
        let Some(first_byte) = self.read_byte_allow_eof().await? else {
            return Ok(None);
        };

        match timeout(
            frame_timeout,
            self.read_frame_header_after_first_byte(first_byte),
        )
        .await
        {
            Ok(result) => result.map(Some),
            Err(_) => Err(FrameError::FrameTimeout),
        }
    }

    /// Read a frame header that must arrive within `header_timeout`
    ///
    /// Used when a frame is expected immediately (the `FileData` following
    /// `UploadFile`), so a clean EOF is reported as `ConnectionClosed`.
    pub async fn read_frame_header_with_timeout(
        &mut self,
        header_timeout: Duration,
    ) -> Result<FrameHeader, FrameError> {
        match timeout(header_timeout, self.read_frame_header()).await {
            Ok(Ok(Some(header))) => Ok(header),
            Ok(Ok(None)) => Err(FrameError::ConnectionClosed),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(FrameError::FrameTimeout),
        }
    }

    /// Payload and terminator of the frame described by `header`
    ///
    /// The buffer grows with the bytes actually received, so a declared
    /// length far beyond what the peer sends costs nothing up front.
    pub async fn read_payload_into_vec(
        &mut self,
        header: &FrameHeader,
    ) -> Result<Vec<u8>, FrameError> {
        let initial = header.payload_length.min(INITIAL_PAYLOAD_CAPACITY as u64) as usize;
        let mut payload = Vec::new();
        payload
            .try_reserve_exact(initial)
            .map_err(|_| FrameError::InvalidPayloadLength)?;

        let mut limited = (&mut self.reader).take(header.payload_length);
        let received = limited.read_to_end(&mut payload).await?;
        if (received as u64) < header.payload_length {
            return Err(FrameError::ConnectionClosed);
        }

        self.read_terminator().await?;
        Ok(payload)
    }

    /// Skip over the payload after reading the header
    ///
    /// Keeps the stream in sync when a request is rejected after its header
    /// was read but before its payload was consumed.
    pub async fn discard_payload(&mut self, header: &FrameHeader) -> Result<(), FrameError> {
        let mut limited = (&mut self.reader).take(header.payload_length);
        let skipped = tokio::io::copy(&mut limited, &mut tokio::io::sink()).await?;
        if skipped < header.payload_length {
            return Err(FrameError::ConnectionClosed);
        }
        self.read_terminator().await
    }

    /// Parse `FD|<type_len>|<type>|<msg_id>|<payload_len>|` once its first
    /// byte is known
    ///
    /// Unknown types and oversized payloads fail here, before any payload
    /// byte is consumed.
    async fn read_frame_header_after_first_byte(
        &mut self,
        first_byte: u8,
    ) -> Result<FrameHeader, FrameError> {
        let mut magic = [first_byte, 0, 0];
        if first_byte == MAGIC[0] {
            self.reader.read_exact(&mut magic[1..]).await?;
        }
        if magic != MAGIC {
            return Err(FrameError::InvalidMagic);
        }

        let type_length = self
            .read_length_field(
                MAX_TYPE_LENGTH_DIGITS,
                FrameError::InvalidTypeLength,
                FrameError::TypeLengthTooManyDigits,
            )
            .await?;
        let type_length = match usize::try_from(type_length) {
            Ok(len @ 1..=MAX_TYPE_LENGTH) => len,
            _ => return Err(FrameError::TypeLengthOutOfRange),
        };

        let mut type_bytes = vec![0u8; type_length];
        self.reader.read_exact(&mut type_bytes).await?;
        let message_type = String::from_utf8(type_bytes)
            .map_err(|_| FrameError::UnknownMessageType("<invalid utf8>".to_string()))?;
        if !is_known_message_type(&message_type) {
            return Err(FrameError::UnknownMessageType(message_type));
        }
        self.expect_delimiter().await?;

        let mut id_bytes = [0u8; MSG_ID_LENGTH];
        self.reader.read_exact(&mut id_bytes).await?;
        let message_id = MessageId::from_bytes(&id_bytes)?;
        self.expect_delimiter().await?;

        let payload_length = self
            .read_length_field(
                MAX_PAYLOAD_LENGTH_DIGITS,
                FrameError::InvalidPayloadLength,
                FrameError::PayloadLengthTooManyDigits,
            )
            .await?;
        let max = max_payload_for_type(&message_type);
        if max > 0 && payload_length > max {
            return Err(FrameError::PayloadLengthExceedsTypeMax {
                message_type,
                length: payload_length,
                max,
            });
        }

        Ok(FrameHeader {
            message_type,
            message_id,
            payload_length,
        })
    }

    async fn read_frame_after_first_byte(&mut self, first_byte: u8) -> Result<RawFrame, FrameError> {
        let header = self.read_frame_header_after_first_byte(first_byte).await?;
        let payload = self.read_payload_into_vec(&header).await?;
        Ok(RawFrame::new(
            header.message_id,
            header.message_type,
            payload,
        ))
    }

    async fn read_terminator(&mut self) -> Result<(), FrameError> {
        if self.read_byte().await? != TERMINATOR {
            return Err(FrameError::MissingTerminator);
        }
        Ok(())
    }

    /// `None` when the peer closed the stream between frames
    async fn read_byte_allow_eof(&mut self) -> Result<Option<u8>, FrameError> {
        let mut buf = [0u8; 1];
        match self.reader.read_exact(&mut buf).await {
            Ok(_) => Ok(Some(buf[0])),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_byte(&mut self) -> Result<u8, FrameError> {
        let mut buf = [0u8; 1];
        self.reader.read_exact(&mut buf).await?;
        Ok(buf[0])
    }

    async fn expect_delimiter(&mut self) -> Result<(), FrameError> {
        if self.read_byte().await? != DELIMITER {
            return Err(FrameError::MissingDelimiter);
        }
        Ok(())
    }

    /// Decimal field of at most `max_digits` digits, ended by the delimiter
    async fn read_length_field(
        &mut self,
        max_digits: usize,
        invalid_err: FrameError,
        too_many_err: FrameError,
    ) -> Result<u64, FrameError> {
        let mut value: u64 = 0;
        let mut digits = 0;

        loop {
            let byte = self.read_byte().await?;
            if byte == DELIMITER {
                return if digits == 0 { Err(invalid_err) } else { Ok(value) };
            }
            if !byte.is_ascii_digit() {
                return Err(invalid_err);
            }

            digits += 1;
            if digits > max_digits {
                return Err(too_many_err);
            }
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(u64::from(byte - b'0')))
                .ok_or_else(|| invalid_err.clone())?;
        }
    }
}
