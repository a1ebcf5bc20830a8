//! Typed message I/O on top of the frame codec
//!
//! JSON control messages and raw `FileData`/`FileChunk` frames share one
//! stream; these helpers keep the frame type name and payload consistent.

use std::io;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;

use crate::framing::{DEFAULT_FRAME_TIMEOUT, FrameError, FrameReader, FrameWriter, MessageId, RawFrame};
use crate::protocol::{
    ClientMessage, FILE_CHUNK_TYPE, FILE_DATA_TYPE, ServerMessage, is_client_request_type,
};

// =============================================================================
// Error Conversion
// =============================================================================

impl From<FrameError> for io::Error {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Io(msg) => io::Error::other(msg),
            FrameError::ConnectionClosed => {
                io::Error::new(io::ErrorKind::ConnectionReset, "connection closed")
            }
            FrameError::FrameTimeout => io::Error::new(io::ErrorKind::TimedOut, "frame timed out"),
            other => io::Error::new(io::ErrorKind::InvalidData, other.to_string()),
        }
    }
}

// =============================================================================
// Message Sending
// =============================================================================

/// Send a `ClientMessage` to the server
///
/// Generates a new message ID for request-response correlation.
/// Returns the message ID that was used.
pub async fn send_client_message<W>(
    writer: &mut FrameWriter<W>,
    message: &ClientMessage,
) -> io::Result<MessageId>
where
    W: AsyncWriteExt + Unpin,
{
    let message_id = MessageId::new();
    send_client_message_with_id(writer, message, message_id).await?;
    Ok(message_id)
}

/// Send a `ClientMessage` to the server with a specific message ID
pub async fn send_client_message_with_id<W>(
    writer: &mut FrameWriter<W>,
    message: &ClientMessage,
    message_id: MessageId,
) -> io::Result<()>
where
    W: AsyncWriteExt + Unpin,
{
    send_json(writer, client_message_type(message), message, message_id).await
}

/// Send a `ServerMessage` to a client, echoing the request's message ID
pub async fn send_server_message_with_id<W>(
    writer: &mut FrameWriter<W>,
    message: &ServerMessage,
    message_id: MessageId,
) -> io::Result<()>
where
    W: AsyncWriteExt + Unpin,
{
    send_json(writer, server_message_type(message), message, message_id).await
}

async fn send_json<W, T>(
    writer: &mut FrameWriter<W>,
    message_type: &str,
    message: &T,
    message_id: MessageId,
) -> io::Result<()>
where
    W: AsyncWriteExt + Unpin,
    T: Serialize,
{
    let payload = serde_json::to_vec(message).map_err(io::Error::other)?;
    writer
        .write(message_id, message_type, &payload)
        .await
        .map_err(Into::into)
}

/// Send the raw upload payload that follows an `UploadFile` request
pub async fn send_file_data<W>(
    writer: &mut FrameWriter<W>,
    message_id: MessageId,
    content: &[u8],
) -> io::Result<()>
where
    W: AsyncWriteExt + Unpin,
{
    writer
        .write(message_id, FILE_DATA_TYPE, content)
        .await
        .map_err(Into::into)
}

/// Send one raw download chunk
pub async fn send_file_chunk<W>(
    writer: &mut FrameWriter<W>,
    message_id: MessageId,
    content: &[u8],
) -> io::Result<()>
where
    W: AsyncWriteExt + Unpin,
{
    writer
        .write(message_id, FILE_CHUNK_TYPE, content)
        .await
        .map_err(Into::into)
}

// =============================================================================
// Message Receiving
// =============================================================================

/// Received client message with its message ID
#[derive(Debug)]
pub struct ReceivedClientMessage {
    /// The message ID from the frame (for response correlation)
    pub message_id: MessageId,
    /// The parsed client message
    pub message: ClientMessage,
}

/// Received server message with its message ID
#[derive(Debug)]
pub struct ReceivedServerMessage {
    /// The message ID from the frame (for request correlation)
    pub message_id: MessageId,
    /// The parsed server message
    pub message: ServerMessage,
}

/// One frame received by a client: a control message or a raw download chunk
#[derive(Debug)]
pub enum ServerFrame {
    Message(ReceivedServerMessage),
    Chunk {
        message_id: MessageId,
        content: Vec<u8>,
    },
}

/// Read a `ClientMessage` from the stream with a timeout
///
/// Waits indefinitely for the first byte (allowing idle connections). Once
/// it arrives, the header and then the payload must each complete within
/// [`DEFAULT_FRAME_TIMEOUT`]. The type is checked from the header alone:
/// anything but a request type (a stray `FileData`, a server message) is
/// rejected with `UnexpectedMessageType` before its payload is read, so
/// only the bounded request limits ever apply here.
///
/// Returns `Ok(None)` if the connection was cleanly closed.
pub async fn read_client_message_with_timeout<R>(
    reader: &mut FrameReader<R>,
) -> Result<Option<ReceivedClientMessage>, FrameError>
where
    R: AsyncReadExt + Unpin,
{
    let Some(header) = reader
        .read_frame_header_after_idle(DEFAULT_FRAME_TIMEOUT)
        .await?
    else {
        return Ok(None);
    };

    if !is_client_request_type(&header.message_type) {
        return Err(FrameError::UnexpectedMessageType(header.message_type));
    }

    let payload = match timeout(DEFAULT_FRAME_TIMEOUT, reader.read_payload_into_vec(&header)).await
    {
        Ok(result) => result?,
        Err(_) => return Err(FrameError::FrameTimeout),
    };

    let frame = RawFrame::new(header.message_id, header.message_type, payload);
    parse_client_frame(frame)
        .map(Some)
        .map_err(|e| FrameError::InvalidJson(e.to_string()))
}

/// Read the next frame sent by the server
///
/// Returns `Ok(None)` if the connection was cleanly closed.
pub async fn read_server_frame<R>(reader: &mut FrameReader<R>) -> io::Result<Option<ServerFrame>>
where
    R: AsyncReadExt + Unpin,
{
    let Some(frame) = reader.read_frame().await? else {
        return Ok(None);
    };

    if frame.message_type == FILE_CHUNK_TYPE {
        return Ok(Some(ServerFrame::Chunk {
            message_id: frame.message_id,
            content: frame.payload,
        }));
    }

    parse_server_frame(frame).map(|m| Some(ServerFrame::Message(m)))
}

fn parse_client_frame(frame: RawFrame) -> io::Result<ReceivedClientMessage> {
    let message = decode_json(&frame, client_message_type)?;
    Ok(ReceivedClientMessage {
        message_id: frame.message_id,
        message,
    })
}

fn parse_server_frame(frame: RawFrame) -> io::Result<ReceivedServerMessage> {
    let message = decode_json(&frame, server_message_type)?;
    Ok(ReceivedServerMessage {
        message_id: frame.message_id,
        message,
    })
}

/// Decode a JSON payload whose variant must agree with the frame's type name
fn decode_json<T>(frame: &RawFrame, type_name: fn(&T) -> &'static str) -> io::Result<T>
where
    T: DeserializeOwned,
{
    let message: T = serde_json::from_slice(&frame.payload)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("invalid JSON: {e}")))?;

    let expected = type_name(&message);
    if frame.message_type != expected {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "frame type '{}' does not match payload type '{expected}'",
                frame.message_type
            ),
        ));
    }
    Ok(message)
}

// =============================================================================
// Message Type Names
// =============================================================================

/// Frame type name for a `ClientMessage`
#[must_use]
pub fn client_message_type(message: &ClientMessage) -> &'static str {
    match message {
        ClientMessage::UploadFile { .. } => "UploadFile",
        ClientMessage::GetFileList => "GetFileList",
        ClientMessage::DownloadFile { .. } => "DownloadFile",
    }
}

/// Frame type name for a `ServerMessage`
#[must_use]
pub fn server_message_type(message: &ServerMessage) -> &'static str {
    match message {
        ServerMessage::UploadFileResponse { .. } => "UploadFileResponse",
        ServerMessage::FileListResponse { .. } => "FileListResponse",
        ServerMessage::DownloadComplete { .. } => "DownloadComplete",
        ServerMessage::Error { .. } => "Error",
    }
}
