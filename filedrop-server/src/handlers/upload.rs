//! UploadFile message handler
//!
//! The request header is admitted (or rejected) before its `FileData` frame
//! is read, so a full server answers immediately. A rejected request's
//! payload is skipped to keep the connection usable.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use filedrop_common::ErrorKind;
use filedrop_common::framing::{DEFAULT_FRAME_TIMEOUT, FrameError, FrameHeader, FrameReader};
use filedrop_common::protocol::{FILE_DATA_TYPE, ServerMessage};

use super::HandlerContext;
use crate::constants::{ERR_EXPECTED_FILE_DATA, MIN_UPLOAD_BYTES_PER_SEC, MSG_UPLOAD_OK};
use crate::service::ServiceError;

const COMMAND: &str = "UploadFile";

/// Handle a file upload request
///
/// Reads the `FileData` frame that must follow the request.
pub async fn handle_upload_file<R, W>(
    name: String,
    size: u64,
    reader: &mut FrameReader<R>,
    ctx: &mut HandlerContext<'_, W>,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let pending = match ctx.service.begin_upload(&name, size) {
        Ok(pending) => Some(pending),
        Err(e @ ServiceError::TooLarge { .. }) => {
            // Not worth reading a payload we refuse to store
            debug!(peer = %ctx.peer_addr, name = %name, size, "upload too large");
            ctx.send_service_error(&e, COMMAND).await?;
            return Err(io::Error::other(e.to_string()));
        }
        Err(e) => {
            debug!(peer = %ctx.peer_addr, name = %name, error = %e, "upload rejected");
            ctx.send_service_error(&e, COMMAND).await?;
            None
        }
    };

    let header = reader
        .read_frame_header_with_timeout(DEFAULT_FRAME_TIMEOUT)
        .await?;

    if header.message_type != FILE_DATA_TYPE || header.message_id != ctx.message_id {
        return ctx
            .send_error_and_disconnect(
                ErrorKind::ProtocolError,
                ERR_EXPECTED_FILE_DATA,
                Some(COMMAND),
            )
            .await;
    }

    let max_upload_size = ctx.service.config().max_upload_size;
    if header.payload_length > max_upload_size {
        let err = ServiceError::TooLarge {
            size: header.payload_length,
            max: max_upload_size,
        };
        ctx.send_service_error(&err, COMMAND).await?;
        return Err(io::Error::other(err.to_string()));
    }

    let Some(pending) = pending else {
        return with_deadline(&header, reader.discard_payload(&header)).await;
    };

    let content = with_deadline(&header, reader.read_payload_into_vec(&header)).await?;

    match pending.commit(&content).await {
        Ok(meta) => {
            info!(
                peer = %ctx.peer_addr,
                name = %meta.name,
                size = content.len(),
                "upload complete"
            );
            ctx.send_message(&ServerMessage::UploadFileResponse {
                message: MSG_UPLOAD_OK.to_string(),
            })
            .await
        }
        Err(e) => {
            warn!(peer = %ctx.peer_addr, name = %name, error = %e, "upload failed");
            ctx.send_service_error(&e, COMMAND).await
        }
    }
}

/// Time allowed to receive a payload of `length` bytes
///
/// The frame timeout covers small payloads; larger ones get extra time at
/// `MIN_UPLOAD_BYTES_PER_SEC`, so a 64 MiB upload may take about 18 minutes.
fn payload_deadline(length: u64) -> Duration {
    DEFAULT_FRAME_TIMEOUT.saturating_add(Duration::from_secs(length / MIN_UPLOAD_BYTES_PER_SEC))
}

/// Bound a payload read by its length-scaled deadline
async fn with_deadline<T, F>(header: &FrameHeader, read: F) -> io::Result<T>
where
    F: Future<Output = Result<T, FrameError>>,
{
    match timeout(payload_deadline(header.payload_length), read).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(FrameError::FrameTimeout.into()),
    }
}
