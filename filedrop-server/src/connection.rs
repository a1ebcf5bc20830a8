//! Client connection handling

use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use filedrop_common::ErrorKind;
use filedrop_common::framing::{FrameError, FrameReader, FrameWriter, MessageId};
use filedrop_common::io::{read_client_message_with_timeout, send_server_message_with_id};
use filedrop_common::protocol::ClientMessage;

use crate::constants::ERR_INVALID_MESSAGE_FORMAT;
use crate::handlers::{self, HandlerContext, error_response};
use crate::service::FileService;

/// Serve requests on one connection until the client disconnects
///
/// Requests are handled one at a time in arrival order. A malformed frame
/// gets a `protocol_error` reply and closes the connection.
pub async fn handle_connection<S>(
    socket: S,
    peer_addr: SocketAddr,
    service: &FileService,
) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, writer) = tokio::io::split(socket);
    let mut frame_reader = FrameReader::new(BufReader::new(reader));
    let mut frame_writer = FrameWriter::new(writer);

    loop {
        match read_client_message_with_timeout(&mut frame_reader).await {
            Ok(Some(received)) => {
                let mut ctx = HandlerContext {
                    writer: &mut frame_writer,
                    peer_addr,
                    service,
                    message_id: received.message_id,
                };

                if let Err(e) =
                    handle_client_message(received.message, &mut frame_reader, &mut ctx).await
                {
                    debug!(peer = %peer_addr, error = %e, "closing connection");
                    break;
                }
            }
            Ok(None) => {
                // Connection closed cleanly
                break;
            }
            Err(e) => {
                // Scanners and dropped connections are routine
                let is_common_error = matches!(
                    e,
                    FrameError::InvalidMagic | FrameError::FrameTimeout | FrameError::ConnectionClosed
                );
                if is_common_error {
                    debug!(peer = %peer_addr, error = %e, "failed to read request");
                } else {
                    warn!(peer = %peer_addr, error = %e, "failed to read request");
                }

                // Try to send error before disconnecting
                let error_msg =
                    error_response(ErrorKind::ProtocolError, ERR_INVALID_MESSAGE_FORMAT, None);
                let _ =
                    send_server_message_with_id(&mut frame_writer, &error_msg, MessageId::new())
                        .await;
                break;
            }
        }
    }

    let _ = frame_writer.get_mut().shutdown().await;
    Ok(())
}

/// Dispatch one request to its handler
///
/// An `Err` return means the connection must be closed.
async fn handle_client_message<R, W>(
    msg: ClientMessage,
    reader: &mut FrameReader<R>,
    ctx: &mut HandlerContext<'_, W>,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    match msg {
        ClientMessage::UploadFile { name, size } => {
            handlers::handle_upload_file(name, size, reader, ctx).await
        }
        ClientMessage::GetFileList => handlers::handle_get_file_list(ctx).await,
        ClientMessage::DownloadFile { name } => handlers::handle_download_file(name, ctx).await,
    }
}
