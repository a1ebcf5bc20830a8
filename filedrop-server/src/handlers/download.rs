//! DownloadFile message handler
//!
//! Streams `FileChunk` frames followed by `DownloadComplete`, all echoing the
//! request's message ID. A storage failure mid-stream ends it with an
//! `Error` frame instead.

use std::io;

use tokio::io::AsyncWrite;
use tracing::{info, warn};

use filedrop_common::protocol::ServerMessage;

use super::HandlerContext;
use crate::service::ChunkStream;

const COMMAND: &str = "DownloadFile";

/// Handle a file download request
pub async fn handle_download_file<W>(name: String, ctx: &mut HandlerContext<'_, W>) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    match ctx.service.download(&name).await {
        Ok(stream) => send_stream(stream, ctx).await,
        Err(e) => ctx.send_service_error(&e, COMMAND).await,
    }
}

/// Drain `stream` to the peer, ending with `DownloadComplete` or an `Error`
async fn send_stream<W>(mut stream: ChunkStream, ctx: &mut HandlerContext<'_, W>) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        match stream.next_chunk().await {
            Ok(Some(chunk)) => {
                if let Err(e) = ctx.send_chunk(&chunk).await {
                    stream.abort();
                    warn!(peer = %ctx.peer_addr, name = %stream.name(), error = %e, "download aborted");
                    return Err(e);
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(peer = %ctx.peer_addr, name = %stream.name(), error = %e, "download aborted");
                return ctx.send_service_error(&e, COMMAND).await;
            }
        }
    }

    info!(
        peer = %ctx.peer_addr,
        name = %stream.name(),
        chunks = stream.chunks(),
        size = stream.bytes(),
        "download complete"
    );
    ctx.send_message(&ServerMessage::DownloadComplete {
        chunks: stream.chunks(),
        size: stream.bytes(),
    })
    .await
}
