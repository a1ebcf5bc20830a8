//! Request handlers for client commands

mod download;
pub mod errors;
mod list;
mod upload;

pub use download::handle_download_file;
pub use errors::*;
pub use list::handle_get_file_list;
pub use upload::handle_upload_file;

use std::io;
use std::net::SocketAddr;

use tokio::io::AsyncWrite;

use filedrop_common::ErrorKind;
use filedrop_common::framing::{FrameWriter, MessageId};
use filedrop_common::io::{send_file_chunk, send_server_message_with_id};
use filedrop_common::protocol::ServerMessage;

use crate::service::{FileService, ServiceError};

/// Context passed to all handlers
pub struct HandlerContext<'a, W> {
    pub writer: &'a mut FrameWriter<W>,
    pub peer_addr: SocketAddr,
    pub service: &'a FileService,
    /// Message ID from the incoming request (for response correlation)
    pub message_id: MessageId,
}

impl<W: AsyncWrite + Unpin> HandlerContext<'_, W> {
    /// Send a message to the client, echoing the request's message ID
    pub async fn send_message(&mut self, message: &ServerMessage) -> io::Result<()> {
        send_server_message_with_id(self.writer, message, self.message_id).await
    }

    /// Send one raw download chunk
    pub async fn send_chunk(&mut self, content: &[u8]) -> io::Result<()> {
        send_file_chunk(self.writer, self.message_id, content).await
    }

    /// Send an error message without disconnecting
    pub async fn send_error(
        &mut self,
        kind: ErrorKind,
        message: &str,
        command: Option<&str>,
    ) -> io::Result<()> {
        self.send_message(&error_response(kind, message, command))
            .await
    }

    /// Report a failed service operation without disconnecting
    pub async fn send_service_error(&mut self, err: &ServiceError, command: &str) -> io::Result<()> {
        self.send_message(&service_error_response(err, command))
            .await
    }

    /// Send an error message and disconnect
    pub async fn send_error_and_disconnect(
        &mut self,
        kind: ErrorKind,
        message: &str,
        command: Option<&str>,
    ) -> io::Result<()> {
        self.send_error(kind, message, command).await?;
        Err(io::Error::other(message.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared test utilities for handler tests

    use std::net::SocketAddr;

    use tokio::io::{BufReader, DuplexStream};

    use filedrop_common::framing::{FrameReader, FrameWriter};
    use filedrop_common::io::{ServerFrame, read_server_frame};

    /// Address reported for in-memory test connections
    pub fn test_peer_addr() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    /// Server-side writer plus a reader for whatever it sends
    pub struct TestPipe {
        pub writer: FrameWriter<DuplexStream>,
        pub client: FrameReader<BufReader<DuplexStream>>,
    }

    impl TestPipe {
        pub fn new() -> Self {
            let (server, client) = tokio::io::duplex(64 * 1024);
            Self {
                writer: FrameWriter::new(server),
                client: FrameReader::new(BufReader::new(client)),
            }
        }

        /// Read the next frame the handler sent
        pub async fn next_frame(&mut self) -> ServerFrame {
            read_server_frame(&mut self.client)
                .await
                .unwrap()
                .expect("server closed the stream")
        }
    }
}
