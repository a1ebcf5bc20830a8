//! Typed client for the Filedrop protocol
//!
//! One request is in flight at a time per connection. Responses are matched
//! to requests by message ID.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::timeout;
use tracing::debug;

use filedrop_common::framing::{FrameReader, FrameWriter, MessageId};
use filedrop_common::io::{
    ReceivedServerMessage, ServerFrame, read_server_frame, send_client_message, send_file_data,
    server_message_type,
};
use filedrop_common::protocol::{ClientMessage, FileEntry, ServerMessage};

use crate::error::ClientError;

/// Timeout for establishing the TCP connection
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Boxed async read half (type alias to reduce complexity)
type BoxedRead = Box<dyn AsyncRead + Unpin + Send>;

/// Boxed async write half (type alias to reduce complexity)
type BoxedWrite = Box<dyn AsyncWrite + Unpin + Send>;

/// Connection to a Filedrop server
pub struct Client {
    reader: FrameReader<BufReader<BoxedRead>>,
    writer: FrameWriter<BoxedWrite>,
    response_timeout: Option<Duration>,
    desynchronized: bool,
}

impl Client {
    /// Connect to a server over TCP
    ///
    /// # Errors
    ///
    /// Returns `Timeout` or `Connect` if the connection cannot be established.
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, ClientError> {
        let stream = timeout(CONNECTION_TIMEOUT, TcpStream::connect(addr))
            .await
            .map_err(|_| ClientError::Timeout)?
            .map_err(ClientError::Connect)?;
        stream.set_nodelay(true).map_err(ClientError::Connect)?;
        Ok(Self::from_stream(stream))
    }

    /// Wrap an already connected stream
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        Self {
            reader: FrameReader::new(BufReader::new(Box::new(read_half) as BoxedRead)),
            writer: FrameWriter::new(Box::new(write_half) as BoxedWrite),
            response_timeout: None,
            desynchronized: false,
        }
    }

    /// Fail any single response wait that exceeds `limit`
    ///
    /// A timed-out connection is left desynchronized.
    #[must_use]
    pub fn with_response_timeout(mut self, limit: Duration) -> Self {
        self.response_timeout = Some(limit);
        self
    }

    /// Upload `content` under `name`, replacing any previous file
    ///
    /// Returns the server's acknowledgment message.
    ///
    /// # Errors
    ///
    /// Returns `Rejected` with the server's error kind, or a transport error.
    pub async fn upload_file(&mut self, name: &str, content: &[u8]) -> Result<String, ClientError> {
        self.ensure_synchronized()?;

        let request = ClientMessage::UploadFile {
            name: name.to_string(),
            size: content.len() as u64,
        };
        let message_id = send_client_message(&mut self.writer, &request).await?;

        // The server may reject the header and close before taking the data;
        // its error reply is more useful than the write failure.
        let data_result = send_file_data(&mut self.writer, message_id, content).await;
        let response = self.read_response(message_id).await;
        if let Err(e) = data_result {
            return Err(match response {
                Err(rejected @ ClientError::Rejected { .. }) => rejected,
                _ => e.into(),
            });
        }

        match response? {
            ServerMessage::UploadFileResponse { message } => Ok(message),
            other => Err(unexpected(&other)),
        }
    }

    /// List every file on the server, in no particular order
    ///
    /// # Errors
    ///
    /// Returns `Rejected` with the server's error kind, or a transport error.
    pub async fn get_file_list(&mut self) -> Result<Vec<FileEntry>, ClientError> {
        self.ensure_synchronized()?;

        let message_id = send_client_message(&mut self.writer, &ClientMessage::GetFileList).await?;
        match self.read_response(message_id).await? {
            ServerMessage::FileListResponse { files } => Ok(files),
            other => Err(unexpected(&other)),
        }
    }

    /// Start downloading `name`
    ///
    /// Rejections that happen before streaming starts (`not_found`,
    /// `resource_exhausted`, `invalid`) are returned here. The returned
    /// [`Download`] must be drained; dropping it early leaves the connection
    /// desynchronized.
    ///
    /// # Errors
    ///
    /// Returns `Rejected` with the server's error kind, or a transport error.
    pub async fn download_file(&mut self, name: &str) -> Result<Download<'_>, ClientError> {
        self.ensure_synchronized()?;

        let request = ClientMessage::DownloadFile {
            name: name.to_string(),
        };
        let message_id = send_client_message(&mut self.writer, &request).await?;

        let first = self.read_frame().await?;
        if let ServerFrame::Message(ReceivedServerMessage {
            message: ServerMessage::Error { kind, message, .. },
            ..
        }) = first
        {
            return Err(ClientError::Rejected { kind, message });
        }

        Ok(Download {
            client: self,
            message_id,
            pending: Some(first),
            chunks: 0,
            bytes: 0,
            finished: false,
        })
    }

    /// Download `name` fully into memory
    ///
    /// # Errors
    ///
    /// Same as [`download_file`](Self::download_file) and
    /// [`Download::next_chunk`].
    pub async fn download_to_vec(&mut self, name: &str) -> Result<Vec<u8>, ClientError> {
        let mut download = self.download_file(name).await?;
        let mut content = Vec::new();
        while let Some(chunk) = download.next_chunk().await? {
            content.extend_from_slice(&chunk);
        }
        Ok(content)
    }

    fn ensure_synchronized(&self) -> Result<(), ClientError> {
        if self.desynchronized {
            return Err(ClientError::Desynchronized);
        }
        Ok(())
    }

    /// Read the next frame; any failure desynchronizes the connection
    async fn read_frame(&mut self) -> Result<ServerFrame, ClientError> {
        let result = match self.response_timeout {
            Some(limit) => match timeout(limit, read_server_frame(&mut self.reader)).await {
                Ok(result) => result.map_err(ClientError::from),
                Err(_) => Err(ClientError::Timeout),
            },
            None => read_server_frame(&mut self.reader)
                .await
                .map_err(ClientError::from),
        };

        match result {
            Ok(Some(frame)) => Ok(frame),
            Ok(None) => {
                self.desynchronized = true;
                Err(ClientError::ConnectionClosed)
            }
            Err(e) => {
                self.desynchronized = true;
                Err(e)
            }
        }
    }

    /// Read the control message answering `message_id`
    ///
    /// `Error` frames are returned as `Rejected` whatever their ID, since
    /// the server reports unparseable requests under a fresh ID.
    async fn read_response(&mut self, message_id: MessageId) -> Result<ServerMessage, ClientError> {
        match self.read_frame().await? {
            ServerFrame::Message(received) => match received.message {
                ServerMessage::Error { kind, message, .. } => {
                    Err(ClientError::Rejected { kind, message })
                }
                message if received.message_id == message_id => Ok(message),
                other => {
                    self.desynchronized = true;
                    Err(ClientError::UnexpectedResponse(format!(
                        "{} for another request",
                        server_message_type(&other)
                    )))
                }
            },
            ServerFrame::Chunk { .. } => {
                self.desynchronized = true;
                Err(ClientError::UnexpectedResponse(
                    "FileChunk outside a download".to_string(),
                ))
            }
        }
    }
}

fn unexpected(message: &ServerMessage) -> ClientError {
    ClientError::UnexpectedResponse(server_message_type(message).to_string())
}

/// An in-progress download
///
/// Yields chunks in file order until the server's `DownloadComplete`.
pub struct Download<'a> {
    client: &'a mut Client,
    message_id: MessageId,
    pending: Option<ServerFrame>,
    chunks: u64,
    bytes: u64,
    finished: bool,
}

impl Download<'_> {
    /// Next chunk, or `None` once the download has completed
    ///
    /// # Errors
    ///
    /// Returns `Rejected` if the server aborted the stream, or
    /// `UnexpectedResponse` if the completion totals do not match the chunks
    /// received.
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, ClientError> {
        if self.finished {
            return Ok(None);
        }

        let frame = match self.pending.take() {
            Some(frame) => frame,
            None => match self.client.read_frame().await {
                Ok(frame) => frame,
                Err(e) => {
                    self.finished = true;
                    return Err(e);
                }
            },
        };

        match frame {
            ServerFrame::Chunk {
                message_id,
                content,
            } if message_id == self.message_id => {
                self.chunks += 1;
                self.bytes += content.len() as u64;
                Ok(Some(content))
            }
            ServerFrame::Message(received) => {
                self.finished = true;
                match received.message {
                    ServerMessage::DownloadComplete { chunks, size } => {
                        if chunks != self.chunks || size != self.bytes {
                            return Err(ClientError::UnexpectedResponse(format!(
                                "download reported {chunks} chunks / {size} bytes, received {} / {}",
                                self.chunks, self.bytes
                            )));
                        }
                        debug!(chunks, size, "download complete");
                        Ok(None)
                    }
                    ServerMessage::Error { kind, message, .. } => {
                        Err(ClientError::Rejected { kind, message })
                    }
                    other => {
                        self.client.desynchronized = true;
                        Err(unexpected(&other))
                    }
                }
            }
            ServerFrame::Chunk { .. } => {
                self.finished = true;
                self.client.desynchronized = true;
                Err(ClientError::UnexpectedResponse(
                    "FileChunk for another request".to_string(),
                ))
            }
        }
    }

    /// Chunks received so far
    #[must_use]
    pub fn chunks(&self) -> u64 {
        self.chunks
    }

    /// Bytes received so far
    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Whether the stream has ended (completed or failed)
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Drop for Download<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.client.desynchronized = true;
        }
    }
}
