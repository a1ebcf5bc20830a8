//! Chunked download stream

use std::fmt;

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use filedrop_common::CHUNK_SIZE;

use crate::admission::AdmissionSlot;

use super::ServiceError;

/// Lifecycle of a [`ChunkStream`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Slot held, file open, more chunks may follow
    Streaming,
    /// Whole file emitted
    Completed,
    /// Ended early by a read error or by the consumer
    Aborted,
}

/// Source of the bytes being streamed, normally the opened storage file
type BoxedSource = Box<dyn AsyncRead + Unpin + Send>;

/// Pull-based, non-restartable sequence of file chunks
///
/// Each chunk is `CHUNK_SIZE` bytes except the last, which may be shorter.
/// An empty file yields no chunks. The source handle and download slot are
/// released as soon as the stream completes or aborts, or when it is dropped.
pub struct ChunkStream {
    name: String,
    source: Option<BoxedSource>,
    slot: Option<AdmissionSlot>,
    state: StreamState,
    chunks: u64,
    bytes: u64,
}

impl ChunkStream {
    pub(crate) fn new<S>(name: String, source: S, slot: AdmissionSlot) -> Self
    where
        S: AsyncRead + Unpin + Send + 'static,
    {
        Self {
            name,
            source: Some(Box::new(source)),
            slot: Some(slot),
            state: StreamState::Streaming,
            chunks: 0,
            bytes: 0,
        }
    }

    /// Next chunk in file order, or `None` once the stream has ended
    ///
    /// After completion or abort every call returns `Ok(None)`.
    ///
    /// # Errors
    ///
    /// A storage read failure aborts the stream and returns `Internal`.
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, ServiceError> {
        let Some(source) = self.source.as_mut() else {
            return Ok(None);
        };

        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut filled = 0;
        while filled < CHUNK_SIZE {
            match source.read(&mut buf[filled..]).await {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) => {
                    self.finish(StreamState::Aborted);
                    return Err(ServiceError::Internal(e));
                }
            }
        }

        if filled == 0 {
            self.finish(StreamState::Completed);
            return Ok(None);
        }

        buf.truncate(filled);
        self.chunks += 1;
        self.bytes += filled as u64;
        Ok(Some(buf))
    }

    /// Stop streaming and release the slot
    ///
    /// Used when the consumer cannot deliver a chunk. No-op once the stream
    /// has already ended.
    pub fn abort(&mut self) {
        if self.state == StreamState::Streaming {
            self.finish(StreamState::Aborted);
        }
    }

    fn finish(&mut self, state: StreamState) {
        self.state = state;
        self.source = None;
        self.slot = None;
        debug!(
            name = %self.name,
            chunks = self.chunks,
            bytes = self.bytes,
            ?state,
            "download stream finished"
        );
    }

    /// File name being streamed
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Chunks emitted so far
    #[must_use]
    pub fn chunks(&self) -> u64 {
        self.chunks
    }

    /// Bytes emitted so far
    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

impl fmt::Debug for ChunkStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkStream")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("chunks", &self.chunks)
            .field("bytes", &self.bytes)
            .finish_non_exhaustive()
    }
}
