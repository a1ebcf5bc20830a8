//! Protocol definitions for Filedrop
//!
//! Control messages are JSON payloads inside frames (see [`crate::framing`]).
//! File content never goes through JSON: uploads carry it in a raw
//! [`FILE_DATA_TYPE`] frame and downloads stream it as raw
//! [`FILE_CHUNK_TYPE`] frames.
//!
//! ## Request flows
//!
//! **Upload:** Client: `UploadFile` + `FileData` → Server: `UploadFileResponse` or `Error`
//!
//! **List:** Client: `GetFileList` → Server: `FileListResponse` or `Error`
//!
//! **Download:** Client: `DownloadFile` → Server: `FileChunk`* then
//! `DownloadComplete`, or `Error` (before or in place of the remaining chunks)

use serde::{Deserialize, Serialize};

use crate::ErrorKind;

/// Frame type for the raw upload payload that follows `UploadFile`
pub const FILE_DATA_TYPE: &str = "FileData";

/// Frame type for one raw download chunk
pub const FILE_CHUNK_TYPE: &str = "FileChunk";

/// Frame types that may open a request
///
/// Everything else a client sends outside an upload is out of sequence.
pub const CLIENT_REQUEST_TYPES: [&str; 3] = ["UploadFile", "GetFileList", "DownloadFile"];

/// Whether `message_type` names a [`ClientMessage`] variant
#[must_use]
pub fn is_client_request_type(message_type: &str) -> bool {
    CLIENT_REQUEST_TYPES.contains(&message_type)
}

/// Client request messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Upload a file; must be followed by one `FileData` frame of `size` bytes
    UploadFile { name: String, size: u64 },
    /// Request the list of uploaded files
    GetFileList,
    /// Download a file as a stream of chunks
    DownloadFile { name: String },
}

/// Server response messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Upload acknowledgment
    UploadFileResponse { message: String },
    /// Current contents of the file index (unordered)
    FileListResponse { files: Vec<FileEntry> },
    /// Terminates a successful download stream
    DownloadComplete { chunks: u64, size: u64 },
    /// Request failed
    Error {
        kind: ErrorKind,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        command: Option<String>,
    },
}

/// One entry of a file listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    /// RFC 3339 timestamp of the first upload
    pub created_at: String,
    /// RFC 3339 timestamp of the latest upload
    pub updated_at: String,
}
