//! Wire framing for Filedrop messages
//!
//! Every message on the wire is a single frame:
//!
//! ```text
//! FD|<type_len>|<type>|<msg_id>|<payload_len>|<payload>\n
//! ```
//!
//! - `type_len`: decimal length of the message type (1-3 digits)
//! - `type`: message type name (e.g., "UploadFile", "FileChunk")
//! - `msg_id`: 12 lowercase hex characters; responses echo the request's ID
//! - `payload_len`: decimal payload length in bytes (1-20 digits)
//! - `payload`: JSON for control messages, raw bytes for `FileData`/`FileChunk`
//!
//! Unknown message types and payloads above the per-type limit are rejected
//! after the header is parsed, before any payload byte is read. `FileData`
//! and `FileListResponse` have no fixed limit: the server bounds `FileData`
//! by its upload cap and accepts it only right after `UploadFile`, and
//! payload buffers grow with the bytes actually received rather than the
//! declared length.

mod error;
mod frame;
mod limits;
mod message_id;
mod reader;
mod writer;

pub use error::FrameError;
pub use frame::RawFrame;
pub use limits::{is_known_message_type, max_payload_for_type};
pub use message_id::MessageId;
pub use reader::{DEFAULT_FRAME_TIMEOUT, FrameHeader, FrameReader};
pub use writer::FrameWriter;

/// Magic bytes that start every frame
pub const MAGIC: &[u8] = b"FD|";

/// Field delimiter
pub const DELIMITER: u8 = b'|';

/// Frame terminator
pub const TERMINATOR: u8 = b'\n';

/// Length of the message ID field in bytes
pub const MSG_ID_LENGTH: usize = 12;

/// Maximum length of a message type name
pub const MAX_TYPE_LENGTH: usize = 64;

/// Maximum number of digits in the type length field
pub const MAX_TYPE_LENGTH_DIGITS: usize = 3;

/// Maximum number of digits in the payload length field (fits any u64)
pub const MAX_PAYLOAD_LENGTH_DIGITS: usize = 20;
