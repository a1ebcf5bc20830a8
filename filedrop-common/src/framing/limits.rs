//! Per-type payload limits for protocol messages

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::CHUNK_SIZE;

/// Apply 20% padding to a limit for safety margin
const fn pad_limit(base: u64) -> u64 {
    // Use integer math: multiply by 6 and divide by 5 equals 1.2x
    (base * 6) / 5
}

/// Maximum payload sizes for each message type
///
/// Base limits match the maximum possible serialized JSON size given the
/// file name validator (255 bytes, worst case every byte escaped to two),
/// then 20% padding is added. Tests verify the base values hold.
///
/// A limit of `0` means "unlimited": `FileData` is bounded by the server's
/// configured maximum upload size instead, and `FileListResponse` grows
/// with the number of uploaded files.
static MESSAGE_TYPE_LIMITS: LazyLock<HashMap<&'static str, u64>> = LazyLock::new(|| {
    let mut m = HashMap::new();

    // Client messages
    m.insert("UploadFile", pad_limit(569)); // name (510 escaped) + size (20 digits) + overhead
    m.insert("GetFileList", pad_limit(22)); // {"type":"GetFileList"} = 22 bytes
    m.insert("DownloadFile", pad_limit(543)); // name (510 escaped) + overhead
    m.insert("FileData", 0);

    // Server messages
    m.insert("UploadFileResponse", pad_limit(300));
    m.insert("FileListResponse", 0);
    m.insert("DownloadComplete", pad_limit(85)); // two u64 fields + overhead
    m.insert("Error", pad_limit(2200)); // kind + message (2048) + command + overhead
    m.insert("FileChunk", CHUNK_SIZE as u64); // raw bytes, never more than one chunk

    m
});

/// Whether `message_type` is a type this protocol knows
#[must_use]
pub fn is_known_message_type(message_type: &str) -> bool {
    MESSAGE_TYPE_LIMITS.contains_key(message_type)
}

/// Maximum payload length for `message_type` (0 = unlimited or unknown)
#[must_use]
pub fn max_payload_for_type(message_type: &str) -> u64 {
    MESSAGE_TYPE_LIMITS
        .get(message_type)
        .copied()
        .unwrap_or(0)
}
