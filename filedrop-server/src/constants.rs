//! Server defaults and fixed strings

/// Default storage directory, relative to the working directory
pub const DEFAULT_STORAGE_DIR: &str = "./files";

/// Default number of concurrent uploads
pub const DEFAULT_MAX_UPLOADS: usize = 10;

/// Default number of concurrent downloads
pub const DEFAULT_MAX_DOWNLOADS: usize = 10;

/// Default number of concurrent list requests
pub const DEFAULT_MAX_LISTINGS: usize = 100;

/// Default maximum upload size in bytes (64 MiB)
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 64 * 1024 * 1024;

/// Slowest sustained upload rate tolerated, in bytes per second
///
/// A `FileData` payload gets the frame timeout plus the time this rate needs
/// for its declared length.
pub const MIN_UPLOAD_BYTES_PER_SEC: u64 = 64 * 1024;

/// Acknowledgment sent after a successful upload
pub const MSG_UPLOAD_OK: &str = "File uploaded successfully";

/// Error sent when a request frame cannot be parsed
pub const ERR_INVALID_MESSAGE_FORMAT: &str = "Invalid message format";

/// Error sent when `UploadFile` is not followed by its `FileData` frame
pub const ERR_EXPECTED_FILE_DATA: &str = "Expected FileData frame after UploadFile";

/// Default log filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter with `--debug`
pub const DEBUG_LOG_FILTER: &str = "debug";
