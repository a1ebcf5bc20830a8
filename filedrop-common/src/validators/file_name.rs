//! File name validation
//!
//! A file name is a single path component inside the storage root. Anything
//! that could escape the root or collide with the staging area is rejected.

use crate::STAGING_DIR_NAME;

/// Maximum length for file names in bytes
pub const MAX_FILE_NAME_LENGTH: usize = 255;

/// Validation error for file names
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FileNameError {
    /// Name is empty
    #[error("file name is empty")]
    Empty,
    /// Name exceeds maximum length
    #[error("file name exceeds {MAX_FILE_NAME_LENGTH} bytes")]
    TooLong,
    /// Name contains path separators (/ or \)
    #[error("file name contains a path separator")]
    ContainsPathSeparator,
    /// Name is "." or ".."
    #[error("file name is a directory reference")]
    DirectoryReference,
    /// Name contains null bytes
    #[error("file name contains a null byte")]
    ContainsNull,
    /// Name contains control characters
    #[error("file name contains control characters")]
    InvalidCharacters,
    /// Name is reserved by the server
    #[error("file name is reserved")]
    Reserved,
}

/// Validate a file name for upload or download
///
/// Checks:
/// - Not empty
/// - Does not exceed maximum length (255 bytes)
/// - Not "." or ".."
/// - Not the staging directory name
/// - No path separators (/ or \)
/// - No null bytes
/// - No control characters
///
/// # Errors
///
/// Returns a `FileNameError` variant describing the validation failure.
pub fn validate_file_name(name: &str) -> Result<(), FileNameError> {
    if name.is_empty() {
        return Err(FileNameError::Empty);
    }

    if name.len() > MAX_FILE_NAME_LENGTH {
        return Err(FileNameError::TooLong);
    }

    if name == "." || name == ".." {
        return Err(FileNameError::DirectoryReference);
    }

    if name == STAGING_DIR_NAME {
        return Err(FileNameError::Reserved);
    }

    for ch in name.chars() {
        if ch == '/' || ch == '\\' {
            return Err(FileNameError::ContainsPathSeparator);
        }

        if ch == '\0' {
            return Err(FileNameError::ContainsNull);
        }

        // Null is handled above
        if ch.is_control() {
            return Err(FileNameError::InvalidCharacters);
        }
    }

    Ok(())
}
