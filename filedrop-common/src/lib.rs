//! Filedrop Common Library
//!
//! Shared types, protocol, and framing for the Filedrop file service.

mod error_kind;
pub mod framing;
pub mod io;
pub mod protocol;
pub mod validators;

pub use error_kind::ErrorKind;

/// Default port for Filedrop connections
pub const DEFAULT_PORT: u16 = 50051;

/// Default port as a string for CLI defaults and display.
///
/// This is the string representation of [`DEFAULT_PORT`], provided as a constant
/// because Rust doesn't support const string formatting.
pub const DEFAULT_PORT_STR: &str = "50051";

/// Size of each `FileChunk` sent during a download (the last chunk may be shorter)
pub const CHUNK_SIZE: usize = 1024;

/// Name of the server's staging directory inside the storage root.
///
/// Reserved: clients may not upload or download a file with this name.
pub const STAGING_DIR_NAME: &str = ".staging";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port() {
        assert_eq!(DEFAULT_PORT, 50051);
    }

    #[test]
    fn test_default_port_str_matches() {
        assert_eq!(DEFAULT_PORT_STR, DEFAULT_PORT.to_string());
    }

    #[test]
    fn test_chunk_size() {
        assert_eq!(CHUNK_SIZE, 1024);
    }
}
