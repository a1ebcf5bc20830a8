//! Input validation functions
//!
//! Shared between client and server: clients use them for pre-validation,
//! the server uses them for enforcement before any admission slot is taken.

mod file_name;

pub use file_name::{FileNameError, MAX_FILE_NAME_LENGTH, validate_file_name};
