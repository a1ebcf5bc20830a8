//! File index and storage backend

pub mod index;
pub mod storage;

pub use index::{FileIndex, FileMetadata, format_timestamp};
pub use storage::{StagedFile, Storage, StorageError};
