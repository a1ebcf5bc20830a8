//! Filedrop Server Library
//!
//! Admission-controlled file service: upload, list and chunked download
//! over the Filedrop framed protocol. Exposed as a library for the
//! `filedropd` binary and for integration testing.

pub mod admission;
pub mod connection;
pub mod constants;
pub mod files;
mod handlers;
pub mod server;
pub mod service;

pub use admission::{AdmissionController, AdmissionSlot, OperationClass};
pub use files::{FileIndex, FileMetadata, Storage, StorageError};
pub use server::serve;
pub use service::{ChunkStream, FileService, ServiceConfig, ServiceError};
