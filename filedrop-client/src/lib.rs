//! Filedrop Client Library
//!
//! Async client for uploading, listing and downloading files on a Filedrop
//! server.

mod client;
mod error;

pub use client::{CONNECTION_TIMEOUT, Client, Download};
pub use error::ClientError;
