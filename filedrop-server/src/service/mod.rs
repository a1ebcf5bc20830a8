//! File service: upload, list and streamed download
//!
//! Every operation takes an admission slot for its class before touching the
//! index or storage, and releases it on every exit path. Name validation
//! happens before admission so malformed requests never consume capacity.

mod download;
mod error;
mod upload;

pub use download::{ChunkStream, StreamState};
pub use error::ServiceError;
pub use upload::PendingUpload;

use tracing::warn;

use filedrop_common::protocol::FileEntry;
use filedrop_common::validators::validate_file_name;

use crate::admission::{AdmissionController, AdmissionSlot, OperationClass};
use crate::constants::{
    DEFAULT_MAX_DOWNLOADS, DEFAULT_MAX_LISTINGS, DEFAULT_MAX_UPLOAD_SIZE, DEFAULT_MAX_UPLOADS,
};
use crate::files::{FileIndex, FileMetadata, Storage};

/// Capacities and limits for a [`FileService`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceConfig {
    pub upload_capacity: usize,
    pub download_capacity: usize,
    pub list_capacity: usize,
    /// Largest accepted upload in bytes
    pub max_upload_size: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            upload_capacity: DEFAULT_MAX_UPLOADS,
            download_capacity: DEFAULT_MAX_DOWNLOADS,
            list_capacity: DEFAULT_MAX_LISTINGS,
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
        }
    }
}

/// Shared service context, built once at startup and handed to every
/// connection
#[derive(Debug)]
pub struct FileService {
    index: FileIndex,
    admission: AdmissionController,
    storage: Storage,
    config: ServiceConfig,
}

impl FileService {
    /// Create a service over `storage` with an empty index
    #[must_use]
    pub fn new(storage: Storage, config: ServiceConfig) -> Self {
        Self {
            index: FileIndex::new(),
            admission: AdmissionController::new(
                config.upload_capacity,
                config.download_capacity,
                config.list_capacity,
            ),
            storage,
            config,
        }
    }

    #[must_use]
    pub fn index(&self) -> &FileIndex {
        &self.index
    }

    #[must_use]
    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Store `content` under `name`, replacing any previous content
    ///
    /// # Errors
    ///
    /// Fails with `InvalidName`/`TooLarge` before admission,
    /// `ResourceExhausted` if no upload slot is free, or `Internal` if
    /// storage fails.
    pub async fn upload(&self, name: &str, content: &[u8]) -> Result<FileMetadata, ServiceError> {
        let pending = self.begin_upload(name, content.len() as u64)?;
        pending.commit(content).await
    }

    /// Validate an upload request and reserve an upload slot
    ///
    /// Lets the transport admit or reject a request before its content has
    /// been received.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidName`, `TooLarge` or `ResourceExhausted`.
    pub fn begin_upload(&self, name: &str, size: u64) -> Result<PendingUpload<'_>, ServiceError> {
        validate_file_name(name)?;
        if size > self.config.max_upload_size {
            return Err(ServiceError::TooLarge {
                size,
                max: self.config.max_upload_size,
            });
        }

        let slot = self.acquire(OperationClass::Upload)?;
        Ok(PendingUpload::new(self, name.to_string(), size, slot))
    }

    /// Every indexed file with RFC 3339 timestamps, in no particular order
    ///
    /// # Errors
    ///
    /// Fails with `ResourceExhausted` if no list slot is free.
    pub fn list(&self) -> Result<Vec<FileEntry>, ServiceError> {
        let _slot = self.acquire(OperationClass::List)?;
        Ok(self
            .index
            .snapshot()
            .iter()
            .map(|meta| meta.to_file_entry())
            .collect())
    }

    /// Open `name` for chunked streaming
    ///
    /// The returned stream holds the download slot until it completes, fails
    /// or is dropped.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidName`, `ResourceExhausted`, `NotFound` if the name
    /// was never uploaded, or `Internal` if the stored file cannot be opened.
    pub async fn download(&self, name: &str) -> Result<ChunkStream, ServiceError> {
        validate_file_name(name)?;
        let slot = self.acquire(OperationClass::Download)?;

        if !self.index.contains(name) {
            return Err(ServiceError::NotFound(name.to_string()));
        }

        let file = self.storage.open(name).await?;
        Ok(ChunkStream::new(name.to_string(), file, slot))
    }

    fn acquire(&self, class: OperationClass) -> Result<AdmissionSlot, ServiceError> {
        self.admission.try_acquire(class).ok_or_else(|| {
            warn!(
                class = %class,
                capacity = self.admission.capacity(class),
                "admission rejected"
            );
            ServiceError::ResourceExhausted(class)
        })
    }
}
