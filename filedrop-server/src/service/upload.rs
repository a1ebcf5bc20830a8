//! Upload commit path

use chrono::Utc;
use tracing::debug;

use crate::admission::AdmissionSlot;
use crate::files::FileMetadata;

use super::{FileService, ServiceError};

/// An admitted upload waiting for its content
///
/// Holds the upload slot; dropping it without committing releases the slot
/// and stores nothing.
#[derive(Debug)]
pub struct PendingUpload<'a> {
    service: &'a FileService,
    name: String,
    size: u64,
    _slot: AdmissionSlot,
}

impl<'a> PendingUpload<'a> {
    pub(super) fn new(service: &'a FileService, name: String, size: u64, slot: AdmissionSlot) -> Self {
        Self {
            service,
            name,
            size,
            _slot: slot,
        }
    }

    /// Validated file name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared content length in bytes
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Write `content` and publish it under the pending name
    ///
    /// The content is staged and synced first; the rename over the final path
    /// and the index upsert then happen together under the index lock. On any
    /// failure the staging file is removed and the index is unchanged.
    ///
    /// # Errors
    ///
    /// Returns `SizeMismatch` if `content` differs from the declared size, or
    /// `Internal` on storage failure.
    pub async fn commit(self, content: &[u8]) -> Result<FileMetadata, ServiceError> {
        let actual = content.len() as u64;
        if actual != self.size {
            return Err(ServiceError::SizeMismatch {
                declared: self.size,
                actual,
            });
        }

        let storage = &self.service.storage;
        let mut staged = storage.stage(content).await?;
        let target = storage.path_for(&self.name);

        let meta = self
            .service
            .index
            .publish(&self.name, Utc::now(), || staged.commit(&target))?;

        debug!(name = %self.name, size = actual, "file stored");
        Ok(meta)
    }
}
