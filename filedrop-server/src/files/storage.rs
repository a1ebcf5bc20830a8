//! Filesystem storage for file contents
//!
//! Files live directly under the storage root, one regular file per name.
//! New content is first written to `<root>/.staging/<uuid>.part` and then
//! renamed over the final path, so a reader opening `<root>/<name>` sees
//! either the old bytes or the new bytes, never a mix.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use filedrop_common::STAGING_DIR_NAME;

/// Extension for in-progress upload files
const PART_EXTENSION: &str = "part";

/// Storage setup errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("storage root {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("failed to clean staging directory {}: {source}", .path.display())]
    CleanStaging { path: PathBuf, source: io::Error },
}

/// Handle to the storage root directory
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
    staging: PathBuf,
}

impl Storage {
    /// Open (creating if missing) the storage root and its staging area
    ///
    /// Leftover `.part` files from a previous run are removed. Returns the
    /// storage handle and the number of stale files purged.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created or the staging
    /// directory cannot be read.
    pub fn open_root(root: impl Into<PathBuf>) -> Result<(Self, usize), StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StorageError::CreateDir {
            path: root.clone(),
            source,
        })?;
        if !root.is_dir() {
            return Err(StorageError::NotADirectory(root));
        }

        let staging = root.join(STAGING_DIR_NAME);
        fs::create_dir_all(&staging).map_err(|source| StorageError::CreateDir {
            path: staging.clone(),
            source,
        })?;

        let purged = purge_part_files(&staging).map_err(|source| StorageError::CleanStaging {
            path: staging.clone(),
            source,
        })?;

        Ok((Self { root, staging }, purged))
    }

    /// Storage root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final path for a validated file name
    #[must_use]
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Write `content` in full to a new staging file and flush it to disk
    ///
    /// The staging file is removed if writing fails, and also when the
    /// returned [`StagedFile`] is dropped without being committed.
    pub async fn stage(&self, content: &[u8]) -> io::Result<StagedFile> {
        let path = self
            .staging
            .join(format!("{}.{}", Uuid::new_v4().simple(), PART_EXTENSION));

        // Created up front so a failed write below still cleans up
        let staged = StagedFile {
            path: path.clone(),
            committed: false,
        };

        let mut file = tokio::fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&path)
            .await?;
        file.write_all(content).await?;
        file.sync_all().await?;

        Ok(staged)
    }

    /// Open the stored content for `name` for reading
    pub async fn open(&self, name: &str) -> io::Result<File> {
        File::open(self.path_for(name)).await
    }
}

/// A fully written upload waiting to be moved into place
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    committed: bool,
}

impl StagedFile {
    /// Path of the staging file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically replace `target` with the staged content
    ///
    /// Synchronous so it can run inside the file index critical section.
    pub fn commit(&mut self, target: &Path) -> io::Result<()> {
        fs::rename(&self.path, target)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// Remove every `*.part` file directly inside `dir`
fn purge_part_files(dir: &Path) -> io::Result<usize> {
    let mut purged = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_part = path
            .extension()
            .is_some_and(|ext| ext == PART_EXTENSION);
        if is_part && path.is_file() {
            fs::remove_file(&path)?;
            purged += 1;
        }
    }
    Ok(purged)
}
