//! In-memory index of uploaded files
//!
//! Maps each file name to its creation and last-update timestamps. All reads
//! and writes go through one mutex, so each operation is atomic relative to
//! the others. The index starts empty and is not persisted.

use std::collections::HashMap;
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, SecondsFormat, Utc};

use filedrop_common::protocol::FileEntry;

/// Metadata for one uploaded file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileMetadata {
    /// Wire form with RFC 3339 timestamps (UTC, `Z` suffix)
    #[must_use]
    pub fn to_file_entry(&self) -> FileEntry {
        FileEntry {
            name: self.name.clone(),
            created_at: format_timestamp(&self.created_at),
            updated_at: format_timestamp(&self.updated_at),
        }
    }
}

/// Format a timestamp as RFC 3339 with whole seconds
#[must_use]
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Name to metadata map guarded by a single mutex
#[derive(Debug, Default)]
pub struct FileIndex {
    entries: Mutex<HashMap<String, FileMetadata>>,
}

impl FileIndex {
    /// Create an empty index
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, FileMetadata>> {
        // A panic while holding the lock cannot leave a half-written entry:
        // every mutation is a single insert.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert `name`, or refresh its `updated_at` if already present
    ///
    /// `created_at` of an existing entry is preserved.
    pub fn upsert(&self, name: &str, now: DateTime<Utc>) -> FileMetadata {
        let mut entries = self.lock();
        upsert_locked(&mut entries, name, now)
    }

    /// Run `commit` and upsert `name` as one step under the index lock
    ///
    /// Used to move uploaded bytes into place: readers of the index never see
    /// a name whose content is still being replaced. If `commit` fails the
    /// index is left untouched.
    pub fn publish<F>(&self, name: &str, now: DateTime<Utc>, commit: F) -> io::Result<FileMetadata>
    where
        F: FnOnce() -> io::Result<()>,
    {
        let mut entries = self.lock();
        commit()?;
        Ok(upsert_locked(&mut entries, name, now))
    }

    /// Copy of every entry, in no particular order
    #[must_use]
    pub fn snapshot(&self) -> Vec<FileMetadata> {
        self.lock().values().cloned().collect()
    }

    /// Whether `name` has been uploaded
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    /// Metadata for `name`, if present
    #[must_use]
    pub fn get(&self, name: &str) -> Option<FileMetadata> {
        self.lock().get(name).cloned()
    }

    /// Number of indexed files
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the index is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

fn upsert_locked(
    entries: &mut HashMap<String, FileMetadata>,
    name: &str,
    now: DateTime<Utc>,
) -> FileMetadata {
    entries
        .entry(name.to_string())
        .and_modify(|meta| meta.updated_at = now)
        .or_insert_with(|| FileMetadata {
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;
    use std::thread;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_new_index_is_empty() {
        let index = FileIndex::new();
        assert!(index.is_empty());
        assert!(index.snapshot().is_empty());
        assert!(!index.contains("a.bin"));
    }

    #[test]
    fn test_upsert_creates_entry() {
        let index = FileIndex::new();
        let meta = index.upsert("a.bin", at(0));

        assert_eq!(meta.name, "a.bin");
        assert_eq!(meta.created_at, at(0));
        assert_eq!(meta.updated_at, at(0));
        assert!(index.contains("a.bin"));
    }

    #[test]
    fn test_upsert_preserves_created_at() {
        let index = FileIndex::new();
        index.upsert("a.bin", at(0));
        let meta = index.upsert("a.bin", at(10));

        assert_eq!(meta.created_at, at(0));
        assert_eq!(meta.updated_at, at(10));
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("a.bin"), Some(meta));
    }

    #[test]
    fn test_publish_upserts_after_commit() {
        let index = FileIndex::new();
        let meta = index.publish("a.bin", at(5), || Ok(())).unwrap();

        assert_eq!(meta.created_at, at(5));
        assert!(index.contains("a.bin"));
    }

    #[test]
    fn test_publish_failure_leaves_index_untouched() {
        let index = FileIndex::new();
        index.upsert("a.bin", at(0));

        let result = index.publish("a.bin", at(10), || Err(io::Error::other("disk full")));
        assert!(result.is_err());

        let meta = index.get("a.bin").unwrap();
        assert_eq!(meta.updated_at, at(0));

        let result = index.publish("b.bin", at(10), || Err(io::Error::other("disk full")));
        assert!(result.is_err());
        assert!(!index.contains("b.bin"));
    }

    #[test]
    fn test_snapshot_contains_every_name_once() {
        let index = FileIndex::new();
        index.upsert("a.bin", at(0));
        index.upsert("b.bin", at(1));
        index.upsert("a.bin", at(2));

        let mut names: Vec<_> = index.snapshot().into_iter().map(|m| m.name).collect();
        names.sort();
        assert_eq!(names, vec!["a.bin", "b.bin"]);
    }

    #[test]
    fn test_to_file_entry_formats_rfc3339() {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 45).unwrap();
        let meta = FileMetadata {
            name: "a.bin".to_string(),
            created_at: created,
            updated_at: created + Duration::seconds(15),
        };

        let entry = meta.to_file_entry();
        assert_eq!(entry.name, "a.bin");
        assert_eq!(entry.created_at, "2024-03-01T12:30:45Z");
        assert_eq!(entry.updated_at, "2024-03-01T12:31:00Z");
        assert!(DateTime::parse_from_rfc3339(&entry.created_at).is_ok());
    }

    #[test]
    fn test_concurrent_upserts_same_name() {
        let index = Arc::new(FileIndex::new());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let index = index.clone();
                thread::spawn(move || {
                    index.upsert("shared.bin", at(i));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(index.len(), 1);
        assert_eq!(index.snapshot().len(), 1);
    }
}
