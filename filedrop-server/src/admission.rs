//! Admission control for file operations
//!
//! Each operation class (upload, download, list) has a fixed number of slots.
//! Acquisition never waits: when a class is full the request is rejected and
//! the caller reports `resource_exhausted`.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Operation classes with independent capacities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationClass {
    Upload,
    Download,
    List,
}

impl OperationClass {
    /// Lowercase name used in log output and error messages
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            OperationClass::Upload => "upload",
            OperationClass::Download => "download",
            OperationClass::List => "list",
        }
    }
}

impl fmt::Display for OperationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Slot counter for one operation class
#[derive(Debug)]
struct SlotCounter {
    in_use: AtomicUsize,
    capacity: usize,
}

impl SlotCounter {
    fn new(capacity: usize) -> Self {
        Self {
            in_use: AtomicUsize::new(0),
            capacity,
        }
    }

    /// Increment `in_use` unless it already equals `capacity`
    fn try_increment(&self) -> bool {
        self.in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < self.capacity).then_some(current + 1)
            })
            .is_ok()
    }

    fn decrement(&self) {
        // Saturate rather than wrap if a release is ever unmatched
        let _ = self
            .in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current.checked_sub(1)
            });
    }
}

/// Tracks in-flight operations per class
///
/// Cloning is cheap; clones share the same counters.
#[derive(Debug, Clone)]
pub struct AdmissionController {
    upload: Arc<SlotCounter>,
    download: Arc<SlotCounter>,
    list: Arc<SlotCounter>,
}

impl AdmissionController {
    /// Create a controller with the given per-class capacities
    #[must_use]
    pub fn new(upload_capacity: usize, download_capacity: usize, list_capacity: usize) -> Self {
        Self {
            upload: Arc::new(SlotCounter::new(upload_capacity)),
            download: Arc::new(SlotCounter::new(download_capacity)),
            list: Arc::new(SlotCounter::new(list_capacity)),
        }
    }

    fn counter(&self, class: OperationClass) -> &Arc<SlotCounter> {
        match class {
            OperationClass::Upload => &self.upload,
            OperationClass::Download => &self.download,
            OperationClass::List => &self.list,
        }
    }

    /// Try to acquire a slot for `class`
    ///
    /// Returns `Some(AdmissionSlot)` if a slot was free, or `None` if the
    /// class is at capacity. The returned slot is released when dropped.
    pub fn try_acquire(&self, class: OperationClass) -> Option<AdmissionSlot> {
        let counter = self.counter(class);
        if !counter.try_increment() {
            return None;
        }

        Some(AdmissionSlot {
            class,
            counter: counter.clone(),
        })
    }

    /// Number of slots currently held for `class`
    #[must_use]
    pub fn in_use(&self, class: OperationClass) -> usize {
        self.counter(class).in_use.load(Ordering::Acquire)
    }

    /// Configured capacity for `class`
    #[must_use]
    pub fn capacity(&self, class: OperationClass) -> usize {
        self.counter(class).capacity
    }

    /// Number of slots currently free for `class`
    #[must_use]
    pub fn available(&self, class: OperationClass) -> usize {
        self.capacity(class).saturating_sub(self.in_use(class))
    }
}

/// RAII guard for one admission slot
///
/// The slot is released exactly once, when the guard is dropped, on every
/// exit path of the operation holding it.
#[derive(Debug)]
pub struct AdmissionSlot {
    class: OperationClass,
    counter: Arc<SlotCounter>,
}

impl AdmissionSlot {
    /// Operation class this slot belongs to
    #[must_use]
    pub fn class(&self) -> OperationClass {
        self.class
    }
}

impl Drop for AdmissionSlot {
    fn drop(&mut self) {
        self.counter.decrement();
    }
}
