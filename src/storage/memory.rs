use crate::error::FlatDbError;
use crate::storage::{Snapshot, StorageBackend, empty_snapshot};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Snapshot held in process memory. Counts reads and writes so callers can
/// observe how often the engine touches storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    content: Mutex<Snapshot>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryStorage {
    pub fn new<I, S>(collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_snapshot(empty_snapshot(collections))
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            content: Mutex::new(snapshot),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn contents(&self) -> Snapshot {
        self.content.lock().clone()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn read_snapshot(&self) -> Result<Snapshot, FlatDbError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.content.lock().clone())
    }

    async fn write_snapshot(&self, snapshot: Snapshot) -> Result<(), FlatDbError> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        *self.content.lock() = snapshot;
        Ok(())
    }
}
