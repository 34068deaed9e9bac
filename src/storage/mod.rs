pub mod file;
pub mod memory;

use crate::catalog::types::Record;
use crate::error::FlatDbError;
use async_trait::async_trait;
use indexmap::IndexMap;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Full persisted state: collection name to its records, in insertion order.
pub type Snapshot = IndexMap<String, Vec<Record>>;

/// Whole-snapshot persistence. There are no partial reads or writes at this
/// boundary; a write replaces everything previously stored.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn read_snapshot(&self) -> Result<Snapshot, FlatDbError>;

    async fn write_snapshot(&self, snapshot: Snapshot) -> Result<(), FlatDbError>;
}

pub(crate) fn empty_snapshot<I, S>(collections: I) -> Snapshot
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    collections
        .into_iter()
        .map(|name| (name.into(), Vec::new()))
        .collect()
}
