pub mod catalog;
pub mod commit;
pub mod config;
pub mod error;
pub mod movies;
pub mod query;
pub mod repository;
pub mod storage;

use crate::catalog::types::Record;
use crate::config::{FlatDbConfig, validate_config};
use crate::error::FlatDbError;
use crate::query::executor::Pipeline;
use crate::repository::Entity;
use crate::storage::{FileStorage, MemoryStorage, Snapshot, StorageBackend};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

pub use crate::catalog::{FieldRule, RecordSchema, SchemaDef, Value};
pub use crate::query::plan::{Order, QueryOutput, WorkingSet};

/// Database handle: one storage backend plus the configuration it was opened
/// with. Cheap to clone; every clone shares the backend.
#[derive(Clone)]
pub struct FlatDb {
    config: FlatDbConfig,
    storage: Arc<dyn StorageBackend>,
}

impl std::fmt::Debug for FlatDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlatDb")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FlatDb {
    /// Wraps a backend without touching it.
    pub fn with_storage(
        config: FlatDbConfig,
        storage: Arc<dyn StorageBackend>,
    ) -> Result<Self, FlatDbError> {
        validate_config(&config)?;
        Ok(Self { config, storage })
    }

    /// Wraps a backend and creates any missing bootstrap collections.
    pub async fn open(
        config: FlatDbConfig,
        storage: Arc<dyn StorageBackend>,
    ) -> Result<Self, FlatDbError> {
        validate_config(&config)?;
        info!(
            snapshot_format = ?config.snapshot_format,
            durability = ?config.durability,
            keep_previous_snapshot = config.keep_previous_snapshot,
            create_if_missing = config.create_if_missing,
            bootstrap_collections = config.bootstrap_collections.len(),
            "opening flatdb"
        );
        let db = Self { config, storage };
        if !db.config.bootstrap_collections.is_empty() {
            let names = db.config.bootstrap_collections.clone();
            db.ensure_collections(&names).await?;
        }
        Ok(db)
    }

    pub async fn open_file(config: FlatDbConfig, path: &Path) -> Result<Self, FlatDbError> {
        let storage = Arc::new(FileStorage::new(path, &config));
        Self::open(config, storage).await
    }

    pub fn in_memory<I, S>(collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            config: FlatDbConfig::development(),
            storage: Arc::new(MemoryStorage::new(collections)),
        }
    }

    pub fn config(&self) -> &FlatDbConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.storage
    }

    pub fn query<E: Entity>(&self) -> Pipeline<E> {
        Pipeline::new(Arc::clone(&self.storage))
    }

    pub async fn snapshot(&self) -> Result<Snapshot, FlatDbError> {
        self.storage.read_snapshot().await
    }

    pub async fn upsert(
        &self,
        collection: &str,
        primary_key: Option<&str>,
        record: Record,
    ) -> Result<Record, FlatDbError> {
        commit::upsert(self.storage.as_ref(), collection, primary_key, record).await
    }

    /// Adds every missing collection as empty. Returns how many were added;
    /// storage is only written when that is non-zero.
    pub async fn ensure_collections<S: AsRef<str>>(
        &self,
        names: &[S],
    ) -> Result<usize, FlatDbError> {
        let mut snapshot = self.storage.read_snapshot().await?;
        let mut added = 0;
        for name in names {
            let name = name.as_ref();
            if !snapshot.contains_key(name) {
                snapshot.insert(name.to_string(), Vec::new());
                added += 1;
            }
        }
        if added > 0 {
            self.storage.write_snapshot(snapshot).await?;
        }
        debug!(requested = names.len(), added, "collections ensured");
        Ok(added)
    }
}
