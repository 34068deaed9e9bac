use crate::config::{FlatDbConfig, SnapshotFormat};
use crate::error::FlatDbError;
use crate::storage::{Snapshot, StorageBackend};
use async_trait::async_trait;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Snapshot persisted as a single file, replaced atomically on every write.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
    format: SnapshotFormat,
    pretty: bool,
    fsync: bool,
    keep_previous: bool,
    create_if_missing: bool,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>, config: &FlatDbConfig) -> Self {
        Self {
            path: path.into(),
            format: config.snapshot_format,
            pretty: config.pretty_json,
            fsync: config.fsync(),
            keep_previous: config.keep_previous_snapshot,
            create_if_missing: config.create_if_missing,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn previous_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".prev");
        PathBuf::from(name)
    }

    fn encode(&self, snapshot: &Snapshot) -> Result<Vec<u8>, FlatDbError> {
        let encoded = match self.format {
            SnapshotFormat::Json if self.pretty => {
                serde_json::to_vec_pretty(snapshot).map_err(|e| e.to_string())
            }
            SnapshotFormat::Json => serde_json::to_vec(snapshot).map_err(|e| e.to_string()),
            SnapshotFormat::MessagePack => {
                rmp_serde::to_vec_named(snapshot).map_err(|e| e.to_string())
            }
        };
        encoded.map_err(FlatDbError::Encode)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Snapshot, FlatDbError> {
        match self.format {
            SnapshotFormat::Json => {
                serde_json::from_slice(bytes).map_err(|e| FlatDbError::Decode(e.to_string()))
            }
            SnapshotFormat::MessagePack => {
                rmp_serde::from_slice(bytes).map_err(|e| FlatDbError::Decode(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl StorageBackend for FileStorage {
    async fn read_snapshot(&self) -> Result<Snapshot, FlatDbError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && self.create_if_missing => {
                warn!(path = %self.path.display(), "snapshot file missing, reading as empty");
                return Ok(Snapshot::new());
            }
            Err(e) => return Err(FlatDbError::Io(e)),
        };
        debug!(path = %self.path.display(), bytes = bytes.len(), "snapshot read");
        self.decode(&bytes)
    }

    async fn write_snapshot(&self, snapshot: Snapshot) -> Result<(), FlatDbError> {
        let bytes = self.encode(&snapshot)?;
        let path = self.path.clone();
        let previous = self.keep_previous.then(|| self.previous_path());
        let fsync = self.fsync;
        let len = bytes.len();
        tokio::task::spawn_blocking(move || {
            write_snapshot_atomic(&path, previous.as_deref(), &bytes, fsync)
        })
        .await
        .map_err(|e| FlatDbError::Io(std::io::Error::other(e.to_string())))??;
        debug!(path = %self.path.display(), bytes = len, "snapshot written");
        Ok(())
    }
}

fn write_snapshot_atomic(
    path: &Path,
    previous: Option<&Path>,
    bytes: &[u8],
    fsync: bool,
) -> Result<(), FlatDbError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    if let Some(prev) = previous
        && path.exists()
    {
        fs::copy(path, prev)?;
        if fsync {
            fsync_file(prev)?;
        }
    }

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    if fsync {
        tmp.as_file().sync_all()?;
    }
    tmp.persist(path).map_err(|e| FlatDbError::Io(e.error))?;
    if fsync {
        fsync_dir(dir)?;
    }
    Ok(())
}

fn fsync_file(path: &Path) -> Result<(), FlatDbError> {
    let file = fs::OpenOptions::new().read(true).open(path)?;
    file.sync_all()?;
    Ok(())
}

fn fsync_dir(path: &Path) -> Result<(), FlatDbError> {
    #[cfg(unix)]
    {
        let dir = fs::File::open(path)?;
        dir.sync_all()?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}
