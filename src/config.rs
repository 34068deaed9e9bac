use crate::error::FlatDbError;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum SnapshotFormat {
    #[default]
    Json,
    MessagePack,
}

impl SnapshotFormat {
    pub fn parse(value: &str) -> Result<Self, FlatDbError> {
        match value.to_ascii_lowercase().as_str() {
            "json" => Ok(SnapshotFormat::Json),
            "msgpack" | "messagepack" => Ok(SnapshotFormat::MessagePack),
            other => Err(FlatDbError::InvalidConfig {
                message: format!("unknown snapshot format '{other}'"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurabilityMode {
    /// fsync the snapshot file and its directory on every write.
    Full,
    OsBuffered,
}

/// Runtime configuration for a database handle and its file storage.
#[derive(Debug, Clone)]
pub struct FlatDbConfig {
    pub snapshot_format: SnapshotFormat,
    pub pretty_json: bool,
    pub durability: DurabilityMode,
    /// Copy the current snapshot to `<file>.prev` before replacing it.
    pub keep_previous_snapshot: bool,
    /// Treat a missing snapshot file as an empty snapshot instead of an error.
    pub create_if_missing: bool,
    /// Collections created empty when the database is opened.
    pub bootstrap_collections: Vec<String>,
}

impl Default for FlatDbConfig {
    fn default() -> Self {
        Self {
            snapshot_format: SnapshotFormat::Json,
            pretty_json: true,
            durability: DurabilityMode::Full,
            keep_previous_snapshot: true,
            create_if_missing: true,
            bootstrap_collections: Vec::new(),
        }
    }
}

impl FlatDbConfig {
    pub fn production() -> Self {
        Self {
            durability: DurabilityMode::Full,
            keep_previous_snapshot: true,
            create_if_missing: false,
            ..Self::default()
        }
    }

    pub fn development() -> Self {
        Self {
            durability: DurabilityMode::OsBuffered,
            keep_previous_snapshot: false,
            create_if_missing: true,
            ..Self::default()
        }
    }

    pub fn with_format(mut self, format: SnapshotFormat) -> Self {
        self.snapshot_format = format;
        if format == SnapshotFormat::MessagePack {
            self.pretty_json = false;
        }
        self
    }

    pub fn with_collections<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bootstrap_collections = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn fsync(&self) -> bool {
        matches!(self.durability, DurabilityMode::Full)
    }
}

pub(crate) fn validate_config(config: &FlatDbConfig) -> Result<(), FlatDbError> {
    if config.pretty_json && config.snapshot_format != SnapshotFormat::Json {
        return Err(FlatDbError::InvalidConfig {
            message: "pretty_json requires the json snapshot format".into(),
        });
    }
    let mut seen = BTreeSet::new();
    for name in &config.bootstrap_collections {
        if name.trim().is_empty() {
            return Err(FlatDbError::InvalidConfig {
                message: "bootstrap collection names must not be empty".into(),
            });
        }
        if !seen.insert(name.as_str()) {
            return Err(FlatDbError::InvalidConfig {
                message: format!("duplicate bootstrap collection '{name}'"),
            });
        }
    }
    Ok(())
}
