use crate::FlatDb;
use crate::catalog::schema::{RecordSchema, SchemaDef};
use crate::catalog::types::{Record, Value};
use crate::error::FlatDbError;
use crate::query::executor::Pipeline;
use async_trait::async_trait;

/// A concrete domain type backed by a record of one collection.
///
/// Implementors own their `Record`; typed accessors read from it. `save` and
/// `load` take the database handle explicitly so an entity never keeps a
/// reference to storage.
#[async_trait]
pub trait Entity: Sized + Send + Sync + 'static {
    fn schema() -> &'static SchemaDef;

    fn from_record(record: Record) -> Result<Self, FlatDbError>;

    fn record(&self) -> &Record;

    fn record_mut(&mut self) -> &mut Record;

    fn collection() -> &'static str {
        Self::schema().collection_name()
    }

    fn primary_key_field() -> Option<&'static str> {
        Self::schema().primary_key_field()
    }

    /// The primary-key value, if the entity has one assigned.
    fn primary_key(&self) -> Option<&Value> {
        let field = Self::primary_key_field()?;
        self.record().get(field).filter(|value| value.is_truthy())
    }

    fn query(db: &FlatDb) -> Pipeline<Self> {
        db.query::<Self>()
    }

    /// Schema validation plus any checks that need the database. Override to
    /// add the latter and call `validate_schema` first.
    async fn validate(&self, _db: &FlatDb) -> Result<(), FlatDbError> {
        self.validate_schema()
    }

    fn validate_schema(&self) -> Result<(), FlatDbError> {
        Self::schema().validate(self.record())
    }

    /// Coerces, validates, then upserts. A freshly allocated key (and any
    /// stored fields the instance lacked) is written back onto `self`.
    async fn save(&mut self, db: &FlatDb) -> Result<(), FlatDbError> {
        Self::schema().sanitize(self.record_mut());
        self.validate(db).await?;
        let stored = db
            .upsert(
                Self::collection(),
                Self::primary_key_field(),
                self.record().clone(),
            )
            .await?;
        *self.record_mut() = stored;
        Ok(())
    }

    /// Re-reads the record by primary key and merges every stored field onto
    /// the instance. Returns `false` when no stored record matches.
    async fn load(&mut self, db: &FlatDb) -> Result<bool, FlatDbError> {
        let key = self.primary_key().cloned().ok_or_else(|| {
            FlatDbError::InvalidArgument(format!(
                "cannot load a '{}' record without a primary key value",
                Self::collection()
            ))
        })?;
        match Self::query(db).find(key).await? {
            Some(found) => {
                let fetched = found.record().clone();
                self.record_mut().merge(fetched);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

pub fn text_field<'a>(record: &'a Record, field: &str) -> Option<&'a str> {
    record.get(field).and_then(Value::as_str)
}

pub fn i64_field(record: &Record, field: &str) -> Option<i64> {
    record.get(field).and_then(Value::as_i64)
}

pub fn text_list_field(record: &Record, field: &str) -> Vec<String> {
    record
        .get(field)
        .and_then(Value::as_list)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Fails when a field that materialization relies on has the wrong kind.
pub fn expect_kind(record: &Record, field: &str, kind: &'static str) -> Result<(), FlatDbError> {
    match record.get(field) {
        None | Some(Value::Null) => Ok(()),
        Some(value) if value.kind_name() == kind => Ok(()),
        Some(value) => Err(FlatDbError::Decode(format!(
            "field '{field}' expected {kind}, got {}",
            value.kind_name()
        ))),
    }
}
