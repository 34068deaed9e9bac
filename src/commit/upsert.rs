use crate::catalog::types::{Record, Value};
use crate::error::{FlatDbError, ResourceType};
use crate::storage::StorageBackend;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// Merged over the record with the same primary key, in place.
    Updated { position: usize },
    /// Appended with a freshly allocated primary key.
    Inserted { key: i64 },
    /// Appended as-is to a collection without a primary key.
    Appended,
}

/// Read-modify-write of one record against the whole snapshot.
///
/// The collection must already exist. Nothing is written when the call
/// fails.
pub async fn upsert(
    storage: &dyn StorageBackend,
    collection: &str,
    primary_key: Option<&str>,
    record: Record,
) -> Result<Record, FlatDbError> {
    let mut snapshot = storage.read_snapshot().await?;
    let rows = snapshot
        .get_mut(collection)
        .ok_or_else(|| FlatDbError::collection_not_found(collection))?;
    let (outcome, stored) = apply_upsert(rows, collection, primary_key, record)?;
    let rows_after = rows.len();
    storage.write_snapshot(snapshot).await?;
    info!(collection, ?outcome, rows = rows_after, "record upserted");
    Ok(stored)
}

/// Applies one upsert to a collection's rows and returns the stored record.
pub fn apply_upsert(
    rows: &mut Vec<Record>,
    collection: &str,
    primary_key: Option<&str>,
    mut record: Record,
) -> Result<(UpsertOutcome, Record), FlatDbError> {
    let Some(pk) = primary_key else {
        rows.push(record.clone());
        return Ok((UpsertOutcome::Appended, record));
    };

    let existing_key = record.get(pk).filter(|key| key.is_truthy()).cloned();
    match existing_key {
        Some(key) => {
            let position = rows
                .iter()
                .position(|row| row.field(pk) == &key)
                .ok_or_else(|| FlatDbError::NotFound {
                    resource_type: ResourceType::Record,
                    resource_id: format!("{collection}.{pk}={}", describe_key(&key)),
                })?;
            let mut merged = rows[position].clone();
            merged.merge(record);
            rows[position] = merged.clone();
            Ok((UpsertOutcome::Updated { position }, merged))
        }
        None => {
            let key = next_key(rows, collection, pk)?;
            record.insert(pk, key);
            rows.push(record.clone());
            Ok((UpsertOutcome::Inserted { key }, record))
        }
    }
}

/// `last row's key + 1`, or 1 for an empty collection.
fn next_key(rows: &[Record], collection: &str, pk: &str) -> Result<i64, FlatDbError> {
    let last = match rows.last() {
        None => 0,
        Some(row) => match row.field(pk) {
            Value::Integer(key) => *key,
            Value::Float(key) if key.fract() == 0.0 && key.is_finite() => *key as i64,
            other => {
                return Err(FlatDbError::Integrity {
                    message: format!(
                        "cannot allocate a key in '{collection}': last {pk} is {} not an integer",
                        other.kind_name()
                    ),
                });
            }
        },
    };
    last.checked_add(1).ok_or_else(|| FlatDbError::Integrity {
        message: format!("primary key space exhausted in '{collection}'"),
    })
}

fn describe_key(key: &Value) -> String {
    match key {
        Value::Text(text) => text.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        other => other.kind_name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{UpsertOutcome, apply_upsert};
    use crate::catalog::types::{Record, Value};

    fn rows() -> Vec<Record> {
        vec![
            Record::new().with("id", 1).with("name", "Edward").with("age", 64),
            Record::new().with("id", 4).with("name", "Wiktor").with("age", 24),
        ]
    }

    #[test]
    fn allocates_after_last_key_not_after_max_or_len() {
        let mut rows = rows();
        let (outcome, stored) =
            apply_upsert(&mut rows, "people", Some("id"), Record::new().with("name", "Ann"))
                .expect("insert");
        assert_eq!(outcome, UpsertOutcome::Inserted { key: 5 });
        assert_eq!(stored.field("id"), &Value::Integer(5));
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], stored);
    }

    #[test]
    fn falsy_key_is_replaced_by_allocation() {
        let mut rows = Vec::new();
        let record = Record::new().with("id", 0).with("name", "First");
        let (outcome, stored) =
            apply_upsert(&mut rows, "people", Some("id"), record).expect("insert");
        assert_eq!(outcome, UpsertOutcome::Inserted { key: 1 });
        assert_eq!(stored.field("id"), &Value::Integer(1));
    }

    #[test]
    fn update_merges_in_place() {
        let mut rows = rows();
        let patch = Record::new().with("id", 1).with("age", 65).with("city", "Oslo");
        let (outcome, stored) =
            apply_upsert(&mut rows, "people", Some("id"), patch).expect("update");
        assert_eq!(outcome, UpsertOutcome::Updated { position: 0 });
        assert_eq!(rows.len(), 2);
        assert_eq!(stored.field("name"), &Value::from("Edward"));
        assert_eq!(stored.field("age"), &Value::Integer(65));
        assert_eq!(rows[0], stored);
        assert_eq!(rows[1].field("id"), &Value::Integer(4));
    }

    #[test]
    fn unknown_explicit_key_is_not_found_and_leaves_rows_alone() {
        let mut rows = rows();
        let err = apply_upsert(&mut rows, "people", Some("id"), Record::new().with("id", 9))
            .expect_err("unknown key");
        assert_eq!(err.code_str(), "record_not_found");
        assert_eq!(rows, self::rows());
    }

    #[test]
    fn non_integer_last_key_is_an_integrity_error() {
        let mut rows = vec![Record::new().with("id", "abc")];
        let err = apply_upsert(&mut rows, "people", Some("id"), Record::new())
            .expect_err("bad key");
        assert_eq!(err.code_str(), "integrity");
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn keyless_collections_append_unchanged() {
        let mut rows = vec![Record::new().with("value", "Drama")];
        let (outcome, stored) =
            apply_upsert(&mut rows, "genres", None, Record::new().with("value", "Comedy"))
                .expect("append");
        assert_eq!(outcome, UpsertOutcome::Appended);
        assert!(!stored.contains("id"));
        assert_eq!(rows.len(), 2);
    }
}
