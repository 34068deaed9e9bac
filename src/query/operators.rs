use crate::catalog::types::Value;
use crate::error::FlatDbError;
use crate::query::plan::{Entry, MatchAnnotations, Order, WorkingSet};
use rand::Rng;
use std::cmp::Ordering;
use std::sync::Arc;

pub type StageFn =
    dyn Fn(WorkingSet, &mut MatchAnnotations) -> Result<WorkingSet, FlatDbError> + Send + Sync;

/// One pipeline step. Stages are plain data until a terminal operation runs
/// them, so cloning a pipeline clones only the handles.
pub type Stage = Arc<StageFn>;

fn stage<F>(f: F) -> Stage
where
    F: Fn(WorkingSet, &mut MatchAnnotations) -> Result<WorkingSet, FlatDbError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

fn retain<F>(working_set: WorkingSet, stage: &str, mut keep: F) -> Result<WorkingSet, FlatDbError>
where
    F: FnMut(&Entry) -> bool,
{
    let mut entries = working_set.into_many(stage)?;
    entries.retain(|entry| keep(entry));
    Ok(WorkingSet::Many(entries))
}

pub fn equals(field: String, value: Value) -> Stage {
    stage(move |ws, _| retain(ws, "filter_eq", |entry| entry.record.field(&field) == &value))
}

pub fn predicate<F>(field: String, predicate: F) -> Stage
where
    F: Fn(&Value) -> bool + Send + Sync + 'static,
{
    stage(move |ws, _| retain(ws, "filter_by", |entry| predicate(entry.record.field(&field))))
}

/// Inclusive range filter. `bounds` must be a list of exactly two values.
pub fn between(field: String, bounds: Value) -> Result<Stage, FlatDbError> {
    let invalid = |value: &Value| {
        FlatDbError::InvalidArgument(format!(
            "filter_between on '{field}' expects a [min, max] pair, got {}",
            describe(value)
        ))
    };
    let [min, max]: [Value; 2] = match bounds {
        Value::List(items) => items
            .try_into()
            .map_err(|items: Vec<Value>| invalid(&Value::List(items)))?,
        other => return Err(invalid(&other)),
    };
    Ok(stage(move |ws, _| {
        retain(ws, "filter_between", |entry| {
            let value = entry.record.field(&field);
            matches!(
                value.natural_cmp(&min),
                Some(Ordering::Greater | Ordering::Equal)
            ) && matches!(value.natural_cmp(&max), Some(Ordering::Less | Ordering::Equal))
        })
    }))
}

/// Set-membership filter. List fields are intersected with the candidates
/// (text compared case-insensitively) and the intersection is recorded as a
/// match group; scalar fields must equal one of the candidates.
pub fn contains_any(field: String, candidates: Value) -> Result<Stage, FlatDbError> {
    let candidates = match candidates {
        Value::List(items) => items,
        other => {
            return Err(FlatDbError::InvalidArgument(format!(
                "filter_in on '{field}' expects a list of candidates, got {}",
                describe(&other)
            )));
        }
    };
    let folded: Vec<String> = candidates
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_lowercase)
        .collect();

    Ok(stage(move |ws, annotations| {
        let entries = ws.into_many("filter_in")?;
        let mut kept = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry.record.field(&field) {
                Value::List(items) => {
                    let matched: Vec<Value> = items
                        .iter()
                        .filter(|item| match *item {
                            Value::Text(text) => folded.contains(&text.as_str().to_lowercase()),
                            other => candidates.contains(other),
                        })
                        .cloned()
                        .collect();
                    if matched.is_empty() {
                        continue;
                    }
                    annotations.push(entry.id, matched);
                    kept.push(entry);
                }
                scalar => {
                    if candidates.contains(scalar) {
                        kept.push(entry);
                    }
                }
            }
        }
        Ok(WorkingSet::Many(kept))
    }))
}

/// Stable sort on a field's value.
pub fn sort_by_field(field: String, order: Order) -> Stage {
    stage(move |ws, _| {
        let mut entries = ws.into_many("order_by")?;
        entries.sort_by(|a, b| {
            order.apply(a.record.field(&field).sort_cmp(b.record.field(&field)))
        });
        Ok(WorkingSet::Many(entries))
    })
}

/// Stable sort on the size of the `index`-th match group of every entry.
pub fn sort_by_matches(index: usize, order: Order) -> Stage {
    stage(move |ws, annotations| {
        let entries = ws.into_many("order_by_matches")?;
        let mut keyed = Vec::with_capacity(entries.len());
        for entry in entries {
            let count = annotations
                .group(entry.id, index)
                .map(<[Value]>::len)
                .ok_or_else(|| {
                    FlatDbError::MissingState(format!(
                        "order_by_matches({index}) must run after at least {} filter_in stage(s)",
                        index + 1
                    ))
                })?;
            keyed.push((count, entry));
        }
        keyed.sort_by(|(a, _), (b, _)| order.apply(a.cmp(b)));
        Ok(WorkingSet::Many(keyed.into_iter().map(|(_, e)| e).collect()))
    })
}

/// Collapses the working set to the first entry whose key equals `key`.
pub fn find_by_key(field: String, key: Value) -> Stage {
    stage(move |ws, _| {
        let entries = ws.into_many("find")?;
        Ok(WorkingSet::One(
            entries
                .into_iter()
                .find(|entry| entry.record.field(&field) == &key),
        ))
    })
}

/// Uniformly picks one entry; an empty sequence yields no entry.
pub fn pick_random() -> Stage {
    stage(|ws, _| {
        let mut entries = ws.into_many("random")?;
        if entries.is_empty() {
            return Ok(WorkingSet::One(None));
        }
        let idx = rand::thread_rng().gen_range(0..entries.len());
        Ok(WorkingSet::One(Some(entries.swap_remove(idx))))
    })
}

fn describe(value: &Value) -> String {
    match value {
        Value::List(items) => format!("a list of {} value(s)", items.len()),
        other => format!("a {} value", other.kind_name()),
    }
}
