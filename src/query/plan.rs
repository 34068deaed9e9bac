use crate::catalog::types::{Record, Value};
use crate::error::FlatDbError;
use std::collections::HashMap;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    Asc,
    #[default]
    Desc,
}

impl Order {
    /// Accepts exactly `ASC` or `DESC`.
    pub fn parse(value: &str) -> Result<Self, FlatDbError> {
        match value {
            "ASC" => Ok(Order::Asc),
            "DESC" => Ok(Order::Desc),
            other => Err(FlatDbError::InvalidArgument(format!(
                "sort direction must be ASC or DESC, got '{other}'"
            ))),
        }
    }

    pub(crate) fn apply(self, ordering: std::cmp::Ordering) -> std::cmp::Ordering {
        match self {
            Order::Asc => ordering,
            Order::Desc => ordering.reverse(),
        }
    }
}

impl FromStr for Order {
    type Err = FlatDbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Order::parse(s)
    }
}

/// Surrogate identity of a record inside one execution: its position in the
/// collection when the snapshot was read.
pub type EntryId = usize;

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub id: EntryId,
    pub record: Record,
}

/// The value flowing between stages.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkingSet {
    Many(Vec<Entry>),
    One(Option<Entry>),
}

impl WorkingSet {
    pub fn from_records(records: Vec<Record>) -> Self {
        WorkingSet::Many(
            records
                .into_iter()
                .enumerate()
                .map(|(id, record)| Entry { id, record })
                .collect(),
        )
    }

    pub fn shape(&self) -> &'static str {
        match self {
            WorkingSet::Many(_) => "sequence",
            WorkingSet::One(_) => "single value",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            WorkingSet::Many(entries) => entries.len(),
            WorkingSet::One(entry) => usize::from(entry.is_some()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unwraps the sequence shape, failing for stages that cannot run on a
    /// single value.
    pub fn into_many(self, stage: &str) -> Result<Vec<Entry>, FlatDbError> {
        match self {
            WorkingSet::Many(entries) => Ok(entries),
            WorkingSet::One(_) => Err(FlatDbError::StructuralMismatch(format!(
                "{stage} must be run on a sequence, got a single value"
            ))),
        }
    }
}

/// Match groups recorded by set-membership filters, keyed by entry id.
/// Lives only for one execution and never touches the records themselves.
#[derive(Debug, Clone, Default)]
pub struct MatchAnnotations {
    groups: HashMap<EntryId, Vec<Vec<Value>>>,
}

impl MatchAnnotations {
    pub fn push(&mut self, id: EntryId, group: Vec<Value>) {
        self.groups.entry(id).or_default().push(group);
    }

    pub fn groups(&self, id: EntryId) -> &[Vec<Value>] {
        self.groups.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn group(&self, id: EntryId, index: usize) -> Option<&[Value]> {
        self.groups(id).get(index).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Materialized result of a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput<E> {
    Many(Vec<E>),
    One(Option<E>),
}

impl<E> QueryOutput<E> {
    pub fn len(&self) -> usize {
        match self {
            QueryOutput::Many(items) => items.len(),
            QueryOutput::One(item) => usize::from(item.is_some()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flattens either shape into a vector.
    pub fn into_vec(self) -> Vec<E> {
        match self {
            QueryOutput::Many(items) => items,
            QueryOutput::One(item) => item.into_iter().collect(),
        }
    }

    pub fn into_single(self) -> Option<E> {
        match self {
            QueryOutput::Many(items) => items.into_iter().next(),
            QueryOutput::One(item) => item,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{MatchAnnotations, Order, WorkingSet};
    use crate::catalog::types::{Record, Value};

    #[test]
    fn order_parses_only_two_directions() {
        assert_eq!(Order::parse("ASC").expect("asc"), Order::Asc);
        assert_eq!("DESC".parse::<Order>().expect("desc"), Order::Desc);
        let err = Order::parse("SIDEWAYS").expect_err("bad direction");
        assert_eq!(err.code_str(), "invalid_argument");
        assert!(Order::parse("asc").is_err());
    }

    #[test]
    fn single_value_rejects_sequence_stages() {
        let ws = WorkingSet::One(None);
        let err = ws.into_many("random()").expect_err("mismatch");
        assert_eq!(err.code_str(), "structural_mismatch");
    }

    #[test]
    fn entries_are_numbered_by_collection_position() {
        let ws = WorkingSet::from_records(vec![Record::new(), Record::new()]);
        let entries = ws.into_many("test").expect("many");
        assert_eq!(entries.iter().map(|e| e.id).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn annotations_append_groups_per_entry() {
        let mut annotations = MatchAnnotations::default();
        annotations.push(3, vec![Value::from("a")]);
        annotations.push(3, vec![Value::from("b"), Value::from("c")]);
        assert_eq!(annotations.groups(3).len(), 2);
        assert_eq!(annotations.group(3, 1).map(<[Value]>::len), Some(2));
        assert!(annotations.group(4, 0).is_none());
    }
}
