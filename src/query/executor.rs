use crate::catalog::types::Value;
use crate::error::FlatDbError;
use crate::query::operators::{self, Stage};
use crate::query::plan::{MatchAnnotations, Order, QueryOutput, WorkingSet};
use crate::repository::Entity;
use crate::storage::StorageBackend;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// A lazily executed chain of stages over one collection, materialized into
/// entities of type `E`.
///
/// Builder calls only append stages; nothing touches storage until a
/// terminal (`execute`, `all`, `count`, `find`, `random`) runs. Every terminal
/// reads a fresh snapshot and replays all stages from scratch.
pub struct Pipeline<E> {
    storage: Arc<dyn StorageBackend>,
    stages: Vec<Stage>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Pipeline<E> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            stages: self.stages.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Pipeline<E> {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            storage,
            stages: Vec::new(),
            _entity: PhantomData,
        }
    }

    pub fn collection(&self) -> &'static str {
        E::collection()
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Appends a custom stage. Errors it returns surface when a terminal runs.
    pub fn add_stage<F>(mut self, stage: F) -> Self
    where
        F: Fn(WorkingSet, &mut MatchAnnotations) -> Result<WorkingSet, FlatDbError>
            + Send
            + Sync
            + 'static,
    {
        self.stages.push(Arc::new(stage));
        self
    }

    pub fn filter_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.stages
            .push(operators::equals(field.to_string(), value.into()));
        self
    }

    pub fn filter_by<F>(mut self, field: &str, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.stages
            .push(operators::predicate(field.to_string(), predicate));
        self
    }

    /// Keeps records with `min <= record[field] <= max`. `bounds` must be a
    /// two-element list, e.g. `(80, 120)` or `vec![lo, hi]`.
    pub fn filter_between(
        mut self,
        field: &str,
        bounds: impl Into<Value>,
    ) -> Result<Self, FlatDbError> {
        self.stages
            .push(operators::between(field.to_string(), bounds.into())?);
        Ok(self)
    }

    /// Keeps records whose field (or any element of a list field) is one of
    /// `candidates`. List matches are recorded for `order_by_matches`.
    pub fn filter_in(
        mut self,
        field: &str,
        candidates: impl Into<Value>,
    ) -> Result<Self, FlatDbError> {
        self.stages
            .push(operators::contains_any(field.to_string(), candidates.into())?);
        Ok(self)
    }

    pub fn order_by(mut self, field: &str, order: Order) -> Self {
        self.stages
            .push(operators::sort_by_field(field.to_string(), order));
        self
    }

    /// Sorts by the number of matches recorded by the `index`-th `filter_in`.
    pub fn order_by_matches(mut self, index: usize, order: Order) -> Self {
        self.stages.push(operators::sort_by_matches(index, order));
        self
    }

    pub async fn execute(&self) -> Result<QueryOutput<E>, FlatDbError> {
        let working_set = self.run(None).await?;
        materialize(working_set)
    }

    pub async fn all(&self) -> Result<Vec<E>, FlatDbError> {
        let entries = self.run(None).await?.into_many("all")?;
        entries
            .into_iter()
            .map(|entry| E::from_record(entry.record))
            .collect()
    }

    pub async fn count(&self) -> Result<usize, FlatDbError> {
        Ok(self.run(None).await?.into_many("count")?.len())
    }

    pub async fn find(&self, primary_key: impl Into<Value>) -> Result<Option<E>, FlatDbError> {
        let field = E::primary_key_field().ok_or_else(|| {
            FlatDbError::InvalidArgument(format!(
                "collection '{}' has no primary key to find by",
                E::collection()
            ))
        })?;
        let terminal = operators::find_by_key(field.to_string(), primary_key.into());
        Ok(materialize(self.run(Some(terminal)).await?)?.into_single())
    }

    pub async fn random(&self) -> Result<Option<E>, FlatDbError> {
        let terminal = operators::pick_random();
        Ok(materialize(self.run(Some(terminal)).await?)?.into_single())
    }

    async fn run(&self, terminal: Option<Stage>) -> Result<WorkingSet, FlatDbError> {
        let collection = E::collection();
        let mut snapshot = self.storage.read_snapshot().await?;
        let records = snapshot
            .swap_remove(collection)
            .ok_or_else(|| FlatDbError::collection_not_found(collection))?;
        let rows_in = records.len();

        let mut annotations = MatchAnnotations::default();
        let mut working_set = WorkingSet::from_records(records);
        for stage in self.stages.iter().chain(terminal.as_ref()) {
            working_set = stage(working_set, &mut annotations)?;
        }

        debug!(
            collection,
            stages = self.stages.len() + usize::from(terminal.is_some()),
            rows_in,
            rows_out = working_set.len(),
            shape = working_set.shape(),
            "pipeline executed"
        );
        Ok(working_set)
    }
}

/// Maps the final working set onto entities. Match annotations live in a
/// side table owned by the execution, so nothing needs stripping here.
fn materialize<E: Entity>(working_set: WorkingSet) -> Result<QueryOutput<E>, FlatDbError> {
    match working_set {
        WorkingSet::Many(entries) => entries
            .into_iter()
            .map(|entry| E::from_record(entry.record))
            .collect::<Result<Vec<_>, _>>()
            .map(QueryOutput::Many),
        WorkingSet::One(entry) => entry
            .map(|entry| E::from_record(entry.record))
            .transpose()
            .map(QueryOutput::One),
    }
}
