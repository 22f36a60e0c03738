//! Stage execution.
//!
//! One [`Execution`] is created per pipeline invocation. It holds the collection snapshots
//! read for that invocation and the deadline clock.

use super::group::Partitions;
use super::stage::{Direction, Pipeline, SortKey, Stage};
use crate::config::{EngineConfig, Strictness};
use crate::record::{FieldPath, Record};
use crate::store::EntityStore;
use crate::value::Value;
use crate::{ReportError, ReportResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

pub(crate) struct Execution<'e> {
    config: &'e EngineConfig,
    snapshots: HashMap<String, Arc<Vec<Record>>>,
    started: Instant,
}

impl<'e> Execution<'e> {
    pub(crate) fn new(config: &'e EngineConfig) -> Self {
        Self {
            config,
            snapshots: HashMap::new(),
            started: Instant::now(),
        }
    }

    /// Read `collection` from the store unless this execution already holds it.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Reference`] if the store has no such collection.
    pub(crate) fn load(
        &mut self,
        store: &dyn EntityStore,
        collection: &str,
    ) -> ReportResult<Arc<Vec<Record>>> {
        if let Some(snapshot) = self.snapshots.get(collection) {
            return Ok(Arc::clone(snapshot));
        }
        let snapshot = store
            .documents(collection)
            .ok_or_else(|| ReportError::Reference(collection.to_string()))?;
        self.snapshots
            .insert(collection.to_string(), Arc::clone(&snapshot));
        Ok(snapshot)
    }

    fn snapshot(&self, collection: &str) -> ReportResult<Arc<Vec<Record>>> {
        self.snapshots
            .get(collection)
            .cloned()
            .ok_or_else(|| ReportError::Reference(collection.to_string()))
    }

    pub(crate) fn check_deadline(&self) -> ReportResult<()> {
        let elapsed = self.started.elapsed();
        if elapsed > self.config.pipeline_deadline() {
            return Err(ReportError::DeadlineExceeded { elapsed });
        }
        Ok(())
    }

    /// Run every stage of `pipeline` over `input` in order.
    pub(crate) fn run(&self, pipeline: &Pipeline, input: Vec<Record>) -> ReportResult<Vec<Record>> {
        let mut records = input;
        for (index, stage) in pipeline.stages().iter().enumerate() {
            self.check_deadline()?;
            let before = records.len();
            records = self.run_stage(pipeline, index, stage, records)?;
            tracing::debug!(
                index,
                stage = stage.name(),
                input = before,
                output = records.len(),
                "stage done"
            );
        }
        Ok(records)
    }

    fn run_stage(
        &self,
        pipeline: &Pipeline,
        index: usize,
        stage: &Stage,
        records: Vec<Record>,
    ) -> ReportResult<Vec<Record>> {
        match stage {
            Stage::Filter(predicate) => {
                let mut out = Vec::new();
                for record in records {
                    self.check_deadline()?;
                    if predicate.matches(&record) {
                        out.push(record);
                    }
                }
                Ok(out)
            }
            Stage::Unwind {
                path,
                preserve_empty,
            } => {
                let absent = absent_everywhere(pipeline, &records, std::iter::once(path));
                if let Some(detail) = absent {
                    return self.malformed(index, stage, detail);
                }
                self.unwind(records, path, *preserve_empty)
            }
            Stage::Lookup {
                from,
                local_field,
                foreign_field,
                as_field,
            } => {
                let absent = absent_everywhere(pipeline, &records, std::iter::once(local_field));
                if let Some(detail) = absent {
                    return self.malformed(index, stage, detail);
                }
                self.lookup(records, from, local_field, foreign_field, as_field)
            }
            Stage::Group { key, accumulators } => {
                let absent = absent_everywhere(pipeline, &records, key.field_paths().into_iter());
                if let Some(detail) = absent {
                    return self.malformed(index, stage, detail);
                }
                let mut partitions = Partitions::new(accumulators);
                for record in &records {
                    self.check_deadline()?;
                    partitions.add(key.eval_or_null(record), record);
                }
                Ok(partitions.into_records())
            }
            Stage::Project(fields) => Ok(records
                .iter()
                .map(|record| {
                    fields
                        .iter()
                        .filter_map(|(name, expr)| Some((name.clone(), expr.eval(record)?)))
                        .collect()
                })
                .collect()),
            Stage::Sort(keys) => {
                let mut records = records;
                sort_records(&mut records, keys);
                Ok(records)
            }
            Stage::Limit(n) => {
                let mut records = records;
                records.truncate(*n);
                Ok(records)
            }
            Stage::Skip(n) => Ok(records.into_iter().skip(*n).collect()),
            Stage::Count(name) => {
                if records.is_empty() {
                    return Ok(Vec::new());
                }
                Ok(vec![Record::new().with(name.clone(), records.len() as i64)])
            }
            Stage::Facet(facets) => {
                let mut out = Record::new();
                for (name, pipeline) in facets {
                    let rows = self.run(pipeline, records.clone())?;
                    out.insert(
                        name.clone(),
                        Value::Array(rows.into_iter().map(Value::Document).collect()),
                    );
                }
                Ok(vec![out])
            }
        }
    }

    fn malformed(&self, index: usize, stage: &Stage, detail: String) -> ReportResult<Vec<Record>> {
        match self.config.strictness() {
            Strictness::Strict => Err(ReportError::MalformedStage {
                index,
                stage: stage.name(),
                detail,
            }),
            Strictness::Lenient => {
                tracing::warn!(
                    index,
                    stage = stage.name(),
                    %detail,
                    "malformed stage, yielding no records"
                );
                Ok(Vec::new())
            }
        }
    }

    fn unwind(
        &self,
        records: Vec<Record>,
        path: &FieldPath,
        preserve_empty: bool,
    ) -> ReportResult<Vec<Record>> {
        let mut out = Vec::with_capacity(records.len());
        for mut record in records {
            self.check_deadline()?;
            match record.get_path(path).cloned() {
                Some(Value::Array(items)) if !items.is_empty() => {
                    for item in items {
                        let mut copy = record.clone();
                        copy.set_path(path, item);
                        out.push(copy);
                    }
                }
                Some(Value::Array(_)) | Some(Value::Null) | None => {
                    if preserve_empty {
                        record.remove_path(path);
                        out.push(record);
                    }
                }
                Some(_) => out.push(record),
            }
        }
        Ok(out)
    }

    fn lookup(
        &self,
        records: Vec<Record>,
        from: &str,
        local_field: &FieldPath,
        foreign_field: &FieldPath,
        as_field: &str,
    ) -> ReportResult<Vec<Record>> {
        let foreign = self.snapshot(from)?;

        // Foreign key -> positions in the foreign collection. Missing keys index as null.
        let null = Value::Null;
        let mut index: HashMap<&Value, Vec<usize>> = HashMap::new();
        for (position, doc) in foreign.iter().enumerate() {
            let keys = doc.candidates(foreign_field);
            if keys.is_empty() {
                index.entry(&null).or_default().push(position);
            }
            for key in keys {
                let keys: Vec<&Value> = match key {
                    Value::Array(items) => items.iter().collect(),
                    other => vec![other],
                };
                for key in keys {
                    index.entry(key).or_default().push(position);
                }
            }
        }

        let mut out = Vec::with_capacity(records.len());
        for mut record in records {
            self.check_deadline()?;
            let local = record.resolve(local_field).unwrap_or(Value::Null);
            let local_keys: Vec<&Value> = match &local {
                Value::Array(items) => items.iter().collect(),
                other => vec![other],
            };

            let mut positions: Vec<usize> = local_keys
                .into_iter()
                .filter_map(|key| index.get(key))
                .flatten()
                .copied()
                .collect();
            positions.sort_unstable();
            positions.dedup();

            let matched: Vec<Value> = positions
                .into_iter()
                .map(|p| Value::Document(foreign[p].clone()))
                .collect();
            record.insert(as_field.to_string(), Value::Array(matched));
            out.push(record);
        }
        Ok(out)
    }
}

/// Describe the first path that no record resolves, if the input is non-empty.
///
/// Paths the pipeline declares optional are skipped.
fn absent_everywhere<'p>(
    pipeline: &Pipeline,
    records: &[Record],
    paths: impl Iterator<Item = &'p FieldPath>,
) -> Option<String> {
    if records.is_empty() {
        return None;
    }
    for path in paths.filter(|path| !pipeline.allows_absent(path)) {
        if records.iter().all(|record| record.resolve(path).is_none()) {
            return Some(format!("field '{path}' is absent from every input record"));
        }
    }
    None
}

/// Stable multi-key sort; missing fields sort as null.
pub(crate) fn sort_records(records: &mut [Record], keys: &[SortKey]) {
    records.sort_by(|a, b| {
        for key in keys {
            let va = a.resolve(&key.path).unwrap_or(Value::Null);
            let vb = b.resolve(&key.path).unwrap_or(Value::Null);
            let ordering = match key.direction {
                Direction::Ascending => va.cmp(&vb),
                Direction::Descending => vb.cmp(&va),
            };
            if ordering.is_ne() {
                return ordering;
            }
        }
        std::cmp::Ordering::Equal
    });
}
