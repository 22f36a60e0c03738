//! # Query/aggregation engine
//!
//! Executes declarative pipelines over an [`EntityStore`] without mutating it.
//!
//! Every call:
//! 1. Asks the [`AccessGate`] whether the subject role may `find` on the source collection
//!    and on every collection the pipeline joins (facets included). A denial fails before
//!    anything is read.
//! 2. Reads each referenced collection once into a per-call snapshot. Unknown collections
//!    fail with [`ReportError::Reference`].
//! 3. Runs the stages in order under the configured deadline.

mod exec;
mod expr;
mod group;
mod predicate;
mod stage;

pub use expr::{CompareOp, Expr};
pub use predicate::Predicate;
pub use stage::{Accumulator, Direction, Pipeline, SortKey, Stage};

use crate::access::{AccessGate, Action, Role};
use crate::config::EngineConfig;
use crate::record::Record;
use crate::store::EntityStore;
use crate::{ReportError, ReportResult};
use exec::Execution;
use std::sync::Arc;

/// Options for [`Engine::find`]: sort, then skip, then limit, then projection.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub sort: Vec<SortKey>,
    pub skip: Option<usize>,
    pub limit: Option<usize>,
    pub projection: Option<Vec<(String, Expr)>>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort(mut self, keys: impl IntoIterator<Item = SortKey>) -> Self {
        self.sort = keys.into_iter().collect();
        self
    }

    pub fn skip(mut self, n: usize) -> Self {
        self.skip = Some(n);
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn project<'a>(mut self, fields: impl IntoIterator<Item = (&'a str, Expr)>) -> Self {
        self.projection = Some(
            fields
                .into_iter()
                .map(|(name, expr)| (name.to_string(), expr))
                .collect(),
        );
        self
    }

    fn into_pipeline(self, predicate: &Predicate) -> Pipeline {
        let mut pipeline = Pipeline::new().filter(predicate.clone());
        if !self.sort.is_empty() {
            pipeline = pipeline.sort(self.sort);
        }
        if let Some(n) = self.skip {
            pipeline = pipeline.skip(n);
        }
        if let Some(n) = self.limit {
            pipeline = pipeline.limit(n);
        }
        if let Some(fields) = self.projection {
            pipeline = pipeline.push(Stage::Project(fields));
        }
        pipeline
    }
}

/// Read-only pipeline executor acting on behalf of one subject role.
#[derive(Clone)]
pub struct Engine<'a> {
    store: &'a dyn EntityStore,
    gate: &'a dyn AccessGate,
    subject: Role,
    config: Arc<EngineConfig>,
}

impl<'a> Engine<'a> {
    pub fn new(
        store: &'a dyn EntityStore,
        gate: &'a dyn AccessGate,
        subject: Role,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            store,
            gate,
            subject,
            config,
        }
    }

    pub fn subject(&self) -> Role {
        self.subject
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run `pipeline` over the documents of `collection`.
    ///
    /// # Errors
    ///
    /// - [`ReportError::Authorization`] if the subject may not read a referenced collection.
    /// - [`ReportError::Reference`] if a referenced collection does not exist.
    /// - [`ReportError::MalformedStage`] in strict mode.
    /// - [`ReportError::DeadlineExceeded`] if the pipeline runs past its deadline.
    pub fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> ReportResult<Vec<Record>> {
        let mut referenced = vec![collection];
        for joined in pipeline.joined_collections() {
            if !referenced.contains(&joined) {
                referenced.push(joined);
            }
        }

        for name in &referenced {
            self.authorize(Action::Find, name)?;
        }

        let mut execution = Execution::new(&self.config);
        for name in &referenced {
            execution.load(self.store, name)?;
        }

        let source = execution.load(self.store, collection)?;
        let input = source.as_ref().clone();
        let output = execution.run(pipeline, input)?;

        tracing::debug!(
            collection,
            stages = pipeline.stages().len(),
            rows = output.len(),
            "pipeline finished"
        );
        Ok(output)
    }

    /// Records of `collection` matching `predicate`.
    pub fn find(
        &self,
        collection: &str,
        predicate: &Predicate,
        options: FindOptions,
    ) -> ReportResult<Vec<Record>> {
        self.aggregate(collection, &options.into_pipeline(predicate))
    }

    /// The first record of `collection` matching `predicate`.
    pub fn find_one(
        &self,
        collection: &str,
        predicate: &Predicate,
        options: FindOptions,
    ) -> ReportResult<Option<Record>> {
        let mut records = self.find(collection, predicate, options.limit(1))?;
        Ok(records.pop())
    }

    /// Number of records of `collection` matching `predicate`.
    pub fn count(&self, collection: &str, predicate: &Predicate) -> ReportResult<u64> {
        let pipeline = Pipeline::new().filter(predicate.clone()).count("n");
        let records = self.aggregate(collection, &pipeline)?;
        Ok(records
            .first()
            .and_then(|r| r.get("n"))
            .and_then(|v| v.as_i64())
            .map_or(0, |n| n.max(0) as u64))
    }

    fn authorize(&self, action: Action, collection: &str) -> ReportResult<()> {
        if self.gate.can(self.subject, action, collection) {
            return Ok(());
        }
        tracing::warn!(
            role = %self.subject,
            %action,
            collection,
            "access denied"
        );
        Err(ReportError::Authorization {
            role: self.subject,
            action,
            collection: collection.to_string(),
        })
    }
}
