//! Pipeline and stage definitions.
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s built with chained methods:
//!
//! ```
//! use medrep_core::engine::{Accumulator, Expr, Pipeline, Predicate, SortKey};
//!
//! let pipeline = Pipeline::new()
//!     .filter(Predicate::eq("diagnosis", "Asthma"))
//!     .group(Expr::field("hospital_id"), [("visits", Accumulator::Count)])
//!     .sort([SortKey::desc("visits")])
//!     .limit(5);
//! assert_eq!(pipeline.stages().len(), 4);
//! ```

use super::expr::Expr;
use super::predicate::Predicate;
use crate::record::FieldPath;

/// Reduction applied to each partition of a group stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    Count,
    /// Sum of numeric inputs; 0 when there are none.
    Sum(Expr),
    /// Mean of numeric inputs; null when there are none.
    Avg(Expr),
    Min(Expr),
    Max(Expr),
    /// Distinct values in first-seen order.
    AddToSet(Expr),
    Push(Expr),
    First(Expr),
}

impl Accumulator {
    pub(crate) fn input(&self) -> Option<&Expr> {
        match self {
            Accumulator::Count => None,
            Accumulator::Sum(e)
            | Accumulator::Avg(e)
            | Accumulator::Min(e)
            | Accumulator::Max(e)
            | Accumulator::AddToSet(e)
            | Accumulator::Push(e)
            | Accumulator::First(e) => Some(e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub path: FieldPath,
    pub direction: Direction,
}

impl SortKey {
    pub fn asc(path: &str) -> Self {
        Self {
            path: FieldPath::new(path),
            direction: Direction::Ascending,
        }
    }

    pub fn desc(path: &str) -> Self {
        Self {
            path: FieldPath::new(path),
            direction: Direction::Descending,
        }
    }
}

/// One step of a pipeline.
#[derive(Debug, Clone)]
pub enum Stage {
    Filter(Predicate),
    /// One output record per element of the array at `path`.
    Unwind {
        path: FieldPath,
        /// Keep records whose array is empty or missing, with the field removed.
        preserve_empty: bool,
    },
    /// Attach the records of `from` whose `foreign_field` equals this record's `local_field`.
    Lookup {
        from: String,
        local_field: FieldPath,
        foreign_field: FieldPath,
        as_field: String,
    },
    Group {
        key: Expr,
        accumulators: Vec<(String, Accumulator)>,
    },
    Project(Vec<(String, Expr)>),
    Sort(Vec<SortKey>),
    Limit(usize),
    Skip(usize),
    /// A single record `{name: n}`; nothing on empty input.
    Count(String),
    /// Named sub-pipelines over the same input, one array field each.
    Facet(Vec<(String, Pipeline)>),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Filter(_) => "filter",
            Stage::Unwind { .. } => "unwind",
            Stage::Lookup { .. } => "lookup",
            Stage::Group { .. } => "group",
            Stage::Project(_) => "project",
            Stage::Sort(_) => "sort",
            Stage::Limit(_) => "limit",
            Stage::Skip(_) => "skip",
            Stage::Count(_) => "count",
            Stage::Facet(_) => "facet",
        }
    }
}

/// An ordered list of stages.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
    /// Paths of optional fields; a stage referencing one is never malformed.
    optional: Vec<FieldPath>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn push(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Declare `path` as an optional field that every record may lack.
    ///
    /// Stages referencing it then run normally in strict mode instead of failing with
    /// [`crate::ReportError::MalformedStage`].
    pub fn allow_absent(mut self, path: &str) -> Self {
        self.optional.push(FieldPath::new(path));
        self
    }

    pub(crate) fn allows_absent(&self, path: &FieldPath) -> bool {
        self.optional.contains(path)
    }

    pub fn filter(self, predicate: Predicate) -> Self {
        self.push(Stage::Filter(predicate))
    }

    pub fn unwind(self, path: &str) -> Self {
        self.push(Stage::Unwind {
            path: FieldPath::new(path),
            preserve_empty: false,
        })
    }

    pub fn unwind_preserving_empty(self, path: &str) -> Self {
        self.push(Stage::Unwind {
            path: FieldPath::new(path),
            preserve_empty: true,
        })
    }

    pub fn lookup(self, from: &str, local_field: &str, foreign_field: &str, as_field: &str) -> Self {
        self.push(Stage::Lookup {
            from: from.to_string(),
            local_field: FieldPath::new(local_field),
            foreign_field: FieldPath::new(foreign_field),
            as_field: as_field.to_string(),
        })
    }

    pub fn group<'a>(
        self,
        key: Expr,
        accumulators: impl IntoIterator<Item = (&'a str, Accumulator)>,
    ) -> Self {
        self.push(Stage::Group {
            key,
            accumulators: accumulators
                .into_iter()
                .map(|(name, acc)| (name.to_string(), acc))
                .collect(),
        })
    }

    pub fn project<'a>(self, fields: impl IntoIterator<Item = (&'a str, Expr)>) -> Self {
        self.push(Stage::Project(
            fields
                .into_iter()
                .map(|(name, expr)| (name.to_string(), expr))
                .collect(),
        ))
    }

    pub fn sort(self, keys: impl IntoIterator<Item = SortKey>) -> Self {
        self.push(Stage::Sort(keys.into_iter().collect()))
    }

    pub fn limit(self, n: usize) -> Self {
        self.push(Stage::Limit(n))
    }

    pub fn skip(self, n: usize) -> Self {
        self.push(Stage::Skip(n))
    }

    pub fn count(self, name: &str) -> Self {
        self.push(Stage::Count(name.to_string()))
    }

    pub fn facet<'a>(self, facets: impl IntoIterator<Item = (&'a str, Pipeline)>) -> Self {
        self.push(Stage::Facet(
            facets
                .into_iter()
                .map(|(name, pipeline)| (name.to_string(), pipeline))
                .collect(),
        ))
    }

    /// Collections joined anywhere in this pipeline, including inside facets.
    pub fn joined_collections(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for stage in &self.stages {
            match stage {
                Stage::Lookup { from, .. } => out.push(from.as_str()),
                Stage::Facet(facets) => {
                    for (_, pipeline) in facets {
                        out.extend(pipeline.joined_collections());
                    }
                }
                _ => {}
            }
        }
        out
    }
}
