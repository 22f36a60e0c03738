//! Filter predicates.
//!
//! A path that crosses an array matches when any element matches, and a path ending on an
//! array matches when the array itself or any of its elements matches. Range comparisons
//! only match values of the same kind bracket, so `gt 5` never matches text.

use super::expr::{CompareOp, Expr};
use crate::record::{FieldPath, Record};
use crate::value::Value;
use crate::{ReportError, ReportResult};
use regex::{Regex, RegexBuilder};

/// A boolean test applied to each record.
#[derive(Debug, Clone)]
pub enum Predicate {
    Compare {
        path: FieldPath,
        op: CompareOp,
        value: Value,
    },
    In {
        path: FieldPath,
        values: Vec<Value>,
    },
    NotIn {
        path: FieldPath,
        values: Vec<Value>,
    },
    Exists {
        path: FieldPath,
        exists: bool,
    },
    Regex {
        path: FieldPath,
        pattern: Regex,
    },
    /// The field is an array of exactly this many elements.
    Size {
        path: FieldPath,
        len: usize,
    },
    /// One element of the array under `path` satisfies the nested predicate.
    ElemMatch {
        path: FieldPath,
        predicate: Box<Predicate>,
    },
    /// Truthiness of an expression evaluated against the record.
    Expr(Expr),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    /// Matches every record.
    pub fn all() -> Self {
        Predicate::And(Vec::new())
    }

    pub fn compare(path: &str, op: CompareOp, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            path: FieldPath::new(path),
            op,
            value: value.into(),
        }
    }

    pub fn eq(path: &str, value: impl Into<Value>) -> Self {
        Self::compare(path, CompareOp::Eq, value)
    }

    pub fn ne(path: &str, value: impl Into<Value>) -> Self {
        Self::compare(path, CompareOp::Ne, value)
    }

    pub fn gt(path: &str, value: impl Into<Value>) -> Self {
        Self::compare(path, CompareOp::Gt, value)
    }

    pub fn gte(path: &str, value: impl Into<Value>) -> Self {
        Self::compare(path, CompareOp::Gte, value)
    }

    pub fn lt(path: &str, value: impl Into<Value>) -> Self {
        Self::compare(path, CompareOp::Lt, value)
    }

    pub fn lte(path: &str, value: impl Into<Value>) -> Self {
        Self::compare(path, CompareOp::Lte, value)
    }

    pub fn is_in(path: &str, values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Predicate::In {
            path: FieldPath::new(path),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn not_in(path: &str, values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Predicate::NotIn {
            path: FieldPath::new(path),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn exists(path: &str, exists: bool) -> Self {
        Predicate::Exists {
            path: FieldPath::new(path),
            exists,
        }
    }

    /// Regular-expression match on text values.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Validation`] if `pattern` does not compile.
    pub fn regex(path: &str, pattern: &str, case_insensitive: bool) -> ReportResult<Self> {
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| ReportError::Validation(format!("invalid pattern: {e}")))?;
        Ok(Predicate::Regex {
            path: FieldPath::new(path),
            pattern,
        })
    }

    pub fn size(path: &str, len: usize) -> Self {
        Predicate::Size {
            path: FieldPath::new(path),
            len,
        }
    }

    pub fn elem_match(path: &str, predicate: Predicate) -> Self {
        Predicate::ElemMatch {
            path: FieldPath::new(path),
            predicate: Box::new(predicate),
        }
    }

    pub fn expr(expr: Expr) -> Self {
        Predicate::Expr(expr)
    }

    pub fn and(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::And(predicates.into_iter().collect())
    }

    pub fn or(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::Or(predicates.into_iter().collect())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(predicate: Predicate) -> Self {
        Predicate::Not(Box::new(predicate))
    }

    /// Whether `record` satisfies this predicate.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Predicate::Compare { path, op, value } => {
                let candidates = record.candidates(path);
                match op {
                    CompareOp::Eq => equals_any(&candidates, value),
                    CompareOp::Ne => !equals_any(&candidates, value),
                    _ => expanded(&candidates)
                        .any(|v| v.same_bracket(value) && op.holds(v.cmp(value))),
                }
            }
            Predicate::In { path, values } => {
                let candidates = record.candidates(path);
                values.iter().any(|value| equals_any(&candidates, value))
            }
            Predicate::NotIn { path, values } => {
                let candidates = record.candidates(path);
                !values.iter().any(|value| equals_any(&candidates, value))
            }
            Predicate::Exists { path, exists } => record.candidates(path).is_empty() != *exists,
            Predicate::Regex { path, pattern } => expanded(&record.candidates(path))
                .filter_map(Value::as_str)
                .any(|text| pattern.is_match(text)),
            Predicate::Size { path, len } => record
                .candidates(path)
                .into_iter()
                .any(|v| v.as_array().is_some_and(|items| items.len() == *len)),
            Predicate::ElemMatch { path, predicate } => {
                record.candidates(path).into_iter().any(|v| {
                    v.as_array().is_some_and(|items| {
                        items
                            .iter()
                            .filter_map(Value::as_document)
                            .any(|element| predicate.matches(element))
                    })
                })
            }
            Predicate::Expr(expr) => expr.eval(record).is_some_and(|v| v.is_truthy()),
            Predicate::And(predicates) => predicates.iter().all(|p| p.matches(record)),
            Predicate::Or(predicates) => predicates.iter().any(|p| p.matches(record)),
            Predicate::Not(predicate) => !predicate.matches(record),
        }
    }
}

/// Candidates plus the elements of any candidate that is an array.
fn expanded<'a>(candidates: &'a [&'a Value]) -> impl Iterator<Item = &'a Value> + 'a {
    candidates.iter().flat_map(|candidate| {
        let elements = candidate.as_array().unwrap_or(&[]);
        std::iter::once(*candidate).chain(elements.iter())
    })
}

/// Equality with missing-as-null: `eq null` matches a missing field.
fn equals_any(candidates: &[&Value], value: &Value) -> bool {
    if candidates.is_empty() {
        return value.is_null();
    }
    expanded(candidates).any(|candidate| candidate == value)
}
