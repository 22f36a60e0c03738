//! Expressions evaluated against one record.
//!
//! Expressions compute field values in project stages, group keys and accumulator inputs,
//! and expression predicates. Evaluation never fails: a missing field evaluates to `None`
//! and operations on values of the wrong kind evaluate to [`Value::Null`].

use crate::record::{FieldPath, Record};
use crate::value::Value;
use crate::{ReportError, ReportResult};
use chrono::format::{Item, StrftimeItems};
use chrono::{Datelike, Duration};
use rust_decimal::{Decimal, RoundingStrategy};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Comparison operators shared by expressions and predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Gte => ordering != Ordering::Less,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Lte => ordering != Ordering::Greater,
        }
    }
}

/// A computed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A field of the current record.
    Field(FieldPath),
    /// A bound variable (the element in `Map` / `FilterArray`), optionally followed by a path.
    Var(String, FieldPath),
    Literal(Value),
    /// A document with the given fields, in order. Missing values are left out.
    Object(Vec<(String, Expr)>),
    Add(Vec<Expr>),
    /// `a - b`. Datetime minus datetime is milliseconds.
    Subtract(Box<Expr>, Box<Expr>),
    Multiply(Vec<Expr>),
    /// `a / b`. Division by zero is null.
    Divide(Box<Expr>, Box<Expr>),
    /// Round half away from zero to the given number of decimal places.
    Round(Box<Expr>, u32),
    Size(Box<Expr>),
    /// The first `n` elements of an array.
    Slice(Box<Expr>, usize),
    /// Element at an index; negative indexes count from the end.
    ArrayElemAt(Box<Expr>, Box<Expr>),
    /// Integers in `[start, end)`.
    Range(Box<Expr>, Box<Expr>),
    Map {
        input: Box<Expr>,
        var: String,
        body: Box<Expr>,
    },
    FilterArray {
        input: Box<Expr>,
        var: String,
        cond: Box<Expr>,
    },
    /// Distinct elements of the given arrays, in first-seen order.
    SetUnion(Vec<Expr>),
    /// Average of the numeric elements of an array.
    Avg(Box<Expr>),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    /// Whether the value occurs in an array.
    In(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Cond {
        when: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// The first value unless it is null or missing.
    IfNull(Box<Expr>, Box<Expr>),
    FormatDate {
        date: Box<Expr>,
        format: String,
    },
    Year(Box<Expr>),
    Month(Box<Expr>),
}

/// Variable bindings visible while evaluating an expression.
#[derive(Debug, Default)]
pub struct Bindings {
    vars: Vec<(String, Value)>,
}

impl Bindings {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.vars
            .iter()
            .rev()
            .find(|(bound, _)| bound == name)
            .map(|(_, value)| value)
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl Expr {
    pub fn field(path: &str) -> Self {
        Expr::Field(FieldPath::new(path))
    }

    /// A bound variable; `path` may be empty to refer to the element itself.
    pub fn var(name: &str, path: &str) -> Self {
        let path = if path.is_empty() {
            FieldPath::root()
        } else {
            FieldPath::new(path)
        };
        Expr::Var(name.to_string(), path)
    }

    pub fn lit(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn null() -> Self {
        Expr::Literal(Value::Null)
    }

    pub fn object<'a>(fields: impl IntoIterator<Item = (&'a str, Expr)>) -> Self {
        Expr::Object(
            fields
                .into_iter()
                .map(|(name, expr)| (name.to_string(), expr))
                .collect(),
        )
    }

    pub fn add(terms: impl IntoIterator<Item = Expr>) -> Self {
        Expr::Add(terms.into_iter().collect())
    }

    pub fn subtract(a: Expr, b: Expr) -> Self {
        Expr::Subtract(Box::new(a), Box::new(b))
    }

    pub fn multiply(factors: impl IntoIterator<Item = Expr>) -> Self {
        Expr::Multiply(factors.into_iter().collect())
    }

    pub fn divide(a: Expr, b: Expr) -> Self {
        Expr::Divide(Box::new(a), Box::new(b))
    }

    pub fn round(expr: Expr, places: u32) -> Self {
        Expr::Round(Box::new(expr), places)
    }

    pub fn size(expr: Expr) -> Self {
        Expr::Size(Box::new(expr))
    }

    pub fn slice(expr: Expr, n: usize) -> Self {
        Expr::Slice(Box::new(expr), n)
    }

    pub fn elem_at(array: Expr, index: Expr) -> Self {
        Expr::ArrayElemAt(Box::new(array), Box::new(index))
    }

    pub fn range(start: Expr, end: Expr) -> Self {
        Expr::Range(Box::new(start), Box::new(end))
    }

    pub fn map(input: Expr, var: &str, body: Expr) -> Self {
        Expr::Map {
            input: Box::new(input),
            var: var.to_string(),
            body: Box::new(body),
        }
    }

    pub fn filter(input: Expr, var: &str, cond: Expr) -> Self {
        Expr::FilterArray {
            input: Box::new(input),
            var: var.to_string(),
            cond: Box::new(cond),
        }
    }

    pub fn set_union(arrays: impl IntoIterator<Item = Expr>) -> Self {
        Expr::SetUnion(arrays.into_iter().collect())
    }

    pub fn avg(expr: Expr) -> Self {
        Expr::Avg(Box::new(expr))
    }

    pub fn compare(op: CompareOp, a: Expr, b: Expr) -> Self {
        Expr::Compare(op, Box::new(a), Box::new(b))
    }

    pub fn eq(a: Expr, b: Expr) -> Self {
        Self::compare(CompareOp::Eq, a, b)
    }

    pub fn gt(a: Expr, b: Expr) -> Self {
        Self::compare(CompareOp::Gt, a, b)
    }

    pub fn is_in(value: Expr, array: Expr) -> Self {
        Expr::In(Box::new(value), Box::new(array))
    }

    pub fn not(expr: Expr) -> Self {
        Expr::Not(Box::new(expr))
    }

    pub fn cond(when: Expr, then: Expr, otherwise: Expr) -> Self {
        Expr::Cond {
            when: Box::new(when),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    pub fn if_null(expr: Expr, fallback: Expr) -> Self {
        Expr::IfNull(Box::new(expr), Box::new(fallback))
    }

    /// Format a datetime with a strftime pattern.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Validation`] if `format` is not a valid strftime pattern.
    pub fn format_date(date: Expr, format: &str) -> ReportResult<Self> {
        if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
            return Err(ReportError::Validation(format!(
                "invalid date format '{format}'"
            )));
        }
        Ok(Expr::FormatDate {
            date: Box::new(date),
            format: format.to_string(),
        })
    }

    pub fn year(date: Expr) -> Self {
        Expr::Year(Box::new(date))
    }

    pub fn month(date: Expr) -> Self {
        Expr::Month(Box::new(date))
    }
}

// ============================================================================
// Evaluation
// ============================================================================

impl Expr {
    /// Evaluate against `record` with no bound variables.
    pub fn eval(&self, record: &Record) -> Option<Value> {
        self.eval_with(record, &mut Bindings::default())
    }

    /// Evaluate, treating a missing result as null.
    pub fn eval_or_null(&self, record: &Record) -> Value {
        self.eval(record).unwrap_or(Value::Null)
    }

    fn eval_with(&self, record: &Record, bindings: &mut Bindings) -> Option<Value> {
        match self {
            Expr::Field(path) => record.resolve(path),
            Expr::Var(name, path) => {
                let bound = bindings.lookup(name)?;
                if path.is_root() {
                    return Some(bound.clone());
                }
                match bound {
                    Value::Document(doc) => doc.resolve(path),
                    _ => None,
                }
            }
            Expr::Literal(value) => Some(value.clone()),
            Expr::Object(fields) => {
                let mut doc = Record::new();
                for (name, expr) in fields {
                    if let Some(value) = expr.eval_with(record, bindings) {
                        doc.insert(name.clone(), value);
                    }
                }
                Some(Value::Document(doc))
            }
            Expr::Add(terms) => {
                let values = Self::eval_all(terms, record, bindings);
                Some(add_values(&values))
            }
            Expr::Subtract(a, b) => {
                let a = a.eval_with(record, bindings).unwrap_or(Value::Null);
                let b = b.eval_with(record, bindings).unwrap_or(Value::Null);
                Some(subtract_values(&a, &b))
            }
            Expr::Multiply(factors) => {
                let values = Self::eval_all(factors, record, bindings);
                Some(multiply_values(&values))
            }
            Expr::Divide(a, b) => {
                let a = a.eval_with(record, bindings).unwrap_or(Value::Null);
                let b = b.eval_with(record, bindings).unwrap_or(Value::Null);
                Some(divide_values(&a, &b))
            }
            Expr::Round(expr, places) => {
                let value = expr.eval_with(record, bindings).unwrap_or(Value::Null);
                Some(round_value(&value, *places))
            }
            Expr::Size(expr) => match expr.eval_with(record, bindings) {
                Some(Value::Array(items)) => Some(Value::Int(items.len() as i64)),
                _ => Some(Value::Null),
            },
            Expr::Slice(expr, n) => match expr.eval_with(record, bindings) {
                Some(Value::Array(mut items)) => {
                    items.truncate(*n);
                    Some(Value::Array(items))
                }
                _ => Some(Value::Null),
            },
            Expr::ArrayElemAt(array, index) => {
                let array = array.eval_with(record, bindings)?;
                let index = index.eval_with(record, bindings)?.as_i64()?;
                let Value::Array(items) = array else {
                    return Some(Value::Null);
                };
                let position = if index < 0 {
                    items.len().checked_sub(index.unsigned_abs() as usize)?
                } else {
                    index as usize
                };
                items.into_iter().nth(position)
            }
            Expr::Range(start, end) => {
                let start = start.eval_with(record, bindings).and_then(|v| v.as_i64());
                let end = end.eval_with(record, bindings).and_then(|v| v.as_i64());
                match (start, end) {
                    (Some(start), Some(end)) => {
                        Some(Value::Array((start..end).map(Value::Int).collect()))
                    }
                    _ => Some(Value::Null),
                }
            }
            Expr::Map { input, var, body } => {
                let Some(Value::Array(items)) = input.eval_with(record, bindings) else {
                    return Some(Value::Null);
                };
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    bindings.vars.push((var.clone(), item));
                    let mapped = body.eval_with(record, bindings).unwrap_or(Value::Null);
                    bindings.vars.pop();
                    out.push(mapped);
                }
                Some(Value::Array(out))
            }
            Expr::FilterArray { input, var, cond } => {
                let Some(Value::Array(items)) = input.eval_with(record, bindings) else {
                    return Some(Value::Null);
                };
                let mut out = Vec::new();
                for item in items {
                    bindings.vars.push((var.clone(), item));
                    let keep = cond
                        .eval_with(record, bindings)
                        .is_some_and(|v| v.is_truthy());
                    if let Some((_, item)) = bindings.vars.pop() {
                        if keep {
                            out.push(item);
                        }
                    }
                }
                Some(Value::Array(out))
            }
            Expr::SetUnion(arrays) => {
                let mut seen = HashSet::new();
                let mut out = Vec::new();
                for value in Self::eval_all(arrays, record, bindings) {
                    let Value::Array(items) = value else {
                        return Some(Value::Null);
                    };
                    for item in items {
                        if seen.insert(item.clone()) {
                            out.push(item);
                        }
                    }
                }
                Some(Value::Array(out))
            }
            Expr::Avg(expr) => match expr.eval_with(record, bindings) {
                Some(Value::Array(items)) => Some(average(items.iter())),
                Some(value) if value.is_numeric() => Some(value),
                _ => Some(Value::Null),
            },
            Expr::Compare(op, a, b) => {
                let a = a.eval_with(record, bindings).unwrap_or(Value::Null);
                let b = b.eval_with(record, bindings).unwrap_or(Value::Null);
                Some(Value::Bool(op.holds(a.cmp(&b))))
            }
            Expr::In(value, array) => {
                let value = value.eval_with(record, bindings).unwrap_or(Value::Null);
                match array.eval_with(record, bindings) {
                    Some(Value::Array(items)) => Some(Value::Bool(items.contains(&value))),
                    _ => Some(Value::Bool(false)),
                }
            }
            Expr::Not(expr) => Some(Value::Bool(
                !expr.eval_with(record, bindings).is_some_and(|v| v.is_truthy()),
            )),
            Expr::And(exprs) => Some(Value::Bool(exprs.iter().all(|e| {
                e.eval_with(record, bindings).is_some_and(|v| v.is_truthy())
            }))),
            Expr::Or(exprs) => Some(Value::Bool(exprs.iter().any(|e| {
                e.eval_with(record, bindings).is_some_and(|v| v.is_truthy())
            }))),
            Expr::Cond {
                when,
                then,
                otherwise,
            } => {
                if when.eval_with(record, bindings).is_some_and(|v| v.is_truthy()) {
                    then.eval_with(record, bindings)
                } else {
                    otherwise.eval_with(record, bindings)
                }
            }
            Expr::IfNull(expr, fallback) => match expr.eval_with(record, bindings) {
                Some(Value::Null) | None => fallback.eval_with(record, bindings),
                value => value,
            },
            Expr::FormatDate { date, format } => match date.eval_with(record, bindings) {
                Some(Value::DateTime(dt)) => Some(Value::Text(dt.format(format).to_string())),
                _ => Some(Value::Null),
            },
            Expr::Year(date) => match date.eval_with(record, bindings) {
                Some(Value::DateTime(dt)) => Some(Value::Int(i64::from(dt.year()))),
                _ => Some(Value::Null),
            },
            Expr::Month(date) => match date.eval_with(record, bindings) {
                Some(Value::DateTime(dt)) => Some(Value::Int(i64::from(dt.month()))),
                _ => Some(Value::Null),
            },
        }
    }

    fn eval_all(exprs: &[Expr], record: &Record, bindings: &mut Bindings) -> Vec<Value> {
        exprs
            .iter()
            .map(|e| e.eval_with(record, bindings).unwrap_or(Value::Null))
            .collect()
    }

    /// Record field paths this expression reads, excluding paths under bound variables.
    pub fn field_paths(&self) -> Vec<&FieldPath> {
        let mut out = Vec::new();
        self.collect_paths(&mut out);
        out
    }

    fn collect_paths<'a>(&'a self, out: &mut Vec<&'a FieldPath>) {
        match self {
            Expr::Field(path) => out.push(path),
            Expr::Var(..) | Expr::Literal(_) => {}
            Expr::Object(fields) => fields.iter().for_each(|(_, e)| e.collect_paths(out)),
            Expr::Add(exprs)
            | Expr::Multiply(exprs)
            | Expr::SetUnion(exprs)
            | Expr::And(exprs)
            | Expr::Or(exprs) => {
                exprs.iter().for_each(|e| e.collect_paths(out))
            }
            Expr::Subtract(a, b)
            | Expr::Divide(a, b)
            | Expr::ArrayElemAt(a, b)
            | Expr::Range(a, b)
            | Expr::Compare(_, a, b)
            | Expr::In(a, b)
            | Expr::IfNull(a, b) => {
                a.collect_paths(out);
                b.collect_paths(out);
            }
            Expr::Round(e, _)
            | Expr::Size(e)
            | Expr::Slice(e, _)
            | Expr::Avg(e)
            | Expr::Not(e)
            | Expr::Year(e)
            | Expr::Month(e) => e.collect_paths(out),
            Expr::FormatDate { date, .. } => date.collect_paths(out),
            Expr::Map { input, body, .. } => {
                input.collect_paths(out);
                body.collect_paths(out);
            }
            Expr::FilterArray { input, cond, .. } => {
                input.collect_paths(out);
                cond.collect_paths(out);
            }
            Expr::Cond {
                when,
                then,
                otherwise,
            } => {
                when.collect_paths(out);
                then.collect_paths(out);
                otherwise.collect_paths(out);
            }
        }
    }
}

// ============================================================================
// Arithmetic
// ============================================================================

/// Sum numeric values. Integers stay integers until they overflow.
pub(crate) fn add_values(values: &[Value]) -> Value {
    let mut total = Value::Int(0);
    let mut date = None;
    for value in values {
        match value {
            Value::DateTime(dt) if date.is_none() => date = Some(*dt),
            v if v.is_numeric() => total = add_numbers(&total, v),
            _ => return Value::Null,
        }
    }
    match date {
        Some(dt) => total
            .as_i64()
            .and_then(|millis| dt.checked_add_signed(Duration::milliseconds(millis)))
            .map_or(Value::Null, Value::DateTime),
        None => total,
    }
}

pub(crate) fn add_numbers(a: &Value, b: &Value) -> Value {
    if let (Value::Int(x), Value::Int(y)) = (a, b) {
        if let Some(sum) = x.checked_add(*y) {
            return Value::Int(sum);
        }
    }
    match (a.as_decimal(), b.as_decimal()) {
        (Some(x), Some(y)) => x.checked_add(y).map_or(Value::Null, Value::Decimal),
        _ => Value::Null,
    }
}

fn subtract_values(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::DateTime(x), Value::DateTime(y)) => {
            Value::Int(x.signed_duration_since(*y).num_milliseconds())
        }
        (Value::DateTime(x), n) if n.is_numeric() => n
            .as_i64()
            .and_then(|millis| x.checked_sub_signed(Duration::milliseconds(millis)))
            .map_or(Value::Null, Value::DateTime),
        (Value::Int(x), Value::Int(y)) => x
            .checked_sub(*y)
            .map(Value::Int)
            .unwrap_or_else(|| decimal_op(a, b, Decimal::checked_sub)),
        _ => decimal_op(a, b, Decimal::checked_sub),
    }
}

fn multiply_values(values: &[Value]) -> Value {
    let mut product = Value::Int(1);
    for value in values {
        product = match (&product, value) {
            (Value::Int(x), Value::Int(y)) => x
                .checked_mul(*y)
                .map(Value::Int)
                .unwrap_or_else(|| decimal_op(&product, value, Decimal::checked_mul)),
            _ => decimal_op(&product, value, Decimal::checked_mul),
        };
        if product.is_null() {
            return Value::Null;
        }
    }
    product
}

fn divide_values(a: &Value, b: &Value) -> Value {
    match (a.as_decimal(), b.as_decimal()) {
        (Some(_), Some(divisor)) if divisor.is_zero() => Value::Null,
        _ => decimal_op(a, b, Decimal::checked_div),
    }
}

fn decimal_op(a: &Value, b: &Value, op: fn(Decimal, Decimal) -> Option<Decimal>) -> Value {
    match (a.as_decimal(), b.as_decimal()) {
        (Some(x), Some(y)) => op(x, y).map_or(Value::Null, Value::Decimal),
        _ => Value::Null,
    }
}

/// Round half away from zero. Integers are already exact.
pub(crate) fn round_value(value: &Value, places: u32) -> Value {
    match value {
        Value::Int(i) => Value::Int(*i),
        Value::Decimal(d) => {
            let mut rounded =
                d.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
            // Always exactly `places` digits: 200 becomes 200.00.
            rounded.rescale(places);
            Value::Decimal(rounded)
        }
        _ => Value::Null,
    }
}

/// Average of the numeric values; null when there are none.
pub(crate) fn average<'a>(values: impl Iterator<Item = &'a Value>) -> Value {
    let mut sum = Decimal::ZERO;
    let mut count = 0_i64;
    for d in values.filter_map(Value::as_decimal) {
        match sum.checked_add(d) {
            Some(total) => sum = total,
            None => return Value::Null,
        }
        count += 1;
    }
    if count == 0 {
        return Value::Null;
    }
    sum.checked_div(Decimal::from(count))
        .map_or(Value::Null, Value::Decimal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn dec(s: &str) -> Value {
        Value::Decimal(s.parse().expect("decimal literal"))
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        let rec = Record::new()
            .with("up", Decimal::new(2345, 3))
            .with("down", Decimal::new(-2345, 3))
            .with("even", Decimal::new(25, 1));

        assert_eq!(Expr::round(Expr::field("up"), 2).eval(&rec), Some(dec("2.35")));
        assert_eq!(
            Expr::round(Expr::field("down"), 2).eval(&rec),
            Some(dec("-2.35"))
        );
        assert_eq!(Expr::round(Expr::field("even"), 0).eval(&rec), Some(dec("3")));
    }

    #[test]
    fn rounding_pads_to_the_requested_places() {
        let rec = Record::new().with("whole", Decimal::from(200));
        let Some(Value::Decimal(rounded)) = Expr::round(Expr::field("whole"), 2).eval(&rec) else {
            panic!("expected a decimal");
        };
        assert_eq!(rounded.to_string(), "200.00");
        assert_eq!(rounded.scale(), 2);
    }

    #[test]
    fn division_by_zero_is_null() {
        let rec = Record::new().with("visits", 4_i64).with("physicians", 0_i64);
        let ratio = Expr::divide(Expr::field("visits"), Expr::field("physicians"));
        assert_eq!(ratio.eval(&rec), Some(Value::Null));

        let rec = rec.with("physicians", 3_i64);
        let ratio = Expr::round(ratio, 2);
        assert_eq!(ratio.eval(&rec), Some(dec("1.33")));
    }

    #[test]
    fn date_minus_date_is_milliseconds() {
        let a = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let rec = Record::new().with("a", a).with("b", b);
        let diff = Expr::subtract(Expr::field("a"), Expr::field("b"));
        assert_eq!(diff.eval(&rec), Some(Value::Int(86_400_000)));
    }

    #[test]
    fn integer_sums_promote_on_overflow() {
        let sum = add_values(&[Value::Int(i64::MAX), Value::Int(1)]);
        assert_eq!(
            sum,
            Value::Decimal(Decimal::from(i64::MAX) + Decimal::ONE)
        );
        assert!(matches!(add_values(&[Value::Int(2), Value::Int(3)]), Value::Int(5)));
    }

    #[test]
    fn map_over_range_computes_gaps() {
        let rec = Record::new().with("dates", vec![Value::Int(10), Value::Int(15), Value::Int(30)]);
        let gaps = Expr::map(
            Expr::range(Expr::lit(1_i64), Expr::size(Expr::field("dates"))),
            "idx",
            Expr::subtract(
                Expr::elem_at(Expr::field("dates"), Expr::var("idx", "")),
                Expr::elem_at(
                    Expr::field("dates"),
                    Expr::subtract(Expr::var("idx", ""), Expr::lit(1_i64)),
                ),
            ),
        );
        assert_eq!(
            gaps.eval(&rec),
            Some(Value::from(vec![Value::Int(5), Value::Int(15)]))
        );
        assert_eq!(Expr::avg(gaps).eval(&rec), Some(dec("10")));
    }

    #[test]
    fn filter_binds_elements() {
        let staff = vec![
            Record::new().with("role", Record::new().with("code", "002")),
            Record::new().with("role", Record::new().with("code", "003")),
            Record::new().with("role", Record::new().with("code", "002")),
        ];
        let rec = Record::new().with("staff", staff);
        let physicians = Expr::size(Expr::filter(
            Expr::field("staff"),
            "member",
            Expr::eq(Expr::var("member", "role.code"), Expr::lit("002")),
        ));
        assert_eq!(physicians.eval(&rec), Some(Value::Int(2)));
    }

    #[test]
    fn set_union_keeps_first_seen_order() {
        let rec = Record::new()
            .with("a", vec!["Flu", "Asthma", "Flu"])
            .with("b", vec!["Otitis", "Asthma"]);
        let union = Expr::set_union([Expr::field("a"), Expr::field("b")]);
        assert_eq!(
            union.eval(&rec),
            Some(Value::from(vec!["Flu", "Asthma", "Otitis"]))
        );
        assert_eq!(Expr::size(union).eval(&rec), Some(Value::Int(3)));
    }

    #[test]
    fn missing_fields_fall_back_with_if_null() {
        let rec = Record::new();
        assert_eq!(Expr::field("total").eval(&rec), None);
        assert_eq!(
            Expr::if_null(Expr::field("total"), Expr::lit(0_i64)).eval(&rec),
            Some(Value::Int(0))
        );
    }

    #[test]
    fn element_at_supports_negative_indexes() {
        let rec = Record::new().with("xs", vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(
            Expr::elem_at(Expr::field("xs"), Expr::lit(-1_i64)).eval(&rec),
            Some(Value::Int(3))
        );
        assert_eq!(Expr::elem_at(Expr::field("xs"), Expr::lit(5_i64)).eval(&rec), None);
    }

    #[test]
    fn date_format_is_validated_at_construction() {
        assert!(Expr::format_date(Expr::field("date"), "%Y-%m-%d").is_ok());
        let err = Expr::format_date(Expr::field("date"), "%Q-%").expect_err("bad pattern");
        assert!(matches!(err, ReportError::Validation(_)));

        let rec = Record::new().with("date", Utc.with_ymd_and_hms(2024, 7, 9, 0, 0, 0).unwrap());
        let expr = Expr::format_date(Expr::field("date"), "%Y-%m").expect("valid");
        assert_eq!(expr.eval(&rec), Some(Value::from("2024-07")));
        assert_eq!(Expr::month(Expr::field("date")).eval(&rec), Some(Value::Int(7)));
    }
}
