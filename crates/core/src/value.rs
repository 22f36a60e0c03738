//! Values carried by records flowing through a pipeline.
//!
//! [`Value`] is a closed set of scalar and composite kinds. Values are totally ordered so that
//! sorting, grouping and min/max behave identically for every input. The order across kinds is:
//!
//! `Null < numbers < Text < Document < Array < Id < Bool < DateTime`
//!
//! Integers and decimals form a single numeric kind: `Int(2)` and `Decimal(2.00)` compare
//! equal and hash equal.

use crate::record::Record;
use chrono::{DateTime, SecondsFormat, Utc};
use medrep_types::EntityId;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// A single value inside a [`Record`].
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    Text(String),
    Id(EntityId),
    DateTime(DateTime<Utc>),
    Array(Vec<Value>),
    Document(Record),
}

impl Value {
    /// Position of this value's kind in the cross-kind ordering.
    fn kind_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Int(_) | Value::Decimal(_) => 1,
            Value::Text(_) => 2,
            Value::Document(_) => 3,
            Value::Array(_) => 4,
            Value::Id(_) => 5,
            Value::Bool(_) => 6,
            Value::DateTime(_) => 7,
        }
    }

    /// Whether two values belong to the same comparison bracket.
    ///
    /// Range comparisons in filters only match values of the same bracket.
    pub fn same_bracket(&self, other: &Value) -> bool {
        self.kind_rank() == other.kind_rank()
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Decimal(_))
    }

    /// Numeric view of an `Int` or `Decimal`.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Int(i) => Some(Decimal::from(*i)),
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Decimal(d) if d.fract().is_zero() => i64::try_from(*d).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Record> {
        match self {
            Value::Document(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Truthiness used by conditional and logical expressions.
    ///
    /// `Null`, `false` and numeric zero are false; everything else is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Decimal(d) => !d.is_zero(),
            _ => true,
        }
    }

    /// JSON rendering used to decode records into typed rows.
    ///
    /// Decimals become strings so no precision is lost, ids use their canonical form and
    /// datetimes are RFC 3339.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Decimal(d) => serde_json::Value::String(d.to_string()),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Id(id) => serde_json::Value::String(id.to_string()),
            Value::DateTime(dt) => {
                serde_json::Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Document(doc) => doc.to_json(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_kind = self.kind_rank().cmp(&other.kind_rank());
        if by_kind != Ordering::Equal {
            return by_kind;
        }

        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (a, b) if a.is_numeric() => match (a.as_decimal(), b.as_decimal()) {
                (Some(a), Some(b)) => a.cmp(&b),
                _ => Ordering::Equal,
            },
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Document(a), Value::Document(b)) => a.cmp(b),
            (Value::Array(a), Value::Array(b)) => a.cmp(b),
            (Value::Id(a), Value::Id(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind_rank().hash(state);
        match self {
            Value::Null => {}
            Value::Int(_) | Value::Decimal(_) => {
                if let Some(d) = self.as_decimal() {
                    d.normalize().hash(state);
                }
            }
            Value::Text(s) => s.hash(state),
            Value::Document(doc) => doc.hash(state),
            Value::Array(items) => items.hash(state),
            Value::Id(id) => id.hash(state),
            Value::Bool(b) => b.hash(state),
            Value::DateTime(dt) => dt.hash(state),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Decimal(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<EntityId> for Value {
    fn from(value: EntityId) -> Self {
        Value::Id(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::DateTime(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Value::Document(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::Array(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    #[test]
    fn kinds_order_across_types() {
        let ascending = vec![
            Value::Null,
            Value::Int(-4),
            Value::Decimal(Decimal::new(15, 1)),
            Value::Int(7),
            Value::from("abc"),
            Value::Document(Record::new()),
            Value::Array(vec![]),
            Value::Id(EntityId::from_u128(1)),
            Value::Bool(false),
            Value::Bool(true),
            Value::DateTime(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        ];

        let mut shuffled = ascending.clone();
        shuffled.reverse();
        shuffled.sort();
        assert_eq!(shuffled, ascending);
    }

    #[test]
    fn ints_and_decimals_are_one_numeric_kind() {
        let int = Value::Int(200);
        let dec = Value::Decimal(Decimal::new(20000, 2));
        assert_eq!(int, dec);

        let set: HashSet<Value> = [int, dec].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn decimals_render_as_json_strings() {
        let json = Value::Decimal(Decimal::new(5050, 2)).to_json();
        assert_eq!(json, serde_json::json!("50.50"));

        let id = EntityId::from_u128(0x2a);
        assert_eq!(Value::Id(id).to_json(), serde_json::json!(id.to_string()));
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::Decimal(Decimal::ZERO).is_truthy());
        assert!(Value::from("").is_truthy());
        assert!(Value::Array(vec![]).is_truthy());
    }
}
