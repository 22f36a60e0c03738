//! Records and field paths.
//!
//! A [`Record`] is an ordered field map; insertion order is preserved and is part of the
//! output contract of project and group stages. Field access goes through [`FieldPath`],
//! a dotted path such as `stock_by_hospital.hospital_id` or `dates.1`.

use crate::value::Value;
use crate::{ReportError, ReportResult};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

// ============================================================================
// Field paths
// ============================================================================

/// A dotted path into a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Split a dotted path into segments.
    pub fn new(path: &str) -> Self {
        Self {
            segments: path.split('.').map(str::to_string).collect(),
        }
    }

    /// The empty path, which refers to the value itself.
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        FieldPath::new(path)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

// ============================================================================
// Records
// ============================================================================

/// An ordered map of field names to values.
#[derive(Debug, Clone, Default)]
pub struct Record {
    fields: IndexMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Insert or replace a top-level field. A replaced field keeps its position.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    /// Builder-style [`Record::insert`].
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.shift_remove(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Follow a path through nested documents and numeric array indexes.
    ///
    /// No fan-out over arrays: a non-numeric segment applied to an array yields `None`.
    pub fn get_path(&self, path: &FieldPath) -> Option<&Value> {
        let (head, rest) = path.segments().split_first()?;
        let mut current = self.get(head)?;
        for segment in rest {
            current = match current {
                Value::Document(doc) => doc.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Resolve a path the way expressions see it.
    ///
    /// A segment applied to an array of documents maps over the elements, collecting the
    /// values that exist, so `hospitals.name` over an array yields an array of names.
    /// Returns `None` for a missing field.
    pub fn resolve(&self, path: &FieldPath) -> Option<Value> {
        let (head, rest) = path.segments().split_first()?;
        resolve_in(self.get(head)?, rest)
    }

    /// Every value reachable by `path`, fanning out over arrays along the way.
    ///
    /// This is the view filters use: a predicate on `history.diagnosis` matches when any
    /// history entry matches. Numeric segments also index into arrays.
    pub fn candidates(&self, path: &FieldPath) -> Vec<&Value> {
        let mut out = Vec::new();
        if let Some((head, rest)) = path.segments().split_first() {
            if let Some(value) = self.get(head) {
                collect_candidates(value, rest, &mut out);
            }
        }
        out
    }

    /// Set a value at `path`, creating intermediate documents as needed.
    ///
    /// Intermediate non-document values are replaced by documents.
    pub fn set_path(&mut self, path: &FieldPath, value: Value) {
        let Some((head, rest)) = path.segments().split_first() else {
            return;
        };
        if rest.is_empty() {
            self.insert(head.clone(), value);
            return;
        }

        let slot = self
            .fields
            .entry(head.clone())
            .or_insert_with(|| Value::Document(Record::new()));
        if !matches!(slot, Value::Document(_)) {
            *slot = Value::Document(Record::new());
        }
        if let Value::Document(doc) = slot {
            doc.set_path(&FieldPath::from_segments(rest), value);
        }
    }

    /// Remove the value at `path`, if present.
    pub fn remove_path(&mut self, path: &FieldPath) -> Option<Value> {
        let (head, rest) = path.segments().split_first()?;
        if rest.is_empty() {
            return self.remove(head);
        }
        match self.fields.get_mut(head)? {
            Value::Document(doc) => doc.remove_path(&FieldPath::from_segments(rest)),
            _ => None,
        }
    }

    /// JSON object in field insertion order, nested documents included.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    /// Decode this record into a typed row.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Shape`] with the failing field path if the record does not
    /// match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> ReportResult<T> {
        serde_path_to_error::deserialize(self.to_json()).map_err(|err| {
            let path = err.path().to_string();
            ReportError::Shape {
                path: if path == "." {
                    "<root>".into()
                } else {
                    path
                },
                message: err.into_inner().to_string(),
            }
        })
    }
}

impl FieldPath {
    fn from_segments(segments: &[String]) -> Self {
        Self {
            segments: segments.to_vec(),
        }
    }
}

fn resolve_in(value: &Value, rest: &[String]) -> Option<Value> {
    let Some((head, tail)) = rest.split_first() else {
        return Some(value.clone());
    };
    match value {
        Value::Document(doc) => resolve_in(doc.get(head)?, tail),
        Value::Array(items) => Some(Value::Array(
            items
                .iter()
                .filter_map(|item| match item {
                    Value::Document(doc) => resolve_in(doc.get(head)?, tail),
                    _ => None,
                })
                .collect(),
        )),
        _ => None,
    }
}

fn collect_candidates<'a>(value: &'a Value, rest: &[String], out: &mut Vec<&'a Value>) {
    let Some((head, tail)) = rest.split_first() else {
        out.push(value);
        return;
    };
    match value {
        Value::Document(doc) => {
            if let Some(next) = doc.get(head) {
                collect_candidates(next, tail, out);
            }
        }
        Value::Array(items) => {
            if let Ok(index) = head.parse::<usize>() {
                if let Some(item) = items.get(index) {
                    collect_candidates(item, tail, out);
                }
            }
            for item in items {
                if matches!(item, Value::Document(_)) {
                    collect_candidates(item, rest, out);
                }
            }
        }
        _ => {}
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Record {}

impl PartialOrd for Record {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Field-by-field in order: name first, then value; a prefix sorts first.
impl Ord for Record {
    fn cmp(&self, other: &Self) -> Ordering {
        for ((ka, va), (kb, vb)) in self.fields.iter().zip(other.fields.iter()) {
            let ord = ka.cmp(kb).then_with(|| va.cmp(vb));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        self.fields.len().cmp(&other.fields.len())
    }
}

impl Hash for Record {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fields.len().hash(state);
        for (k, v) in &self.fields {
            k.hash(state);
            v.hash(state);
        }
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde::Deserialize;

    fn patient() -> Record {
        Record::new()
            .with("name", "Ana")
            .with(
                "history",
                vec![
                    Record::new().with("diagnosis", "Flu").with("outcome", "Completed"),
                    Record::new().with("diagnosis", "Asthma"),
                ],
            )
            .with("dates", vec![Value::Int(10), Value::Int(20)])
    }

    #[test]
    fn get_path_indexes_arrays_but_does_not_fan_out() {
        let rec = patient();
        assert_eq!(rec.get_path(&"dates.1".into()), Some(&Value::Int(20)));
        assert_eq!(rec.get_path(&"history.diagnosis".into()), None);
        assert_eq!(
            rec.get_path(&"history.0.diagnosis".into()),
            Some(&Value::from("Flu"))
        );
    }

    #[test]
    fn resolve_maps_over_arrays_of_documents() {
        let rec = patient();
        let outcomes = rec.resolve(&"history.outcome".into()).expect("array");
        assert_eq!(outcomes, Value::from(vec!["Completed"]));
        assert!(rec.resolve(&"missing".into()).is_none());
    }

    #[test]
    fn candidates_fan_out_over_arrays() {
        let rec = patient();
        let found = rec.candidates(&"history.diagnosis".into());
        assert_eq!(found, vec![&Value::from("Flu"), &Value::from("Asthma")]);
        assert_eq!(rec.candidates(&"dates.0".into()), vec![&Value::Int(10)]);
    }

    #[test]
    fn set_and_remove_nested_paths() {
        let mut rec = Record::new().with("a", 1_i64);
        rec.set_path(&"b.c".into(), Value::from("x"));
        assert_eq!(rec.get_path(&"b.c".into()), Some(&Value::from("x")));
        assert_eq!(rec.keys().collect::<Vec<_>>(), vec!["a", "b"]);

        assert_eq!(rec.remove_path(&"b.c".into()), Some(Value::from("x")));
        assert!(rec.get_path(&"b.c".into()).is_none());
    }

    #[test]
    fn equality_is_order_sensitive() {
        let a = Record::new().with("x", 1_i64).with("y", 2_i64);
        let b = Record::new().with("y", 2_i64).with("x", 1_i64);
        assert_ne!(a, b);
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Row {
        medical_area: String,
        average_cost: Decimal,
    }

    #[test]
    fn json_keeps_field_order() {
        let record = Record::new()
            .with("zeta", 1_i64)
            .with("alpha", Record::new().with("b", 2_i64).with("a", 3_i64))
            .with("mid", "x");
        let json = record.to_json();

        let keys: Vec<&str> = json
            .as_object()
            .expect("object")
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        let nested: Vec<&str> = json["alpha"]
            .as_object()
            .expect("nested object")
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(nested, vec!["b", "a"]);
    }

    #[test]
    fn decode_reports_failing_path() {
        let ok = Record::new()
            .with("medicalArea", "Cardiology")
            .with("averageCost", Decimal::new(20000, 2))
            .decode::<Row>()
            .expect("decodes");
        assert_eq!(ok.medical_area, "Cardiology");
        assert_eq!(ok.average_cost, Decimal::new(200, 0));

        let err = Record::new()
            .with("medicalArea", 5_i64)
            .with("averageCost", "1")
            .decode::<Row>()
            .expect_err("wrong type");
        assert!(matches!(err, ReportError::Shape { ref path, .. } if path == "medicalArea"));
    }
}
