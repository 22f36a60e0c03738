//! Partitioning and accumulator state for group stages.

use super::expr::{add_numbers, average};
use super::stage::Accumulator;
use crate::record::Record;
use crate::value::Value;
use indexmap::IndexMap;
use std::collections::HashSet;

/// Running state of one accumulator over one partition.
#[derive(Debug)]
enum AccState {
    Count(i64),
    Sum(Value),
    Avg(Vec<Value>),
    Min(Option<Value>),
    Max(Option<Value>),
    AddToSet(Vec<Value>, HashSet<Value>),
    Push(Vec<Value>),
    First(Option<Value>),
}

impl AccState {
    fn new(accumulator: &Accumulator) -> Self {
        match accumulator {
            Accumulator::Count => AccState::Count(0),
            Accumulator::Sum(_) => AccState::Sum(Value::Int(0)),
            Accumulator::Avg(_) => AccState::Avg(Vec::new()),
            Accumulator::Min(_) => AccState::Min(None),
            Accumulator::Max(_) => AccState::Max(None),
            Accumulator::AddToSet(_) => AccState::AddToSet(Vec::new(), HashSet::new()),
            Accumulator::Push(_) => AccState::Push(Vec::new()),
            Accumulator::First(_) => AccState::First(None),
        }
    }

    /// Feed the accumulator input evaluated for one record (`None` when missing).
    fn feed(&mut self, input: Option<Value>) {
        match self {
            AccState::Count(n) => *n += 1,
            AccState::Sum(total) => {
                if let Some(v) = input.filter(Value::is_numeric) {
                    *total = add_numbers(total, &v);
                }
            }
            AccState::Avg(values) => {
                if let Some(v) = input.filter(Value::is_numeric) {
                    values.push(v);
                }
            }
            AccState::Min(current) => {
                if let Some(v) = input.filter(|v| !v.is_null()) {
                    if current.as_ref().map_or(true, |c| v < *c) {
                        *current = Some(v);
                    }
                }
            }
            AccState::Max(current) => {
                if let Some(v) = input.filter(|v| !v.is_null()) {
                    if current.as_ref().map_or(true, |c| v > *c) {
                        *current = Some(v);
                    }
                }
            }
            AccState::AddToSet(values, seen) => {
                if let Some(v) = input {
                    if seen.insert(v.clone()) {
                        values.push(v);
                    }
                }
            }
            AccState::Push(values) => {
                if let Some(v) = input {
                    values.push(v);
                }
            }
            AccState::First(first) => {
                if first.is_none() {
                    *first = Some(input.unwrap_or(Value::Null));
                }
            }
        }
    }

    fn finish(self) -> Value {
        match self {
            AccState::Count(n) => Value::Int(n),
            AccState::Sum(total) => total,
            AccState::Avg(values) => average(values.iter()),
            AccState::Min(v) | AccState::Max(v) | AccState::First(v) => v.unwrap_or(Value::Null),
            AccState::AddToSet(values, _) | AccState::Push(values) => Value::Array(values),
        }
    }
}

/// Partitions of a group stage, kept in first-appearance order.
pub(crate) struct Partitions<'a> {
    accumulators: &'a [(String, Accumulator)],
    groups: IndexMap<Value, Vec<AccState>>,
}

impl<'a> Partitions<'a> {
    pub(crate) fn new(accumulators: &'a [(String, Accumulator)]) -> Self {
        Self {
            accumulators,
            groups: IndexMap::new(),
        }
    }

    pub(crate) fn add(&mut self, key: Value, record: &Record) {
        let accumulators = self.accumulators;
        let states = self
            .groups
            .entry(key)
            .or_insert_with(|| accumulators.iter().map(|(_, a)| AccState::new(a)).collect());

        for ((_, accumulator), state) in accumulators.iter().zip(states.iter_mut()) {
            let input = accumulator.input().and_then(|expr| expr.eval(record));
            state.feed(input);
        }
    }

    /// One record per partition: `_id` first, then accumulators in declaration order.
    pub(crate) fn into_records(self) -> Vec<Record> {
        let accumulators = self.accumulators;
        self.groups
            .into_iter()
            .map(|(key, states)| {
                let mut record = Record::new().with("_id", key);
                for ((name, _), state) in accumulators.iter().zip(states) {
                    record.insert(name.clone(), state.finish());
                }
                record
            })
            .collect()
    }
}
