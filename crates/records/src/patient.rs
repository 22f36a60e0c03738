//! Patients and their clinical history.

use chrono::{DateTime, Utc};
use medrep_types::{EntityId, NonEmptyText};
use serde::{Deserialize, Serialize};

/// One entry of a patient's ordered clinical history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HistoryEntry {
    pub date: DateTime<Utc>,
    pub diagnosis: String,
    pub treatment_id: EntityId,
    /// Free-text outcome, e.g. "In progress", "Completed".
    pub outcome: String,
}

/// A patient. `record_number` is unique across all patients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Patient {
    #[serde(rename = "_id", alias = "id")]
    pub id: EntityId,
    pub record_number: i64,
    pub name: NonEmptyText,
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub insurer: String,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}
