//! Medical visits.

use chrono::{DateTime, Utc};
use medrep_types::EntityId;
use serde::{Deserialize, Serialize};

/// One patient encounter with a specialist physician at a hospital.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Visit {
    #[serde(rename = "_id", alias = "id")]
    pub id: EntityId,
    pub date: DateTime<Utc>,
    pub patient_id: EntityId,
    pub physician_id: EntityId,
    pub hospital_id: EntityId,
    pub diagnosis: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
