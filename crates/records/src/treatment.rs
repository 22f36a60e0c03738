//! Treatment catalog entries.

use medrep_types::{EntityId, NonEmptyText};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A billable treatment. `cost` is never negative in a validated dataset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Treatment {
    #[serde(rename = "_id", alias = "id")]
    pub id: EntityId,
    pub name: NonEmptyText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub medical_area: String,
    pub cost: Decimal,
}
