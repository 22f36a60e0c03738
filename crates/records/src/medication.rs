//! Medications and their per-hospital stock.

use medrep_types::{EntityId, NonEmptyText};
use serde::{Deserialize, Serialize};

/// Units of a medication on hand at one hospital.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StockEntry {
    pub hospital_id: EntityId,
    pub quantity: i64,
}

/// A medication with at most one stock entry per hospital.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Medication {
    #[serde(rename = "_id", alias = "id")]
    pub id: EntityId,
    pub name: NonEmptyText,
    pub manufacturer: String,
    /// Dosage form, e.g. tablet, suspension, inhaler.
    pub form: String,
    #[serde(default)]
    pub stock_by_hospital: Vec<StockEntry>,
}

impl Medication {
    pub fn stock_at(&self, hospital_id: EntityId) -> Option<i64> {
        self.stock_by_hospital
            .iter()
            .find(|entry| entry.hospital_id == hospital_id)
            .map(|entry| entry.quantity)
    }
}
