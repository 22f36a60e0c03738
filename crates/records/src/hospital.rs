//! Hospitals.

use medrep_types::{EntityId, NonEmptyText};
use serde::{Deserialize, Serialize};

/// A hospital and the specialties it offers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Hospital {
    #[serde(rename = "_id", alias = "id")]
    pub id: EntityId,
    pub name: NonEmptyText,
    pub city: String,
    /// Never empty once the owning dataset has been validated.
    pub specialties: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub director_id: Option<EntityId>,
}

impl Hospital {
    pub fn offers(&self, specialty: &str) -> bool {
        self.specialties.iter().any(|s| s == specialty)
    }
}
