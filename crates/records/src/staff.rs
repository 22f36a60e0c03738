//! Hospital staff.

use crate::role_codes;
use medrep_types::{EntityId, NonEmptyText};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Role held by a staff member: a short code plus a human-readable description.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaffRole {
    pub code: String,
    pub description: String,
}

impl StaffRole {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
        }
    }

    pub fn specialist() -> Self {
        Self::new(role_codes::SPECIALIST, "Specialist Physician")
    }

    pub fn nurse() -> Self {
        Self::new(role_codes::NURSE, "Nurse")
    }

    pub fn is_specialist(&self) -> bool {
        self.code == role_codes::SPECIALIST
    }
}

/// A staff member.
///
/// `specialty` and `license_number` are only carried by specialist physicians; the dataset
/// validation enforces this both ways.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Staff {
    #[serde(rename = "_id", alias = "id")]
    pub id: EntityId,
    pub name: NonEmptyText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub salary: Decimal,
    pub role: StaffRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hospital_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
}
