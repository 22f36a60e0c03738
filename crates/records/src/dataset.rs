//! Dataset bundles: all six collections in one document.
//!
//! A dataset file is a YAML (or JSON) mapping with one list per collection:
//!
//! ```yaml
//! hospitals: [...]
//! staff: [...]
//! patients: [...]
//! treatments: [...]
//! medications: [...]
//! visits: [...]
//! ```
//!
//! Parsing uses `serde_path_to_error` so that a schema mismatch names the failing field
//! (for example `patients[2].history[0].date`). Parsing never validates cross-record
//! invariants; call [`Dataset::validate`] for that.

use crate::{
    Hospital, Medication, Patient, RecordsError, RecordsResult, Staff, Treatment, Visit,
};
use medrep_types::EntityId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// All entity collections of one hospital information system.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Dataset {
    #[serde(default)]
    pub hospitals: Vec<Hospital>,
    #[serde(default)]
    pub staff: Vec<Staff>,
    #[serde(default)]
    pub patients: Vec<Patient>,
    #[serde(default)]
    pub treatments: Vec<Treatment>,
    #[serde(default)]
    pub medications: Vec<Medication>,
    #[serde(default)]
    pub visits: Vec<Visit>,
}

impl Dataset {
    /// Parse a dataset from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`RecordsError::Schema`] with the failing path when the text does not match
    /// the dataset schema (unknown keys, wrong types, malformed ids or dates).
    pub fn parse_yaml(yaml_text: &str) -> RecordsResult<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);
        serde_path_to_error::deserialize(deserializer).map_err(schema_error)
    }

    /// Parse a dataset from JSON text.
    pub fn parse_json(json_text: &str) -> RecordsResult<Self> {
        let mut deserializer = serde_json::Deserializer::from_str(json_text);
        serde_path_to_error::deserialize(&mut deserializer).map_err(schema_error)
    }

    /// Read and parse a dataset file, choosing the format from the extension.
    ///
    /// `.json` files are parsed as JSON; everything else is treated as YAML.
    pub fn load(path: &Path) -> RecordsResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let dataset = if is_json {
            Self::parse_json(&text)?
        } else {
            Self::parse_yaml(&text)?
        };

        tracing::debug!(
            path = %path.display(),
            hospitals = dataset.hospitals.len(),
            patients = dataset.patients.len(),
            visits = dataset.visits.len(),
            "loaded dataset"
        );
        Ok(dataset)
    }

    /// Check the model invariants across the whole dataset.
    ///
    /// Checked:
    /// - identifiers are unique within each collection
    /// - hospitals offer at least one specialty
    /// - specialty and license number are present exactly for specialist staff
    /// - patient record numbers are unique
    /// - treatment costs and stock quantities are non-negative
    /// - a medication has at most one stock entry per hospital
    /// - every visit's physician exists and holds the specialist role
    pub fn validate(&self) -> RecordsResult<()> {
        ensure_unique_ids("hospitals", self.hospitals.iter().map(|h| h.id))?;
        ensure_unique_ids("staff", self.staff.iter().map(|s| s.id))?;
        ensure_unique_ids("patients", self.patients.iter().map(|p| p.id))?;
        ensure_unique_ids("treatments", self.treatments.iter().map(|t| t.id))?;
        ensure_unique_ids("medications", self.medications.iter().map(|m| m.id))?;
        ensure_unique_ids("visits", self.visits.iter().map(|v| v.id))?;

        for hospital in &self.hospitals {
            if hospital.specialties.is_empty() {
                return Err(RecordsError::Invariant(format!(
                    "hospital {} offers no specialties",
                    hospital.id
                )));
            }
        }

        for member in &self.staff {
            let has_specialist_fields =
                member.specialty.is_some() && member.license_number.is_some();
            let has_any_specialist_field =
                member.specialty.is_some() || member.license_number.is_some();

            if member.role.is_specialist() && !has_specialist_fields {
                return Err(RecordsError::Invariant(format!(
                    "specialist {} must have a specialty and a license number",
                    member.id
                )));
            }
            if !member.role.is_specialist() && has_any_specialist_field {
                return Err(RecordsError::Invariant(format!(
                    "staff member {} carries specialist fields without the specialist role",
                    member.id
                )));
            }
        }

        let mut record_numbers = HashSet::new();
        for patient in &self.patients {
            if !record_numbers.insert(patient.record_number) {
                return Err(RecordsError::Invariant(format!(
                    "duplicate patient record number {}",
                    patient.record_number
                )));
            }
        }

        for treatment in &self.treatments {
            if treatment.cost < Decimal::ZERO {
                return Err(RecordsError::Invariant(format!(
                    "treatment {} has negative cost",
                    treatment.id
                )));
            }
        }

        for medication in &self.medications {
            let mut stocked_at = HashSet::new();
            for entry in &medication.stock_by_hospital {
                if entry.quantity < 0 {
                    return Err(RecordsError::Invariant(format!(
                        "medication {} has negative stock at hospital {}",
                        medication.id, entry.hospital_id
                    )));
                }
                if !stocked_at.insert(entry.hospital_id) {
                    return Err(RecordsError::Invariant(format!(
                        "medication {} has more than one stock entry for hospital {}",
                        medication.id, entry.hospital_id
                    )));
                }
            }
        }

        let staff_by_id: HashMap<EntityId, &Staff> =
            self.staff.iter().map(|s| (s.id, s)).collect();
        for visit in &self.visits {
            match staff_by_id.get(&visit.physician_id) {
                Some(physician) if physician.role.is_specialist() => {}
                Some(_) => {
                    return Err(RecordsError::Invariant(format!(
                        "visit {} references staff member {} who is not a specialist",
                        visit.id, visit.physician_id
                    )));
                }
                None => {
                    return Err(RecordsError::Invariant(format!(
                        "visit {} references unknown physician {}",
                        visit.id, visit.physician_id
                    )));
                }
            }
        }

        Ok(())
    }
}

fn ensure_unique_ids(
    collection: &str,
    ids: impl Iterator<Item = EntityId>,
) -> RecordsResult<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(RecordsError::Invariant(format!(
                "duplicate id {id} in {collection}"
            )));
        }
    }
    Ok(())
}

fn schema_error<E: std::fmt::Display>(err: serde_path_to_error::Error<E>) -> RecordsError {
    let path = err.path().to_string();
    let path = if path.is_empty() || path == "." {
        "<root>".to_string()
    } else {
        path
    };
    RecordsError::Schema {
        path,
        message: err.into_inner().to_string(),
    }
}
