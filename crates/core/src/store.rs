//! Entity store: the read-only source of collection documents.
//!
//! The real storage engine is an external collaborator; the engine only needs the documents
//! of a named collection. [`MemoryStore`] keeps collections in memory and is filled from a
//! [`records::Dataset`].

use crate::constants::{HOSPITALS, MAINTENANCE_TASKS, MEDICATIONS, PATIENTS, STAFF, TREATMENTS, VISITS};
use crate::record::Record;
use crate::value::Value;
use records::{Dataset, Hospital, Medication, Patient, Staff, Treatment, Visit};
use std::collections::HashMap;
use std::sync::Arc;

/// Read access to collections of documents.
pub trait EntityStore: Send + Sync {
    /// All documents of `collection`, or `None` if no such collection exists.
    fn documents(&self, collection: &str) -> Option<Arc<Vec<Record>>>;
}

/// In-memory [`EntityStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: HashMap<String, Arc<Vec<Record>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a collection.
    pub fn insert_collection(&mut self, name: impl Into<String>, documents: Vec<Record>) {
        self.collections.insert(name.into(), Arc::new(documents));
    }

    /// Builder-style [`MemoryStore::insert_collection`].
    pub fn with_collection(mut self, name: impl Into<String>, documents: Vec<Record>) -> Self {
        self.insert_collection(name, documents);
        self
    }

    /// Build a store holding every collection of `dataset`.
    ///
    /// `maintenance_tasks` is created empty so that the maintenance role has something to
    /// read.
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let store = Self::new()
            .with_collection(HOSPITALS, dataset.hospitals.iter().map(hospital_record).collect())
            .with_collection(STAFF, dataset.staff.iter().map(staff_record).collect())
            .with_collection(PATIENTS, dataset.patients.iter().map(patient_record).collect())
            .with_collection(
                TREATMENTS,
                dataset.treatments.iter().map(treatment_record).collect(),
            )
            .with_collection(
                MEDICATIONS,
                dataset.medications.iter().map(medication_record).collect(),
            )
            .with_collection(VISITS, dataset.visits.iter().map(visit_record).collect())
            .with_collection(MAINTENANCE_TASKS, Vec::new());

        tracing::debug!(
            hospitals = dataset.hospitals.len(),
            staff = dataset.staff.len(),
            patients = dataset.patients.len(),
            visits = dataset.visits.len(),
            "memory store built from dataset"
        );

        store
    }

    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }
}

impl EntityStore for MemoryStore {
    fn documents(&self, collection: &str) -> Option<Arc<Vec<Record>>> {
        self.collections.get(collection).cloned()
    }
}

// ============================================================================
// Entity to record conversion
// ============================================================================
//
// Field names match the dataset's serialized names. Optional fields that are unset are
// omitted rather than stored as null.

fn with_opt(record: Record, field: &str, value: Option<impl Into<Value>>) -> Record {
    match value {
        Some(v) => record.with(field, v),
        None => record,
    }
}

pub fn hospital_record(hospital: &Hospital) -> Record {
    let record = Record::new()
        .with("_id", hospital.id)
        .with("name", hospital.name.as_str())
        .with("city", hospital.city.as_str())
        .with("specialties", hospital.specialties.clone());
    with_opt(record, "director_id", hospital.director_id)
}

pub fn staff_record(staff: &Staff) -> Record {
    let mut record = Record::new()
        .with("_id", staff.id)
        .with("name", staff.name.as_str());
    record = with_opt(record, "phone", staff.phone.clone());
    record = with_opt(record, "email", staff.email.clone());
    record = record.with("salary", staff.salary).with(
        "role",
        Record::new()
            .with("code", staff.role.code.as_str())
            .with("description", staff.role.description.as_str()),
    );
    record = with_opt(record, "hospital_id", staff.hospital_id);
    record = with_opt(record, "specialty", staff.specialty.clone());
    with_opt(record, "license_number", staff.license_number.clone())
}

pub fn patient_record(patient: &Patient) -> Record {
    let history: Vec<Record> = patient
        .history
        .iter()
        .map(|entry| {
            Record::new()
                .with("date", entry.date)
                .with("diagnosis", entry.diagnosis.as_str())
                .with("treatment_id", entry.treatment_id)
                .with("outcome", entry.outcome.as_str())
        })
        .collect();

    let mut record = Record::new()
        .with("_id", patient.id)
        .with("record_number", patient.record_number)
        .with("name", patient.name.as_str())
        .with("address", patient.address.as_str());
    record = with_opt(record, "phone", patient.phone.clone());
    record = with_opt(record, "email", patient.email.clone());
    record
        .with("insurer", patient.insurer.as_str())
        .with("history", history)
}

pub fn treatment_record(treatment: &Treatment) -> Record {
    let record = Record::new()
        .with("_id", treatment.id)
        .with("name", treatment.name.as_str());
    with_opt(record, "description", treatment.description.clone())
        .with("medical_area", treatment.medical_area.as_str())
        .with("cost", treatment.cost)
}

pub fn medication_record(medication: &Medication) -> Record {
    let stock: Vec<Record> = medication
        .stock_by_hospital
        .iter()
        .map(|entry| {
            Record::new()
                .with("hospital_id", entry.hospital_id)
                .with("quantity", entry.quantity)
        })
        .collect();

    Record::new()
        .with("_id", medication.id)
        .with("name", medication.name.as_str())
        .with("manufacturer", medication.manufacturer.as_str())
        .with("form", medication.form.as_str())
        .with("stock_by_hospital", stock)
}

pub fn visit_record(visit: &Visit) -> Record {
    let record = Record::new()
        .with("_id", visit.id)
        .with("date", visit.date)
        .with("patient_id", visit.patient_id)
        .with("physician_id", visit.physician_id)
        .with("hospital_id", visit.hospital_id)
        .with("diagnosis", visit.diagnosis.as_str());
    with_opt(record, "notes", visit.notes.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn dataset_collections_are_all_present() {
        let store = MemoryStore::from_dataset(&fixtures::dataset());
        for name in crate::constants::ALL_COLLECTIONS {
            assert!(store.documents(name).is_some(), "missing {name}");
        }
        assert!(store.documents("archive").is_none());
        assert!(store
            .documents(MAINTENANCE_TASKS)
            .expect("maintenance")
            .is_empty());
    }

    #[test]
    fn ids_and_dates_keep_their_kinds() {
        let dataset = fixtures::dataset();
        let visit = &dataset.visits[0];
        let record = visit_record(visit);

        assert_eq!(record.get("_id"), Some(&Value::Id(visit.id)));
        assert_eq!(record.get("date"), Some(&Value::DateTime(visit.date)));
        assert!(matches!(record.get("physician_id"), Some(Value::Id(_))));
    }

    #[test]
    fn unset_optional_fields_are_omitted() {
        let dataset = fixtures::dataset();
        let nurse = dataset
            .staff
            .iter()
            .find(|s| !s.role.is_specialist())
            .expect("fixture has a nurse");
        let record = staff_record(nurse);
        assert!(record.get("specialty").is_none());
        assert!(record.get("license_number").is_none());
        assert_eq!(
            record.get_path(&"role.code".into()),
            Some(&Value::from(nurse.role.code.as_str()))
        );
    }
}
