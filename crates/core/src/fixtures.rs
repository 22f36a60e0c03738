//! Small, fully known dataset shared by the unit tests.

use chrono::{DateTime, TimeZone, Utc};
use records::{
    Dataset, EntityId, HistoryEntry, Hospital, Medication, NonEmptyText, Patient, Staff,
    StaffRole, StockEntry, Treatment, Visit,
};
use rust_decimal::Decimal;

use crate::access::{Role, RoleTable};
use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::store::MemoryStore;
use std::sync::Arc;

pub const CENTRAL: EntityId = EntityId::from_u128(0x0101);
pub const NORTH: EntityId = EntityId::from_u128(0x0102);
pub const SOUTH: EntityId = EntityId::from_u128(0x0103);

pub const DR_RUIZ: EntityId = EntityId::from_u128(0x0201);
pub const DR_MORA: EntityId = EntityId::from_u128(0x0202);
pub const DR_DIAZ: EntityId = EntityId::from_u128(0x0203);
pub const NURSE_RIOS: EntityId = EntityId::from_u128(0x0204);
pub const NURSE_VEGA: EntityId = EntityId::from_u128(0x0205);
pub const CLERK_TORRES: EntityId = EntityId::from_u128(0x0206);
pub const DR_LEON: EntityId = EntityId::from_u128(0x0207);

pub const ANGIOPLASTY: EntityId = EntityId::from_u128(0x0301);
pub const PHYSIOTHERAPY: EntityId = EntityId::from_u128(0x0302);
pub const ALLERGY_SHOTS: EntityId = EntityId::from_u128(0x0303);
pub const BETA_BLOCKERS: EntityId = EntityId::from_u128(0x0304);

pub const AMOXICILLIN: EntityId = EntityId::from_u128(0x0401);
pub const IBUPROFEN: EntityId = EntityId::from_u128(0x0402);
pub const SALBUTAMOL: EntityId = EntityId::from_u128(0x0403);

pub const GOMEZ: EntityId = EntityId::from_u128(0x0501);
pub const ROJAS: EntityId = EntityId::from_u128(0x0502);
pub const CASTRO: EntityId = EntityId::from_u128(0x0503);

fn text(s: &str) -> NonEmptyText {
    NonEmptyText::new(s).expect("fixture text is non-empty")
}

pub fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 9, 0, 0)
        .single()
        .expect("fixture date is valid")
}

fn hospital(id: EntityId, name: &str, city: &str, specialties: &[&str]) -> Hospital {
    Hospital {
        id,
        name: text(name),
        city: city.into(),
        specialties: specialties.iter().map(|s| s.to_string()).collect(),
        director_id: None,
    }
}

fn specialist(id: EntityId, name: &str, hospital: EntityId, specialty: &str) -> Staff {
    Staff {
        id,
        name: text(name),
        phone: None,
        email: None,
        salary: Decimal::new(9_000_000, 0),
        role: StaffRole::specialist(),
        hospital_id: Some(hospital),
        specialty: Some(specialty.into()),
        license_number: Some(format!("LIC-{}", &id.to_string()[28..])),
    }
}

fn staff(id: EntityId, name: &str, hospital: EntityId, role: StaffRole) -> Staff {
    Staff {
        id,
        name: text(name),
        phone: Some("+57 300 000 0000".into()),
        email: None,
        salary: Decimal::new(3_500_000, 0),
        role,
        hospital_id: Some(hospital),
        specialty: None,
        license_number: None,
    }
}

fn treatment(id: EntityId, name: &str, area: &str, cost: i64) -> Treatment {
    Treatment {
        id,
        name: text(name),
        description: None,
        medical_area: area.into(),
        cost: Decimal::from(cost),
    }
}

fn medication(id: EntityId, name: &str, stock: &[(EntityId, i64)]) -> Medication {
    Medication {
        id,
        name: text(name),
        manufacturer: "Genfar".into(),
        form: "tablet".into(),
        stock_by_hospital: stock
            .iter()
            .map(|&(hospital_id, quantity)| StockEntry {
                hospital_id,
                quantity,
            })
            .collect(),
    }
}

fn entry(date: DateTime<Utc>, diagnosis: &str, treatment_id: EntityId, outcome: &str) -> HistoryEntry {
    HistoryEntry {
        date,
        diagnosis: diagnosis.into(),
        treatment_id,
        outcome: outcome.into(),
    }
}

fn patient(id: EntityId, number: i64, name: &str, insurer: &str, history: Vec<HistoryEntry>) -> Patient {
    Patient {
        id,
        record_number: number,
        name: text(name),
        address: "Calle 10 # 5-20".into(),
        phone: None,
        email: None,
        insurer: insurer.into(),
        history,
    }
}

fn visit(
    n: u128,
    date: DateTime<Utc>,
    patient_id: EntityId,
    physician_id: EntityId,
    hospital_id: EntityId,
    diagnosis: &str,
) -> Visit {
    Visit {
        id: EntityId::from_u128(0x0600 + n),
        date,
        patient_id,
        physician_id,
        hospital_id,
        diagnosis: diagnosis.into(),
        notes: None,
    }
}

/// Three hospitals, four specialists, six visits.
///
/// Dr. Diaz practises cardiology at North Clinic, which does not offer it. Dr. Leon has no
/// visits and South Annex has no staff.
pub fn dataset() -> Dataset {
    let dataset = Dataset {
        hospitals: vec![
            hospital(CENTRAL, "Central Hospital", "Bogota", &["Cardiology", "Pediatrics", "Neurology"]),
            hospital(NORTH, "North Clinic", "Medellin", &["Pediatrics", "Dermatology"]),
            hospital(SOUTH, "South Annex", "Cali", &["Dermatology"]),
        ],
        staff: vec![
            specialist(DR_RUIZ, "Carlos Ruiz", CENTRAL, "Cardiology"),
            specialist(DR_MORA, "Elena Mora", CENTRAL, "Neurology"),
            specialist(DR_DIAZ, "Jorge Diaz", NORTH, "Cardiology"),
            specialist(DR_LEON, "Ines Leon", NORTH, "Pediatrics"),
            staff(NURSE_RIOS, "Paula Rios", CENTRAL, StaffRole::nurse()),
            staff(NURSE_VEGA, "Sara Vega", NORTH, StaffRole::nurse()),
            staff(
                CLERK_TORRES,
                "Ana Torres",
                CENTRAL,
                StaffRole::new(records::role_codes::ADMINISTRATIVE, "Administrative Staff"),
            ),
        ],
        patients: vec![
            patient(
                GOMEZ,
                1001,
                "Laura Gomez",
                "Sanitas",
                vec![
                    entry(day(2024, 1, 10), "Hypertension", BETA_BLOCKERS, "In progress"),
                    entry(day(2024, 2, 1), "Coronary disease", ANGIOPLASTY, "Completed"),
                ],
            ),
            patient(
                ROJAS,
                1002,
                "Mateo Rojas",
                "Sura",
                vec![entry(day(2024, 1, 15), "Asthma", ALLERGY_SHOTS, "Completed")],
            ),
            patient(
                CASTRO,
                1003,
                "Valeria Castro",
                "Sanitas",
                vec![
                    entry(day(2024, 3, 1), "Migraine", PHYSIOTHERAPY, "Ongoing"),
                    entry(day(2024, 3, 20), "Back pain", PHYSIOTHERAPY, "Completed"),
                    entry(day(2024, 4, 2), "Hypertension", BETA_BLOCKERS, "Successful"),
                ],
            ),
        ],
        treatments: vec![
            treatment(ANGIOPLASTY, "Angioplasty", "Cardiology", 5000),
            treatment(PHYSIOTHERAPY, "Physiotherapy", "Rehabilitation", 300),
            treatment(ALLERGY_SHOTS, "Allergy shots", "Immunology", 100),
            treatment(BETA_BLOCKERS, "Beta blockers", "Cardiology", 300),
        ],
        medications: vec![
            medication(AMOXICILLIN, "Amoxicillin", &[(CENTRAL, 500), (NORTH, 2000)]),
            medication(IBUPROFEN, "Ibuprofen", &[(CENTRAL, 1200)]),
            medication(SALBUTAMOL, "Salbutamol", &[(NORTH, 40)]),
        ],
        visits: vec![
            visit(1, day(2024, 1, 10), GOMEZ, DR_RUIZ, CENTRAL, "Hypertension"),
            visit(2, day(2024, 2, 1), GOMEZ, DR_RUIZ, CENTRAL, "Coronary disease"),
            visit(3, day(2024, 1, 15), ROJAS, DR_DIAZ, NORTH, "Asthma"),
            visit(4, day(2024, 3, 1), CASTRO, DR_MORA, CENTRAL, "Migraine"),
            visit(5, day(2024, 3, 20), CASTRO, DR_MORA, CENTRAL, "Migraine"),
            visit(6, day(2024, 4, 2), CASTRO, DR_RUIZ, CENTRAL, "Hypertension"),
        ],
    };
    dataset.validate().expect("fixture dataset is valid");
    dataset
}

pub fn store() -> MemoryStore {
    MemoryStore::from_dataset(&dataset())
}

/// An engine acting as the general director with the default configuration.
pub fn director<'a>(store: &'a MemoryStore, gate: &'a RoleTable) -> Engine<'a> {
    Engine::new(store, gate, Role::GeneralDirector, Arc::new(EngineConfig::default()))
}
