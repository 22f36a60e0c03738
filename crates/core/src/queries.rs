//! Canned lookups returning whole entities.
//!
//! These are plain filters over one collection, decoded back into the `records` entity
//! types. They go through the same [`Engine`] (and therefore the same access checks) as the
//! report catalog.

use crate::constants::{HOSPITALS, MEDICATIONS, PATIENTS, STAFF, TREATMENTS, VISITS};
use crate::engine::{Engine, FindOptions, Predicate, SortKey};
use crate::reports::{decode_rows, params};
use crate::{ReportError, ReportResult};
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use records::{role_codes, EntityId, Hospital, Medication, Patient, Staff, Treatment, Visit};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;

fn find_as<T: DeserializeOwned>(
    engine: &Engine<'_>,
    collection: &str,
    predicate: Predicate,
    options: FindOptions,
) -> ReportResult<Vec<T>> {
    decode_rows(&engine.find(collection, &predicate, options)?)
}

fn by_name() -> FindOptions {
    FindOptions::new().sort([SortKey::asc("name")])
}

pub fn patients_by_insurer(engine: &Engine<'_>, insurer: &str) -> ReportResult<Vec<Patient>> {
    find_as(engine, PATIENTS, Predicate::eq("insurer", insurer), by_name())
}

pub fn specialists_by_specialty(engine: &Engine<'_>, specialty: &str) -> ReportResult<Vec<Staff>> {
    let predicate = Predicate::and([
        Predicate::eq("role.code", role_codes::SPECIALIST),
        Predicate::eq("specialty", specialty),
    ]);
    find_as(engine, STAFF, predicate, by_name())
}

/// Treatments costing strictly more than `cost`, most expensive first.
pub fn treatments_above_cost(engine: &Engine<'_>, cost: Decimal) -> ReportResult<Vec<Treatment>> {
    let cost = params::non_negative_decimal("cost", cost)?;
    find_as(
        engine,
        TREATMENTS,
        Predicate::gt("cost", cost),
        FindOptions::new().sort([SortKey::desc("cost"), SortKey::asc("name")]),
    )
}

pub fn count_hospitals_in_city(engine: &Engine<'_>, city: &str) -> ReportResult<u64> {
    engine.count(HOSPITALS, &Predicate::eq("city", city))
}

pub fn medication_by_name(engine: &Engine<'_>, name: &str) -> ReportResult<Option<Medication>> {
    engine
        .find_one(MEDICATIONS, &Predicate::eq("name", name), FindOptions::new())?
        .map(|record| record.decode())
        .transpose()
}

pub fn staff_with_salary_above(engine: &Engine<'_>, salary: Decimal) -> ReportResult<Vec<Staff>> {
    let salary = params::non_negative_decimal("salary", salary)?;
    find_as(
        engine,
        STAFF,
        Predicate::gt("salary", salary),
        FindOptions::new().sort([SortKey::desc("salary"), SortKey::asc("name")]),
    )
}

/// Patients whose name matches a regular expression.
///
/// # Errors
///
/// Returns [`ReportError::Validation`] for an invalid pattern.
pub fn patients_by_name_pattern(
    engine: &Engine<'_>,
    pattern: &str,
    case_insensitive: bool,
) -> ReportResult<Vec<Patient>> {
    let predicate = Predicate::regex("name", pattern, case_insensitive)?;
    find_as(engine, PATIENTS, predicate, by_name())
}

/// Visits on one calendar day (UTC), earliest first.
pub fn visits_on_day(engine: &Engine<'_>, day: NaiveDate) -> ReportResult<Vec<Visit>> {
    let next = day
        .succ_opt()
        .ok_or_else(|| ReportError::Validation(format!("no day follows {day}")))?;
    let start = Utc.from_utc_datetime(&day.and_time(NaiveTime::default()));
    let end = Utc.from_utc_datetime(&next.and_time(NaiveTime::default()));

    find_as(
        engine,
        VISITS,
        Predicate::and([Predicate::gte("date", start), Predicate::lt("date", end)]),
        FindOptions::new().sort([SortKey::asc("date")]),
    )
}

pub fn patients_with_diagnosis(engine: &Engine<'_>, diagnosis: &str) -> ReportResult<Vec<Patient>> {
    find_as(
        engine,
        PATIENTS,
        Predicate::eq("history.diagnosis", diagnosis),
        by_name(),
    )
}

pub fn count_specialists(engine: &Engine<'_>) -> ReportResult<u64> {
    engine.count(STAFF, &Predicate::eq("role.code", role_codes::SPECIALIST))
}

pub fn hospitals_offering(engine: &Engine<'_>, specialty: &str) -> ReportResult<Vec<Hospital>> {
    find_as(engine, HOSPITALS, Predicate::eq("specialties", specialty), by_name())
}

/// Medications whose stock at `hospital_id` is below `below` units.
pub fn medications_low_at(
    engine: &Engine<'_>,
    hospital_id: EntityId,
    below: i64,
) -> ReportResult<Vec<Medication>> {
    let below = params::non_negative("stock threshold", below)?;
    let predicate = Predicate::elem_match(
        "stock_by_hospital",
        Predicate::and([
            Predicate::eq("hospital_id", hospital_id),
            Predicate::lt("quantity", below),
        ]),
    );
    find_as(engine, MEDICATIONS, predicate, by_name())
}

pub fn patients_without_history(engine: &Engine<'_>) -> ReportResult<Vec<Patient>> {
    find_as(engine, PATIENTS, Predicate::size("history", 0), by_name())
}

pub fn staff_without_hospital(engine: &Engine<'_>) -> ReportResult<Vec<Staff>> {
    find_as(engine, STAFF, Predicate::exists("hospital_id", false), by_name())
}
