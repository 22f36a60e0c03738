//! Visit activity reports.

use super::{decode_rows, params::DateWindow};
use crate::constants::{HOSPITALS, MILLIS_PER_DAY, PATIENTS, STAFF, VISITS};
use crate::engine::{Accumulator, Engine, Expr, Pipeline, Predicate, SortKey};
use crate::ReportResult;
use medrep_types::EntityId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Diagnoses ranked by visit count; at most this many rows.
const TOP_DIAGNOSES: usize = 20;

/// Distinct patients listed per diagnosis.
const PATIENTS_PER_DIAGNOSIS: usize = 10;

/// Patients listed in the average-visits summary.
const TOP_PATIENTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DiagnosisVisitsRow {
    pub diagnosis: String,
    pub total_visits: i64,
    pub first_patients: Vec<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CaseloadRow {
    pub physician_name: String,
    pub specialty: Option<String>,
    pub total_visits: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PatientVisits {
    pub patient_id: EntityId,
    pub visits: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AverageVisitsRow {
    pub average_visits: Decimal,
    pub top_patients: Vec<PatientVisits>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DistributionRow {
    pub insurer: String,
    pub city: String,
    pub total_patients: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VisitGapsRow {
    pub patient_name: String,
    pub average_days_between_visits: Decimal,
    pub total_visits: i64,
    pub gaps_in_days: Vec<Decimal>,
}

fn within(window: &DateWindow) -> Predicate {
    Predicate::and([
        Predicate::gte("date", window.start()),
        Predicate::lte("date", window.end()),
    ])
}

/// Most frequent diagnoses inside `window`, with the first distinct patients seen for each.
pub fn visits_by_diagnosis(
    engine: &Engine<'_>,
    window: &DateWindow,
) -> ReportResult<Vec<DiagnosisVisitsRow>> {
    let pipeline = Pipeline::new()
        .filter(within(window))
        .group(
            Expr::field("diagnosis"),
            [
                ("totalVisits", Accumulator::Count),
                ("patients", Accumulator::AddToSet(Expr::field("patient_id"))),
            ],
        )
        .sort([SortKey::desc("totalVisits"), SortKey::asc("_id")])
        .limit(TOP_DIAGNOSES)
        .project([
            ("diagnosis", Expr::field("_id")),
            ("totalVisits", Expr::field("totalVisits")),
            (
                "firstPatients",
                Expr::slice(Expr::field("patients"), PATIENTS_PER_DIAGNOSIS),
            ),
        ]);

    decode_rows(&engine.aggregate(VISITS, &pipeline)?)
}

/// Visits per physician inside `window`, busiest first.
pub fn physician_caseload(
    engine: &Engine<'_>,
    window: &DateWindow,
) -> ReportResult<Vec<CaseloadRow>> {
    let pipeline = Pipeline::new()
        .filter(within(window))
        .group(
            Expr::field("physician_id"),
            [("totalVisits", Accumulator::Count)],
        )
        .sort([SortKey::desc("totalVisits"), SortKey::asc("_id")])
        .lookup(STAFF, "_id", "_id", "physician")
        .unwind("physician")
        .project([
            ("physicianName", Expr::field("physician.name")),
            ("specialty", Expr::field("physician.specialty")),
            ("totalVisits", Expr::field("totalVisits")),
        ]);

    decode_rows(&engine.aggregate(VISITS, &pipeline)?)
}

/// Mean visits per patient who has visited at least once, plus the busiest patients.
///
/// No visits means no row.
pub fn average_visits_per_patient(engine: &Engine<'_>) -> ReportResult<Vec<AverageVisitsRow>> {
    let pipeline = Pipeline::new()
        .group(Expr::field("patient_id"), [("visits", Accumulator::Count)])
        .sort([SortKey::desc("visits"), SortKey::asc("_id")])
        .group(
            Expr::null(),
            [
                ("averageVisits", Accumulator::Avg(Expr::field("visits"))),
                (
                    "topPatients",
                    Accumulator::Push(Expr::object([
                        ("patientId", Expr::field("_id")),
                        ("visits", Expr::field("visits")),
                    ])),
                ),
            ],
        )
        .project([
            ("averageVisits", Expr::round(Expr::field("averageVisits"), 2)),
            ("topPatients", Expr::slice(Expr::field("topPatients"), TOP_PATIENTS)),
        ]);

    decode_rows(&engine.aggregate(VISITS, &pipeline)?)
}

/// Distinct visiting patients per insurer and hospital city.
pub fn patient_distribution(engine: &Engine<'_>) -> ReportResult<Vec<DistributionRow>> {
    let pipeline = Pipeline::new()
        .lookup(VISITS, "_id", "patient_id", "visits")
        .filter(Predicate::exists("visits.0", true))
        .unwind("visits")
        .lookup(HOSPITALS, "visits.hospital_id", "_id", "hospital")
        .unwind("hospital")
        .group(
            Expr::object([
                ("insurer", Expr::field("insurer")),
                ("city", Expr::field("hospital.city")),
            ]),
            [("patients", Accumulator::AddToSet(Expr::field("_id")))],
        )
        .project([
            ("insurer", Expr::field("_id.insurer")),
            ("city", Expr::field("_id.city")),
            ("totalPatients", Expr::size(Expr::field("patients"))),
        ])
        .sort([
            SortKey::asc("city"),
            SortKey::desc("totalPatients"),
            SortKey::asc("insurer"),
        ]);

    decode_rows(&engine.aggregate(PATIENTS, &pipeline)?)
}

/// Days between consecutive visits for every patient with at least two visits.
///
/// Gaps are exact; only their average is rounded.
pub fn inter_visit_gaps(engine: &Engine<'_>) -> ReportResult<Vec<VisitGapsRow>> {
    let day_gap = Expr::divide(
        Expr::subtract(
            Expr::elem_at(Expr::field("dates"), Expr::var("i", "")),
            Expr::elem_at(
                Expr::field("dates"),
                Expr::subtract(Expr::var("i", ""), Expr::lit(1_i64)),
            ),
        ),
        Expr::lit(MILLIS_PER_DAY),
    );

    let pipeline = Pipeline::new()
        .sort([SortKey::asc("patient_id"), SortKey::asc("date")])
        .group(
            Expr::field("patient_id"),
            [("dates", Accumulator::Push(Expr::field("date")))],
        )
        .filter(Predicate::exists("dates.1", true))
        .project([
            ("_id", Expr::field("_id")),
            ("totalVisits", Expr::size(Expr::field("dates"))),
            (
                "gapsInDays",
                Expr::map(
                    Expr::range(Expr::lit(1_i64), Expr::size(Expr::field("dates"))),
                    "i",
                    day_gap,
                ),
            ),
        ])
        .lookup(PATIENTS, "_id", "_id", "patient")
        .unwind("patient")
        .project([
            ("patientName", Expr::field("patient.name")),
            (
                "averageDaysBetweenVisits",
                Expr::round(Expr::avg(Expr::field("gapsInDays")), 2),
            ),
            ("totalVisits", Expr::field("totalVisits")),
            ("gapsInDays", Expr::field("gapsInDays")),
        ])
        .sort([
            SortKey::asc("averageDaysBetweenVisits"),
            SortKey::asc("patientName"),
        ]);

    decode_rows(&engine.aggregate(VISITS, &pipeline)?)
}
