//! Treatment cost and usage reports.

use super::{decode_rows, params};
use crate::constants::{HOSPITALS, PATIENTS, STAFF, TREATMENTS, VISITS};
use crate::engine::{Accumulator, Engine, Expr, Pipeline, Predicate, SortKey};
use crate::ReportResult;
use medrep_types::EntityId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HospitalCostRow {
    pub hospital_name: String,
    pub treatments_applied: i64,
    pub average_cost: Decimal,
    pub total_cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HighCostPatientRow {
    pub patient_id: EntityId,
    pub name: String,
    pub total_spent: Decimal,
    pub expensive_treatments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TreatmentTally {
    pub treatment: String,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SpecialtyTreatmentsRow {
    pub specialty: String,
    pub top_treatments: Vec<TreatmentTally>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AreaRevenueRow {
    pub medical_area: String,
    pub total_revenue: Decimal,
    pub treatment_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TreatmentFrequency {
    pub treatment: String,
    pub frequency: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DiagnosisTreatmentsRow {
    pub diagnosis: String,
    pub top_treatments: Vec<TreatmentFrequency>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AreaCostRow {
    pub medical_area: String,
    pub average_cost: Decimal,
    pub treatment_count: i64,
}

/// Patients with one record per history entry and the entry's treatment joined in.
fn history_with_treatment() -> Pipeline {
    Pipeline::new()
        .unwind("history")
        .lookup(TREATMENTS, "history.treatment_id", "_id", "treatment")
        .unwind("treatment")
}

/// Cost of the treatments in patient histories per hospital.
///
/// Every history entry is attributed to each hospital visit of its patient, so a patient
/// seen twice contributes each treatment twice. Patients without visits are not counted.
pub fn treatment_costs_by_hospital(engine: &Engine<'_>) -> ReportResult<Vec<HospitalCostRow>> {
    let pipeline = history_with_treatment()
        .lookup(VISITS, "_id", "patient_id", "visit")
        .unwind("visit")
        .group(
            Expr::field("visit.hospital_id"),
            [
                ("treatmentsApplied", Accumulator::Count),
                ("averageCost", Accumulator::Avg(Expr::field("treatment.cost"))),
                ("totalCost", Accumulator::Sum(Expr::field("treatment.cost"))),
            ],
        )
        .lookup(HOSPITALS, "_id", "_id", "hospital")
        .unwind("hospital")
        .project([
            ("hospitalName", Expr::field("hospital.name")),
            ("treatmentsApplied", Expr::field("treatmentsApplied")),
            ("averageCost", Expr::round(Expr::field("averageCost"), 2)),
            ("totalCost", Expr::field("totalCost")),
        ])
        .sort([SortKey::desc("totalCost"), SortKey::asc("hospitalName")]);

    decode_rows(&engine.aggregate(PATIENTS, &pipeline)?)
}

/// Patients whose history includes treatments costing more than `threshold`, with the sum
/// of those treatments.
pub fn high_cost_patients(
    engine: &Engine<'_>,
    threshold: Decimal,
) -> ReportResult<Vec<HighCostPatientRow>> {
    let threshold = params::non_negative_decimal("cost threshold", threshold)?;

    let pipeline = history_with_treatment()
        .filter(Predicate::gt("treatment.cost", threshold))
        .group(
            Expr::field("_id"),
            [
                ("name", Accumulator::First(Expr::field("name"))),
                ("totalSpent", Accumulator::Sum(Expr::field("treatment.cost"))),
                (
                    "expensiveTreatments",
                    Accumulator::Push(Expr::field("treatment.name")),
                ),
            ],
        )
        .sort([SortKey::desc("totalSpent"), SortKey::asc("name")])
        .project([
            ("patientId", Expr::field("_id")),
            ("name", Expr::field("name")),
            ("totalSpent", Expr::field("totalSpent")),
            ("expensiveTreatments", Expr::field("expensiveTreatments")),
        ]);

    decode_rows(&engine.aggregate(PATIENTS, &pipeline)?)
}

/// The `top_n` treatments in the histories of patients seen by each specialty.
///
/// History entries pair with every visit of the same patient; the attending physician's
/// specialty names the bucket.
pub fn top_treatments_by_specialty(
    engine: &Engine<'_>,
    top_n: usize,
) -> ReportResult<Vec<SpecialtyTreatmentsRow>> {
    let top_n = params::top_n(top_n)?;

    let pipeline = Pipeline::new()
        .unwind("history")
        .lookup(VISITS, "_id", "patient_id", "visit")
        .unwind("visit")
        .lookup(STAFF, "visit.physician_id", "_id", "physician")
        .unwind("physician")
        .lookup(TREATMENTS, "history.treatment_id", "_id", "treatment")
        .unwind("treatment")
        .group(
            Expr::object([
                ("specialty", Expr::field("physician.specialty")),
                ("treatment", Expr::field("treatment.name")),
            ]),
            [("total", Accumulator::Count)],
        )
        .sort([SortKey::desc("total"), SortKey::asc("_id.treatment")])
        .group(
            Expr::field("_id.specialty"),
            [(
                "treatments",
                Accumulator::Push(Expr::object([
                    ("treatment", Expr::field("_id.treatment")),
                    ("total", Expr::field("total")),
                ])),
            )],
        )
        .project([
            ("specialty", Expr::field("_id")),
            ("topTreatments", Expr::slice(Expr::field("treatments"), top_n)),
        ])
        .sort([SortKey::asc("specialty")]);

    decode_rows(&engine.aggregate(PATIENTS, &pipeline)?)
}

/// Revenue from the treatments recorded in patient histories, per medical area.
pub fn revenue_by_medical_area(engine: &Engine<'_>) -> ReportResult<Vec<AreaRevenueRow>> {
    let pipeline = history_with_treatment()
        .group(
            Expr::field("treatment.medical_area"),
            [
                ("totalRevenue", Accumulator::Sum(Expr::field("treatment.cost"))),
                ("treatmentCount", Accumulator::Count),
            ],
        )
        .project([
            ("medicalArea", Expr::field("_id")),
            ("totalRevenue", Expr::field("totalRevenue")),
            ("treatmentCount", Expr::field("treatmentCount")),
        ])
        .sort([SortKey::desc("totalRevenue"), SortKey::asc("medicalArea")]);

    decode_rows(&engine.aggregate(PATIENTS, &pipeline)?)
}

/// The `top_n` treatments prescribed for each diagnosis in patient histories.
pub fn diagnosis_treatment_correlation(
    engine: &Engine<'_>,
    top_n: usize,
) -> ReportResult<Vec<DiagnosisTreatmentsRow>> {
    let top_n = params::top_n(top_n)?;

    let pipeline = history_with_treatment()
        .group(
            Expr::object([
                ("diagnosis", Expr::field("history.diagnosis")),
                ("treatment", Expr::field("treatment.name")),
            ]),
            [("frequency", Accumulator::Count)],
        )
        .sort([SortKey::desc("frequency"), SortKey::asc("_id.treatment")])
        .group(
            Expr::field("_id.diagnosis"),
            [(
                "treatments",
                Accumulator::Push(Expr::object([
                    ("treatment", Expr::field("_id.treatment")),
                    ("frequency", Expr::field("frequency")),
                ])),
            )],
        )
        .project([
            ("diagnosis", Expr::field("_id")),
            ("topTreatments", Expr::slice(Expr::field("treatments"), top_n)),
        ])
        .sort([SortKey::asc("diagnosis")]);

    decode_rows(&engine.aggregate(PATIENTS, &pipeline)?)
}

/// Average catalog price per medical area.
pub fn average_cost_by_medical_area(engine: &Engine<'_>) -> ReportResult<Vec<AreaCostRow>> {
    let pipeline = Pipeline::new()
        .group(
            Expr::field("medical_area"),
            [
                ("averageCost", Accumulator::Avg(Expr::field("cost"))),
                ("treatmentCount", Accumulator::Count),
            ],
        )
        .project([
            ("medicalArea", Expr::field("_id")),
            ("averageCost", Expr::round(Expr::field("averageCost"), 2)),
            ("treatmentCount", Expr::field("treatmentCount")),
        ])
        .sort([SortKey::asc("medicalArea")]);

    decode_rows(&engine.aggregate(TREATMENTS, &pipeline)?)
}
