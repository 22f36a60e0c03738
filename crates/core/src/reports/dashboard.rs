//! Single-row overview computed with one faceted pipeline over visits.

use super::decode_rows;
use crate::constants::{HOSPITALS, VISITS};
use crate::engine::{Accumulator, Engine, Expr, Pipeline, SortKey};
use crate::{ReportError, ReportResult};
use serde::{Deserialize, Serialize};

const TOP_DIAGNOSES: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DiagnosisFrequency {
    pub diagnosis: String,
    pub frequency: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HospitalVisits {
    pub hospital: String,
    pub visits: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DashboardRow {
    pub total_visits: i64,
    pub total_patients_seen: i64,
    pub top_diagnoses: Vec<DiagnosisFrequency>,
    pub hospital_performance: Vec<HospitalVisits>,
}

fn summary() -> Pipeline {
    Pipeline::new()
        .group(
            Expr::null(),
            [
                ("totalVisits", Accumulator::Count),
                ("patients", Accumulator::AddToSet(Expr::field("patient_id"))),
            ],
        )
        .project([
            ("totalVisits", Expr::field("totalVisits")),
            ("totalPatientsSeen", Expr::size(Expr::field("patients"))),
        ])
}

fn top_diagnoses() -> Pipeline {
    Pipeline::new()
        .group(Expr::field("diagnosis"), [("frequency", Accumulator::Count)])
        .sort([SortKey::desc("frequency"), SortKey::asc("_id")])
        .limit(TOP_DIAGNOSES)
        .project([
            ("diagnosis", Expr::field("_id")),
            ("frequency", Expr::field("frequency")),
        ])
}

fn hospital_performance() -> Pipeline {
    Pipeline::new()
        .group(Expr::field("hospital_id"), [("visits", Accumulator::Count)])
        .lookup(HOSPITALS, "_id", "_id", "hospital")
        .unwind("hospital")
        .project([
            ("hospital", Expr::field("hospital.name")),
            ("visits", Expr::field("visits")),
        ])
        .sort([SortKey::desc("visits"), SortKey::asc("hospital")])
}

/// Visit totals, the most frequent diagnoses and visits per hospital.
///
/// Always exactly one row; totals are zero when there are no visits.
pub fn dashboard(engine: &Engine<'_>) -> ReportResult<DashboardRow> {
    let first_or_zero = |path: &str| {
        Expr::if_null(
            Expr::elem_at(Expr::field(path), Expr::lit(0_i64)),
            Expr::lit(0_i64),
        )
    };

    let pipeline = Pipeline::new()
        .facet([
            ("summary", summary()),
            ("topDiagnoses", top_diagnoses()),
            ("hospitalPerformance", hospital_performance()),
        ])
        .project([
            ("totalVisits", first_or_zero("summary.totalVisits")),
            ("totalPatientsSeen", first_or_zero("summary.totalPatientsSeen")),
            ("topDiagnoses", Expr::field("topDiagnoses")),
            ("hospitalPerformance", Expr::field("hospitalPerformance")),
        ]);

    decode_rows::<DashboardRow>(&engine.aggregate(VISITS, &pipeline)?)?
        .pop()
        .ok_or_else(|| ReportError::Shape {
            path: "<root>".into(),
            message: "faceted pipeline produced no row".into(),
        })
}
