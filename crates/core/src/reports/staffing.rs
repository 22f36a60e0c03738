//! Staffing and physician performance reports.

use super::decode_rows;
use crate::constants::{HOSPITALS, STAFF, VISITS};
use crate::engine::{Engine, Expr, Pipeline, Predicate, SortKey};
use crate::ReportResult;
use medrep_types::EntityId;
use records::role_codes;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SpecialtyMismatchRow {
    pub physician_name: String,
    pub specialty: String,
    pub hospital_name: String,
    pub hospital_specialties: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EfficiencyRow {
    pub physician_id: EntityId,
    pub physician_name: String,
    pub specialty: Option<String>,
    pub total_visits: i64,
    pub distinct_diagnoses: i64,
    /// `None` for a physician with no visits.
    pub efficiency_ratio: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScorecardRow {
    pub name: String,
    pub city: String,
    pub total_visits: i64,
    pub total_physicians: i64,
    pub total_nurses: i64,
    /// `None` for a hospital with no physicians.
    pub visits_per_physician: Option<Decimal>,
}

fn specialists() -> Predicate {
    Predicate::eq("role.code", role_codes::SPECIALIST)
}

/// Members of `staff` (an array field) holding role `code`.
fn staff_with_role(code: &str) -> Expr {
    Expr::size(Expr::filter(
        Expr::field("staff"),
        "member",
        Expr::eq(Expr::var("member", "role.code"), Expr::lit(code)),
    ))
}

/// Specialists assigned to a hospital that does not offer their specialty.
pub fn specialty_mismatches(engine: &Engine<'_>) -> ReportResult<Vec<SpecialtyMismatchRow>> {
    let pipeline = Pipeline::new()
        .allow_absent("hospital_id")
        .filter(specialists())
        .lookup(HOSPITALS, "hospital_id", "_id", "hospital")
        .unwind("hospital")
        .filter(Predicate::expr(Expr::not(Expr::is_in(
            Expr::field("specialty"),
            Expr::field("hospital.specialties"),
        ))))
        .project([
            ("physicianName", Expr::field("name")),
            ("specialty", Expr::field("specialty")),
            ("hospitalName", Expr::field("hospital.name")),
            ("hospitalSpecialties", Expr::field("hospital.specialties")),
        ])
        .sort([SortKey::asc("physicianName")]);

    decode_rows(&engine.aggregate(STAFF, &pipeline)?)
}

/// Distinct diagnoses per visit for every specialist.
///
/// The ratio is exact (no rounding) and undefined for physicians without visits, who sort
/// last.
pub fn physician_efficiency(engine: &Engine<'_>) -> ReportResult<Vec<EfficiencyRow>> {
    let pipeline = Pipeline::new()
        .filter(specialists())
        .lookup(VISITS, "_id", "physician_id", "visits")
        .project([
            ("physicianId", Expr::field("_id")),
            ("physicianName", Expr::field("name")),
            ("specialty", Expr::field("specialty")),
            ("totalVisits", Expr::size(Expr::field("visits"))),
            (
                "distinctDiagnoses",
                Expr::size(Expr::set_union([Expr::field("visits.diagnosis")])),
            ),
        ])
        .project([
            ("physicianId", Expr::field("physicianId")),
            ("physicianName", Expr::field("physicianName")),
            ("specialty", Expr::field("specialty")),
            ("totalVisits", Expr::field("totalVisits")),
            ("distinctDiagnoses", Expr::field("distinctDiagnoses")),
            (
                "efficiencyRatio",
                Expr::divide(
                    Expr::field("distinctDiagnoses"),
                    Expr::field("totalVisits"),
                ),
            ),
        ])
        .sort([
            SortKey::desc("efficiencyRatio"),
            SortKey::asc("physicianName"),
        ]);

    decode_rows(&engine.aggregate(STAFF, &pipeline)?)
}

/// Visits, physicians and nurses per hospital, busiest per physician first.
pub fn hospital_scorecard(engine: &Engine<'_>) -> ReportResult<Vec<ScorecardRow>> {
    let pipeline = Pipeline::new()
        .lookup(VISITS, "_id", "hospital_id", "visits")
        .lookup(STAFF, "_id", "hospital_id", "staff")
        .project([
            ("name", Expr::field("name")),
            ("city", Expr::field("city")),
            ("totalVisits", Expr::size(Expr::field("visits"))),
            ("totalPhysicians", staff_with_role(role_codes::SPECIALIST)),
            ("totalNurses", staff_with_role(role_codes::NURSE)),
        ])
        .project([
            ("name", Expr::field("name")),
            ("city", Expr::field("city")),
            ("totalVisits", Expr::field("totalVisits")),
            ("totalPhysicians", Expr::field("totalPhysicians")),
            ("totalNurses", Expr::field("totalNurses")),
            (
                "visitsPerPhysician",
                Expr::round(
                    Expr::divide(
                        Expr::field("totalVisits"),
                        Expr::field("totalPhysicians"),
                    ),
                    2,
                ),
            ),
        ])
        .sort([SortKey::desc("visitsPerPhysician"), SortKey::asc("name")]);

    decode_rows(&engine.aggregate(HOSPITALS, &pipeline)?)
}
