//! Patient history reports.

use super::{decode_rows, params};
use crate::constants::{PATIENTS, TREATMENTS};
use crate::engine::{Accumulator, Engine, Expr, Pipeline, Predicate, SortKey};
use crate::ReportResult;
use medrep_types::EntityId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MultiDiagnosisRow {
    pub patient_id: EntityId,
    pub name: String,
    pub insurer: String,
    pub total_diagnoses: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct IncompleteTreatment {
    pub treatment: String,
    pub diagnosis: String,
    pub outcome: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct IncompleteTreatmentsRow {
    pub patient_id: EntityId,
    pub name: String,
    pub incomplete_treatments: Vec<IncompleteTreatment>,
}

/// Patients with more than `min_diagnoses` history entries, most first.
pub fn multi_diagnosis_patients(
    engine: &Engine<'_>,
    min_diagnoses: i64,
) -> ReportResult<Vec<MultiDiagnosisRow>> {
    let min_diagnoses = params::non_negative("minimum diagnoses", min_diagnoses)?;

    let pipeline = Pipeline::new()
        .project([
            ("patientId", Expr::field("_id")),
            ("name", Expr::field("name")),
            ("insurer", Expr::field("insurer")),
            ("totalDiagnoses", Expr::size(Expr::field("history"))),
        ])
        .filter(Predicate::gt("totalDiagnoses", min_diagnoses))
        .sort([SortKey::desc("totalDiagnoses"), SortKey::asc("name")]);

    decode_rows(&engine.aggregate(PATIENTS, &pipeline)?)
}

/// History entries whose outcome is none of `completed_outcomes`, grouped per patient.
pub fn incomplete_treatments(
    engine: &Engine<'_>,
    completed_outcomes: &[String],
) -> ReportResult<Vec<IncompleteTreatmentsRow>> {
    let completed = params::outcomes(completed_outcomes)?;

    let pipeline = Pipeline::new()
        .unwind("history")
        .filter(Predicate::not_in("history.outcome", completed))
        .lookup(TREATMENTS, "history.treatment_id", "_id", "treatment")
        .unwind("treatment")
        .group(
            Expr::field("_id"),
            [
                ("name", Accumulator::First(Expr::field("name"))),
                (
                    "incompleteTreatments",
                    Accumulator::Push(Expr::object([
                        ("treatment", Expr::field("treatment.name")),
                        ("diagnosis", Expr::field("history.diagnosis")),
                        ("outcome", Expr::field("history.outcome")),
                    ])),
                ),
            ],
        )
        .project([
            ("patientId", Expr::field("_id")),
            ("name", Expr::field("name")),
            ("incompleteTreatments", Expr::field("incompleteTreatments")),
        ])
        .sort([SortKey::asc("name")]);

    decode_rows(&engine.aggregate(PATIENTS, &pipeline)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::RoleTable;
    use crate::constants::COMPLETED_OUTCOMES;
    use crate::fixtures::{self, CASTRO, GOMEZ};
    use crate::ReportError;

    fn default_outcomes() -> Vec<String> {
        COMPLETED_OUTCOMES.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn patients_above_diagnosis_minimum() {
        let store = fixtures::store();
        let gate = RoleTable::standard();
        let engine = fixtures::director(&store, &gate);

        let rows = multi_diagnosis_patients(&engine, 1).expect("report");
        assert_eq!(
            rows,
            vec![
                MultiDiagnosisRow {
                    patient_id: CASTRO,
                    name: "Valeria Castro".into(),
                    insurer: "Sanitas".into(),
                    total_diagnoses: 3,
                },
                MultiDiagnosisRow {
                    patient_id: GOMEZ,
                    name: "Laura Gomez".into(),
                    insurer: "Sanitas".into(),
                    total_diagnoses: 2,
                },
            ]
        );

        assert_eq!(multi_diagnosis_patients(&engine, 0).expect("all").len(), 3);
        assert!(multi_diagnosis_patients(&engine, 3).expect("none").is_empty());
        assert!(matches!(
            multi_diagnosis_patients(&engine, -1),
            Err(ReportError::Validation(_))
        ));
    }

    #[test]
    fn unfinished_history_entries_per_patient() {
        let store = fixtures::store();
        let gate = RoleTable::standard();
        let engine = fixtures::director(&store, &gate);

        let rows = incomplete_treatments(&engine, &default_outcomes()).expect("report");
        assert_eq!(
            rows,
            vec![
                IncompleteTreatmentsRow {
                    patient_id: GOMEZ,
                    name: "Laura Gomez".into(),
                    incomplete_treatments: vec![IncompleteTreatment {
                        treatment: "Beta blockers".into(),
                        diagnosis: "Hypertension".into(),
                        outcome: "In progress".into(),
                    }],
                },
                IncompleteTreatmentsRow {
                    patient_id: CASTRO,
                    name: "Valeria Castro".into(),
                    incomplete_treatments: vec![IncompleteTreatment {
                        treatment: "Physiotherapy".into(),
                        diagnosis: "Migraine".into(),
                        outcome: "Ongoing".into(),
                    }],
                },
            ]
        );
    }

    #[test]
    fn custom_outcomes_change_what_counts_as_done() {
        let store = fixtures::store();
        let gate = RoleTable::standard();
        let engine = fixtures::director(&store, &gate);

        let rows = incomplete_treatments(&engine, &["Completed".to_string()]).expect("report");
        let castro = rows
            .iter()
            .find(|r| r.patient_id == CASTRO)
            .expect("castro still has open entries");
        assert_eq!(castro.incomplete_treatments.len(), 2);

        assert!(matches!(
            incomplete_treatments(&engine, &[]),
            Err(ReportError::Validation(_))
        ));
    }
}
