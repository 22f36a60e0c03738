//! # Report catalog
//!
//! Named, parameterized reports built on the [`Engine`]. Each report validates its parameters,
//! builds one pipeline, runs it and decodes the result records into typed rows whose
//! serialized field names (camelCase) and order are stable.
//!
//! Reports can be called directly (`visits::visits_by_diagnosis(&engine, &window)`) or
//! dispatched by name through [`ReportRequest`] and [`run_report`].

pub mod dashboard;
pub mod inventory;
pub mod params;
pub mod patients;
pub mod staffing;
pub mod treatments;
pub mod visits;

pub use params::DateWindow;

use crate::engine::Engine;
use crate::record::Record;
use crate::ReportResult;
use medrep_types::EntityId;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;

use dashboard::DashboardRow;
use inventory::{InventoryTotalsRow, LowStockRow, RunoutRow, TurnoverRow};
use patients::{IncompleteTreatmentsRow, MultiDiagnosisRow};
use staffing::{EfficiencyRow, ScorecardRow, SpecialtyMismatchRow};
use treatments::{
    AreaCostRow, AreaRevenueRow, DiagnosisTreatmentsRow, HighCostPatientRow, HospitalCostRow,
    SpecialtyTreatmentsRow,
};
use visits::{AverageVisitsRow, CaseloadRow, DiagnosisVisitsRow, DistributionRow, VisitGapsRow};

/// Every report name accepted by [`ReportRequest::name`], in catalog order.
pub const REPORT_NAMES: &[&str] = &[
    "inventory_totals",
    "visits_by_diagnosis",
    "treatment_costs_by_hospital",
    "physician_caseload",
    "high_cost_patients",
    "low_stock_alerts",
    "average_visits_per_patient",
    "specialty_mismatches",
    "patient_distribution",
    "top_treatments_by_specialty",
    "medication_turnover",
    "multi_diagnosis_patients",
    "inter_visit_gaps",
    "physician_efficiency",
    "incomplete_treatments",
    "stock_runout_projection",
    "revenue_by_medical_area",
    "diagnosis_treatment_correlation",
    "hospital_scorecard",
    "dashboard",
    "average_cost_by_medical_area",
];

/// A report together with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportRequest {
    InventoryTotals { hospital_id: EntityId },
    VisitsByDiagnosis { window: DateWindow },
    TreatmentCostsByHospital,
    PhysicianCaseload { window: DateWindow },
    HighCostPatients { threshold: Decimal },
    LowStockAlerts { threshold: i64 },
    AverageVisitsPerPatient,
    SpecialtyMismatches,
    PatientDistribution,
    TopTreatmentsBySpecialty { top_n: usize },
    MedicationTurnover,
    MultiDiagnosisPatients { min_diagnoses: i64 },
    InterVisitGaps,
    PhysicianEfficiency,
    IncompleteTreatments { completed_outcomes: Vec<String> },
    StockRunoutProjection { desired_days: i64, daily_consumption: i64 },
    RevenueByMedicalArea,
    DiagnosisTreatmentCorrelation { top_n: usize },
    HospitalScorecard,
    Dashboard,
    AverageCostByMedicalArea,
}

impl ReportRequest {
    pub fn name(&self) -> &'static str {
        match self {
            ReportRequest::InventoryTotals { .. } => "inventory_totals",
            ReportRequest::VisitsByDiagnosis { .. } => "visits_by_diagnosis",
            ReportRequest::TreatmentCostsByHospital => "treatment_costs_by_hospital",
            ReportRequest::PhysicianCaseload { .. } => "physician_caseload",
            ReportRequest::HighCostPatients { .. } => "high_cost_patients",
            ReportRequest::LowStockAlerts { .. } => "low_stock_alerts",
            ReportRequest::AverageVisitsPerPatient => "average_visits_per_patient",
            ReportRequest::SpecialtyMismatches => "specialty_mismatches",
            ReportRequest::PatientDistribution => "patient_distribution",
            ReportRequest::TopTreatmentsBySpecialty { .. } => "top_treatments_by_specialty",
            ReportRequest::MedicationTurnover => "medication_turnover",
            ReportRequest::MultiDiagnosisPatients { .. } => "multi_diagnosis_patients",
            ReportRequest::InterVisitGaps => "inter_visit_gaps",
            ReportRequest::PhysicianEfficiency => "physician_efficiency",
            ReportRequest::IncompleteTreatments { .. } => "incomplete_treatments",
            ReportRequest::StockRunoutProjection { .. } => "stock_runout_projection",
            ReportRequest::RevenueByMedicalArea => "revenue_by_medical_area",
            ReportRequest::DiagnosisTreatmentCorrelation { .. } => {
                "diagnosis_treatment_correlation"
            }
            ReportRequest::HospitalScorecard => "hospital_scorecard",
            ReportRequest::Dashboard => "dashboard",
            ReportRequest::AverageCostByMedicalArea => "average_cost_by_medical_area",
        }
    }
}

/// Typed rows of one report run. Serializes as `{"report": <name>, "rows": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "report", content = "rows", rename_all = "snake_case")]
pub enum ReportOutput {
    InventoryTotals(Vec<InventoryTotalsRow>),
    VisitsByDiagnosis(Vec<DiagnosisVisitsRow>),
    TreatmentCostsByHospital(Vec<HospitalCostRow>),
    PhysicianCaseload(Vec<CaseloadRow>),
    HighCostPatients(Vec<HighCostPatientRow>),
    LowStockAlerts(Vec<LowStockRow>),
    AverageVisitsPerPatient(Vec<AverageVisitsRow>),
    SpecialtyMismatches(Vec<SpecialtyMismatchRow>),
    PatientDistribution(Vec<DistributionRow>),
    TopTreatmentsBySpecialty(Vec<SpecialtyTreatmentsRow>),
    MedicationTurnover(Vec<TurnoverRow>),
    MultiDiagnosisPatients(Vec<MultiDiagnosisRow>),
    InterVisitGaps(Vec<VisitGapsRow>),
    PhysicianEfficiency(Vec<EfficiencyRow>),
    IncompleteTreatments(Vec<IncompleteTreatmentsRow>),
    StockRunoutProjection(Vec<RunoutRow>),
    RevenueByMedicalArea(Vec<AreaRevenueRow>),
    DiagnosisTreatmentCorrelation(Vec<DiagnosisTreatmentsRow>),
    HospitalScorecard(Vec<ScorecardRow>),
    Dashboard(Vec<DashboardRow>),
    AverageCostByMedicalArea(Vec<AreaCostRow>),
}

impl ReportOutput {
    /// Number of rows produced.
    pub fn len(&self) -> usize {
        match self {
            ReportOutput::InventoryTotals(rows) => rows.len(),
            ReportOutput::VisitsByDiagnosis(rows) => rows.len(),
            ReportOutput::TreatmentCostsByHospital(rows) => rows.len(),
            ReportOutput::PhysicianCaseload(rows) => rows.len(),
            ReportOutput::HighCostPatients(rows) => rows.len(),
            ReportOutput::LowStockAlerts(rows) => rows.len(),
            ReportOutput::AverageVisitsPerPatient(rows) => rows.len(),
            ReportOutput::SpecialtyMismatches(rows) => rows.len(),
            ReportOutput::PatientDistribution(rows) => rows.len(),
            ReportOutput::TopTreatmentsBySpecialty(rows) => rows.len(),
            ReportOutput::MedicationTurnover(rows) => rows.len(),
            ReportOutput::MultiDiagnosisPatients(rows) => rows.len(),
            ReportOutput::InterVisitGaps(rows) => rows.len(),
            ReportOutput::PhysicianEfficiency(rows) => rows.len(),
            ReportOutput::IncompleteTreatments(rows) => rows.len(),
            ReportOutput::StockRunoutProjection(rows) => rows.len(),
            ReportOutput::RevenueByMedicalArea(rows) => rows.len(),
            ReportOutput::DiagnosisTreatmentCorrelation(rows) => rows.len(),
            ReportOutput::HospitalScorecard(rows) => rows.len(),
            ReportOutput::Dashboard(rows) => rows.len(),
            ReportOutput::AverageCostByMedicalArea(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Run the report named by `request`.
///
/// # Errors
///
/// Whatever the report itself returns: [`crate::ReportError::Validation`] for bad
/// parameters (raised before the store is touched), then any engine error.
pub fn run_report(engine: &Engine<'_>, request: &ReportRequest) -> ReportResult<ReportOutput> {
    let output = match request {
        ReportRequest::InventoryTotals { hospital_id } => {
            ReportOutput::InventoryTotals(inventory::inventory_totals(engine, *hospital_id)?)
        }
        ReportRequest::VisitsByDiagnosis { window } => {
            ReportOutput::VisitsByDiagnosis(visits::visits_by_diagnosis(engine, window)?)
        }
        ReportRequest::TreatmentCostsByHospital => ReportOutput::TreatmentCostsByHospital(
            treatments::treatment_costs_by_hospital(engine)?,
        ),
        ReportRequest::PhysicianCaseload { window } => {
            ReportOutput::PhysicianCaseload(visits::physician_caseload(engine, window)?)
        }
        ReportRequest::HighCostPatients { threshold } => {
            ReportOutput::HighCostPatients(treatments::high_cost_patients(engine, *threshold)?)
        }
        ReportRequest::LowStockAlerts { threshold } => {
            ReportOutput::LowStockAlerts(inventory::low_stock_alerts(engine, *threshold)?)
        }
        ReportRequest::AverageVisitsPerPatient => {
            ReportOutput::AverageVisitsPerPatient(visits::average_visits_per_patient(engine)?)
        }
        ReportRequest::SpecialtyMismatches => {
            ReportOutput::SpecialtyMismatches(staffing::specialty_mismatches(engine)?)
        }
        ReportRequest::PatientDistribution => {
            ReportOutput::PatientDistribution(visits::patient_distribution(engine)?)
        }
        ReportRequest::TopTreatmentsBySpecialty { top_n } => {
            ReportOutput::TopTreatmentsBySpecialty(treatments::top_treatments_by_specialty(
                engine, *top_n,
            )?)
        }
        ReportRequest::MedicationTurnover => {
            ReportOutput::MedicationTurnover(inventory::medication_turnover(engine)?)
        }
        ReportRequest::MultiDiagnosisPatients { min_diagnoses } => {
            ReportOutput::MultiDiagnosisPatients(patients::multi_diagnosis_patients(
                engine,
                *min_diagnoses,
            )?)
        }
        ReportRequest::InterVisitGaps => {
            ReportOutput::InterVisitGaps(visits::inter_visit_gaps(engine)?)
        }
        ReportRequest::PhysicianEfficiency => {
            ReportOutput::PhysicianEfficiency(staffing::physician_efficiency(engine)?)
        }
        ReportRequest::IncompleteTreatments { completed_outcomes } => {
            ReportOutput::IncompleteTreatments(patients::incomplete_treatments(
                engine,
                completed_outcomes,
            )?)
        }
        ReportRequest::StockRunoutProjection {
            desired_days,
            daily_consumption,
        } => ReportOutput::StockRunoutProjection(inventory::stock_runout_projection(
            engine,
            *desired_days,
            *daily_consumption,
        )?),
        ReportRequest::RevenueByMedicalArea => {
            ReportOutput::RevenueByMedicalArea(treatments::revenue_by_medical_area(engine)?)
        }
        ReportRequest::DiagnosisTreatmentCorrelation { top_n } => {
            ReportOutput::DiagnosisTreatmentCorrelation(
                treatments::diagnosis_treatment_correlation(engine, *top_n)?,
            )
        }
        ReportRequest::HospitalScorecard => {
            ReportOutput::HospitalScorecard(staffing::hospital_scorecard(engine)?)
        }
        ReportRequest::Dashboard => ReportOutput::Dashboard(vec![dashboard::dashboard(engine)?]),
        ReportRequest::AverageCostByMedicalArea => ReportOutput::AverageCostByMedicalArea(
            treatments::average_cost_by_medical_area(engine)?,
        ),
    };

    tracing::info!(
        report = request.name(),
        role = %engine.subject(),
        rows = output.len(),
        "report finished"
    );
    Ok(output)
}

/// Decode every record into `T`, failing on the first mismatch.
pub(crate) fn decode_rows<T: DeserializeOwned>(records: &[Record]) -> ReportResult<Vec<T>> {
    records.iter().map(Record::decode).collect()
}
