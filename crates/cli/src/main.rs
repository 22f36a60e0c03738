use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use medrep_core::access::{Role, RoleTable};
use medrep_core::config::{
    pipeline_deadline_from_env_value, strictness_from_env_value, EngineConfig,
};
use medrep_core::constants::{
    COMPLETED_OUTCOMES, DEFAULT_CORRELATION_TOP, DEFAULT_DAILY_CONSUMPTION,
    DEFAULT_TOP_TREATMENTS,
};
use medrep_core::engine::Engine;
use medrep_core::reports::{run_report, DateWindow, ReportOutput, ReportRequest, REPORT_NAMES};
use medrep_core::store::MemoryStore;
use records::{Dataset, EntityId};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const STRICTNESS_VAR: &str = "MEDREP_STRICTNESS";
const TIMEOUT_VAR: &str = "MEDREP_PIPELINE_TIMEOUT_MS";

#[derive(Parser)]
#[command(name = "medrep")]
#[command(about = "Hospital reporting over a records dataset")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available reports
    Reports,
    /// Run one report and print its rows as JSON
    Run {
        /// Dataset file (.yaml, .yml or .json)
        #[arg(long)]
        dataset: PathBuf,
        /// Role the report runs as
        #[arg(long, default_value = "general_director", value_parser = parse_role)]
        role: Role,
        #[command(subcommand)]
        report: ReportCommand,
    },
}

#[derive(Subcommand)]
#[command(rename_all = "snake_case")]
enum ReportCommand {
    /// Units in stock and distinct medications at one hospital
    InventoryTotals {
        #[arg(long)]
        hospital: EntityId,
    },
    /// Visits per diagnosis within a date window
    VisitsByDiagnosis {
        /// First day, YYYY-MM-DD
        #[arg(long)]
        from: NaiveDate,
        /// Last day (inclusive), YYYY-MM-DD
        #[arg(long)]
        to: NaiveDate,
    },
    /// Treatment cost totals per hospital
    TreatmentCostsByHospital,
    /// Visits per physician within a date window
    PhysicianCaseload {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
    /// Patients whose treatment spend exceeds a threshold
    HighCostPatients {
        #[arg(long)]
        threshold: Decimal,
    },
    /// Stock entries below a threshold
    LowStockAlerts {
        #[arg(long)]
        threshold: i64,
    },
    AverageVisitsPerPatient,
    /// Specialists whose specialty their hospital does not offer
    SpecialtyMismatches,
    PatientDistribution,
    TopTreatmentsBySpecialty {
        #[arg(long, default_value_t = DEFAULT_TOP_TREATMENTS)]
        top: usize,
    },
    MedicationTurnover,
    MultiDiagnosisPatients {
        #[arg(long, default_value_t = 2)]
        min_diagnoses: i64,
    },
    /// Days between consecutive visits per patient
    InterVisitGaps,
    PhysicianEfficiency,
    /// Treatments whose outcome is not a completed one
    IncompleteTreatments {
        /// Outcome counted as completed; repeat for several
        #[arg(long = "completed")]
        completed: Vec<String>,
    },
    /// Days until each stock entry runs out
    StockRunoutProjection {
        #[arg(long)]
        desired_days: i64,
        #[arg(long, default_value_t = DEFAULT_DAILY_CONSUMPTION)]
        daily_consumption: i64,
    },
    RevenueByMedicalArea,
    DiagnosisTreatmentCorrelation {
        #[arg(long, default_value_t = DEFAULT_CORRELATION_TOP)]
        top: usize,
    },
    HospitalScorecard,
    Dashboard,
    AverageCostByMedicalArea,
}

fn parse_role(value: &str) -> Result<Role, String> {
    value.parse::<Role>().map_err(|err| err.to_string())
}

/// Whole days `from..=to`, as UTC instants.
fn date_window(from: NaiveDate, to: NaiveDate) -> anyhow::Result<DateWindow> {
    let start = from.and_hms_opt(0, 0, 0).context("invalid start date")?.and_utc();
    let end = to
        .and_hms_milli_opt(23, 59, 59, 999)
        .context("invalid end date")?
        .and_utc();
    Ok(DateWindow::new(start, end)?)
}

impl ReportCommand {
    fn into_request(self) -> anyhow::Result<ReportRequest> {
        let request = match self {
            ReportCommand::InventoryTotals { hospital } => ReportRequest::InventoryTotals {
                hospital_id: hospital,
            },
            ReportCommand::VisitsByDiagnosis { from, to } => ReportRequest::VisitsByDiagnosis {
                window: date_window(from, to)?,
            },
            ReportCommand::TreatmentCostsByHospital => ReportRequest::TreatmentCostsByHospital,
            ReportCommand::PhysicianCaseload { from, to } => ReportRequest::PhysicianCaseload {
                window: date_window(from, to)?,
            },
            ReportCommand::HighCostPatients { threshold } => {
                ReportRequest::HighCostPatients { threshold }
            }
            ReportCommand::LowStockAlerts { threshold } => ReportRequest::LowStockAlerts { threshold },
            ReportCommand::AverageVisitsPerPatient => ReportRequest::AverageVisitsPerPatient,
            ReportCommand::SpecialtyMismatches => ReportRequest::SpecialtyMismatches,
            ReportCommand::PatientDistribution => ReportRequest::PatientDistribution,
            ReportCommand::TopTreatmentsBySpecialty { top } => {
                ReportRequest::TopTreatmentsBySpecialty { top_n: top }
            }
            ReportCommand::MedicationTurnover => ReportRequest::MedicationTurnover,
            ReportCommand::MultiDiagnosisPatients { min_diagnoses } => {
                ReportRequest::MultiDiagnosisPatients { min_diagnoses }
            }
            ReportCommand::InterVisitGaps => ReportRequest::InterVisitGaps,
            ReportCommand::PhysicianEfficiency => ReportRequest::PhysicianEfficiency,
            ReportCommand::IncompleteTreatments { completed } => {
                let completed_outcomes = if completed.is_empty() {
                    COMPLETED_OUTCOMES.iter().map(|o| o.to_string()).collect()
                } else {
                    completed
                };
                ReportRequest::IncompleteTreatments { completed_outcomes }
            }
            ReportCommand::StockRunoutProjection {
                desired_days,
                daily_consumption,
            } => ReportRequest::StockRunoutProjection {
                desired_days,
                daily_consumption,
            },
            ReportCommand::RevenueByMedicalArea => ReportRequest::RevenueByMedicalArea,
            ReportCommand::DiagnosisTreatmentCorrelation { top } => {
                ReportRequest::DiagnosisTreatmentCorrelation { top_n: top }
            }
            ReportCommand::HospitalScorecard => ReportRequest::HospitalScorecard,
            ReportCommand::Dashboard => ReportRequest::Dashboard,
            ReportCommand::AverageCostByMedicalArea => ReportRequest::AverageCostByMedicalArea,
        };
        Ok(request)
    }
}

/// Engine configuration from `MEDREP_STRICTNESS` and `MEDREP_PIPELINE_TIMEOUT_MS`.
fn config_from_env() -> anyhow::Result<EngineConfig> {
    let strictness = strictness_from_env_value(std::env::var(STRICTNESS_VAR).ok())
        .with_context(|| format!("reading {STRICTNESS_VAR}"))?;
    let deadline = pipeline_deadline_from_env_value(std::env::var(TIMEOUT_VAR).ok())
        .with_context(|| format!("reading {TIMEOUT_VAR}"))?;
    Ok(EngineConfig::new(strictness, deadline)?)
}

fn run(
    dataset_path: &Path,
    role: Role,
    request: &ReportRequest,
    config: Arc<EngineConfig>,
) -> anyhow::Result<ReportOutput> {
    let dataset = Dataset::load(dataset_path)
        .with_context(|| format!("loading dataset {}", dataset_path.display()))?;
    dataset.validate()?;
    tracing::debug!(dataset = %dataset_path.display(), "dataset loaded");

    let store = MemoryStore::from_dataset(&dataset);
    let gate = RoleTable::standard();
    let engine = Engine::new(&store, &gate, role, config);

    Ok(run_report(&engine, request)?)
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("medrep=info".parse()?))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Reports) => {
            for name in REPORT_NAMES {
                println!("{name}");
            }
        }
        Some(Commands::Run {
            dataset,
            role,
            report,
        }) => {
            let config = Arc::new(config_from_env()?);
            tracing::info!(
                strictness = config.strictness().as_str(),
                deadline_ms = config.pipeline_deadline().as_millis() as u64,
                "engine configured"
            );
            let request = report.into_request()?;
            let output = run(&dataset, role, &request, config)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use medrep_core::ReportError;
    use std::io::Write;

    const DATASET: &str = r#"
hospitals:
  - id: "00000000000000000000000000000001"
    name: "Valley University Hospital"
    city: "Cali"
    specialties: ["Oncology", "Cardiology"]
staff:
  - id: "00000000000000000000000000000011"
    name: "Carla Jaramillo"
    salary: 7500000
    role: { code: "002", description: "Specialist Physician" }
    hospital_id: "00000000000000000000000000000001"
    specialty: "Oncology"
    license_number: "76001"
patients:
  - id: "00000000000000000000000000000021"
    record_number: 101
    name: "Juan Perez"
    address: "123 Fake St"
    insurer: "Sura"
    history:
      - date: "2025-01-20T09:00:00Z"
        diagnosis: "Leukemia"
        treatment_id: "00000000000000000000000000000031"
        outcome: "In progress"
treatments:
  - id: "00000000000000000000000000000031"
    name: "Standard Chemotherapy"
    medical_area: "Oncology"
    cost: 1500000
medications:
  - id: "00000000000000000000000000000041"
    name: "Paracetamol 500mg"
    manufacturer: "Genfar"
    form: "Tablet"
    stock_by_hospital:
      - { hospital_id: "00000000000000000000000000000001", quantity: 2000 }
visits:
  - id: "00000000000000000000000000000051"
    date: "2025-07-10T09:30:00Z"
    patient_id: "00000000000000000000000000000021"
    physician_id: "00000000000000000000000000000011"
    hospital_id: "00000000000000000000000000000001"
    diagnosis: "Leukemia follow-up"
"#;

    fn dataset_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .expect("create temp file");
        file.write_all(DATASET.as_bytes()).expect("write dataset");
        file
    }

    fn parse_report(args: &[&str]) -> ReportCommand {
        let mut argv = vec!["medrep", "run", "--dataset", "data.yaml"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).expect("parse args").command {
            Some(Commands::Run { report, .. }) => report,
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn report_subcommands_use_catalog_names() {
        for &name in REPORT_NAMES {
            let args: Vec<&str> = match name {
                "inventory_totals" => {
                    vec![name, "--hospital", "00000000000000000000000000000001"]
                }
                "visits_by_diagnosis" | "physician_caseload" => {
                    vec![name, "--from", "2025-01-01", "--to", "2025-12-31"]
                }
                "high_cost_patients" | "low_stock_alerts" => vec![name, "--threshold", "10"],
                "stock_runout_projection" => vec![name, "--desired-days", "30"],
                _ => vec![name],
            };
            let request = parse_report(&args).into_request().expect("request");
            assert_eq!(request.name(), name);
        }
    }

    #[test]
    fn run_defaults_to_general_director() {
        let cli = Cli::try_parse_from(["medrep", "run", "--dataset", "d.json", "dashboard"])
            .expect("parse");
        assert!(matches!(
            cli.command,
            Some(Commands::Run {
                role: Role::GeneralDirector,
                ..
            })
        ));
    }

    #[test]
    fn unknown_role_is_rejected() {
        let parsed = Cli::try_parse_from([
            "medrep",
            "run",
            "--dataset",
            "d.json",
            "--role",
            "janitor",
            "dashboard",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn incomplete_treatments_defaults_completed_outcomes() {
        let request = parse_report(&["incomplete_treatments"])
            .into_request()
            .expect("request");
        assert_eq!(
            request,
            ReportRequest::IncompleteTreatments {
                completed_outcomes: vec![
                    "Completed".to_string(),
                    "Finished".to_string(),
                    "Successful".to_string(),
                ],
            }
        );

        let request = parse_report(&["incomplete_treatments", "--completed", "Done"])
            .into_request()
            .expect("request");
        assert_eq!(
            request,
            ReportRequest::IncompleteTreatments {
                completed_outcomes: vec!["Done".to_string()],
            }
        );
    }

    #[test]
    fn date_window_covers_whole_days() {
        let from = NaiveDate::from_ymd_opt(2025, 3, 1).expect("date");
        let to = NaiveDate::from_ymd_opt(2025, 3, 1).expect("date");
        let window = date_window(from, to).expect("window");
        assert_eq!(window.start().to_rfc3339(), "2025-03-01T00:00:00+00:00");
        assert_eq!(window.end().to_rfc3339(), "2025-03-01T23:59:59.999+00:00");
    }

    #[test]
    fn reversed_dates_fail_validation() {
        let err = parse_report(&[
            "visits_by_diagnosis",
            "--from",
            "2025-02-01",
            "--to",
            "2025-01-01",
        ])
        .into_request()
        .expect_err("reversed window");
        assert!(matches!(
            err.downcast_ref::<ReportError>(),
            Some(ReportError::Validation(_))
        ));
    }

    #[test]
    fn runs_report_against_dataset_file() {
        let file = dataset_file();
        let request = ReportRequest::InventoryTotals {
            hospital_id: "00000000000000000000000000000001".parse().expect("id"),
        };

        let output = run(
            file.path(),
            Role::GeneralDirector,
            &request,
            Arc::new(EngineConfig::default()),
        )
        .expect("run report");

        let json = serde_json::to_value(&output).expect("serialize");
        assert_eq!(json["report"], "inventory_totals");
        assert_eq!(json["rows"][0]["totalUnits"], 2000);
        assert_eq!(json["rows"][0]["medicationCount"], 1);
    }

    #[test]
    fn role_without_access_is_denied() {
        let file = dataset_file();

        let err = run(
            file.path(),
            Role::Nurse,
            &ReportRequest::TreatmentCostsByHospital,
            Arc::new(EngineConfig::default()),
        )
        .expect_err("nurse cannot read treatments");
        assert!(matches!(
            err.downcast_ref::<ReportError>(),
            Some(ReportError::Authorization { .. })
        ));
    }

    #[test]
    fn missing_dataset_file_reports_path() {
        let err = run(
            Path::new("/nonexistent/medrep.yaml"),
            Role::GeneralDirector,
            &ReportRequest::Dashboard,
            Arc::new(EngineConfig::default()),
        )
        .expect_err("missing file");
        assert!(err.to_string().contains("/nonexistent/medrep.yaml"));
    }
}
