//! Constants used throughout the medrep core crate.
//!
//! Collection names and report defaults live here so that pipelines, the access table and
//! the catalog agree on them.

use std::time::Duration;

/// Collection holding hospitals.
pub const HOSPITALS: &str = "hospitals";

/// Collection holding staff members.
pub const STAFF: &str = "staff";

/// Collection holding patients and their clinical history.
pub const PATIENTS: &str = "patients";

/// Collection holding the treatment catalog.
pub const TREATMENTS: &str = "treatments";

/// Collection holding medications and per-hospital stock.
pub const MEDICATIONS: &str = "medications";

/// Collection holding medical visits.
pub const VISITS: &str = "visits";

/// Collection reserved for maintenance staff.
pub const MAINTENANCE_TASKS: &str = "maintenance_tasks";

/// Every collection the store is expected to expose.
pub const ALL_COLLECTIONS: &[&str] = &[
    HOSPITALS,
    STAFF,
    PATIENTS,
    TREATMENTS,
    MEDICATIONS,
    VISITS,
    MAINTENANCE_TASKS,
];

/// Default per-pipeline execution deadline.
pub const DEFAULT_PIPELINE_DEADLINE: Duration = Duration::from_secs(30);

/// Units consumed per day assumed by the stock run-out projection.
pub const DEFAULT_DAILY_CONSUMPTION: i64 = 5;

/// History outcomes that mark a treatment as finished.
pub const COMPLETED_OUTCOMES: &[&str] = &["Completed", "Finished", "Successful"];

/// Milliseconds in one day, for date differences.
pub const MILLIS_PER_DAY: i64 = 1000 * 60 * 60 * 24;

/// Treatments listed per specialty unless the caller asks otherwise.
pub const DEFAULT_TOP_TREATMENTS: usize = 5;

/// Treatments listed per diagnosis unless the caller asks otherwise.
pub const DEFAULT_CORRELATION_TOP: usize = 3;
