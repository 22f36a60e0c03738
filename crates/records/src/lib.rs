//! Hospital entity model.
//!
//! This crate defines the six record collections the reporting engine reads:
//! - hospitals, staff, patients, treatments, medications and visits
//!
//! It also provides [`Dataset`], a bundle of all six collections that can be parsed from
//! YAML or JSON and validated against the model's invariants. Seeding a real store is out of
//! scope; the dataset exists so an in-memory store can be filled from a file.
//!
//! Reporting logic does not live here. See `medrep-core`.

pub mod dataset;
pub mod hospital;
pub mod medication;
pub mod patient;
pub mod staff;
pub mod treatment;
pub mod visit;

pub use dataset::Dataset;
pub use hospital::Hospital;
pub use medication::{Medication, StockEntry};
pub use patient::{HistoryEntry, Patient};
pub use staff::{Staff, StaffRole};
pub use treatment::Treatment;
pub use visit::Visit;

pub use medrep_types::{EntityId, NonEmptyText};

/// Staff role codes used by the source system.
pub mod role_codes {
    pub const GENERAL_DIRECTOR: &str = "001";
    pub const SPECIALIST: &str = "002";
    pub const NURSE: &str = "003";
    pub const ADMINISTRATIVE: &str = "004";
    pub const MAINTENANCE: &str = "005";
}

/// Errors returned by the `records` crate.
#[derive(Debug, thiserror::Error)]
pub enum RecordsError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("dataset schema mismatch at {path}: {message}")]
    Schema { path: String, message: String },

    #[error("dataset invariant violated: {0}")]
    Invariant(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for Results that can fail with a [`RecordsError`].
pub type RecordsResult<T> = Result<T, RecordsError>;
