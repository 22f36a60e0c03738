use crate::access::{Action, Role};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("invalid parameter: {0}")]
    Validation(String),
    #[error("unknown collection: {0}")]
    Reference(String),
    #[error("role {role} may not {action} on collection {collection}")]
    Authorization {
        role: Role,
        action: Action,
        collection: String,
    },
    #[error("malformed {stage} stage at position {index}: {detail}")]
    MalformedStage {
        index: usize,
        stage: &'static str,
        detail: String,
    },
    #[error("pipeline exceeded its deadline after {elapsed:?}")]
    DeadlineExceeded { elapsed: Duration },
    #[error("result record does not match row shape at {path}: {message}")]
    Shape { path: String, message: String },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("records error: {0}")]
    Records(#[from] records::RecordsError),
}

pub type ReportResult<T> = std::result::Result<T, ReportError>;
