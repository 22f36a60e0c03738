//! Report parameters and their validation.
//!
//! Every check here runs before a pipeline is built, so a bad parameter never reaches the
//! store.

use crate::{ReportError, ReportResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// An inclusive date window. `start <= end` is guaranteed by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DateWindow {
    /// # Errors
    ///
    /// Returns [`ReportError::Validation`] if `end` is before `start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> ReportResult<Self> {
        if end < start {
            return Err(ReportError::Validation(format!(
                "date window ends ({end}) before it starts ({start})"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

pub(crate) fn non_negative(name: &str, value: i64) -> ReportResult<i64> {
    if value < 0 {
        return Err(ReportError::Validation(format!(
            "{name} must be non-negative, got {value}"
        )));
    }
    Ok(value)
}

pub(crate) fn non_negative_decimal(name: &str, value: Decimal) -> ReportResult<Decimal> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ReportError::Validation(format!(
            "{name} must be non-negative, got {value}"
        )));
    }
    Ok(value)
}

pub(crate) fn positive(name: &str, value: i64) -> ReportResult<i64> {
    if value <= 0 {
        return Err(ReportError::Validation(format!(
            "{name} must be greater than zero, got {value}"
        )));
    }
    Ok(value)
}

pub(crate) fn top_n(value: usize) -> ReportResult<usize> {
    if value == 0 {
        return Err(ReportError::Validation("top-N count must be at least 1".into()));
    }
    Ok(value)
}

/// Outcome labels must be non-blank; duplicates are harmless.
pub(crate) fn outcomes(values: &[String]) -> ReportResult<Vec<String>> {
    if values.is_empty() {
        return Err(ReportError::Validation(
            "at least one completed outcome is required".into(),
        ));
    }
    values
        .iter()
        .map(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                Err(ReportError::Validation("outcome labels cannot be blank".into()))
            } else {
                Ok(trimmed.to_string())
            }
        })
        .collect()
}
