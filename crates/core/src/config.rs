//! Engine runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into the engine behind an
//! `Arc`. Nothing in this crate reads environment variables; the `*_from_env_value` helpers
//! take the raw value so the binary decides where it comes from.

use crate::constants::DEFAULT_PIPELINE_DEADLINE;
use crate::{ReportError, ReportResult};
use std::str::FromStr;
use std::time::Duration;

/// How the engine treats a stage whose referenced field exists in no input record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Strictness {
    /// The stage yields an empty result and a warning is logged.
    #[default]
    Lenient,
    /// The stage fails with [`ReportError::MalformedStage`].
    Strict,
}

impl Strictness {
    pub fn as_str(self) -> &'static str {
        match self {
            Strictness::Lenient => "lenient",
            Strictness::Strict => "strict",
        }
    }
}

impl FromStr for Strictness {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(Strictness::Lenient),
            "strict" => Ok(Strictness::Strict),
            other => Err(ReportError::InvalidConfig(format!(
                "strictness must be 'lenient' or 'strict', got '{other}'"
            ))),
        }
    }
}

/// Engine configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    strictness: Strictness,
    pipeline_deadline: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strictness: Strictness::default(),
            pipeline_deadline: DEFAULT_PIPELINE_DEADLINE,
        }
    }
}

impl EngineConfig {
    /// Create a new `EngineConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::InvalidConfig`] if `pipeline_deadline` is zero.
    pub fn new(strictness: Strictness, pipeline_deadline: Duration) -> ReportResult<Self> {
        if pipeline_deadline.is_zero() {
            return Err(ReportError::InvalidConfig(
                "pipeline deadline must be greater than zero".into(),
            ));
        }

        Ok(Self {
            strictness,
            pipeline_deadline,
        })
    }

    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    pub fn pipeline_deadline(&self) -> Duration {
        self.pipeline_deadline
    }
}

/// Parse the strictness from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`Strictness::Lenient`].
pub fn strictness_from_env_value(value: Option<String>) -> ReportResult<Strictness> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    Ok(value
        .map(|v| v.parse::<Strictness>())
        .transpose()?
        .unwrap_or_default())
}

/// Parse a pipeline deadline given in whole milliseconds.
///
/// If `value` is `None` or empty/whitespace, returns the default deadline.
pub fn pipeline_deadline_from_env_value(value: Option<String>) -> ReportResult<Duration> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let Some(raw) = value else {
        return Ok(DEFAULT_PIPELINE_DEADLINE);
    };

    let millis: u64 = raw.parse().map_err(|_| {
        ReportError::InvalidConfig(format!(
            "pipeline timeout must be a whole number of milliseconds, got '{raw}'"
        ))
    })?;

    if millis == 0 {
        return Err(ReportError::InvalidConfig(
            "pipeline timeout must be greater than zero".into(),
        ));
    }

    Ok(Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strictness_defaults_to_lenient_when_unset() {
        assert_eq!(
            strictness_from_env_value(None).expect("unset"),
            Strictness::Lenient
        );
        assert_eq!(
            strictness_from_env_value(Some("   ".into())).expect("blank"),
            Strictness::Lenient
        );
        assert_eq!(
            strictness_from_env_value(Some(" Strict ".into())).expect("strict"),
            Strictness::Strict
        );
    }

    #[test]
    fn strictness_rejects_unknown_values() {
        let err = strictness_from_env_value(Some("sloppy".into())).expect_err("invalid");
        assert!(matches!(err, ReportError::InvalidConfig(_)));
    }

    #[test]
    fn deadline_parses_milliseconds() {
        assert_eq!(
            pipeline_deadline_from_env_value(Some("250".into())).expect("valid"),
            Duration::from_millis(250)
        );
        assert_eq!(
            pipeline_deadline_from_env_value(None).expect("default"),
            DEFAULT_PIPELINE_DEADLINE
        );
        assert!(pipeline_deadline_from_env_value(Some("0".into())).is_err());
        assert!(pipeline_deadline_from_env_value(Some("soon".into())).is_err());
    }

    #[test]
    fn config_rejects_zero_deadline() {
        let err = EngineConfig::new(Strictness::Strict, Duration::ZERO).expect_err("zero");
        assert!(matches!(err, ReportError::InvalidConfig(_)));

        let cfg = EngineConfig::new(Strictness::Strict, Duration::from_secs(1)).expect("valid");
        assert_eq!(cfg.strictness(), Strictness::Strict);
    }
}
