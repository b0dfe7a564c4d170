//! Error types for configuration validation and the bar loop.

use chrono::NaiveDateTime;
use thiserror::Error;

/// A parameter set that cannot be simulated. Raised before any bar is read.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("window must be >= 2 (got {0})")]
    WindowTooSmall(usize),

    #[error("{name} must be positive and finite (got {value})")]
    NonPositive { name: &'static str, value: f64 },

    #[error("{name} must not be negative (got {value})")]
    Negative { name: &'static str, value: f64 },

    #[error("correlation threshold must lie in (0, 1) (got {0})")]
    CorrelationOutOfRange(f64),

    #[error("{name} must lie strictly between 0 and 1 (got {value})")]
    FractionOutOfRange { name: &'static str, value: f64 },

    #[error("{0}")]
    InconsistentTargets(String),
}

/// Failure of a simulation run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),

    #[error("bar {index} at {current} does not follow previous bar at {previous}")]
    UnorderedBars {
        index: usize,
        previous: NaiveDateTime,
        current: NaiveDateTime,
    },
}
