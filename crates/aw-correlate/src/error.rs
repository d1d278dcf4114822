//! Error types for correlation.
//!
//! Correlation itself never fails on records; only tunables are validated.

use thiserror::Error;

/// Result type for correlation operations.
pub type Result<T> = std::result::Result<T, CorrelationError>;

/// Errors raised while configuring a correlator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CorrelationError {
    /// The tool-count tolerance ratio is not a finite value in `[0, 1]`.
    #[error("tool count tolerance ratio must be within [0, 1], got {0}")]
    InvalidToleranceRatio(f64),

    /// The time window exceeds the supported maximum.
    #[error("time window of {0} ms exceeds the maximum of {max} ms", max = crate::correlator::MAX_TIME_WINDOW_MS)]
    TimeWindowTooLarge(u64),
}

impl From<CorrelationError> for aw_common::Error {
    fn from(err: CorrelationError) -> Self {
        aw_common::Error::Config(err.to_string())
    }
}
