//! Telemetry error types.

use thiserror::Error;

/// Errors from configuring or initialising logging.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A level or directive did not parse.
    #[error("invalid log filter: {0}")]
    Filter(String),

    /// The global subscriber could not be installed, usually because one
    /// is already set.
    #[error("failed to initialise logging: {0}")]
    Init(String),
}

/// Result alias for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
