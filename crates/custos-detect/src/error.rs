//! Detection error types.

use thiserror::Error;

use crate::alert::AlertStatus;

/// Errors from rule evaluation and alert handling.
#[derive(Debug, Error)]
pub enum DetectError {
    /// A rule's definition is unusable (bad regex, zero threshold, ...).
    #[error("invalid rule: {0}")]
    InvalidRule(String),

    /// The requested status change would move an alert backwards.
    #[error("cannot move alert from {from} to {to}")]
    InvalidTransition {
        /// The alert's current status.
        from: AlertStatus,
        /// The rejected target status.
        to: AlertStatus,
    },

    /// The event history backend failed.
    #[error("history lookup failed: {0}")]
    History(String),

    /// The event history backend did not answer within its deadline.
    #[error("history lookup timed out after {timeout_ms}ms")]
    HistoryTimeout {
        /// The deadline that elapsed.
        timeout_ms: u64,
    },

    /// An alert or rule store operation failed.
    #[error("store error: {0}")]
    Store(String),
}

impl From<regex::Error> for DetectError {
    fn from(err: regex::Error) -> Self {
        Self::InvalidRule(format!("invalid match pattern: {err}"))
    }
}

/// Result alias for detection operations.
pub type DetectResult<T> = Result<T, DetectError>;
