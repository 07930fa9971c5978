//! Notification error types.

use thiserror::Error;

/// Why one delivery attempt to a sink failed.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The notification could not be rendered for this sink.
    #[error("payload error: {0}")]
    Payload(String),

    /// The transport failed before the sink answered.
    #[error("transport error: {0}")]
    Transport(String),

    /// The sink answered and said no.
    #[error("rejected by sink: {0}")]
    Rejected(String),
}

/// Errors from delivery bookkeeping.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The delivery record store failed.
    #[error("delivery store error: {0}")]
    Store(String),
}

/// Result alias for notification operations.
pub type NotifyResult<T> = Result<T, NotifyError>;
