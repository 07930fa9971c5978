//! Pipeline error types.

use custos_core::ValidationError;
use custos_ledger::LedgerError;
use thiserror::Error;

/// Errors surfaced to ingestion callers.
///
/// Only the synchronous half of the pipeline reports through this type.
/// Once a draft is committed, detection and delivery failures are logged
/// and handled downstream; they never travel back to the ingester.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The draft was rejected before anything touched the ledger.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The append failed; the chain holds no trace of the draft.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Result alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
