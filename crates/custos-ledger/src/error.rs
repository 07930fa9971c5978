//! Ledger error types.

use custos_core::{EventId, TenantId};
use thiserror::Error;

/// Errors from ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Concurrent appenders kept winning the chain head; the append gave up.
    ///
    /// The chain itself is unharmed — no partial state is left behind.
    /// Callers may retry the append from scratch.
    #[error("chain conflict for tenant '{tenant_id}' after {attempts} attempts")]
    ChainConflict {
        /// The tenant whose head kept moving.
        tenant_id: TenantId,
        /// How many append attempts were made before giving up.
        attempts: u32,
    },

    /// No event with the given id exists.
    #[error("event not found: {0}")]
    EventNotFound(EventId),

    /// The underlying store failed.
    #[error(transparent)]
    Storage(#[from] custos_storage::StorageError),

    /// An event could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
