//! Convenience re-exports for consumers of the ledger.
//!
//! ```
//! use custos_ledger::prelude::*;
//! ```

pub use crate::canonical::{canonical_event_bytes, content_hash};
pub use crate::chain::{ChainAppender, DEFAULT_MAX_APPEND_ATTEMPTS};
pub use crate::error::{LedgerError, LedgerResult};
pub use crate::head::ChainHead;
pub use crate::kv::{EVENTS_NAMESPACE, HEADS_NAMESPACE, KvLedgerStore, chain_namespace};
pub use crate::store::{ChainHeadStore, EventStore, InMemoryLedger};
pub use crate::verify::{
    ChainProblem, ChainVerifier, EventFinding, EventStatus, VerificationReport,
};
