//! Custos Ledger — tamper-evident, per-tenant event chains.
//!
//! Every committed event carries a SHA-256 hash over its canonical content
//! and the hash of the event before it, so each tenant's history forms a
//! hash chain anchored at a zero genesis sentinel. Rewriting, reordering,
//! or deleting a stored event breaks the chain arithmetic from that point
//! on, and [`ChainVerifier`] reports exactly where.
//!
//! Appends are optimistic: [`ChainAppender`] seals a draft against the
//! tenant's current [`ChainHead`] and advances the head by compare-and-swap,
//! retrying a bounded number of times when concurrent appenders win the
//! race. No per-tenant locks, no partial state on failure.
//!
//! Persistence is pluggable through the [`EventStore`] and
//! [`ChainHeadStore`] traits — [`InMemoryLedger`] for tests and ephemeral
//! use, [`KvLedgerStore`] for anything durable.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use custos_core::prelude::*;
//! use custos_ledger::{ChainAppender, ChainVerifier, InMemoryLedger};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), custos_ledger::LedgerError> {
//! let store = Arc::new(InMemoryLedger::new());
//! let appender = ChainAppender::new(Arc::clone(&store));
//!
//! let draft = EventDraft::new(
//!     Actor::new("user-7", ActorType::User),
//!     Action::login(),
//!     Resource::new("session-api", ResourceType::Api),
//!     EventMetadata::new("auth-service", TenantId::new("acme")),
//! );
//! let event = appender.append(draft).await?;
//! assert_eq!(event.sequence, 0);
//!
//! let report = ChainVerifier::new(store).verify(&TenantId::new("acme")).await?;
//! assert!(report.is_intact());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod canonical;
pub mod chain;
pub mod error;
pub mod head;
pub mod kv;
pub mod prelude;
pub mod store;
pub mod verify;

pub use canonical::{canonical_event_bytes, content_hash};
pub use chain::{ChainAppender, DEFAULT_MAX_APPEND_ATTEMPTS};
pub use error::{LedgerError, LedgerResult};
pub use head::ChainHead;
pub use kv::KvLedgerStore;
pub use store::{ChainHeadStore, EventStore, InMemoryLedger};
pub use verify::{ChainProblem, ChainVerifier, EventFinding, EventStatus, VerificationReport};
