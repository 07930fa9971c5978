//! Custos Storage — the persistence layer under the event ledger.
//!
//! Provides namespaced byte-level [`KvStore`] access with two backends:
//!
//! - **In-memory** (always available): for tests and ephemeral deployments.
//! - **`SurrealKV`** (behind the **`kv`** feature): embedded, versioned,
//!   ACID-compliant LSM-tree storage for durable ledgers.
//!
//! Higher layers never touch backends directly. The ledger stores events
//! under `ledger:*` namespaces, the detection engine keeps rules and alerts
//! under `detect:*`, and each store sees only byte values — serialization
//! stays with the owning crate.
//!
//! Beyond plain `get`/`set`, the trait carries [`compare_and_swap`]: the
//! atomic primitive the ledger uses to advance per-tenant chain heads so
//! concurrent appends linearize instead of forking a tenant's chain.
//!
//! [`compare_and_swap`]: KvStore::compare_and_swap
//!
//! # Example
//!
//! ```
//! use custos_storage::{KvStore, MemoryKvStore};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> custos_storage::StorageResult<()> {
//! let store = MemoryKvStore::new();
//! store.set("ledger:heads", "acme", b"v1".to_vec()).await?;
//!
//! // Only one of two racing writers wins the swap.
//! let won = store
//!     .compare_and_swap("ledger:heads", "acme", Some(b"v1"), b"v2".to_vec())
//!     .await?;
//! assert!(won);
//! let lost = store
//!     .compare_and_swap("ledger:heads", "acme", Some(b"v1"), b"v3".to_vec())
//!     .await?;
//! assert!(!lost);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod kv;

pub use error::{StorageError, StorageResult};
pub use kv::{KvStore, MemoryKvStore, ScopedKvStore};

#[cfg(feature = "kv")]
pub use kv::SurrealKvStore;
