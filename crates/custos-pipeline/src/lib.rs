//! Custos Pipeline — from accepted draft to dispatched alert.
//!
//! [`Ingestor`] is the synchronous half: validate the draft, append it to
//! the tenant's hash chain, signal the commit, return. Everything after
//! the commit — rule evaluation, alert folding, sink delivery — runs in a
//! spawned detection worker fed by a bounded queue, so detection adds
//! nothing to ingestion latency and its failures never reach the caller.
//!
//! [`Pipeline::spawn`] wires the stages together. Shutting down through
//! [`PipelineHandle::shutdown`] drains the commit queue first, so events
//! that were durable before the shutdown are still evaluated.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use custos_core::prelude::*;
//! use custos_detect::{
//!     AlertGenerator, AlertStore, Condition, EventField, MatchOp, MemoryAlertStore,
//!     MemoryRuleStore, Rule, RuleEngine, RuleKind, RuleStore,
//! };
//! use custos_ledger::{ChainAppender, InMemoryLedger};
//! use custos_notify::{Dispatcher, MemoryDeliveryStore};
//! use custos_pipeline::{LedgerHistory, Pipeline};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(InMemoryLedger::new());
//! let appender = Arc::new(ChainAppender::new(Arc::clone(&store)));
//! let history = Arc::new(LedgerHistory::new(store));
//!
//! let rules = Arc::new(MemoryRuleStore::new());
//! rules
//!     .put_rule(&Rule::new(
//!         TenantId::new("acme"),
//!         "any failed login",
//!         Severity::Medium,
//!         RuleKind::SimpleMatch {
//!             where_: Condition::field(
//!                 EventField::ActionKind,
//!                 MatchOp::Equals("auth.login.failed".into()),
//!             ),
//!         },
//!     ))
//!     .await?;
//!
//! let alerts = Arc::new(MemoryAlertStore::new());
//! let pipeline = Pipeline::new(
//!     appender,
//!     rules,
//!     RuleEngine::new(history),
//!     AlertGenerator::new(Arc::clone(&alerts) as Arc<dyn AlertStore>),
//!     Arc::new(Dispatcher::new(Arc::new(MemoryDeliveryStore::new()))),
//! );
//! let (ingestor, handle) = pipeline.spawn();
//!
//! let draft = EventDraft::new(
//!     Actor::new("user-7", ActorType::User),
//!     Action::new("auth.login.failed").with_category("auth"),
//!     Resource::new("portal", ResourceType::System),
//!     EventMetadata::new("auth-service", TenantId::new("acme")),
//! );
//! let event = ingestor.ingest(draft).await?;
//! assert_eq!(event.sequence, 0);
//!
//! // A draining shutdown guarantees the committed event was evaluated.
//! handle.shutdown().await;
//! let open = alerts.alerts_for_tenant(&TenantId::new("acme")).await?;
//! assert_eq!(open.len(), 1);
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
pub mod history;
pub mod ingest;
pub mod pipeline;
pub mod prelude;
mod worker;

pub use error::{PipelineError, PipelineResult};
pub use history::LedgerHistory;
pub use ingest::{BatchFailure, BatchReport, CommitSignal, Ingestor};
pub use pipeline::{DEFAULT_QUEUE_CAPACITY, Pipeline, PipelineHandle};
