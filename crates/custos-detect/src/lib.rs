//! Custos Detect — rule evaluation and alert generation over committed events.
//!
//! Detection runs off the ingestion path: once an event is durably chained,
//! the [`RuleEngine`] tests it against the tenant's enabled rules. Simple
//! matches look at the one event; threshold and pattern rules pull the
//! recent past through the [`EventHistory`] boundary and re-derive their
//! windowed state on every evaluation, so the engine itself holds nothing
//! that can go stale across restarts.
//!
//! Matches become [`RuleTrigger`]s, and the [`AlertGenerator`] decides
//! whether each trigger opens a fresh alert or is folded into an active one
//! for the same `(tenant, rule, dedup key)` within the cooldown — evidence
//! accumulates, alert storms do not.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use custos_core::prelude::*;
//! use custos_detect::{
//!     AlertGenerator, AlertOutcome, Condition, EventField, MatchOp, MemoryAlertStore,
//!     MemoryHistory, Rule, RuleEngine, RuleKind,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), custos_detect::DetectError> {
//! let engine = RuleEngine::new(Arc::new(MemoryHistory::new()));
//! let generator = AlertGenerator::new(Arc::new(MemoryAlertStore::new()));
//!
//! let rule = Rule::new(
//!     TenantId::new("acme"),
//!     "any failed login",
//!     Severity::Medium,
//!     RuleKind::SimpleMatch {
//!         where_: Condition::field(
//!             EventField::ActionKind,
//!             MatchOp::Equals("auth.login.failed".into()),
//!         ),
//!     },
//! );
//!
//! # let event = custos_core::Event {
//! #     id: EventId::new(),
//! #     timestamp: chrono::Utc::now(),
//! #     actor: Actor::new("user-7", ActorType::User),
//! #     action: Action::new("auth.login.failed").with_category("auth"),
//! #     resource: Resource::new("portal", ResourceType::System),
//! #     metadata: EventMetadata::new("auth-service", TenantId::new("acme")),
//! #     sequence: 0,
//! #     previous_hash: custos_crypto::EventHash::zero(),
//! #     hash: custos_crypto::EventHash::zero(),
//! #     signature: None,
//! # };
//! for trigger in engine.evaluate(&event, &[rule]).await {
//!     if let AlertOutcome::Created(alert) = generator.process(&trigger).await? {
//!         println!("{}: {}", alert.severity, alert.message);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod alert;
pub mod alerts;
pub mod condition;
pub mod engine;
pub mod error;
pub mod history;
pub mod matcher;
pub mod prelude;
pub mod rule;
pub mod store;

pub use alert::{Alert, AlertStatus};
pub use alerts::{AlertGenerator, AlertOutcome, DEFAULT_COOLDOWN_SECS, DEFAULT_MAX_ALERT_EVENTS};
pub use condition::{Condition, EventField, MatchOp, Predicate};
pub use engine::{DEFAULT_HISTORY_TIMEOUT, DEFAULT_MAX_TRIGGER_EVENTS, RuleEngine, RuleTrigger};
pub use error::{DetectError, DetectResult};
pub use history::{EventHistory, HistoryQuery, MemoryHistory};
pub use rule::{Rule, RuleKind, ThresholdScope};
pub use store::{AlertStore, MemoryAlertStore, MemoryRuleStore, RuleStore};
