//! Convenience re-exports for consumers of the detection engine.
//!
//! ```
//! use custos_detect::prelude::*;
//! ```

pub use crate::alert::{Alert, AlertStatus};
pub use crate::alerts::{
    AlertGenerator, AlertOutcome, DEFAULT_COOLDOWN_SECS, DEFAULT_MAX_ALERT_EVENTS,
};
pub use crate::condition::{Condition, EventField, MatchOp, Predicate};
pub use crate::engine::{
    DEFAULT_HISTORY_TIMEOUT, DEFAULT_MAX_TRIGGER_EVENTS, RuleEngine, RuleTrigger,
};
pub use crate::error::{DetectError, DetectResult};
pub use crate::history::{EventHistory, HistoryQuery, MemoryHistory};
pub use crate::rule::{Rule, RuleKind, ThresholdScope};
pub use crate::store::{AlertStore, MemoryAlertStore, MemoryRuleStore, RuleStore};
