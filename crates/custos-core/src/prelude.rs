//! Convenience re-exports for consumers of the core domain model.
//!
//! ```
//! use custos_core::prelude::*;
//! ```

pub use crate::error::{CoreError, CoreResult};
pub use crate::event::{
    Action, Actor, ActorType, Event, EventDraft, EventMetadata, Resource, ResourceType,
    StateSnapshot,
};
pub use crate::ids::{AlertId, EventId, RuleId, TenantId};
pub use crate::severity::Severity;
pub use crate::validate::{ValidationError, Violation};
