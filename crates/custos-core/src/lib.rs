//! Custos Core - domain model for the security event ledger.
//!
//! This crate defines:
//! - Identifier newtypes ([`TenantId`], [`EventId`], [`RuleId`], [`AlertId`])
//! - The immutable [`Event`] record and its parts ([`Actor`], [`Action`],
//!   [`Resource`], [`EventMetadata`])
//! - [`EventDraft`], the mutable pre-chain form accepted at the ingestion
//!   boundary, with collect-all-violations validation
//! - The shared [`Severity`] scale
//!
//! Events become immutable once the ledger assigns their chain position and
//! hash; nothing in this crate mutates a committed [`Event`].
//!
//! # Example
//!
//! ```rust
//! use custos_core::prelude::*;
//!
//! let draft = EventDraft::new(
//!     Actor::new("user-7", ActorType::User).with_ip("203.0.113.9"),
//!     Action::login(),
//!     Resource::new("session-api", ResourceType::Api),
//!     EventMetadata::new("auth-service", TenantId::new("acme")),
//! );
//! assert!(draft.validate().is_ok());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod event;
mod ids;
mod severity;
mod validate;

pub use error::{CoreError, CoreResult};
pub use event::{
    Action, Actor, ActorType, Event, EventDraft, EventMetadata, Resource, ResourceType,
    StateSnapshot,
};
pub use ids::{AlertId, EventId, RuleId, TenantId};
pub use severity::Severity;
pub use validate::{ValidationError, Violation};
