//! The event record and its parts.
//!
//! An [`EventDraft`] is what callers hand to the ingestion boundary: the
//! semantic fields only. The ledger turns a draft into an immutable
//! [`Event`] by assigning its chain position (`sequence`, `previous_hash`)
//! and integrity `hash`. Committed events are never mutated.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use custos_crypto::{EventHash, Signature};
use serde::{Deserialize, Serialize};

use crate::ids::{EventId, TenantId};

/// A point-in-time snapshot of resource state (`before`/`after` images).
///
/// Backed by a sorted map so snapshots serialize deterministically.
pub type StateSnapshot = serde_json::Map<String, serde_json::Value>;

/// Who performed an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    /// Stable identifier (user id, service account, host name).
    pub id: String,
    /// What kind of principal this is.
    pub kind: ActorType,
    /// Human-readable display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Source network address, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    /// Client user agent, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Free-form attributes (department, role, device id, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl Actor {
    /// Create an actor with the mandatory fields.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: ActorType) -> Self {
        Self {
            id: id.into(),
            kind,
            name: None,
            ip: None,
            user_agent: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the source address.
    #[must_use]
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    /// Set the client user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Add a free-form attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// The kind of principal behind an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    /// A human user.
    User,
    /// The platform itself (scheduled jobs, migrations).
    System,
    /// A machine-to-machine service account.
    Service,
}

impl ActorType {
    /// The wire name of this kind, as used in rule predicates.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::System => "system",
            Self::Service => "service",
        }
    }
}

/// What was done.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Dotted action kind, e.g. `auth.login.failed` or `document.update`.
    pub kind: String,
    /// Coarse grouping for reporting (`auth`, `data`, `admin`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Action {
    /// Create an action with the given kind.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            category: None,
            description: None,
        }
    }

    /// Set the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// `data.create`, categorized `data`.
    #[must_use]
    pub fn create() -> Self {
        Self::new("data.create").with_category("data")
    }

    /// `data.read`, categorized `data`.
    #[must_use]
    pub fn read() -> Self {
        Self::new("data.read").with_category("data")
    }

    /// `data.update`, categorized `data`.
    #[must_use]
    pub fn update() -> Self {
        Self::new("data.update").with_category("data")
    }

    /// `data.delete`, categorized `data`.
    #[must_use]
    pub fn delete() -> Self {
        Self::new("data.delete").with_category("data")
    }

    /// `auth.login`, categorized `auth`.
    #[must_use]
    pub fn login() -> Self {
        Self::new("auth.login").with_category("auth")
    }

    /// `auth.logout`, categorized `auth`.
    #[must_use]
    pub fn logout() -> Self {
        Self::new("auth.logout").with_category("auth")
    }
}

/// What was acted upon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Stable identifier of the resource.
    pub id: String,
    /// What kind of resource this is.
    pub kind: ResourceType,
    /// Human-readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// State before the action, for mutating actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<StateSnapshot>,
    /// State after the action, for mutating actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<StateSnapshot>,
}

impl Resource {
    /// Create a resource with the mandatory fields.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: ResourceType) -> Self {
        Self {
            id: id.into(),
            kind,
            name: None,
            before: None,
            after: None,
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach the pre-action state snapshot.
    #[must_use]
    pub fn with_before(mut self, before: StateSnapshot) -> Self {
        self.before = Some(before);
        self
    }

    /// Attach the post-action state snapshot.
    #[must_use]
    pub fn with_after(mut self, after: StateSnapshot) -> Self {
        self.after = Some(after);
        self
    }
}

/// The kind of resource an event touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// A document or record.
    Document,
    /// A user account.
    User,
    /// A financial or business transaction.
    Transaction,
    /// A configuration object.
    Config,
    /// A file or blob.
    File,
    /// An API endpoint or token.
    Api,
    /// A database or schema.
    Database,
    /// The platform itself.
    System,
}

impl ResourceType {
    /// The wire name of this kind, as used in rule predicates.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::User => "user",
            Self::Transaction => "transaction",
            Self::Config => "config",
            Self::File => "file",
            Self::Api => "api",
            Self::Database => "database",
            Self::System => "system",
        }
    }
}

/// Contextual metadata attached to every event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Which system emitted the event.
    pub source: String,
    /// The tenant whose chain this event belongs to.
    pub tenant_id: TenantId,
    /// Correlates events across services for one logical operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// The emitting session, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Classification tags.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    /// Free-form extra attributes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl EventMetadata {
    /// Create metadata with the mandatory fields.
    #[must_use]
    pub fn new(source: impl Into<String>, tenant_id: TenantId) -> Self {
        Self {
            source: source.into(),
            tenant_id,
            correlation_id: None,
            session_id: None,
            tags: BTreeSet::new(),
            extra: BTreeMap::new(),
        }
    }

    /// Set the correlation id.
    #[must_use]
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Set the session id.
    #[must_use]
    pub fn with_session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    /// Add a classification tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Add a free-form attribute.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// A committed, immutable ledger event.
///
/// `sequence`, `previous_hash`, `hash` and `signature` are assigned by the
/// ledger at append time; everything else comes from the [`EventDraft`].
/// The `hash` is a pure function of the canonical encoding of the semantic
/// fields combined with `previous_hash`, and is never recomputed or changed
/// after commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier.
    pub id: EventId,
    /// When the event occurred (UTC).
    pub timestamp: DateTime<Utc>,
    /// Who did it.
    pub actor: Actor,
    /// What they did.
    pub action: Action,
    /// What it was done to.
    pub resource: Resource,
    /// Context: source system, tenant, correlation, tags.
    pub metadata: EventMetadata,
    /// Zero-based position in the tenant's append order.
    pub sequence: u64,
    /// Hash of the tenant's prior event; zero for the first event.
    pub previous_hash: EventHash,
    /// Integrity digest of this event.
    pub hash: EventHash,
    /// Optional Ed25519 signature over `hash`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
}

impl Event {
    /// The tenant whose chain this event belongs to.
    #[must_use]
    pub fn tenant_id(&self) -> &TenantId {
        &self.metadata.tenant_id
    }

    /// Whether this is the first event of its tenant's chain.
    #[must_use]
    pub fn is_chain_start(&self) -> bool {
        self.previous_hash.is_zero()
    }
}

/// The pre-chain form of an event, as accepted at the ingestion boundary.
///
/// `id` and `timestamp` may be left unset; ingestion fills them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    /// Caller-supplied event id, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EventId>,
    /// When the event occurred; defaults to ingestion time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Who did it.
    pub actor: Actor,
    /// What they did.
    pub action: Action,
    /// What it was done to.
    pub resource: Resource,
    /// Context: source system, tenant, correlation, tags.
    pub metadata: EventMetadata,
}

impl EventDraft {
    /// Create a draft from its semantic parts.
    #[must_use]
    pub fn new(actor: Actor, action: Action, resource: Resource, metadata: EventMetadata) -> Self {
        Self {
            id: None,
            timestamp: None,
            actor,
            action,
            resource,
            metadata,
        }
    }

    /// Pin the event id instead of letting ingestion mint one.
    #[must_use]
    pub fn with_id(mut self, id: EventId) -> Self {
        self.id = Some(id);
        self
    }

    /// Pin the occurrence timestamp instead of using ingestion time.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// The tenant this draft belongs to.
    #[must_use]
    pub fn tenant_id(&self) -> &TenantId {
        &self.metadata.tenant_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_draft() -> EventDraft {
        EventDraft::new(
            Actor::new("user-1", ActorType::User)
                .with_name("Sam")
                .with_ip("198.51.100.4")
                .with_attribute("department", "finance"),
            Action::login().with_description("password login"),
            Resource::new("session-api", ResourceType::Api).with_name("Session API"),
            EventMetadata::new("auth-service", TenantId::new("acme"))
                .with_correlation_id("req-42")
                .with_tag("auth"),
        )
    }

    #[test]
    fn builders_populate_fields() {
        let draft = sample_draft();
        assert_eq!(draft.actor.id, "user-1");
        assert_eq!(draft.action.kind, "auth.login");
        assert_eq!(draft.action.category.as_deref(), Some("auth"));
        assert_eq!(draft.resource.kind, ResourceType::Api);
        assert_eq!(draft.tenant_id().as_str(), "acme");
        assert!(draft.metadata.tags.contains("auth"));
    }

    #[test]
    fn draft_serde_omits_absent_fields() {
        let draft = EventDraft::new(
            Actor::new("svc", ActorType::Service),
            Action::new("config.reload"),
            Resource::new("scheduler", ResourceType::System),
            EventMetadata::new("ops", TenantId::new("acme")),
        );
        let json = serde_json::to_string(&draft).unwrap();
        assert!(!json.contains("user_agent"));
        assert!(!json.contains("tags"));
        assert!(!json.contains("\"id\""));

        let back: EventDraft = serde_json::from_str(&json).unwrap();
        assert_eq!(back, draft);
    }

    #[test]
    fn action_verbs_carry_categories() {
        for (action, kind) in [
            (Action::create(), "data.create"),
            (Action::read(), "data.read"),
            (Action::update(), "data.update"),
            (Action::delete(), "data.delete"),
        ] {
            assert_eq!(action.kind, kind);
            assert_eq!(action.category.as_deref(), Some("data"));
        }
        assert_eq!(Action::logout().category.as_deref(), Some("auth"));
    }
}
