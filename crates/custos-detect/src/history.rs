//! The history boundary windowed rules fetch recent events through.
//!
//! Threshold and pattern rules need the tenant's recent past, which lives
//! wherever events are persisted. [`EventHistory`] is the narrow seam: the
//! engine asks for a trailing window, optionally scoped to one actor or
//! resource, and re-filters the result itself. Implementations are allowed
//! to over-return and to lag ingestion by at most one event.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use custos_core::{Event, TenantId};

use crate::error::DetectResult;

/// A window query over a tenant's committed events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    /// Window length in seconds.
    pub window_secs: u64,
    /// The window's inclusive end, normally the current event's timestamp.
    pub until: DateTime<Utc>,
    /// Restrict to events by this actor.
    pub actor_id: Option<String>,
    /// Restrict to events touching this resource.
    pub resource_id: Option<String>,
}

impl HistoryQuery {
    /// A query for the trailing `window_secs` ending at `until`.
    #[must_use]
    pub fn window(window_secs: u64, until: DateTime<Utc>) -> Self {
        Self {
            window_secs,
            until,
            actor_id: None,
            resource_id: None,
        }
    }

    /// Scope the query to one actor.
    #[must_use]
    pub fn for_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    /// Scope the query to one resource.
    #[must_use]
    pub fn for_resource(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    /// The window's inclusive start. Saturates at the epoch floor rather
    /// than wrapping for absurd window lengths.
    #[must_use]
    pub fn since(&self) -> DateTime<Utc> {
        let window = i64::try_from(self.window_secs).unwrap_or(i64::MAX);
        self.until
            .checked_sub_signed(Duration::seconds(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Whether `timestamp` falls inside the window.
    #[must_use]
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.since() && timestamp <= self.until
    }
}

/// Read access to a tenant's recent events.
///
/// Results must be ordered by timestamp (ties broken by chain sequence)
/// and safe to call concurrently with ongoing ingestion; the very latest
/// in-flight event may be missing, which callers tolerate by folding the
/// current event in themselves.
#[async_trait]
pub trait EventHistory: Send + Sync {
    /// Events for `tenant` within the query window, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::DetectError::History`] when the backing
    /// store cannot be queried.
    async fn recent(&self, tenant: &TenantId, query: &HistoryQuery) -> DetectResult<Vec<Event>>;
}

/// In-memory [`EventHistory`] backed by a plain vector.
///
/// Serves unit tests and single-process deployments; anything larger
/// should adapt its event store instead.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    events: std::sync::RwLock<Vec<Event>>,
}

impl MemoryHistory {
    /// Create an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a committed event.
    pub fn push(&self, event: Event) {
        self.events
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(event);
    }

    /// Number of recorded events, across all tenants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Whether no events have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EventHistory for MemoryHistory {
    async fn recent(&self, tenant: &TenantId, query: &HistoryQuery) -> DetectResult<Vec<Event>> {
        let events = self
            .events
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut matching: Vec<Event> = events
            .iter()
            .filter(|event| event.tenant_id() == tenant)
            .filter(|event| query.contains(event.timestamp))
            .filter(|event| {
                query
                    .actor_id
                    .as_ref()
                    .is_none_or(|actor| event.actor.id == *actor)
            })
            .filter(|event| {
                query
                    .resource_id
                    .as_ref()
                    .is_none_or(|resource| event.resource.id == *resource)
            })
            .cloned()
            .collect();
        matching.sort_by_key(|event| (event.timestamp, event.sequence));
        Ok(matching)
    }
}
