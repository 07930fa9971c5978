//! Adapts the ledger's event store to the detection history boundary.

use std::sync::Arc;

use async_trait::async_trait;
use custos_core::{Event, TenantId};
use custos_detect::{DetectError, DetectResult, EventHistory, HistoryQuery};
use custos_ledger::EventStore;

/// [`EventHistory`] over a ledger [`EventStore`].
///
/// Reads the tenant's whole chain and filters down to the query window,
/// so each lookup is linear in chain length. That is the right trade for
/// the embedded backends this crate ships with; a store with indexed
/// timestamps should implement [`EventHistory`] directly instead.
pub struct LedgerHistory<S> {
    store: Arc<S>,
}

impl<S> LedgerHistory<S> {
    /// Wrap an event store for use as detection history.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S> std::fmt::Debug for LedgerHistory<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerHistory").finish_non_exhaustive()
    }
}

#[async_trait]
impl<S> EventHistory for LedgerHistory<S>
where
    S: EventStore,
{
    async fn recent(&self, tenant: &TenantId, query: &HistoryQuery) -> DetectResult<Vec<Event>> {
        let events = self
            .store
            .events_in_range(tenant, 0, None)
            .await
            .map_err(|e| DetectError::History(e.to_string()))?;

        // The chain orders by sequence; pinned occurrence timestamps may
        // disagree, and the history contract is timestamp order.
        let mut matching: Vec<Event> = events
            .into_iter()
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
            .collect();
        matching.sort_by_key(|event| (event.timestamp, event.sequence));
        Ok(matching)
    }
}
