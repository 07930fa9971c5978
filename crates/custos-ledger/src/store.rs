//! Event and chain-head persistence traits, plus the in-memory backend.
//!
//! The appender and verifier only ever see these traits. [`InMemoryLedger`]
//! serves tests and ephemeral deployments; [`KvLedgerStore`](crate::kv::KvLedgerStore)
//! persists through the storage layer.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use custos_core::{Event, EventId, TenantId};
use custos_storage::StorageError;
use dashmap::DashMap;

use crate::error::LedgerResult;
use crate::head::ChainHead;

/// Append-only storage for committed events.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persist a committed event.
    ///
    /// Events are immutable: the store is never asked to overwrite one.
    async fn insert_event(&self, event: &Event) -> LedgerResult<()>;

    /// Fetch one event by id.
    async fn event_by_id(&self, id: EventId) -> LedgerResult<Option<Event>>;

    /// Fetch a tenant's events with sequence in `from..=to`, ordered by
    /// sequence. `to = None` means "through the end of the chain".
    ///
    /// Sequences with no stored event are simply absent from the result;
    /// the verifier is the layer that decides what a hole means.
    async fn events_in_range(
        &self,
        tenant_id: &TenantId,
        from: u64,
        to: Option<u64>,
    ) -> LedgerResult<Vec<Event>>;
}

/// Storage for per-tenant chain heads, advanced only by compare-and-swap.
#[async_trait]
pub trait ChainHeadStore: Send + Sync {
    /// The current head for a tenant, or `None` for an empty chain.
    async fn chain_head(&self, tenant_id: &TenantId) -> LedgerResult<Option<ChainHead>>;

    /// Advance the head from `expected` to `next` atomically.
    ///
    /// Returns `false` without touching anything if the stored head no
    /// longer equals `expected` — some other appender committed first.
    async fn advance_head(
        &self,
        expected: Option<&ChainHead>,
        next: &ChainHead,
    ) -> LedgerResult<bool>;
}

/// In-memory ledger backend.
///
/// Events and the per-tenant sequence index live in lock-free maps; heads
/// sit behind one mutex so that compare-and-swap is a single critical
/// section rather than a read-then-write race.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    events: DashMap<EventId, Event>,
    sequences: DashMap<TenantId, BTreeMap<u64, EventId>>,
    heads: Mutex<HashMap<TenantId, ChainHead>>,
}

impl InMemoryLedger {
    /// Create an empty in-memory ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for InMemoryLedger {
    async fn insert_event(&self, event: &Event) -> LedgerResult<()> {
        self.events.insert(event.id, event.clone());
        self.sequences
            .entry(event.tenant_id().clone())
            .or_default()
            .insert(event.sequence, event.id);
        Ok(())
    }

    async fn event_by_id(&self, id: EventId) -> LedgerResult<Option<Event>> {
        Ok(self.events.get(&id).map(|entry| entry.clone()))
    }

    async fn events_in_range(
        &self,
        tenant_id: &TenantId,
        from: u64,
        to: Option<u64>,
    ) -> LedgerResult<Vec<Event>> {
        let Some(index) = self.sequences.get(tenant_id) else {
            return Ok(Vec::new());
        };
        let upper = to.unwrap_or(u64::MAX);
        let mut events = Vec::new();
        for id in index.range(from..=upper).map(|(_, id)| *id) {
            if let Some(event) = self.events.get(&id) {
                events.push(event.clone());
            }
        }
        Ok(events)
    }
}

#[async_trait]
impl ChainHeadStore for InMemoryLedger {
    async fn chain_head(&self, tenant_id: &TenantId) -> LedgerResult<Option<ChainHead>> {
        let heads = self
            .heads
            .lock()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(heads.get(tenant_id).cloned())
    }

    async fn advance_head(
        &self,
        expected: Option<&ChainHead>,
        next: &ChainHead,
    ) -> LedgerResult<bool> {
        let mut heads = self
            .heads
            .lock()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        if heads.get(&next.tenant_id) != expected {
            return Ok(false);
        }
        heads.insert(next.tenant_id.clone(), next.clone());
        Ok(true)
    }
}
