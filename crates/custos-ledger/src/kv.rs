//! KV-backed ledger persistence.
//!
//! Layout on the shared [`KvStore`]:
//!
//! - **`ledger:events`** — event id → event JSON
//! - **`ledger:chain:{tenant}`** — zero-padded sequence → event id
//! - **`ledger:heads`** — tenant id → [`ChainHead`] JSON
//!
//! The per-tenant chain namespace keeps one tenant's sequences listable
//! without scanning anyone else's, and zero-padded keys make lexicographic
//! order equal numeric order.

use std::sync::Arc;

use async_trait::async_trait;
use custos_core::{Event, EventId, TenantId};
use custos_storage::{KvStore, ScopedKvStore};

use crate::error::LedgerResult;
use crate::head::ChainHead;
use crate::store::{ChainHeadStore, EventStore};

/// Namespace holding event bodies, keyed by event id.
pub const EVENTS_NAMESPACE: &str = "ledger:events";

/// Namespace holding chain heads, keyed by tenant id.
pub const HEADS_NAMESPACE: &str = "ledger:heads";

/// Namespace holding one tenant's sequence index.
#[must_use]
pub fn chain_namespace(tenant_id: &TenantId) -> String {
    format!("ledger:chain:{tenant_id}")
}

fn sequence_key(sequence: u64) -> String {
    format!("{sequence:020}")
}

/// Ledger persistence over any [`KvStore`] backend.
pub struct KvLedgerStore {
    store: Arc<dyn KvStore>,
    events: ScopedKvStore,
    heads: ScopedKvStore,
}

impl std::fmt::Debug for KvLedgerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvLedgerStore").finish_non_exhaustive()
    }
}

impl KvLedgerStore {
    /// Bind the ledger namespaces on the given store.
    ///
    /// # Errors
    ///
    /// Returns an error if a namespace fails validation, which would mean
    /// the constants above are broken.
    pub fn new(store: Arc<dyn KvStore>) -> LedgerResult<Self> {
        let events = ScopedKvStore::new(Arc::clone(&store), EVENTS_NAMESPACE)?;
        let heads = ScopedKvStore::new(Arc::clone(&store), HEADS_NAMESPACE)?;
        Ok(Self {
            store,
            events,
            heads,
        })
    }
}

#[async_trait]
impl EventStore for KvLedgerStore {
    async fn insert_event(&self, event: &Event) -> LedgerResult<()> {
        let id = event.id.to_string();
        self.events.set_json(&id, event).await?;
        self.store
            .set(
                &chain_namespace(event.tenant_id()),
                &sequence_key(event.sequence),
                id.into_bytes(),
            )
            .await?;
        Ok(())
    }

    async fn event_by_id(&self, id: EventId) -> LedgerResult<Option<Event>> {
        Ok(self.events.get_json(&id.to_string()).await?)
    }

    async fn events_in_range(
        &self,
        tenant_id: &TenantId,
        from: u64,
        to: Option<u64>,
    ) -> LedgerResult<Vec<Event>> {
        let namespace = chain_namespace(tenant_id);
        let upper = to.unwrap_or(u64::MAX);

        let mut sequences: Vec<u64> = self
            .store
            .list_keys(&namespace)
            .await?
            .into_iter()
            .filter_map(|key| key.parse::<u64>().ok())
            .filter(|sequence| (from..=upper).contains(sequence))
            .collect();
        sequences.sort_unstable();

        let mut events = Vec::with_capacity(sequences.len());
        for sequence in sequences {
            let Some(id_bytes) = self.store.get(&namespace, &sequence_key(sequence)).await? else {
                continue;
            };
            let Ok(id) = String::from_utf8(id_bytes) else {
                continue;
            };
            // An index entry whose event body is gone reads as a hole;
            // the verifier reports it as a missing sequence.
            if let Some(event) = self.events.get_json::<Event>(&id).await? {
                events.push(event);
            }
        }
        Ok(events)
    }
}

#[async_trait]
impl ChainHeadStore for KvLedgerStore {
    async fn chain_head(&self, tenant_id: &TenantId) -> LedgerResult<Option<ChainHead>> {
        Ok(self.heads.get_json(tenant_id.as_str()).await?)
    }

    /// Byte-level compare-and-swap on the stored head row.
    ///
    /// Heads are only ever written through this method, with one serializer,
    /// so re-serializing `expected` reproduces the stored bytes exactly.
    async fn advance_head(
        &self,
        expected: Option<&ChainHead>,
        next: &ChainHead,
    ) -> LedgerResult<bool> {
        let expected_bytes = expected.map(serde_json::to_vec).transpose()?;
        let next_bytes = serde_json::to_vec(next)?;
        Ok(self
            .heads
            .compare_and_swap(
                next.tenant_id.as_str(),
                expected_bytes.as_deref(),
                next_bytes,
            )
            .await?)
    }
}
