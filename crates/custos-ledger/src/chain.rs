//! Optimistic, hash-chaining event appender.
//!
//! Appends never take a per-tenant lock. Each attempt reads the tenant's
//! head, seals the event against it (sequence, previous hash, chain hash),
//! and tries to advance the head by compare-and-swap. The loser of a race
//! simply re-reads and re-seals; after a bounded number of lost races the
//! append gives up with [`LedgerError::ChainConflict`] and leaves no
//! partial state behind.
//!
//! The head is advanced *before* the event body is inserted. A winner that
//! crashes between the two leaves a hole at its sequence — which the
//! verifier reports — rather than an event the head does not account for,
//! and the loser of a race never has anything to clean up.

use std::sync::Arc;

use chrono::Utc;
use custos_core::{Event, EventDraft, EventId};
use custos_crypto::{EventHash, KeyPair};
use tracing::{debug, trace};

use crate::canonical::content_hash;
use crate::error::{LedgerError, LedgerResult};
use crate::head::ChainHead;
use crate::store::{ChainHeadStore, EventStore};

/// How many lost head races an append tolerates before giving up.
pub const DEFAULT_MAX_APPEND_ATTEMPTS: u32 = 5;

/// Appends drafts to per-tenant hash chains.
pub struct ChainAppender<S> {
    store: Arc<S>,
    signer: Option<Arc<KeyPair>>,
    max_attempts: u32,
}

impl<S> std::fmt::Debug for ChainAppender<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainAppender")
            .field("signing", &self.signer.is_some())
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl<S> ChainAppender<S>
where
    S: EventStore + ChainHeadStore,
{
    /// Create an appender over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            signer: None,
            max_attempts: DEFAULT_MAX_APPEND_ATTEMPTS,
        }
    }

    /// Sign every committed event's chain hash with this keypair.
    #[must_use]
    pub fn with_signer(mut self, keypair: Arc<KeyPair>) -> Self {
        self.signer = Some(keypair);
        self
    }

    /// Override the bounded retry budget (clamped to at least one attempt).
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Append a draft to its tenant's chain and return the committed event.
    ///
    /// The draft is expected to have passed
    /// [`EventDraft::validate`](custos_core::EventDraft::validate); the
    /// appender assigns whatever the draft left unset (id, timestamp) once,
    /// so retries commit the same event identity.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ChainConflict`] after exhausting the retry budget.
    /// - [`LedgerError::Storage`] if the backend fails.
    /// - [`LedgerError::Serialization`] if the event cannot be encoded.
    pub async fn append(&self, draft: EventDraft) -> LedgerResult<Event> {
        let tenant_id = draft.metadata.tenant_id.clone();
        let id = draft.id.unwrap_or_else(EventId::new);
        let timestamp = draft.timestamp.unwrap_or_else(Utc::now);

        for attempt in 1..=self.max_attempts {
            let head = self.store.chain_head(&tenant_id).await?;
            let sequence = ChainHead::next_sequence(head.as_ref());
            let previous_hash = head.as_ref().map_or_else(EventHash::zero, |h| h.hash);

            let mut event = Event {
                id,
                timestamp,
                actor: draft.actor.clone(),
                action: draft.action.clone(),
                resource: draft.resource.clone(),
                metadata: draft.metadata.clone(),
                sequence,
                previous_hash,
                hash: EventHash::zero(),
                signature: None,
            };
            event.hash = content_hash(&event)?;
            if let Some(signer) = &self.signer {
                event.signature = Some(signer.sign(event.hash.as_bytes()));
            }

            let next = ChainHead::advanced(head.as_ref(), &tenant_id, event.hash);
            if self.store.advance_head(head.as_ref(), &next).await? {
                self.store.insert_event(&event).await?;
                debug!(
                    tenant = %tenant_id,
                    sequence,
                    hash = %event.hash.short(),
                    attempt,
                    "event committed"
                );
                return Ok(event);
            }

            trace!(tenant = %tenant_id, attempt, "lost chain head race, retrying");
        }

        Err(LedgerError::ChainConflict {
            tenant_id,
            attempts: self.max_attempts,
        })
    }
}
