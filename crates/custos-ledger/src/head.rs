//! The per-tenant chain head.

use custos_core::TenantId;
use custos_crypto::EventHash;
use serde::{Deserialize, Serialize};

/// The current tip of one tenant's event chain.
///
/// `version` counts committed events: a head at version `n` means events
/// with sequences `0..n` exist and the last of them hashes to `hash`.
/// Appenders advance the head by compare-and-swap on the full row, so two
/// writers observing the same head cannot both commit — the loser re-reads
/// and retries. A tenant with no head row has an empty chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainHead {
    /// The tenant this head belongs to.
    pub tenant_id: TenantId,
    /// Hash of the most recently committed event.
    pub hash: EventHash,
    /// Number of events committed to the chain.
    pub version: u64,
}

impl ChainHead {
    /// The head after committing `event_hash` on top of this chain state.
    ///
    /// `current = None` means the chain was empty, so the committed event
    /// is the first one and the new head sits at version 1.
    #[must_use]
    pub fn advanced(current: Option<&Self>, tenant_id: &TenantId, event_hash: EventHash) -> Self {
        let version = current.map_or(1, |head| head.version.saturating_add(1));
        Self {
            tenant_id: tenant_id.clone(),
            hash: event_hash,
            version,
        }
    }

    /// The sequence the next appended event will take on top of this state.
    #[must_use]
    pub fn next_sequence(current: Option<&Self>) -> u64 {
        current.map_or(0, |head| head.version)
    }

    /// Sequence of the last committed event, or `None` for an empty chain.
    #[must_use]
    pub fn last_sequence(&self) -> Option<u64> {
        self.version.checked_sub(1)
    }
}
