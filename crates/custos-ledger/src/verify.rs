//! Chain verification.
//!
//! Verification replays a tenant's chain (or a sequence range of it) and
//! re-checks every event: recompute the content hash, compare the link to
//! the stored predecessor, confirm the tip matches the stored head, and —
//! when a trusted key is configured — check the detached signature.
//!
//! Findings are classified per event. The first event whose own checks
//! fail is the **root cause**; every event after it is reported as
//! **propagated**, because a chain is only trustworthy up to its first
//! inconsistency. Later events' own problems are still recorded on their
//! findings, they just don't claim root-cause status.
//!
//! A sequence with no stored event is itself a finding: it is either an
//! append that crashed between advancing the head and inserting the body,
//! or a deletion. Either way the chain does not account for it.

use std::sync::Arc;

use custos_core::{EventId, TenantId};
use custos_crypto::{EventHash, PublicKey};
use serde::{Deserialize, Serialize};

use crate::canonical::content_hash;
use crate::error::LedgerResult;
use crate::store::{ChainHeadStore, EventStore};

/// One specific check failure on one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainProblem {
    /// The stored hash does not match the recomputed canonical content.
    ContentMismatch {
        /// Hash as stored on the event.
        stored: EventHash,
        /// Hash recomputed from the stored content.
        computed: EventHash,
    },
    /// The event's `previous_hash` does not match its stored predecessor.
    BrokenLink {
        /// The predecessor's stored hash.
        expected: EventHash,
        /// What the event actually points at.
        actual: EventHash,
    },
    /// No event is stored at this sequence.
    MissingEvent,
    /// The chain tip does not match the stored head.
    HeadMismatch {
        /// Hash recorded on the head row.
        head: EventHash,
        /// Hash of the stored tip event.
        event: EventHash,
    },
    /// A trusted key is configured but the event carries no signature.
    SignatureMissing,
    /// The event's signature does not verify against the trusted key.
    SignatureInvalid,
}

/// How one examined sequence position fared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// All checks passed and no earlier event in range failed.
    Intact,
    /// The first event in range whose own checks failed.
    RootCause,
    /// Comes after the root cause; its lineage cannot be trusted.
    Propagated,
}

/// The verdict for one sequence position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFinding {
    /// The chain position examined.
    pub sequence: u64,
    /// The stored event's id, or `None` when the position is empty.
    pub event_id: Option<EventId>,
    /// Classification relative to the rest of the range.
    pub status: EventStatus,
    /// The specific checks that failed, if any.
    pub problems: Vec<ChainProblem>,
}

/// The result of verifying a range of one tenant's chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    /// The tenant whose chain was examined.
    pub tenant_id: TenantId,
    /// How many sequence positions were examined.
    pub checked: u64,
    /// One finding per examined position, in sequence order.
    pub findings: Vec<EventFinding>,
}

impl VerificationReport {
    fn empty(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            checked: 0,
            findings: Vec::new(),
        }
    }

    /// Whether every examined position passed every check.
    #[must_use]
    pub fn is_intact(&self) -> bool {
        self.findings
            .iter()
            .all(|finding| finding.status == EventStatus::Intact)
    }

    /// The first failing finding, if any.
    #[must_use]
    pub fn root_cause(&self) -> Option<&EventFinding> {
        self.findings
            .iter()
            .find(|finding| finding.status == EventStatus::RootCause)
    }
}

/// Replays stored chains and reports tamper evidence.
pub struct ChainVerifier<S> {
    store: Arc<S>,
    trusted_key: Option<PublicKey>,
}

impl<S> std::fmt::Debug for ChainVerifier<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainVerifier")
            .field("signature_checks", &self.trusted_key.is_some())
            .finish_non_exhaustive()
    }
}

impl<S> ChainVerifier<S>
where
    S: EventStore + ChainHeadStore,
{
    /// Create a verifier over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            trusted_key: None,
        }
    }

    /// Additionally require every event to carry a valid signature from
    /// this key.
    #[must_use]
    pub fn with_trusted_key(mut self, key: PublicKey) -> Self {
        self.trusted_key = Some(key);
        self
    }

    /// Verify a tenant's entire chain.
    ///
    /// # Errors
    ///
    /// Returns an error only when the store itself fails; tamper evidence
    /// is reported in the [`VerificationReport`], not as an error.
    pub async fn verify(&self, tenant_id: &TenantId) -> LedgerResult<VerificationReport> {
        self.verify_range(tenant_id, 0, None).await
    }

    /// Verify the sequence range `from..=to` of a tenant's chain.
    ///
    /// `to = None` means "through the chain tip". The range is clamped to
    /// what the head says exists; an empty chain yields an empty, intact
    /// report. When `from > 0` the predecessor event is fetched so the
    /// first in-range link can still be checked.
    ///
    /// # Errors
    ///
    /// Returns an error only when the store itself fails.
    pub async fn verify_range(
        &self,
        tenant_id: &TenantId,
        from: u64,
        to: Option<u64>,
    ) -> LedgerResult<VerificationReport> {
        let Some(head) = self.store.chain_head(tenant_id).await? else {
            return Ok(VerificationReport::empty(tenant_id.clone()));
        };
        let Some(last) = head.last_sequence() else {
            return Ok(VerificationReport::empty(tenant_id.clone()));
        };
        let end = to.map_or(last, |t| t.min(last));
        if from > end {
            return Ok(VerificationReport::empty(tenant_id.clone()));
        }

        let events = self.store.events_in_range(tenant_id, from, Some(end)).await?;

        // Anchor for the first link check: the genesis sentinel at the
        // chain start, or the stored predecessor for a mid-chain range.
        let mut anchor: Option<EventHash> = if from == 0 {
            Some(EventHash::zero())
        } else {
            let before = from.saturating_sub(1);
            self.store
                .events_in_range(tenant_id, before, Some(before))
                .await?
                .pop()
                .map(|event| event.hash)
        };

        let mut findings = Vec::new();
        let mut broken = false;
        let mut stored = events.into_iter().peekable();

        for sequence in from..=end {
            let event = match stored.peek() {
                Some(next) if next.sequence == sequence => stored.next(),
                _ => None,
            };

            let (event_id, problems, next_anchor) = match event {
                None => (None, vec![ChainProblem::MissingEvent], None),
                Some(event) => {
                    let mut problems = Vec::new();

                    let computed = content_hash(&event)?;
                    if computed != event.hash {
                        problems.push(ChainProblem::ContentMismatch {
                            stored: event.hash,
                            computed,
                        });
                    }

                    if let Some(expected) = anchor
                        && event.previous_hash != expected
                    {
                        problems.push(ChainProblem::BrokenLink {
                            expected,
                            actual: event.previous_hash,
                        });
                    }

                    if sequence == last && event.hash != head.hash {
                        problems.push(ChainProblem::HeadMismatch {
                            head: head.hash,
                            event: event.hash,
                        });
                    }

                    if let Some(key) = &self.trusted_key {
                        match &event.signature {
                            None => problems.push(ChainProblem::SignatureMissing),
                            Some(signature) => {
                                if key.verify(event.hash.as_bytes(), signature).is_err() {
                                    problems.push(ChainProblem::SignatureInvalid);
                                }
                            },
                        }
                    }

                    (Some(event.id), problems, Some(event.hash))
                },
            };

            let status = if broken {
                EventStatus::Propagated
            } else if problems.is_empty() {
                EventStatus::Intact
            } else {
                broken = true;
                EventStatus::RootCause
            };

            findings.push(EventFinding {
                sequence,
                event_id,
                status,
                problems,
            });
            anchor = next_anchor;
        }

        Ok(VerificationReport {
            tenant_id: tenant_id.clone(),
            checked: findings.len() as u64,
            findings,
        })
    }
}

#[cfg(test)]
mod tests {
    use custos_core::{
        Action, Actor, ActorType, Event, EventDraft, EventMetadata, Resource, ResourceType,
    };
    use custos_crypto::KeyPair;
    use custos_storage::{KvStore, MemoryKvStore};

    use super::*;
    use crate::chain::ChainAppender;
    use crate::kv::{EVENTS_NAMESPACE, KvLedgerStore};

    fn draft(tenant: &str, actor: &str) -> EventDraft {
        EventDraft::new(
            Actor::new(actor, ActorType::User),
            Action::update(),
            Resource::new("doc-1", ResourceType::Document),
            EventMetadata::new("docs-service", TenantId::new(tenant)),
        )
    }

    async fn seeded_chain(
        count: usize,
        signer: Option<Arc<KeyPair>>,
    ) -> (Arc<KvLedgerStore>, Arc<MemoryKvStore>, Vec<Event>) {
        let kv = Arc::new(MemoryKvStore::new());
        let store = Arc::new(
            KvLedgerStore::new(Arc::clone(&kv) as Arc<dyn KvStore>).unwrap(),
        );
        let mut appender = ChainAppender::new(Arc::clone(&store));
        if let Some(signer) = signer {
            appender = appender.with_signer(signer);
        }

        let mut events = Vec::new();
        for i in 0..count {
            events.push(
                appender
                    .append(draft("acme", &format!("user-{i}")))
                    .await
                    .unwrap(),
            );
        }
        (store, kv, events)
    }

    /// Rewrite a stored event's raw JSON in place.
    async fn tamper(kv: &MemoryKvStore, event: &Event, edit: impl FnOnce(&mut serde_json::Value)) {
        let key = event.id.to_string();
        let raw = kv.get(EVENTS_NAMESPACE, &key).await.unwrap().unwrap();
        let mut value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        edit(&mut value);
        kv.set(EVENTS_NAMESPACE, &key, serde_json::to_vec(&value).unwrap())
            .await
            .unwrap();
    }

    fn statuses(report: &VerificationReport) -> Vec<EventStatus> {
        report.findings.iter().map(|f| f.status).collect()
    }

    #[tokio::test]
    async fn intact_chain_reports_all_intact() {
        let (store, _kv, _events) = seeded_chain(5, None).await;
        let report = ChainVerifier::new(store)
            .verify(&TenantId::new("acme"))
            .await
            .unwrap();

        assert_eq!(report.checked, 5);
        assert!(report.is_intact());
        assert!(report.root_cause().is_none());
    }

    #[tokio::test]
    async fn empty_chain_is_trivially_intact() {
        let kv = Arc::new(MemoryKvStore::new());
        let store = Arc::new(
            KvLedgerStore::new(Arc::clone(&kv) as Arc<dyn KvStore>).unwrap(),
        );
        let report = ChainVerifier::new(store)
            .verify(&TenantId::new("acme"))
            .await
            .unwrap();

        assert_eq!(report.checked, 0);
        assert!(report.is_intact());
    }

    #[tokio::test]
    async fn content_tamper_is_root_cause_and_later_events_propagate() {
        let (store, kv, events) = seeded_chain(5, None).await;
        tamper(&kv, &events[2], |value| {
            value["actor"]["id"] = serde_json::json!("mallory");
        })
        .await;

        let report = ChainVerifier::new(store)
            .verify(&TenantId::new("acme"))
            .await
            .unwrap();

        assert!(!report.is_intact());
        assert_eq!(
            statuses(&report),
            vec![
                EventStatus::Intact,
                EventStatus::Intact,
                EventStatus::RootCause,
                EventStatus::Propagated,
                EventStatus::Propagated,
            ]
        );
        let root = report.root_cause().unwrap();
        assert_eq!(root.sequence, 2);
        assert!(matches!(
            root.problems[0],
            ChainProblem::ContentMismatch { .. }
        ));
    }

    #[tokio::test]
    async fn deleted_event_is_a_missing_sequence() {
        let (store, kv, events) = seeded_chain(4, None).await;
        kv.delete(EVENTS_NAMESPACE, &events[1].id.to_string())
            .await
            .unwrap();

        let report = ChainVerifier::new(store)
            .verify(&TenantId::new("acme"))
            .await
            .unwrap();

        let root = report.root_cause().unwrap();
        assert_eq!(root.sequence, 1);
        assert!(root.event_id.is_none());
        assert_eq!(root.problems, vec![ChainProblem::MissingEvent]);
        assert_eq!(
            statuses(&report),
            vec![
                EventStatus::Intact,
                EventStatus::RootCause,
                EventStatus::Propagated,
                EventStatus::Propagated,
            ]
        );
    }

    #[tokio::test]
    async fn rewritten_tip_is_caught_by_the_head() {
        let (store, kv, events) = seeded_chain(3, None).await;
        let tip = events.last().unwrap();

        // The attacker rewrites the tip and recomputes a consistent hash,
        // but cannot rewrite the head row the appender CASes over.
        let mut forged = tip.clone();
        forged.actor.id = "mallory".into();
        forged.hash = content_hash(&forged).unwrap();
        tamper(&kv, tip, |value| {
            *value = serde_json::to_value(&forged).unwrap();
        })
        .await;

        let report = ChainVerifier::new(store)
            .verify(&TenantId::new("acme"))
            .await
            .unwrap();

        let root = report.root_cause().unwrap();
        assert_eq!(root.sequence, 2);
        assert!(
            root.problems
                .iter()
                .any(|p| matches!(p, ChainProblem::HeadMismatch { .. }))
        );
    }

    #[tokio::test]
    async fn hash_fixup_mid_chain_breaks_the_next_link() {
        let (store, kv, events) = seeded_chain(4, None).await;

        let mut forged = events[1].clone();
        forged.actor.id = "mallory".into();
        forged.hash = content_hash(&forged).unwrap();
        tamper(&kv, &events[1], |value| {
            *value = serde_json::to_value(&forged).unwrap();
        })
        .await;

        let report = ChainVerifier::new(store)
            .verify(&TenantId::new("acme"))
            .await
            .unwrap();

        // The forged event is internally consistent; detection lands on
        // the first link that no longer adds up.
        let root = report.root_cause().unwrap();
        assert_eq!(root.sequence, 2);
        assert!(matches!(root.problems[0], ChainProblem::BrokenLink { .. }));
    }

    #[tokio::test]
    async fn signature_pins_hash_fixup_to_its_source() {
        let keypair = Arc::new(KeyPair::generate());
        let public = keypair.public_key();
        let (store, kv, events) = seeded_chain(4, Some(keypair)).await;

        let mut forged = events[1].clone();
        forged.actor.id = "mallory".into();
        forged.hash = content_hash(&forged).unwrap();
        // The old signature no longer covers the forged hash.
        tamper(&kv, &events[1], |value| {
            *value = serde_json::to_value(&forged).unwrap();
        })
        .await;

        let report = ChainVerifier::new(store)
            .with_trusted_key(public)
            .verify(&TenantId::new("acme"))
            .await
            .unwrap();

        let root = report.root_cause().unwrap();
        assert_eq!(root.sequence, 1);
        assert!(
            root.problems
                .iter()
                .any(|p| matches!(p, ChainProblem::SignatureInvalid))
        );
    }

    #[tokio::test]
    async fn unsigned_events_fail_when_a_key_is_required() {
        let (store, _kv, _events) = seeded_chain(2, None).await;
        let report = ChainVerifier::new(store)
            .with_trusted_key(KeyPair::generate().public_key())
            .verify(&TenantId::new("acme"))
            .await
            .unwrap();

        assert!(!report.is_intact());
        assert_eq!(report.root_cause().unwrap().sequence, 0);
        assert!(
            report
                .findings
                .iter()
                .all(|f| f.problems.contains(&ChainProblem::SignatureMissing))
        );
    }

    #[tokio::test]
    async fn range_verification_scopes_the_checks() {
        let (store, kv, events) = seeded_chain(4, None).await;
        tamper(&kv, &events[0], |value| {
            value["actor"]["id"] = serde_json::json!("mallory");
        })
        .await;

        let verifier = ChainVerifier::new(store);
        let tenant = TenantId::new("acme");

        // The tampered event's own range reports it.
        let head_range = verifier.verify_range(&tenant, 0, Some(0)).await.unwrap();
        assert_eq!(head_range.root_cause().unwrap().sequence, 0);

        // A range past it anchors on the stored predecessor hash, which a
        // pure content tamper does not change.
        let tail = verifier.verify_range(&tenant, 1, None).await.unwrap();
        assert!(tail.is_intact());
        assert_eq!(tail.checked, 3);
    }

    #[tokio::test]
    async fn range_clamps_to_the_chain() {
        let (store, _kv, _events) = seeded_chain(3, None).await;
        let verifier = ChainVerifier::new(store);
        let tenant = TenantId::new("acme");

        let wide = verifier.verify_range(&tenant, 0, Some(999)).await.unwrap();
        assert_eq!(wide.checked, 3);

        let past_end = verifier.verify_range(&tenant, 10, None).await.unwrap();
        assert_eq!(past_end.checked, 0);
        assert!(past_end.is_intact());
    }

    #[tokio::test]
    async fn missing_anchor_skips_only_the_first_link_check() {
        let (store, kv, events) = seeded_chain(5, None).await;
        kv.delete(EVENTS_NAMESPACE, &events[2].id.to_string())
            .await
            .unwrap();

        // Range starts just past the hole; its anchor cannot be fetched,
        // so only content checks run for the first in-range event.
        let report = ChainVerifier::new(store)
            .verify_range(&TenantId::new("acme"), 3, None)
            .await
            .unwrap();
        assert!(report.is_intact());
        assert_eq!(report.checked, 2);
    }
}
