//! The synchronous half of the pipeline: validate, chain, signal.
//!
//! [`Ingestor::ingest`] is the write path callers hold. It validates the
//! draft, appends it to the tenant's chain, and hands the committed event
//! to the detection worker over a bounded queue. Only validation and the
//! append can fail the call; a congested queue degrades to a detached
//! sender so ingestion latency never depends on detection keeping up.

use std::sync::Arc;

use custos_core::{Event, EventDraft};
use custos_ledger::{ChainAppender, ChainHeadStore, EventStore};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::error::{PipelineError, PipelineResult};

/// Carries one committed event from ingestion to the detection worker.
#[derive(Debug, Clone)]
pub struct CommitSignal {
    /// The event exactly as committed to the chain.
    pub event: Event,
}

/// One failed item of a batch ingest.
#[derive(Debug)]
pub struct BatchFailure {
    /// Position of the draft in the submitted batch.
    pub index: usize,
    /// Why it was rejected or failed to commit.
    pub error: PipelineError,
}

/// Outcome of [`Ingestor::ingest_batch`]: every item commits or fails on
/// its own, so a bad draft in the middle never blocks its neighbours.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Committed events, in submission order.
    pub committed: Vec<Event>,
    /// Failures, keyed back to the batch by index.
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    /// Whether every draft in the batch was committed.
    #[must_use]
    pub fn all_committed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Validates drafts, appends them to the ledger, and signals commits to
/// the detection worker.
///
/// Cheap to clone; every clone shares the appender and the commit queue.
pub struct Ingestor<S> {
    appender: Arc<ChainAppender<S>>,
    commits: mpsc::Sender<CommitSignal>,
}

impl<S> Clone for Ingestor<S> {
    fn clone(&self) -> Self {
        Self {
            appender: Arc::clone(&self.appender),
            commits: self.commits.clone(),
        }
    }
}

impl<S> std::fmt::Debug for Ingestor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingestor")
            .field("appender", &self.appender)
            .finish_non_exhaustive()
    }
}

impl<S> Ingestor<S>
where
    S: EventStore + ChainHeadStore,
{
    /// Create an ingestor that appends through `appender` and signals
    /// commits into `commits`.
    pub(crate) fn new(appender: Arc<ChainAppender<S>>, commits: mpsc::Sender<CommitSignal>) -> Self {
        Self { appender, commits }
    }

    /// Validate and commit one draft, returning the chained event.
    ///
    /// The returned event is durable by the time this resolves; detection
    /// runs afterwards and cannot affect the outcome.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::Validation`] if the draft fails ingestion rules;
    ///   nothing is written.
    /// - [`PipelineError::Ledger`] if the append fails, including a
    ///   [`ChainConflict`](custos_ledger::LedgerError::ChainConflict) after
    ///   exhausting the append's retry budget.
    pub async fn ingest(&self, draft: EventDraft) -> PipelineResult<Event> {
        draft.validate()?;
        let event = self.appender.append(draft).await?;
        self.signal_commit(event.clone());
        Ok(event)
    }

    /// Commit a batch, each draft independently.
    ///
    /// Items are processed in order; a failure is recorded against its
    /// index and the rest of the batch carries on.
    pub async fn ingest_batch(&self, drafts: Vec<EventDraft>) -> BatchReport {
        let mut report = BatchReport::default();
        for (index, draft) in drafts.into_iter().enumerate() {
            match self.ingest(draft).await {
                Ok(event) => report.committed.push(event),
                Err(error) => report.failures.push(BatchFailure { index, error }),
            }
        }
        report
    }

    /// Hand a committed event to the detection worker without waiting.
    ///
    /// A full queue is expected under burst: the signal moves to a
    /// detached task that waits for capacity, keeping the ingest path
    /// non-blocking. A closed queue means the worker is gone; the event
    /// is already durable, so this only costs its evaluation.
    fn signal_commit(&self, event: Event) {
        let signal = CommitSignal { event };
        match self.commits.try_send(signal) {
            Ok(()) => {},
            Err(TrySendError::Full(signal)) => {
                debug!(
                    tenant = %signal.event.tenant_id(),
                    sequence = signal.event.sequence,
                    "commit queue full, sending from a detached task"
                );
                let commits = self.commits.clone();
                tokio::spawn(async move {
                    if commits.send(signal).await.is_err() {
                        debug!("commit queue closed while waiting for capacity");
                    }
                });
            },
            Err(TrySendError::Closed(signal)) => {
                warn!(
                    tenant = %signal.event.tenant_id(),
                    sequence = signal.event.sequence,
                    "detection worker is gone; event committed but not evaluated"
                );
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use custos_core::{
        Action, Actor, ActorType, EventMetadata, Resource, ResourceType, TenantId,
    };
    use custos_ledger::InMemoryLedger;

    use super::*;

    fn draft(tenant: &str) -> EventDraft {
        EventDraft::new(
            Actor::new("user-1", ActorType::User),
            Action::login(),
            Resource::new("session-api", ResourceType::Api),
            EventMetadata::new("auth-service", TenantId::new(tenant)),
        )
    }

    fn ingestor(
        capacity: usize,
    ) -> (Ingestor<InMemoryLedger>, mpsc::Receiver<CommitSignal>, Arc<InMemoryLedger>) {
        let store = Arc::new(InMemoryLedger::new());
        let appender = Arc::new(ChainAppender::new(Arc::clone(&store)));
        let (tx, rx) = mpsc::channel(capacity);
        (Ingestor::new(appender, tx), rx, store)
    }

    #[tokio::test]
    async fn ingest_commits_and_signals() {
        let (ingestor, mut rx, store) = ingestor(8);

        let event = ingestor.ingest(draft("acme")).await.unwrap();
        assert_eq!(event.sequence, 0);
        assert!(!event.hash.is_zero());

        let signal = rx.recv().await.unwrap();
        assert_eq!(signal.event, event);

        let stored = store
            .events_in_range(&TenantId::new("acme"), 0, None)
            .await
            .unwrap();
        assert_eq!(stored, vec![event]);
    }

    #[tokio::test]
    async fn invalid_draft_is_rejected_before_the_ledger() {
        let (ingestor, mut rx, store) = ingestor(8);

        let mut bad = draft("acme");
        bad.actor.id = String::new();

        let err = ingestor.ingest(bad).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));

        assert!(rx.try_recv().is_err());
        let stored = store
            .events_in_range(&TenantId::new("acme"), 0, None)
            .await
            .unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn full_queue_does_not_drop_commits() {
        let (ingestor, mut rx, _store) = ingestor(1);

        // Second ingest finds the queue full and falls back to the
        // detached sender; both signals must still arrive.
        let first = ingestor.ingest(draft("acme")).await.unwrap();
        let second = ingestor.ingest(draft("acme")).await.unwrap();
        assert_eq!(second.sequence, 1);

        let mut seen = vec![
            rx.recv().await.unwrap().event.sequence,
            rx.recv().await.unwrap().event.sequence,
        ];
        seen.sort_unstable();
        assert_eq!(seen, vec![first.sequence, second.sequence]);
    }

    #[tokio::test]
    async fn closed_queue_still_commits() {
        let (ingestor, rx, store) = ingestor(1);
        drop(rx);

        let event = ingestor.ingest(draft("acme")).await.unwrap();
        let stored = store
            .events_in_range(&TenantId::new("acme"), 0, None)
            .await
            .unwrap();
        assert_eq!(stored, vec![event]);
    }

    #[tokio::test]
    async fn batch_commits_independently_per_item() {
        let (ingestor, _rx, _store) = ingestor(8);

        let mut bad = draft("acme");
        bad.metadata.source = "  ".to_owned();
        let batch = vec![draft("acme"), bad, draft("acme")];

        let report = ingestor.ingest_batch(batch).await;
        assert!(!report.all_committed());
        assert_eq!(report.committed.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 1);
        assert!(matches!(report.failures[0].error, PipelineError::Validation(_)));

        // Survivors still chain contiguously.
        let sequences: Vec<u64> = report.committed.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![0, 1]);
    }

    #[tokio::test]
    async fn empty_batch_reports_complete() {
        let (ingestor, _rx, _store) = ingestor(8);
        let report = ingestor.ingest_batch(Vec::new()).await;
        assert!(report.all_committed());
        assert!(report.committed.is_empty());
    }
}
