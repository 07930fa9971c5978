//! Pipeline assembly: wire the stages together and spawn the worker.

use std::sync::Arc;

use custos_detect::{AlertGenerator, RuleEngine, RuleStore};
use custos_ledger::{ChainAppender, ChainHeadStore, EventStore};
use custos_notify::Dispatcher;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::ingest::Ingestor;
use crate::worker::DetectionWorker;

/// Default bound of the commit queue between ingestion and detection.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Wires ingestion, detection, alerting, and dispatch into one running
/// pipeline.
///
/// The builder owns fully-configured stages; [`Pipeline::spawn`] connects
/// them with a bounded commit queue and starts the detection worker.
pub struct Pipeline<S> {
    appender: Arc<ChainAppender<S>>,
    rules: Arc<dyn RuleStore>,
    engine: RuleEngine,
    generator: AlertGenerator,
    dispatcher: Arc<Dispatcher>,
    queue_capacity: usize,
}

impl<S> std::fmt::Debug for Pipeline<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("queue_capacity", &self.queue_capacity)
            .finish_non_exhaustive()
    }
}

impl<S> Pipeline<S>
where
    S: EventStore + ChainHeadStore,
{
    /// Assemble a pipeline from its stages.
    #[must_use]
    pub fn new(
        appender: Arc<ChainAppender<S>>,
        rules: Arc<dyn RuleStore>,
        engine: RuleEngine,
        generator: AlertGenerator,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            appender,
            rules,
            engine,
            generator,
            dispatcher,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    /// Override the commit queue bound (clamped to at least one slot).
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Start the detection worker and hand back the write path.
    ///
    /// Must be called from within a Tokio runtime. Dropping the returned
    /// [`PipelineHandle`] leaves the worker running detached; call
    /// [`PipelineHandle::shutdown`] to stop it cleanly.
    #[must_use]
    pub fn spawn(self) -> (Ingestor<S>, PipelineHandle) {
        let (commits_tx, commits_rx) = mpsc::channel(self.queue_capacity);
        let cancel = CancellationToken::new();

        let worker = DetectionWorker::new(
            commits_rx,
            cancel.clone(),
            self.rules,
            self.engine,
            self.generator,
            self.dispatcher,
        );
        let worker = tokio::spawn(worker.run());
        debug!(queue_capacity = self.queue_capacity, "detection pipeline started");

        (
            Ingestor::new(self.appender, commits_tx),
            PipelineHandle { cancel, worker },
        )
    }
}

/// Controls a spawned detection worker.
#[derive(Debug)]
pub struct PipelineHandle {
    cancel: CancellationToken,
    worker: JoinHandle<()>,
}

impl PipelineHandle {
    /// Whether the worker has already stopped.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Stop detection: cancel the worker, let it drain the commit queue,
    /// and wait for it to finish.
    ///
    /// Events committed before this call are still evaluated; alerts
    /// dispatched on the way out are delivered by their own tasks.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(error) = self.worker.await {
            warn!(%error, "detection worker did not stop cleanly");
        }
    }
}
