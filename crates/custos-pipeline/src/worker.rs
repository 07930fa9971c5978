//! The detection worker task.
//!
//! Sits on the commit queue and runs the detection chain for each event:
//! load the tenant's enabled rules, evaluate, fold triggers into alerts,
//! dispatch what gets created. Every failure on this path is logged and
//! contained; nothing here can reach back and fail an ingest that already
//! returned.

use std::sync::Arc;

use custos_core::Event;
use custos_detect::{AlertGenerator, AlertOutcome, RuleEngine, RuleStore};
use custos_notify::Dispatcher;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::ingest::CommitSignal;

/// Drives detection for committed events until cancelled.
pub(crate) struct DetectionWorker {
    commits: mpsc::Receiver<CommitSignal>,
    cancel: CancellationToken,
    rules: Arc<dyn RuleStore>,
    engine: RuleEngine,
    generator: AlertGenerator,
    dispatcher: Arc<Dispatcher>,
}

impl DetectionWorker {
    pub(crate) fn new(
        commits: mpsc::Receiver<CommitSignal>,
        cancel: CancellationToken,
        rules: Arc<dyn RuleStore>,
        engine: RuleEngine,
        generator: AlertGenerator,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            commits,
            cancel,
            rules,
            engine,
            generator,
            dispatcher,
        }
    }

    /// Process commit signals until cancellation, then drain the queue so
    /// events committed before shutdown still get evaluated.
    pub(crate) async fn run(mut self) {
        loop {
            tokio::select! {
                biased;

                () = self.cancel.cancelled() => break,

                signal = self.commits.recv() => match signal {
                    Some(signal) => self.evaluate(&signal.event).await,
                    None => {
                        debug!("commit queue closed, detection worker stopping");
                        return;
                    },
                },
            }
        }

        while let Ok(signal) = self.commits.try_recv() {
            self.evaluate(&signal.event).await;
        }
        debug!("detection worker drained and stopped");
    }

    /// Run one committed event through rules, alerting, and dispatch.
    async fn evaluate(&self, event: &Event) {
        let tenant_id = event.tenant_id();
        let rules = match self.rules.enabled_rules(tenant_id).await {
            Ok(rules) => rules,
            Err(error) => {
                warn!(
                    tenant = %tenant_id,
                    event = %event.id,
                    %error,
                    "failed to load rules, skipping detection for event"
                );
                return;
            },
        };

        for trigger in self.engine.evaluate(event, &rules).await {
            match self.generator.process(&trigger).await {
                Ok(AlertOutcome::Created(alert)) => {
                    // Handles detach on drop; outcomes land in the delivery store.
                    drop(self.dispatcher.dispatch(&alert));
                },
                Ok(AlertOutcome::Suppressed { alert_id }) => {
                    debug!(
                        tenant = %tenant_id,
                        alert = %alert_id,
                        rule = %trigger.rule_id,
                        "trigger folded into active alert"
                    );
                },
                Err(error) => {
                    warn!(
                        tenant = %tenant_id,
                        rule = %trigger.rule_id,
                        %error,
                        "failed to process trigger, alert may be missing"
                    );
                },
            }
        }
    }
}
