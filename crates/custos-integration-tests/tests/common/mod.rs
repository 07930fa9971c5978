//! Shared wiring for the end-to-end tests.

use std::sync::Arc;
use std::time::Duration;

use custos_core::{AlertId, TenantId};
use custos_detect::{
    Alert, AlertGenerator, AlertStore, MemoryAlertStore, MemoryRuleStore, Rule, RuleEngine,
    RuleStore,
};
use custos_ledger::{ChainAppender, InMemoryLedger};
use custos_notify::{AlertSink, DeliveryRecord, DeliveryStore, Dispatcher, MemoryDeliveryStore};
use custos_pipeline::{Ingestor, LedgerHistory, Pipeline, PipelineHandle};
use custos_test::CapturingSink;

/// A fully wired in-memory Custos stack with one capturing sink.
#[allow(dead_code)]
pub struct Stack {
    /// The write path handed out by the pipeline.
    pub ingestor: Ingestor<InMemoryLedger>,
    /// Controls the detection worker.
    pub handle: PipelineHandle,
    /// The event store under the chain.
    pub ledger: Arc<InMemoryLedger>,
    /// Where raised alerts land.
    pub alerts: Arc<MemoryAlertStore>,
    /// Delivery bookkeeping.
    pub deliveries: Arc<MemoryDeliveryStore>,
    /// Receives every notification for every tenant.
    pub sink: Arc<CapturingSink>,
}

/// Wire ledger, detection, and delivery around an in-memory store and
/// seed the given rules.
#[allow(dead_code)]
pub async fn spawn_stack(rules: Vec<Rule>) -> Stack {
    let ledger = Arc::new(InMemoryLedger::new());
    let appender = Arc::new(ChainAppender::new(Arc::clone(&ledger)));
    let history = Arc::new(LedgerHistory::new(Arc::clone(&ledger)));

    let rule_store = Arc::new(MemoryRuleStore::new());
    for rule in &rules {
        rule_store.put_rule(rule).await.expect("fixture rules are valid");
    }

    let alerts = Arc::new(MemoryAlertStore::new());
    let deliveries = Arc::new(MemoryDeliveryStore::new());
    let sink = Arc::new(CapturingSink::new());

    let mut dispatcher = Dispatcher::new(Arc::clone(&deliveries) as Arc<dyn DeliveryStore>);
    dispatcher.register_global(Arc::clone(&sink) as Arc<dyn AlertSink>);

    let (ingestor, handle) = Pipeline::new(
        appender,
        Arc::clone(&rule_store) as Arc<dyn RuleStore>,
        RuleEngine::new(history),
        AlertGenerator::new(Arc::clone(&alerts) as Arc<dyn AlertStore>),
        Arc::new(dispatcher),
    )
    .spawn();

    Stack {
        ingestor,
        handle,
        ledger,
        alerts,
        deliveries,
        sink,
    }
}

/// Poll the alert store until the tenant's alerts satisfy `ready`.
///
/// Alerts come back newest first, as the store returns them.
#[allow(dead_code)]
pub async fn wait_for_alerts(
    alerts: &MemoryAlertStore,
    tenant: &TenantId,
    ready: impl Fn(&[Alert]) -> bool,
) -> Vec<Alert> {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let got = alerts
                .alerts_for_tenant(tenant)
                .await
                .expect("memory alert store cannot fail");
            if ready(&got) {
                return got;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("expected alerts did not appear in time")
}

/// Poll until `alert_id` has `count` delivery records, all terminal.
#[allow(dead_code)]
pub async fn wait_for_terminal_deliveries(
    deliveries: &MemoryDeliveryStore,
    alert_id: AlertId,
    count: usize,
) -> Vec<DeliveryRecord> {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let records = deliveries
                .for_alert(alert_id)
                .await
                .expect("memory delivery store cannot fail");
            if records.len() >= count && records.iter().all(|r| r.state.is_terminal()) {
                return records;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("deliveries did not settle in time")
}
