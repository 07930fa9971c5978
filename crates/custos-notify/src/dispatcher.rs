//! Fan-out of alerts to sinks, with independent per-sink retry.
//!
//! Each registered sink gets its own spawned delivery task, so one sink's
//! backoff or permanent failure never delays another sink or the caller.
//! Every task keeps a [`DeliveryRecord`] current in the [`DeliveryStore`]:
//! `Pending` on entry, `Retrying` between attempts, then `Delivered` or
//! the terminal, operator-actionable `Failed`. Nothing is silently dropped.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use custos_core::{AlertId, TenantId};
use custos_detect::Alert;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::error::NotifyResult;
use crate::sink::{AlertNotification, AlertSink};

/// Attempts before a delivery goes terminally `Failed`.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// How retry attempts are spaced and bounded.
///
/// The delay before attempt `n + 1` is `base_delay * 2^(n-1)`, capped at
/// `max_delay`; each attempt itself is cut off after `attempt_timeout`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts before giving up.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub base_delay: Duration,
    /// Ceiling for the doubling delay.
    pub max_delay: Duration,
    /// Deadline for a single delivery attempt.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Override the attempt budget; clamped to at least one.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Override the first backoff delay.
    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Override the backoff ceiling.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Override the per-attempt deadline.
    #[must_use]
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// The backoff delay after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let factor = 1_u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Where a delivery stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    /// Queued, no attempt finished yet.
    Pending,
    /// At least one attempt failed; another is scheduled.
    Retrying,
    /// The sink acknowledged; terminal.
    Delivered,
    /// The attempt budget is exhausted; terminal, needs an operator.
    Failed,
}

impl DeliveryState {
    /// Whether the delivery will see no further attempts.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Failed)
    }
}

/// Bookkeeping for one alert's delivery to one sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    /// The alert being delivered.
    pub alert_id: AlertId,
    /// Tenant the alert belongs to.
    pub tenant_id: TenantId,
    /// Name of the target sink.
    pub sink: String,
    /// Current state.
    pub state: DeliveryState,
    /// Attempts made so far.
    pub attempts: u32,
    /// The most recent attempt's failure, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// When this record last changed.
    pub updated_at: DateTime<Utc>,
}

impl DeliveryRecord {
    /// A fresh `Pending` record for one notification and sink.
    #[must_use]
    pub fn pending(notification: &AlertNotification, sink: &str) -> Self {
        Self {
            alert_id: notification.idempotency_key,
            tenant_id: notification.tenant_id.clone(),
            sink: sink.to_string(),
            state: DeliveryState::Pending,
            attempts: 0,
            last_error: None,
            updated_at: Utc::now(),
        }
    }
}

/// Persistence for delivery records.
#[async_trait]
pub trait DeliveryStore: Send + Sync {
    /// Insert or replace the record for `(alert, sink)`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::NotifyError::Store`] on backend failure.
    async fn upsert(&self, record: &DeliveryRecord) -> NotifyResult<()>;

    /// Fetch the record for one alert and sink.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::NotifyError::Store`] on backend failure.
    async fn find(&self, alert_id: AlertId, sink: &str) -> NotifyResult<Option<DeliveryRecord>>;

    /// All records for an alert, ordered by sink name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::NotifyError::Store`] on backend failure.
    async fn for_alert(&self, alert_id: AlertId) -> NotifyResult<Vec<DeliveryRecord>>;
}

/// In-memory [`DeliveryStore`] on a concurrent map.
#[derive(Debug, Default)]
pub struct MemoryDeliveryStore {
    records: DashMap<(AlertId, String), DeliveryRecord>,
}

impl MemoryDeliveryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeliveryStore for MemoryDeliveryStore {
    async fn upsert(&self, record: &DeliveryRecord) -> NotifyResult<()> {
        self.records
            .insert((record.alert_id, record.sink.clone()), record.clone());
        Ok(())
    }

    async fn find(&self, alert_id: AlertId, sink: &str) -> NotifyResult<Option<DeliveryRecord>> {
        Ok(self
            .records
            .get(&(alert_id, sink.to_string()))
            .map(|entry| entry.value().clone()))
    }

    async fn for_alert(&self, alert_id: AlertId) -> NotifyResult<Vec<DeliveryRecord>> {
        let mut records: Vec<DeliveryRecord> = self
            .records
            .iter()
            .filter(|entry| entry.value().alert_id == alert_id)
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| a.sink.cmp(&b.sink));
        Ok(records)
    }
}

/// Fans alerts out to sinks and supervises per-sink retry.
pub struct Dispatcher {
    tenant_sinks: HashMap<TenantId, Vec<Arc<dyn AlertSink>>>,
    global_sinks: Vec<Arc<dyn AlertSink>>,
    deliveries: Arc<dyn DeliveryStore>,
    policy: RetryPolicy,
}

impl Dispatcher {
    /// Create a dispatcher with the default [`RetryPolicy`].
    #[must_use]
    pub fn new(deliveries: Arc<dyn DeliveryStore>) -> Self {
        Self {
            tenant_sinks: HashMap::new(),
            global_sinks: Vec::new(),
            deliveries,
            policy: RetryPolicy::default(),
        }
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Register a sink for one tenant's alerts.
    pub fn register(&mut self, tenant: TenantId, sink: Arc<dyn AlertSink>) {
        self.tenant_sinks.entry(tenant).or_default().push(sink);
    }

    /// Register a sink that receives every tenant's alerts.
    pub fn register_global(&mut self, sink: Arc<dyn AlertSink>) {
        self.global_sinks.push(sink);
    }

    /// The sinks an alert for `tenant` fans out to.
    #[must_use]
    pub fn sinks_for(&self, tenant: &TenantId) -> Vec<Arc<dyn AlertSink>> {
        let mut sinks = self.global_sinks.clone();
        if let Some(scoped) = self.tenant_sinks.get(tenant) {
            sinks.extend(scoped.iter().cloned());
        }
        sinks
    }

    /// Fan `alert` out to its tenant's sinks, one spawned delivery task per
    /// sink, and return the task handles in registration order.
    ///
    /// Dropping the handles detaches the deliveries (the normal mode for
    /// the detection worker); awaiting them yields each sink's final
    /// [`DeliveryState`], which tests and shutdown drains use.
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch(&self, alert: &Alert) -> Vec<JoinHandle<DeliveryState>> {
        let sinks = self.sinks_for(&alert.tenant_id);
        if sinks.is_empty() {
            tracing::debug!(
                alert = %alert.id,
                tenant = %alert.tenant_id,
                "no sinks registered, alert not dispatched"
            );
            return Vec::new();
        }
        let notification = Arc::new(AlertNotification::from(alert));
        sinks
            .into_iter()
            .map(|sink| {
                tokio::spawn(deliver_with_retry(
                    sink,
                    Arc::clone(&self.deliveries),
                    self.policy.clone(),
                    Arc::clone(&notification),
                ))
            })
            .collect()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("tenants", &self.tenant_sinks.len())
            .field("global_sinks", &self.global_sinks.len())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// One sink's delivery loop: attempt, back off, record, repeat until a
/// terminal state.
async fn deliver_with_retry(
    sink: Arc<dyn AlertSink>,
    deliveries: Arc<dyn DeliveryStore>,
    policy: RetryPolicy,
    notification: Arc<AlertNotification>,
) -> DeliveryState {
    let mut record = DeliveryRecord::pending(&notification, sink.name());
    persist(&deliveries, &record).await;

    for attempt in 1..=policy.max_attempts.max(1) {
        record.attempts = attempt;
        let outcome =
            tokio::time::timeout(policy.attempt_timeout, sink.deliver(&notification)).await;
        let error = match outcome {
            Ok(Ok(())) => {
                record.state = DeliveryState::Delivered;
                record.last_error = None;
                record.updated_at = Utc::now();
                persist(&deliveries, &record).await;
                tracing::debug!(
                    alert = %record.alert_id,
                    sink = %record.sink,
                    attempts = attempt,
                    "alert delivered"
                );
                return DeliveryState::Delivered;
            },
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!(
                "attempt timed out after {}ms",
                policy.attempt_timeout.as_millis()
            ),
        };
        record.last_error = Some(error);

        if attempt < policy.max_attempts {
            let delay = policy.delay_for(attempt);
            record.state = DeliveryState::Retrying;
            record.updated_at = Utc::now();
            persist(&deliveries, &record).await;
            tracing::warn!(
                alert = %record.alert_id,
                sink = %record.sink,
                attempt,
                delay = ?delay,
                error = record.last_error.as_deref().unwrap_or_default(),
                "alert delivery failed, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }

    record.state = DeliveryState::Failed;
    record.updated_at = Utc::now();
    persist(&deliveries, &record).await;
    tracing::error!(
        alert = %record.alert_id,
        sink = %record.sink,
        attempts = record.attempts,
        error = record.last_error.as_deref().unwrap_or_default(),
        "alert delivery failed permanently"
    );
    DeliveryState::Failed
}

/// Record-keeping must never take a delivery down with it.
async fn persist(deliveries: &Arc<dyn DeliveryStore>, record: &DeliveryRecord) {
    if let Err(e) = deliveries.upsert(record).await {
        tracing::warn!(
            alert = %record.alert_id,
            sink = %record.sink,
            error = %e,
            "failed to persist delivery record"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use custos_core::{EventId, RuleId, Severity};

    use crate::error::SinkError;

    use super::*;

    struct FlakySink {
        name: &'static str,
        failures_left: AtomicU32,
        delivered: AtomicU32,
        seen_keys: std::sync::Mutex<Vec<AlertId>>,
    }

    impl FlakySink {
        fn failing(name: &'static str, failures: u32) -> Self {
            Self {
                name,
                failures_left: AtomicU32::new(failures),
                delivered: AtomicU32::new(0),
                seen_keys: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AlertSink for FlakySink {
        fn name(&self) -> &str {
            self.name
        }

        async fn deliver(&self, notification: &AlertNotification) -> Result<(), SinkError> {
            self.seen_keys
                .lock()
                .unwrap()
                .push(notification.idempotency_key);
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left.saturating_sub(1), Ordering::SeqCst);
                return Err(SinkError::Transport("connection refused".into()));
            }
            self.delivered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn sample_alert(tenant: &str) -> Alert {
        Alert::new(
            TenantId::new(tenant),
            RuleId::new(),
            "failed login burst",
            Severity::High,
            "rule 'failed login burst' triggered: test",
            "u1",
            vec![EventId::new()],
            Utc::now(),
        )
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::default()
            .with_base_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(60));
        let delays: Vec<u64> = (1..=8).map(|n| policy.delay_for(n).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 32, 60, 60]);
        // Shift overflow saturates at the cap instead of wrapping.
        assert_eq!(policy.delay_for(200), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn first_attempt_success_is_recorded() {
        let store = Arc::new(MemoryDeliveryStore::new());
        let mut dispatcher = Dispatcher::new(store.clone());
        let sink = Arc::new(FlakySink::failing("webhook", 0));
        dispatcher.register(TenantId::new("acme"), sink.clone());

        let alert = sample_alert("acme");
        let handles = dispatcher.dispatch(&alert);
        assert_eq!(handles.len(), 1);
        for handle in handles {
            assert_eq!(handle.await.unwrap(), DeliveryState::Delivered);
        }

        let record = store.find(alert.id, "webhook").await.unwrap().unwrap();
        assert_eq!(record.state, DeliveryState::Delivered);
        assert_eq!(record.attempts, 1);
        assert!(record.last_error.is_none());
        assert_eq!(sink.delivered.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_retry_with_doubling_backoff() {
        let store = Arc::new(MemoryDeliveryStore::new());
        let mut dispatcher = Dispatcher::new(store.clone());
        let sink = Arc::new(FlakySink::failing("webhook", 2));
        dispatcher.register(TenantId::new("acme"), sink.clone());

        let alert = sample_alert("acme");
        let started = tokio::time::Instant::now();
        let handles = dispatcher.dispatch(&alert);
        for handle in handles {
            assert_eq!(handle.await.unwrap(), DeliveryState::Delivered);
        }

        // Two failures cost 1s + 2s of backoff before the third attempt.
        assert_eq!(started.elapsed(), Duration::from_secs(3));
        let record = store.find(alert.id, "webhook").await.unwrap().unwrap();
        assert_eq!(record.attempts, 3);
        assert_eq!(record.state, DeliveryState::Delivered);

        // The idempotency key never changed across attempts.
        let keys = sink.seen_keys.lock().unwrap();
        assert_eq!(keys.len(), 3);
        assert!(keys.iter().all(|key| *key == alert.id));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_attempts_reach_terminal_failed() {
        let store = Arc::new(MemoryDeliveryStore::new());
        let policy = RetryPolicy::default().with_max_attempts(3);
        let mut dispatcher = Dispatcher::new(store.clone()).with_policy(policy);
        let sink = Arc::new(FlakySink::failing("webhook", u32::MAX));
        dispatcher.register(TenantId::new("acme"), sink.clone());

        let alert = sample_alert("acme");
        for handle in dispatcher.dispatch(&alert) {
            assert_eq!(handle.await.unwrap(), DeliveryState::Failed);
        }

        let record = store.find(alert.id, "webhook").await.unwrap().unwrap();
        assert_eq!(record.state, DeliveryState::Failed);
        assert!(record.state.is_terminal());
        assert_eq!(record.attempts, 3);
        assert_eq!(record.last_error.as_deref(), Some("transport error: connection refused"));
        assert_eq!(sink.delivered.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn one_failing_sink_does_not_affect_others() {
        let store = Arc::new(MemoryDeliveryStore::new());
        let policy = RetryPolicy::default().with_max_attempts(2);
        let mut dispatcher = Dispatcher::new(store.clone()).with_policy(policy);
        let broken = Arc::new(FlakySink::failing("broken", u32::MAX));
        let healthy = Arc::new(FlakySink::failing("healthy", 0));
        dispatcher.register(TenantId::new("acme"), broken);
        dispatcher.register(TenantId::new("acme"), healthy.clone());

        let alert = sample_alert("acme");
        let mut states = Vec::new();
        for handle in dispatcher.dispatch(&alert) {
            states.push(handle.await.unwrap());
        }
        assert_eq!(states, vec![DeliveryState::Failed, DeliveryState::Delivered]);
        assert_eq!(healthy.delivered.load(Ordering::SeqCst), 1);

        let records = store.for_alert(alert.id).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sink, "broken");
        assert_eq!(records[0].state, DeliveryState::Failed);
        assert_eq!(records[1].sink, "healthy");
        assert_eq!(records[1].state, DeliveryState::Delivered);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_sink_attempts_are_cut_off() {
        struct StuckSink;

        #[async_trait]
        impl AlertSink for StuckSink {
            fn name(&self) -> &str {
                "stuck"
            }

            async fn deliver(&self, _notification: &AlertNotification) -> Result<(), SinkError> {
                tokio::time::sleep(Duration::from_secs(3_600)).await;
                Ok(())
            }
        }

        let store = Arc::new(MemoryDeliveryStore::new());
        let policy = RetryPolicy::default()
            .with_max_attempts(2)
            .with_attempt_timeout(Duration::from_secs(5));
        let mut dispatcher = Dispatcher::new(store.clone()).with_policy(policy);
        dispatcher.register(TenantId::new("acme"), Arc::new(StuckSink));

        let alert = sample_alert("acme");
        for handle in dispatcher.dispatch(&alert) {
            assert_eq!(handle.await.unwrap(), DeliveryState::Failed);
        }
        let record = store.find(alert.id, "stuck").await.unwrap().unwrap();
        assert!(record.last_error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn sinks_are_tenant_scoped_with_globals() {
        let store = Arc::new(MemoryDeliveryStore::new());
        let mut dispatcher = Dispatcher::new(store);
        let acme_sink = Arc::new(FlakySink::failing("acme-webhook", 0));
        let audit_sink = Arc::new(FlakySink::failing("audit", 0));
        dispatcher.register(TenantId::new("acme"), acme_sink);
        dispatcher.register_global(audit_sink);

        assert_eq!(dispatcher.sinks_for(&TenantId::new("acme")).len(), 2);
        assert_eq!(dispatcher.sinks_for(&TenantId::new("globex")).len(), 1);

        let foreign = sample_alert("globex");
        let handles = dispatcher.dispatch(&foreign);
        assert_eq!(handles.len(), 1);
        for handle in handles {
            handle.await.unwrap();
        }
    }
}
