//! The sink boundary alerts are delivered through.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use custos_core::{AlertId, EventId, RuleId, Severity, TenantId};
use custos_detect::Alert;
use serde::{Deserialize, Serialize};

use crate::error::SinkError;

/// The payload handed to sinks, identical across retries of one alert.
///
/// Delivery is at-least-once, so the same notification can arrive more
/// than once; `idempotency_key` (the alert id) is what receivers
/// deduplicate on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertNotification {
    /// Stable dedup key for receivers: the alert id.
    pub idempotency_key: AlertId,
    /// Tenant the alert belongs to.
    pub tenant_id: TenantId,
    /// The rule that raised the alert.
    pub rule_id: RuleId,
    /// The rule's name at trigger time.
    pub rule_name: String,
    /// Alert severity.
    pub severity: Severity,
    /// Human-readable alert message.
    pub message: String,
    /// Events that contributed, oldest first.
    pub event_ids: Vec<EventId>,
    /// How many triggers the alert has absorbed.
    pub trigger_count: u32,
    /// When the alert was first raised.
    pub triggered_at: DateTime<Utc>,
    /// When the most recent trigger was folded in.
    pub last_triggered_at: DateTime<Utc>,
}

impl From<&Alert> for AlertNotification {
    fn from(alert: &Alert) -> Self {
        Self {
            idempotency_key: alert.id,
            tenant_id: alert.tenant_id.clone(),
            rule_id: alert.rule_id,
            rule_name: alert.rule_name.clone(),
            severity: alert.severity,
            message: alert.message.clone(),
            event_ids: alert.event_ids.clone(),
            trigger_count: alert.trigger_count,
            triggered_at: alert.triggered_at,
            last_triggered_at: alert.last_triggered_at,
        }
    }
}

/// An external delivery target for alert notifications.
///
/// Implementations must be safe to call concurrently and must tolerate
/// duplicate notifications carrying the same idempotency key.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Stable sink name, used in delivery records and logs.
    fn name(&self) -> &str;

    /// Deliver one notification.
    ///
    /// # Errors
    ///
    /// Returns a [`SinkError`] when the notification did not demonstrably
    /// reach the target; the dispatcher retries per its policy.
    async fn deliver(&self, notification: &AlertNotification) -> Result<(), SinkError>;
}

/// Sink that writes each notification to the log.
///
/// Useful as a default channel and in development; delivery never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    /// Create the sink.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AlertSink for TracingSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, notification: &AlertNotification) -> Result<(), SinkError> {
        tracing::info!(
            alert = %notification.idempotency_key,
            tenant = %notification.tenant_id,
            rule = %notification.rule_name,
            severity = %notification.severity,
            events = notification.event_ids.len(),
            triggers = notification.trigger_count,
            "{}",
            notification.message
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_mirrors_the_alert() {
        let alert = Alert::new(
            TenantId::new("acme"),
            RuleId::new(),
            "failed login burst",
            Severity::High,
            "rule 'failed login burst' triggered: 3 matching events",
            "u1",
            vec![EventId::new(), EventId::new()],
            Utc::now(),
        );
        let notification = AlertNotification::from(&alert);
        assert_eq!(notification.idempotency_key, alert.id);
        assert_eq!(notification.event_ids, alert.event_ids);
        assert_eq!(notification.message, alert.message);
        assert_eq!(notification.trigger_count, 1);
    }

    #[tokio::test]
    async fn tracing_sink_always_acks() {
        let alert = Alert::new(
            TenantId::new("acme"),
            RuleId::new(),
            "r",
            Severity::Low,
            "rule 'r' triggered: test",
            "u1",
            vec![EventId::new()],
            Utc::now(),
        );
        let sink = TracingSink::new();
        assert_eq!(sink.name(), "log");
        assert!(sink.deliver(&AlertNotification::from(&alert)).await.is_ok());
    }
}
