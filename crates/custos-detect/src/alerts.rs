//! Turning rule triggers into persisted alerts, with dedup suppression.
//!
//! The generator is what stands between a noisy rule and an alert storm:
//! repeated triggers for the same `(tenant, rule, dedup key)` inside the
//! cooldown fold into the existing alert as accumulated evidence instead of
//! creating siblings.

use std::sync::Arc;

use chrono::Duration;
use custos_core::AlertId;

use crate::alert::Alert;
use crate::engine::RuleTrigger;
use crate::error::DetectResult;
use crate::store::AlertStore;

/// Cooldown applied when neither the rule nor its window says otherwise.
pub const DEFAULT_COOLDOWN_SECS: u64 = 300;

/// Cap on accumulated event ids per alert, matching the engine's trigger cap.
pub const DEFAULT_MAX_ALERT_EVENTS: usize = 100;

/// What became of one trigger.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertOutcome {
    /// A new alert was opened.
    Created(Alert),
    /// The trigger was folded into an existing active alert.
    Suppressed {
        /// The alert that absorbed the trigger.
        alert_id: AlertId,
    },
}

/// Creates alerts from triggers, suppressing duplicates within a cooldown.
pub struct AlertGenerator {
    alerts: Arc<dyn AlertStore>,
    default_cooldown_secs: u64,
    max_alert_events: usize,
}

impl AlertGenerator {
    /// Create a generator with default cooldown and event cap.
    #[must_use]
    pub fn new(alerts: Arc<dyn AlertStore>) -> Self {
        Self {
            alerts,
            default_cooldown_secs: DEFAULT_COOLDOWN_SECS,
            max_alert_events: DEFAULT_MAX_ALERT_EVENTS,
        }
    }

    /// Override the fallback cooldown for rules without one of their own.
    #[must_use]
    pub fn with_default_cooldown_secs(mut self, secs: u64) -> Self {
        self.default_cooldown_secs = secs;
        self
    }

    /// Override the per-alert accumulated event id cap.
    #[must_use]
    pub fn with_max_alert_events(mut self, cap: usize) -> Self {
        self.max_alert_events = cap.max(1);
        self
    }

    /// Persist the trigger as a new `Open` alert, or fold it into the
    /// active alert for the same `(tenant, rule, dedup key)` when the
    /// previous trigger was within the cooldown.
    ///
    /// Cooldown precedence: the rule's explicit override, else the rule's
    /// window (both carried on the trigger), else this generator's default.
    /// An active alert older than the cooldown no longer absorbs; a fresh
    /// alert is opened beside it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::DetectError::Store`] when the alert store
    /// fails; the trigger is then neither persisted nor suppressed.
    pub async fn process(&self, trigger: &RuleTrigger) -> DetectResult<AlertOutcome> {
        let cooldown_secs = trigger.cooldown_secs.unwrap_or(self.default_cooldown_secs);
        let existing = self
            .alerts
            .find_active(&trigger.tenant_id, trigger.rule_id, &trigger.dedup_key)
            .await?;

        if let Some(mut alert) = existing
            && within_cooldown(&alert, trigger, cooldown_secs)
        {
            alert.absorb_trigger(&trigger.event_ids, trigger.at, self.max_alert_events);
            self.alerts.put_alert(&alert).await?;
            tracing::debug!(
                alert = %alert.id,
                rule = %trigger.rule_id,
                tenant = %trigger.tenant_id,
                triggers = alert.trigger_count,
                "trigger suppressed into existing alert"
            );
            return Ok(AlertOutcome::Suppressed { alert_id: alert.id });
        }

        let mut event_ids = trigger.event_ids.clone();
        if event_ids.len() > self.max_alert_events {
            let excess = event_ids.len().saturating_sub(self.max_alert_events);
            event_ids.drain(..excess);
        }
        let alert = Alert::new(
            trigger.tenant_id.clone(),
            trigger.rule_id,
            &trigger.rule_name,
            trigger.severity,
            &trigger.message,
            &trigger.dedup_key,
            event_ids,
            trigger.at,
        );
        self.alerts.put_alert(&alert).await?;
        tracing::info!(
            alert = %alert.id,
            rule = %trigger.rule_id,
            tenant = %trigger.tenant_id,
            severity = %trigger.severity,
            "alert created"
        );
        Ok(AlertOutcome::Created(alert))
    }
}

/// Whether the trigger lands inside the alert's cooldown. Triggers dated
/// before the last one (out-of-order delivery) always count as inside.
fn within_cooldown(alert: &Alert, trigger: &RuleTrigger, cooldown_secs: u64) -> bool {
    let elapsed = trigger.at.signed_duration_since(alert.last_triggered_at);
    if elapsed < Duration::zero() {
        return true;
    }
    u64::try_from(elapsed.num_seconds()).is_ok_and(|secs| secs <= cooldown_secs)
}

impl std::fmt::Debug for AlertGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertGenerator")
            .field("default_cooldown_secs", &self.default_cooldown_secs)
            .field("max_alert_events", &self.max_alert_events)
            .finish_non_exhaustive()
    }
}
