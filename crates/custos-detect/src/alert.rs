//! Alerts raised by rule matches, and their status lifecycle.

use chrono::{DateTime, Utc};
use custos_core::{AlertId, EventId, RuleId, Severity, TenantId};
use serde::{Deserialize, Serialize};

use crate::error::{DetectError, DetectResult};

/// Where an alert sits in the operator workflow.
///
/// Transitions only move forward: `Open → Acknowledged → Resolved`, with
/// `Dismissed` reachable from either non-terminal state as the
/// false-positive exit. Terminal states never change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    /// Raised and awaiting triage.
    Open,
    /// An operator has seen it and is working it.
    Acknowledged,
    /// Handled; terminal.
    Resolved,
    /// Judged a false positive; terminal.
    Dismissed,
}

impl AlertStatus {
    /// Whether the status can never change again.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Dismissed)
    }

    /// Whether the alert still participates in deduplication.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Whether moving to `next` is a legal forward transition.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Open, Self::Acknowledged | Self::Resolved | Self::Dismissed)
                | (Self::Acknowledged, Self::Resolved | Self::Dismissed)
        )
    }

    /// Stable lowercase label, matching the serde encoding.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Acknowledged => "acknowledged",
            Self::Resolved => "resolved",
            Self::Dismissed => "dismissed",
        }
    }
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted alert record.
///
/// Created only by the alert generator; afterwards mutated by dedup
/// accumulation ([`Alert::absorb_trigger`]) and by the operator
/// transition methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Unique alert identifier; doubles as the notification idempotency key.
    pub id: AlertId,
    /// The tenant this alert belongs to.
    pub tenant_id: TenantId,
    /// The rule that raised it.
    pub rule_id: RuleId,
    /// The rule's name at trigger time, denormalized for display.
    pub rule_name: String,
    /// Severity inherited from the rule.
    pub severity: Severity,
    /// Current workflow status.
    pub status: AlertStatus,
    /// Human-readable summary of what triggered.
    pub message: String,
    /// The key repeated triggers of the same rule collapse on.
    pub dedup_key: String,
    /// Events that contributed to this alert, oldest first, capped.
    pub event_ids: Vec<EventId>,
    /// How many triggers this alert has absorbed, including the first.
    pub trigger_count: u32,
    /// When the alert was first raised.
    pub triggered_at: DateTime<Utc>,
    /// When the most recent trigger was folded in.
    pub last_triggered_at: DateTime<Utc>,
    /// When and by whom the alert was acknowledged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
    /// Operator who acknowledged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_by: Option<String>,
    /// When the alert was resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    /// Operator who resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    /// Free-text resolution note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    /// When the alert was dismissed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dismissed_at: Option<DateTime<Utc>>,
    /// Operator who dismissed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dismissed_by: Option<String>,
    /// Why the alert was judged a false positive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dismiss_reason: Option<String>,
}

impl Alert {
    /// Create a fresh `Open` alert for a first trigger.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tenant_id: TenantId,
        rule_id: RuleId,
        rule_name: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        dedup_key: impl Into<String>,
        event_ids: Vec<EventId>,
        triggered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AlertId::new(),
            tenant_id,
            rule_id,
            rule_name: rule_name.into(),
            severity,
            status: AlertStatus::Open,
            message: message.into(),
            dedup_key: dedup_key.into(),
            event_ids,
            trigger_count: 1,
            triggered_at,
            last_triggered_at: triggered_at,
            acknowledged_at: None,
            acknowledged_by: None,
            resolved_at: None,
            resolved_by: None,
            resolution: None,
            dismissed_at: None,
            dismissed_by: None,
            dismiss_reason: None,
        }
    }

    /// Fold a suppressed trigger into this alert: append unseen event ids
    /// (dropping the oldest once `cap` is exceeded), bump the trigger count
    /// and advance `last_triggered_at`.
    pub fn absorb_trigger(&mut self, event_ids: &[EventId], at: DateTime<Utc>, cap: usize) {
        for id in event_ids {
            if !self.event_ids.contains(id) {
                self.event_ids.push(*id);
            }
        }
        if self.event_ids.len() > cap {
            let excess = self.event_ids.len().saturating_sub(cap);
            self.event_ids.drain(..excess);
        }
        self.trigger_count = self.trigger_count.saturating_add(1);
        if at > self.last_triggered_at {
            self.last_triggered_at = at;
        }
    }

    /// Mark the alert acknowledged by an operator.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::InvalidTransition`] unless the alert is `Open`.
    pub fn acknowledge(&mut self, by: impl Into<String>) -> DetectResult<()> {
        self.transition(AlertStatus::Acknowledged)?;
        self.acknowledged_at = Some(Utc::now());
        self.acknowledged_by = Some(by.into());
        Ok(())
    }

    /// Mark the alert resolved.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::InvalidTransition`] if the alert is already
    /// terminal.
    pub fn resolve(&mut self, by: impl Into<String>, resolution: Option<String>) -> DetectResult<()> {
        self.transition(AlertStatus::Resolved)?;
        self.resolved_at = Some(Utc::now());
        self.resolved_by = Some(by.into());
        self.resolution = resolution;
        Ok(())
    }

    /// Dismiss the alert as a false positive.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::InvalidTransition`] if the alert is already
    /// terminal.
    pub fn dismiss(&mut self, by: impl Into<String>, reason: Option<String>) -> DetectResult<()> {
        self.transition(AlertStatus::Dismissed)?;
        self.dismissed_at = Some(Utc::now());
        self.dismissed_by = Some(by.into());
        self.dismiss_reason = reason;
        Ok(())
    }

    fn transition(&mut self, next: AlertStatus) -> DetectResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(DetectError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}
