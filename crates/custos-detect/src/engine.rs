//! Rule evaluation over newly committed events.
//!
//! The engine is stateless between events: windowed rules re-fetch whatever
//! past they need through [`EventHistory`] on every evaluation, which keeps
//! restarts and concurrent workers trivially correct at the cost of some
//! repeated queries. One failing rule never affects its siblings, and no
//! error from here ever reaches the ingestion caller.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use custos_core::{Event, EventId, RuleId, Severity, TenantId};

use crate::error::{DetectError, DetectResult};
use crate::history::{EventHistory, HistoryQuery};
use crate::matcher;
use crate::rule::{Rule, RuleKind, ThresholdScope};

/// How long a history query may run before the rule is skipped.
pub const DEFAULT_HISTORY_TIMEOUT: Duration = Duration::from_secs(2);

/// Cap on how many event ids a single trigger carries.
pub const DEFAULT_MAX_TRIGGER_EVENTS: usize = 100;

/// A rule match, ready for the alert generator.
///
/// Carries everything the generator needs so it never has to re-read the
/// rule: identity, severity, the dedup key, the contributing event ids
/// (oldest first, current event last) and the rule-level cooldown.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTrigger {
    /// The rule that matched.
    pub rule_id: RuleId,
    /// The rule's name, denormalized into the alert.
    pub rule_name: String,
    /// Tenant the rule and event belong to.
    pub tenant_id: TenantId,
    /// Severity the resulting alert inherits.
    pub severity: Severity,
    /// Key repeated triggers collapse on: the actor id, or the resource id
    /// for resource-scoped threshold rules.
    pub dedup_key: String,
    /// Events that produced the match, oldest first, capped.
    pub event_ids: Vec<EventId>,
    /// Full alert message, `rule '<name>' triggered: <detail>`.
    pub message: String,
    /// The triggering event's timestamp; anchors dedup cooldown math.
    pub at: DateTime<Utc>,
    /// Rule-level cooldown: the explicit override if set, else the rule's
    /// window. `None` means the generator's default applies.
    pub cooldown_secs: Option<u64>,
}

/// Evaluates a tenant's rules against one committed event at a time.
pub struct RuleEngine {
    history: Arc<dyn EventHistory>,
    history_timeout: Duration,
    max_trigger_events: usize,
}

impl RuleEngine {
    /// Create an engine with default timeout and trigger cap.
    #[must_use]
    pub fn new(history: Arc<dyn EventHistory>) -> Self {
        Self {
            history,
            history_timeout: DEFAULT_HISTORY_TIMEOUT,
            max_trigger_events: DEFAULT_MAX_TRIGGER_EVENTS,
        }
    }

    /// Override how long history queries may take.
    #[must_use]
    pub fn with_history_timeout(mut self, timeout: Duration) -> Self {
        self.history_timeout = timeout;
        self
    }

    /// Override the per-trigger event id cap.
    #[must_use]
    pub fn with_max_trigger_events(mut self, cap: usize) -> Self {
        self.max_trigger_events = cap.max(1);
        self
    }

    /// Evaluate `rules` against a committed event.
    ///
    /// Disabled rules and rules belonging to other tenants are skipped.
    /// A rule whose evaluation fails (bad condition, history error or
    /// timeout) is logged and skipped; the remaining rules still run, so
    /// this never returns an error.
    pub async fn evaluate(&self, event: &Event, rules: &[Rule]) -> Vec<RuleTrigger> {
        let mut triggers = Vec::new();
        for rule in rules {
            if !rule.enabled || rule.tenant_id != *event.tenant_id() {
                continue;
            }
            match self.evaluate_rule(rule, event).await {
                Ok(Some(trigger)) => {
                    tracing::debug!(
                        rule = %rule.id,
                        tenant = %rule.tenant_id,
                        event = %event.id,
                        "rule triggered"
                    );
                    triggers.push(trigger);
                },
                Ok(None) => {},
                Err(e) => {
                    tracing::warn!(
                        rule = %rule.id,
                        tenant = %rule.tenant_id,
                        event = %event.id,
                        error = %e,
                        "rule evaluation failed, skipping rule"
                    );
                },
            }
        }
        triggers
    }

    async fn evaluate_rule(&self, rule: &Rule, event: &Event) -> DetectResult<Option<RuleTrigger>> {
        match &rule.kind {
            RuleKind::SimpleMatch { where_ } => {
                if matcher::evaluate(where_, event)? {
                    let detail = format!(
                        "action '{}' by actor '{}'",
                        event.action.kind, event.actor.id
                    );
                    Ok(Some(self.trigger_for(rule, event, vec![event.id], &detail)))
                } else {
                    Ok(None)
                }
            },
            RuleKind::Threshold {
                where_,
                scope,
                count,
                window_secs,
            } => {
                self.evaluate_threshold(rule, event, where_, *scope, *count, *window_secs)
                    .await
            },
            RuleKind::Pattern {
                sequence,
                window_secs,
            } => self.evaluate_pattern(rule, event, sequence, *window_secs).await,
        }
    }

    async fn evaluate_threshold(
        &self,
        rule: &Rule,
        event: &Event,
        where_: &crate::condition::Condition,
        scope: ThresholdScope,
        count: u32,
        window_secs: u64,
    ) -> DetectResult<Option<RuleTrigger>> {
        // The current event is the one that can push the count over the
        // line; if it does not match, an earlier event already had its turn.
        if !matcher::evaluate(where_, event)? {
            return Ok(None);
        }

        let query = match scope {
            ThresholdScope::Actor => {
                HistoryQuery::window(window_secs, event.timestamp).for_actor(&event.actor.id)
            },
            ThresholdScope::Resource => {
                HistoryQuery::window(window_secs, event.timestamp).for_resource(&event.resource.id)
            },
        };
        let history = self.fetch_history(event.tenant_id(), &query).await?;

        let mut matched: Vec<EventId> = Vec::new();
        for past in &history {
            // History may already contain the current event; count it once.
            if past.id == event.id {
                continue;
            }
            if matcher::evaluate(where_, past)? {
                matched.push(past.id);
            }
        }
        matched.push(event.id);

        if matched.len() < count as usize {
            return Ok(None);
        }
        let detail = format!(
            "{} matching events within {window_secs}s (threshold {count})",
            matched.len()
        );
        if matched.len() > self.max_trigger_events {
            let excess = matched.len().saturating_sub(self.max_trigger_events);
            matched.drain(..excess);
        }
        Ok(Some(self.trigger_for(rule, event, matched, &detail)))
    }

    async fn evaluate_pattern(
        &self,
        rule: &Rule,
        event: &Event,
        sequence: &[String],
        window_secs: u64,
    ) -> DetectResult<Option<RuleTrigger>> {
        // The current event must complete the sequence.
        let Some(last_step) = sequence.last() else {
            return Ok(None);
        };
        if event.action.kind != *last_step {
            return Ok(None);
        }

        let query =
            HistoryQuery::window(window_secs, event.timestamp).for_actor(&event.actor.id);
        let history = self.fetch_history(event.tenant_id(), &query).await?;

        // Greedy in-order scan: each earlier step must appear, in order but
        // not necessarily adjacent, before the current event.
        let prefix = &sequence[..sequence.len().saturating_sub(1)];
        let mut remaining = prefix.iter();
        let mut want = remaining.next();
        let mut matched: Vec<EventId> = Vec::with_capacity(sequence.len());
        for past in &history {
            let Some(step) = want else { break };
            if past.id == event.id {
                continue;
            }
            if past.action.kind == *step {
                matched.push(past.id);
                want = remaining.next();
            }
        }
        if want.is_some() {
            return Ok(None);
        }
        matched.push(event.id);
        let detail = format!(
            "actor '{}' completed sequence [{}] within {window_secs}s",
            event.actor.id,
            sequence.join(" -> ")
        );
        Ok(Some(self.trigger_for(rule, event, matched, &detail)))
    }

    async fn fetch_history(
        &self,
        tenant: &TenantId,
        query: &HistoryQuery,
    ) -> DetectResult<Vec<Event>> {
        let timeout_ms = u64::try_from(self.history_timeout.as_millis()).unwrap_or(u64::MAX);
        tokio::time::timeout(self.history_timeout, self.history.recent(tenant, query))
            .await
            .map_err(|_| DetectError::HistoryTimeout { timeout_ms })?
    }

    fn trigger_for(
        &self,
        rule: &Rule,
        event: &Event,
        event_ids: Vec<EventId>,
        detail: &str,
    ) -> RuleTrigger {
        let dedup_key = match &rule.kind {
            RuleKind::Threshold {
                scope: ThresholdScope::Resource,
                ..
            } => event.resource.id.clone(),
            _ => event.actor.id.clone(),
        };
        RuleTrigger {
            rule_id: rule.id,
            rule_name: rule.name.clone(),
            tenant_id: rule.tenant_id.clone(),
            severity: rule.severity,
            dedup_key,
            event_ids,
            message: format!("rule '{}' triggered: {detail}", rule.name),
            at: event.timestamp,
            cooldown_secs: rule.cooldown_secs.or_else(|| rule.window_secs()),
        }
    }
}

impl std::fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEngine")
            .field("history_timeout", &self.history_timeout)
            .field("max_trigger_events", &self.max_trigger_events)
            .finish_non_exhaustive()
    }
}
