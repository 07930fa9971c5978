//! Persistence boundaries for rules and alerts.
//!
//! The detection core only ever reads rules and creates/updates alerts;
//! administration of rules and operator workflows live outside. Callers can
//! bring their own backends; the in-memory implementations here serve tests
//! and single-process deployments.

use async_trait::async_trait;
use custos_core::{AlertId, RuleId, TenantId};
use dashmap::DashMap;

use crate::alert::Alert;
use crate::error::DetectResult;
use crate::rule::Rule;

/// Read/write access to rule definitions.
///
/// The engine only calls [`RuleStore::enabled_rules`]; the write side exists
/// for the administrative surface that owns rule lifecycles.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Insert or replace a rule.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::DetectError::InvalidRule`] when the rule
    /// fails [`Rule::validate`], or [`crate::error::DetectError::Store`]
    /// on backend failure.
    async fn put_rule(&self, rule: &Rule) -> DetectResult<()>;

    /// Fetch one rule.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::DetectError::Store`] on backend failure.
    async fn rule_by_id(&self, id: RuleId) -> DetectResult<Option<Rule>>;

    /// All of a tenant's rules, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::DetectError::Store`] on backend failure.
    async fn rules_for_tenant(&self, tenant: &TenantId) -> DetectResult<Vec<Rule>>;

    /// The tenant's enabled rules, ordered by name; what the detection
    /// worker evaluates.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::DetectError::Store`] on backend failure.
    async fn enabled_rules(&self, tenant: &TenantId) -> DetectResult<Vec<Rule>>;

    /// Remove a rule; returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::DetectError::Store`] on backend failure.
    async fn delete_rule(&self, id: RuleId) -> DetectResult<bool>;
}

/// Read/write access to alert records.
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Insert or replace an alert.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::DetectError::Store`] on backend failure.
    async fn put_alert(&self, alert: &Alert) -> DetectResult<()>;

    /// Fetch one alert.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::DetectError::Store`] on backend failure.
    async fn alert_by_id(&self, id: AlertId) -> DetectResult<Option<Alert>>;

    /// The most recently triggered non-terminal alert for
    /// `(tenant, rule, dedup_key)`, if any. This is the dedup lookup.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::DetectError::Store`] on backend failure.
    async fn find_active(
        &self,
        tenant: &TenantId,
        rule_id: RuleId,
        dedup_key: &str,
    ) -> DetectResult<Option<Alert>>;

    /// A tenant's alerts, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::DetectError::Store`] on backend failure.
    async fn alerts_for_tenant(&self, tenant: &TenantId) -> DetectResult<Vec<Alert>>;
}

/// In-memory [`RuleStore`] on a concurrent map.
#[derive(Debug, Default)]
pub struct MemoryRuleStore {
    rules: DashMap<RuleId, Rule>,
}

impl MemoryRuleStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RuleStore for MemoryRuleStore {
    async fn put_rule(&self, rule: &Rule) -> DetectResult<()> {
        rule.validate()?;
        self.rules.insert(rule.id, rule.clone());
        Ok(())
    }

    async fn rule_by_id(&self, id: RuleId) -> DetectResult<Option<Rule>> {
        Ok(self.rules.get(&id).map(|entry| entry.value().clone()))
    }

    async fn rules_for_tenant(&self, tenant: &TenantId) -> DetectResult<Vec<Rule>> {
        let mut rules: Vec<Rule> = self
            .rules
            .iter()
            .filter(|entry| entry.value().tenant_id == *tenant)
            .map(|entry| entry.value().clone())
            .collect();
        rules.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rules)
    }

    async fn enabled_rules(&self, tenant: &TenantId) -> DetectResult<Vec<Rule>> {
        let mut rules = self.rules_for_tenant(tenant).await?;
        rules.retain(|rule| rule.enabled);
        Ok(rules)
    }

    async fn delete_rule(&self, id: RuleId) -> DetectResult<bool> {
        Ok(self.rules.remove(&id).is_some())
    }
}

/// In-memory [`AlertStore`] on a concurrent map.
#[derive(Debug, Default)]
pub struct MemoryAlertStore {
    alerts: DashMap<AlertId, Alert>,
}

impl MemoryAlertStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    async fn put_alert(&self, alert: &Alert) -> DetectResult<()> {
        self.alerts.insert(alert.id, alert.clone());
        Ok(())
    }

    async fn alert_by_id(&self, id: AlertId) -> DetectResult<Option<Alert>> {
        Ok(self.alerts.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_active(
        &self,
        tenant: &TenantId,
        rule_id: RuleId,
        dedup_key: &str,
    ) -> DetectResult<Option<Alert>> {
        Ok(self
            .alerts
            .iter()
            .filter(|entry| {
                let alert = entry.value();
                alert.tenant_id == *tenant
                    && alert.rule_id == rule_id
                    && alert.dedup_key == dedup_key
                    && alert.status.is_active()
            })
            .map(|entry| entry.value().clone())
            .max_by_key(|alert| alert.last_triggered_at))
    }

    async fn alerts_for_tenant(&self, tenant: &TenantId) -> DetectResult<Vec<Alert>> {
        let mut alerts: Vec<Alert> = self
            .alerts
            .iter()
            .filter(|entry| entry.value().tenant_id == *tenant)
            .map(|entry| entry.value().clone())
            .collect();
        alerts.sort_by(|a, b| b.triggered_at.cmp(&a.triggered_at));
        Ok(alerts)
    }
}
