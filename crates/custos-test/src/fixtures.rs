//! Fixtures for common Custos types.
//!
//! Every draft returned here passes validation, and every rule passes
//! [`Rule::validate`]; tests mutate them to manufacture the invalid
//! cases they need.

use chrono::{DateTime, Duration, Utc};
use custos_core::{
    Action, Actor, ActorType, EventDraft, EventId, EventMetadata, Resource, ResourceType, RuleId,
    Severity, TenantId,
};
use custos_detect::{Alert, Condition, EventField, MatchOp, Rule, RuleKind, ThresholdScope};
use custos_notify::AlertNotification;

/// The tenant most fixtures default to.
#[must_use]
pub fn test_tenant() -> TenantId {
    TenantId::new("acme")
}

/// A valid draft for a successful login by `user`.
#[must_use]
pub fn login_draft(tenant: &TenantId, user: &str) -> EventDraft {
    draft_for(tenant, user, "auth.login")
}

/// A valid draft for a failed login by `user`.
#[must_use]
pub fn failed_login_draft(tenant: &TenantId, user: &str) -> EventDraft {
    draft_for(tenant, user, "auth.login.failed")
}

/// A valid draft with an arbitrary action kind.
///
/// The action category is the first dotted segment of the kind, so
/// `"data.export"` lands in category `"data"`.
#[must_use]
pub fn draft_for(tenant: &TenantId, user: &str, action_kind: &str) -> EventDraft {
    let category = action_kind.split('.').next().unwrap_or("other").to_string();
    EventDraft::new(
        Actor::new(user, ActorType::User).with_ip("203.0.113.7"),
        Action::new(action_kind).with_category(category),
        Resource::new("portal", ResourceType::Api),
        EventMetadata::new("test-suite", tenant.clone()),
    )
}

/// A timestamp `offset_secs` away from `base`, for pinning event times
/// in sliding-window tests.
#[must_use]
pub fn at_offset(base: DateTime<Utc>, offset_secs: i64) -> DateTime<Utc> {
    base.checked_add_signed(Duration::seconds(offset_secs))
        .expect("offset stays within the representable time range")
}

/// An enabled simple-match rule firing on one action kind.
#[must_use]
pub fn match_rule(tenant: &TenantId, name: &str, action_kind: &str) -> Rule {
    Rule::new(
        tenant.clone(),
        name,
        Severity::Medium,
        RuleKind::SimpleMatch {
            where_: kind_equals(action_kind),
        },
    )
}

/// An enabled per-actor threshold rule on one action kind.
#[must_use]
pub fn threshold_rule(
    tenant: &TenantId,
    name: &str,
    action_kind: &str,
    count: u32,
    window_secs: u64,
) -> Rule {
    Rule::new(
        tenant.clone(),
        name,
        Severity::High,
        RuleKind::Threshold {
            where_: kind_equals(action_kind),
            scope: ThresholdScope::Actor,
            count,
            window_secs,
        },
    )
}

/// An enabled pattern rule over an ordered list of action kinds.
#[must_use]
pub fn pattern_rule(tenant: &TenantId, name: &str, sequence: &[&str], window_secs: u64) -> Rule {
    Rule::new(
        tenant.clone(),
        name,
        Severity::Critical,
        RuleKind::Pattern {
            sequence: sequence.iter().map(|step| (*step).to_string()).collect(),
            window_secs,
        },
    )
}

/// A ready-made open alert for exercising dispatch and delivery.
#[must_use]
pub fn test_alert(tenant: &TenantId) -> Alert {
    Alert::new(
        tenant.clone(),
        RuleId::new(),
        "failed login burst",
        Severity::High,
        "rule 'failed login burst' triggered: 3 matching events",
        "u1",
        vec![EventId::new(), EventId::new(), EventId::new()],
        Utc::now(),
    )
}

/// A ready-made notification for exercising sinks directly.
#[must_use]
pub fn test_notification(tenant: &TenantId) -> AlertNotification {
    AlertNotification::from(&test_alert(tenant))
}

fn kind_equals(action_kind: &str) -> Condition {
    Condition::field(EventField::ActionKind, MatchOp::Equals(action_kind.into()))
}
