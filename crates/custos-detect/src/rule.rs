//! Detection rule definitions.

use chrono::{DateTime, Utc};
use custos_core::{RuleId, Severity, TenantId};
use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::error::{DetectError, DetectResult};

/// A tenant-scoped detection rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Unique rule identifier.
    pub id: RuleId,
    /// The tenant whose events this rule watches.
    pub tenant_id: TenantId,
    /// Short human-readable name; appears in alert messages.
    pub name: String,
    /// Longer description for operators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Severity stamped onto alerts this rule raises.
    pub severity: Severity,
    /// Disabled rules are skipped during evaluation.
    pub enabled: bool,
    /// What the rule actually detects.
    pub kind: RuleKind,
    /// Explicit alert cooldown override, in seconds.
    ///
    /// When unset, threshold and pattern rules fall back to their window
    /// and simple matches to the engine-wide default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_secs: Option<u64>,
    /// When the rule was created.
    pub created_at: DateTime<Utc>,
    /// When the rule definition last changed.
    pub updated_at: DateTime<Utc>,
}

/// The detection behaviors a rule can have.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleKind {
    /// Fire on every single event satisfying the condition.
    SimpleMatch {
        /// The condition each event is tested against.
        #[serde(rename = "where")]
        where_: Condition,
    },
    /// Fire when enough matching events pile up inside a sliding window.
    Threshold {
        /// The condition selecting which events count.
        #[serde(rename = "where")]
        where_: Condition,
        /// Whether occurrences are counted per actor or per resource.
        scope: ThresholdScope,
        /// How many matching events (including the current one) trigger.
        count: u32,
        /// Window length in seconds, ending at the current event.
        window_secs: u64,
    },
    /// Fire when one actor performs a sequence of action kinds, in order
    /// but not necessarily back-to-back, inside a sliding window.
    Pattern {
        /// The ordered action kinds to look for.
        sequence: Vec<String>,
        /// Window length in seconds, ending at the current event.
        window_secs: u64,
    },
}

/// What a threshold rule counts occurrences per.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdScope {
    /// Count events per actor id; the alert dedup key is the actor.
    Actor,
    /// Count events per resource id; the alert dedup key is the resource.
    Resource,
}

impl Rule {
    /// Create an enabled rule with fresh id and timestamps.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        name: impl Into<String>,
        severity: Severity,
        kind: RuleKind,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: RuleId::new(),
            tenant_id,
            name: name.into(),
            description: None,
            severity,
            enabled: true,
            kind,
            cooldown_secs: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Override the alert cooldown.
    #[must_use]
    pub fn with_cooldown_secs(mut self, secs: u64) -> Self {
        self.cooldown_secs = Some(secs);
        self
    }

    /// Create the rule disabled.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// The rule's sliding window, for the kinds that have one.
    #[must_use]
    pub fn window_secs(&self) -> Option<u64> {
        match &self.kind {
            RuleKind::SimpleMatch { .. } => None,
            RuleKind::Threshold { window_secs, .. } | RuleKind::Pattern { window_secs, .. } => {
                Some(*window_secs)
            },
        }
    }

    /// Check the rule definition for problems that would make every
    /// evaluation fail.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::InvalidRule`] naming the first problem found:
    /// an empty name, a zero threshold count or window, an empty or
    /// trivial pattern sequence, or an uncompilable regex.
    pub fn validate(&self) -> DetectResult<()> {
        if self.name.trim().is_empty() {
            return Err(DetectError::InvalidRule("name must not be empty".into()));
        }
        match &self.kind {
            RuleKind::SimpleMatch { where_ } => validate_condition(where_)?,
            RuleKind::Threshold {
                where_,
                count,
                window_secs,
                ..
            } => {
                if *count == 0 {
                    return Err(DetectError::InvalidRule(
                        "threshold count must be at least 1".into(),
                    ));
                }
                if *window_secs == 0 {
                    return Err(DetectError::InvalidRule(
                        "threshold window must be positive".into(),
                    ));
                }
                validate_condition(where_)?;
            },
            RuleKind::Pattern {
                sequence,
                window_secs,
            } => {
                if sequence.len() < 2 {
                    return Err(DetectError::InvalidRule(
                        "pattern sequence needs at least two steps".into(),
                    ));
                }
                if sequence.iter().any(|step| step.trim().is_empty()) {
                    return Err(DetectError::InvalidRule(
                        "pattern steps must not be empty".into(),
                    ));
                }
                if *window_secs == 0 {
                    return Err(DetectError::InvalidRule(
                        "pattern window must be positive".into(),
                    ));
                }
            },
        }
        Ok(())
    }
}

/// Walk a condition tree and compile every regex once, to reject bad
/// patterns at definition time instead of on the hot path.
fn validate_condition(condition: &Condition) -> DetectResult<()> {
    use crate::condition::MatchOp;

    match condition {
        Condition::All { all: children } | Condition::Any { any: children } => {
            for child in children {
                validate_condition(child)?;
            }
            Ok(())
        },
        Condition::Predicate(predicate) => {
            if let MatchOp::Matches(pattern) = &predicate.op {
                regex::Regex::new(pattern)?;
            }
            Ok(())
        },
    }
}

#[cfg(test)]
mod tests {
    use crate::condition::{EventField, MatchOp};

    use super::*;

    fn failed_login_condition() -> Condition {
        Condition::field(
            EventField::ActionKind,
            MatchOp::Equals("auth.login.failed".into()),
        )
    }

    #[test]
    fn kinds_serialize_with_a_type_tag() {
        let rule = Rule::new(
            TenantId::new("acme"),
            "burst of failed logins",
            Severity::High,
            RuleKind::Threshold {
                where_: failed_login_condition(),
                scope: ThresholdScope::Actor,
                count: 5,
                window_secs: 60,
            },
        );
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["kind"]["type"], "threshold");
        assert_eq!(json["kind"]["scope"], "actor");
        assert_eq!(json["kind"]["where"]["op"], "equals");

        let back: Rule = serde_json::from_value(json).unwrap();
        assert_eq!(back, rule);
    }

    #[test]
    fn window_is_kind_dependent() {
        let simple = Rule::new(
            TenantId::new("acme"),
            "any failed login",
            Severity::Low,
            RuleKind::SimpleMatch {
                where_: failed_login_condition(),
            },
        );
        assert_eq!(simple.window_secs(), None);

        let pattern = Rule::new(
            TenantId::new("acme"),
            "recon then exfil",
            Severity::Critical,
            RuleKind::Pattern {
                sequence: vec!["data.read".into(), "data.delete".into()],
                window_secs: 900,
            },
        );
        assert_eq!(pattern.window_secs(), Some(900));
    }

    #[test]
    fn validation_rejects_degenerate_rules() {
        let zero_count = Rule::new(
            TenantId::new("acme"),
            "r",
            Severity::Low,
            RuleKind::Threshold {
                where_: failed_login_condition(),
                scope: ThresholdScope::Actor,
                count: 0,
                window_secs: 60,
            },
        );
        assert!(zero_count.validate().is_err());

        let short_sequence = Rule::new(
            TenantId::new("acme"),
            "r",
            Severity::Low,
            RuleKind::Pattern {
                sequence: vec!["data.read".into()],
                window_secs: 60,
            },
        );
        assert!(short_sequence.validate().is_err());

        let bad_regex = Rule::new(
            TenantId::new("acme"),
            "r",
            Severity::Low,
            RuleKind::SimpleMatch {
                where_: Condition::field(EventField::ActorIp, MatchOp::Matches("[".into())),
            },
        );
        assert!(bad_regex.validate().is_err());
    }

    #[test]
    fn validation_accepts_reasonable_rules() {
        let rule = Rule::new(
            TenantId::new("acme"),
            "failed login burst",
            Severity::High,
            RuleKind::Threshold {
                where_: failed_login_condition(),
                scope: ThresholdScope::Resource,
                count: 3,
                window_secs: 300,
            },
        )
        .with_description("several failed logins against one resource")
        .with_cooldown_secs(600);
        assert!(rule.validate().is_ok());
        assert_eq!(rule.cooldown_secs, Some(600));
    }
}
