//! The rule condition model.
//!
//! Conditions are a small boolean tree over event fields: `all` / `any`
//! combinators around leaf predicates. They are pure data — evaluation
//! lives in [`matcher`](crate::matcher) — so rules serialize cleanly and
//! round-trip through storage and APIs.
//!
//! ```json
//! {
//!   "all": [
//!     { "field": "action_kind", "op": "equals", "value": "auth.login.failed" },
//!     { "field": "actor_type", "op": "not_equals", "value": "service" }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

/// A boolean expression over one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    /// True when every child is true. An empty list is vacuously true.
    All {
        /// The conjoined children.
        all: Vec<Condition>,
    },
    /// True when at least one child is true. An empty list is false.
    Any {
        /// The disjoined children.
        any: Vec<Condition>,
    },
    /// A single field test.
    Predicate(Predicate),
}

impl Condition {
    /// A condition requiring every child to hold.
    #[must_use]
    pub fn all(children: Vec<Condition>) -> Self {
        Self::All { all: children }
    }

    /// A condition requiring at least one child to hold.
    #[must_use]
    pub fn any(children: Vec<Condition>) -> Self {
        Self::Any { any: children }
    }

    /// A single field test.
    #[must_use]
    pub fn field(field: EventField, op: MatchOp) -> Self {
        Self::Predicate(Predicate { field, op })
    }
}

/// One field test: the field to read and the operator to apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    /// Which event field to read.
    pub field: EventField,
    /// The operator and its argument.
    #[serde(flatten)]
    pub op: MatchOp,
}

/// The event fields a predicate can read.
///
/// `Tag` is multi-valued: a predicate on it holds if any tag satisfies
/// the operator. Every other field yields at most one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventField {
    /// `action.kind`.
    ActionKind,
    /// `action.category`.
    ActionCategory,
    /// `actor.id`.
    ActorId,
    /// `actor.kind` as its wire name (`user`, `system`, `service`).
    ActorType,
    /// `actor.name`.
    ActorName,
    /// `actor.ip`.
    ActorIp,
    /// `resource.id`.
    ResourceId,
    /// `resource.kind` as its wire name.
    ResourceType,
    /// `resource.name`.
    ResourceName,
    /// `metadata.source`.
    Source,
    /// `metadata.correlation_id`.
    CorrelationId,
    /// `metadata.session_id`.
    SessionId,
    /// Any of `metadata.tags`.
    Tag,
}

/// The comparison operators.
///
/// String-valued operators compare case-sensitively. On a missing field,
/// the negative operators (`NotEquals`, `NotIn`, `NotExists`) hold and
/// everything else fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum MatchOp {
    /// The field equals the given string.
    Equals(String),
    /// The field is absent or differs from the given string.
    NotEquals(String),
    /// The field contains the given substring.
    Contains(String),
    /// The field starts with the given prefix.
    StartsWith(String),
    /// The field ends with the given suffix.
    EndsWith(String),
    /// The field matches the given regular expression.
    Matches(String),
    /// The field equals one of the given strings.
    In(Vec<String>),
    /// The field is absent or equals none of the given strings.
    NotIn(Vec<String>),
    /// The field is present (and non-empty).
    Exists,
    /// The field is absent (or empty).
    NotExists,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicate_serializes_flat() {
        let condition = Condition::field(
            EventField::ActionKind,
            MatchOp::Equals("auth.login.failed".into()),
        );
        let json = serde_json::to_value(&condition).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "field": "action_kind",
                "op": "equals",
                "value": "auth.login.failed"
            })
        );
    }

    #[test]
    fn combinators_round_trip() {
        let condition = Condition::all(vec![
            Condition::field(EventField::Source, MatchOp::Equals("auth-service".into())),
            Condition::any(vec![
                Condition::field(EventField::Tag, MatchOp::Contains("suspicious".into())),
                Condition::field(EventField::ActorIp, MatchOp::StartsWith("10.".into())),
            ]),
        ]);
        let json = serde_json::to_string(&condition).unwrap();
        let back: Condition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, condition);
    }

    #[test]
    fn bare_operators_need_no_value() {
        let condition = Condition::field(EventField::SessionId, MatchOp::Exists);
        let json = serde_json::to_value(&condition).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "field": "session_id", "op": "exists" })
        );
        let back: Condition = serde_json::from_value(json).unwrap();
        assert_eq!(back, condition);
    }

    #[test]
    fn list_operators_take_arrays() {
        let condition = Condition::field(
            EventField::ActionKind,
            MatchOp::In(vec!["data.delete".into(), "data.update".into()]),
        );
        let json = serde_json::to_value(&condition).unwrap();
        assert_eq!(json["value"], serde_json::json!(["data.delete", "data.update"]));
    }
}
