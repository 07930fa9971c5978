//! Condition evaluation against committed events.
//!
//! Evaluation is pure and infallible except for one case: a `matches`
//! predicate whose pattern fails to compile surfaces
//! [`DetectError::InvalidRule`], which the engine turns into a skipped
//! rule rather than a failed event.
//!
//! An empty string is treated the same as an absent field, mirroring how
//! the ledger's canonical form erases the distinction.

use custos_core::Event;
use regex::Regex;

use crate::condition::{Condition, EventField, MatchOp, Predicate};
use crate::error::DetectResult;

/// Evaluate a condition tree against one event.
///
/// # Errors
///
/// Returns [`DetectError::InvalidRule`](crate::DetectError::InvalidRule)
/// if a `matches` predicate carries an uncompilable pattern.
pub fn evaluate(condition: &Condition, event: &Event) -> DetectResult<bool> {
    match condition {
        Condition::All { all } => {
            for child in all {
                if !evaluate(child, event)? {
                    return Ok(false);
                }
            }
            Ok(true)
        },
        Condition::Any { any } => {
            for child in any {
                if evaluate(child, event)? {
                    return Ok(true);
                }
            }
            Ok(false)
        },
        Condition::Predicate(predicate) => eval_predicate(predicate, event),
    }
}

fn eval_predicate(predicate: &Predicate, event: &Event) -> DetectResult<bool> {
    let values = field_values(event, predicate.field);
    Ok(match &predicate.op {
        MatchOp::Equals(arg) => values.iter().any(|v| v == arg),
        MatchOp::NotEquals(arg) => values.iter().all(|v| v != arg),
        MatchOp::Contains(arg) => values.iter().any(|v| v.contains(arg.as_str())),
        MatchOp::StartsWith(arg) => values.iter().any(|v| v.starts_with(arg.as_str())),
        MatchOp::EndsWith(arg) => values.iter().any(|v| v.ends_with(arg.as_str())),
        MatchOp::Matches(pattern) => {
            let regex = Regex::new(pattern)?;
            values.iter().any(|v| regex.is_match(v))
        },
        MatchOp::In(set) => values.iter().any(|v| set.iter().any(|s| s == v)),
        MatchOp::NotIn(set) => values.iter().all(|v| set.iter().all(|s| s != v)),
        MatchOp::Exists => !values.is_empty(),
        MatchOp::NotExists => values.is_empty(),
    })
}

/// Read a field's values off an event. Empty means absent; only `Tag`
/// ever yields more than one value.
fn field_values(event: &Event, field: EventField) -> Vec<&str> {
    fn single(value: Option<&str>) -> Vec<&str> {
        value.into_iter().filter(|v| !v.is_empty()).collect()
    }
    match field {
        EventField::ActionKind => single(Some(&event.action.kind)),
        EventField::ActionCategory => single(event.action.category.as_deref()),
        EventField::ActorId => single(Some(&event.actor.id)),
        EventField::ActorType => single(Some(event.actor.kind.as_str())),
        EventField::ActorName => single(event.actor.name.as_deref()),
        EventField::ActorIp => single(event.actor.ip.as_deref()),
        EventField::ResourceId => single(Some(&event.resource.id)),
        EventField::ResourceType => single(Some(event.resource.kind.as_str())),
        EventField::ResourceName => single(event.resource.name.as_deref()),
        EventField::Source => single(Some(&event.metadata.source)),
        EventField::CorrelationId => single(event.metadata.correlation_id.as_deref()),
        EventField::SessionId => single(event.metadata.session_id.as_deref()),
        EventField::Tag => event
            .metadata
            .tags
            .iter()
            .map(String::as_str)
            .filter(|v| !v.is_empty())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use custos_core::{
        Action, Actor, ActorType, Event, EventId, EventMetadata, Resource, ResourceType, TenantId,
    };
    use custos_crypto::EventHash;

    use super::*;
    use crate::error::DetectError;

    fn event() -> Event {
        Event {
            id: EventId::new(),
            timestamp: chrono::Utc::now(),
            actor: Actor::new("user-7", ActorType::User).with_ip("203.0.113.9"),
            action: Action::new("auth.login.failed").with_category("auth"),
            resource: Resource::new("session-api", ResourceType::Api),
            metadata: EventMetadata::new("auth-service", TenantId::new("acme"))
                .with_tag("auth")
                .with_tag("failed"),
            sequence: 0,
            previous_hash: EventHash::zero(),
            hash: EventHash::zero(),
            signature: None,
        }
    }

    fn holds(field: EventField, op: MatchOp) -> bool {
        evaluate(&Condition::field(field, op), &event()).unwrap()
    }

    #[test]
    fn equals_and_not_equals() {
        assert!(holds(
            EventField::ActionKind,
            MatchOp::Equals("auth.login.failed".into())
        ));
        assert!(!holds(
            EventField::ActionKind,
            MatchOp::Equals("auth.login".into())
        ));
        assert!(holds(
            EventField::ActorId,
            MatchOp::NotEquals("user-8".into())
        ));
        assert!(!holds(
            EventField::ActorId,
            MatchOp::NotEquals("user-7".into())
        ));
    }

    #[test]
    fn substring_operators() {
        assert!(holds(
            EventField::ActionKind,
            MatchOp::Contains("login".into())
        ));
        assert!(holds(
            EventField::ActionKind,
            MatchOp::StartsWith("auth.".into())
        ));
        assert!(holds(
            EventField::ActionKind,
            MatchOp::EndsWith(".failed".into())
        ));
        assert!(!holds(
            EventField::ActionKind,
            MatchOp::StartsWith("data.".into())
        ));
    }

    #[test]
    fn regex_matching() {
        assert!(holds(
            EventField::ActorIp,
            MatchOp::Matches(r"^203\.0\.113\.\d+$".into())
        ));
        assert!(!holds(
            EventField::ActorIp,
            MatchOp::Matches(r"^10\.".into())
        ));
    }

    #[test]
    fn bad_regex_is_an_invalid_rule() {
        let err = evaluate(
            &Condition::field(EventField::ActorIp, MatchOp::Matches("[".into())),
            &event(),
        )
        .unwrap_err();
        assert!(matches!(err, DetectError::InvalidRule(_)));
    }

    #[test]
    fn set_membership() {
        assert!(holds(
            EventField::ActorType,
            MatchOp::In(vec!["user".into(), "service".into()])
        ));
        assert!(holds(
            EventField::Source,
            MatchOp::NotIn(vec!["billing".into()])
        ));
        assert!(!holds(
            EventField::Source,
            MatchOp::NotIn(vec!["auth-service".into()])
        ));
    }

    #[test]
    fn missing_fields_favor_negative_operators() {
        // The fixture has no session id.
        assert!(!holds(EventField::SessionId, MatchOp::Equals("s-1".into())));
        assert!(holds(EventField::SessionId, MatchOp::NotEquals("s-1".into())));
        assert!(holds(EventField::SessionId, MatchOp::NotIn(vec!["s-1".into()])));
        assert!(!holds(EventField::SessionId, MatchOp::Exists));
        assert!(holds(EventField::SessionId, MatchOp::NotExists));
        assert!(!holds(EventField::SessionId, MatchOp::Contains("s".into())));
    }

    #[test]
    fn empty_strings_count_as_missing() {
        let mut event = event();
        event.actor.ip = Some(String::new());
        assert!(
            !evaluate(
                &Condition::field(EventField::ActorIp, MatchOp::Exists),
                &event
            )
            .unwrap()
        );
    }

    #[test]
    fn tags_match_any_value() {
        assert!(holds(EventField::Tag, MatchOp::Equals("failed".into())));
        assert!(holds(EventField::Tag, MatchOp::Equals("auth".into())));
        assert!(!holds(EventField::Tag, MatchOp::Equals("billing".into())));
        // NotEquals over a multi-valued field requires *no* tag to equal it.
        assert!(!holds(EventField::Tag, MatchOp::NotEquals("auth".into())));
    }

    #[test]
    fn combinators_compose() {
        let condition = Condition::all(vec![
            Condition::field(EventField::Source, MatchOp::Equals("auth-service".into())),
            Condition::any(vec![
                Condition::field(EventField::Tag, MatchOp::Equals("billing".into())),
                Condition::field(EventField::Tag, MatchOp::Equals("failed".into())),
            ]),
        ]);
        assert!(evaluate(&condition, &event()).unwrap());

        let empty_all = Condition::all(vec![]);
        assert!(evaluate(&empty_all, &event()).unwrap());
        let empty_any = Condition::any(vec![]);
        assert!(!evaluate(&empty_any, &event()).unwrap());
    }
}
