//! Canonical event encoding.
//!
//! Chain hashes are only as good as the bytes they are computed over, so
//! the semantic content of an event is reduced to exactly one byte string:
//!
//! - object keys are sorted at every nesting level;
//! - timestamps render as UTC with fixed microsecond precision, so a value
//!   that survives a parse/serialize round trip hashes identically;
//! - absent optional fields, empty strings, and empty collections are all
//!   omitted, so `None`, `""`, `{}` and `[]` encode the same way;
//! - the output uses compact separators with no insignificant whitespace.
//!
//! The chain hash is a domain-separated SHA-256 over the canonical bytes
//! concatenated with the previous event's hash, which binds every event to
//! its position: same content at a different position, or after a different
//! predecessor, produces a different hash.
//!
//! The canonical form covers `id`, `timestamp`, `actor`, `action`,
//! `resource`, `metadata` and `sequence`. It deliberately excludes
//! `previous_hash` (fed to the digest separately), `hash` itself, and the
//! detached `signature`.

use chrono::{DateTime, SecondsFormat, Utc};
use custos_core::{Action, Actor, Event, EventId, EventMetadata, Resource};
use custos_crypto::EventHash;
use serde::Serialize;
use serde_json::Value;

use crate::error::LedgerResult;

/// Domain-separation prefix for chain hashes.
///
/// Bump the version suffix if the canonical form ever changes shape, so
/// hashes from different encodings can never collide.
pub(crate) const CHAIN_DOMAIN: &[u8] = b"custos.event.v1";

/// Borrowed view over the hashed subset of an event.
///
/// Field order here is irrelevant: serialization goes through
/// [`serde_json::Value`], whose object representation sorts keys.
#[derive(Serialize)]
struct CanonicalView<'a> {
    id: &'a EventId,
    timestamp: String,
    actor: &'a Actor,
    action: &'a Action,
    resource: &'a Resource,
    metadata: &'a EventMetadata,
    sequence: u64,
}

/// Render a timestamp in the fixed canonical form, e.g.
/// `2026-03-01T09:30:00.000000Z`.
fn canonical_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Recursively drop nulls, empty strings, and empty containers.
///
/// Returns `None` when the value itself reduces to nothing, which makes
/// a field carrying it indistinguishable from an absent field.
fn prune(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::Array(items) => {
            let kept: Vec<Value> = items.into_iter().filter_map(prune).collect();
            if kept.is_empty() {
                None
            } else {
                Some(Value::Array(kept))
            }
        },
        Value::Object(fields) => {
            let kept: serde_json::Map<String, Value> = fields
                .into_iter()
                .filter_map(|(key, value)| prune(value).map(|v| (key, v)))
                .collect();
            if kept.is_empty() {
                None
            } else {
                Some(Value::Object(kept))
            }
        },
        other => Some(other),
    }
}

/// Produce the canonical byte encoding of an event's semantic content.
///
/// # Errors
///
/// Returns [`LedgerError::Serialization`](crate::LedgerError::Serialization)
/// if the event cannot be represented as JSON.
pub fn canonical_event_bytes(event: &Event) -> LedgerResult<Vec<u8>> {
    let view = CanonicalView {
        id: &event.id,
        timestamp: canonical_timestamp(&event.timestamp),
        actor: &event.actor,
        action: &event.action,
        resource: &event.resource,
        metadata: &event.metadata,
        sequence: event.sequence,
    };
    let value = serde_json::to_value(&view)?;
    let pruned = prune(value).unwrap_or_else(|| Value::Object(serde_json::Map::new()));
    Ok(serde_json::to_vec(&pruned)?)
}

/// Compute the chain hash of an event from its canonical content and its
/// `previous_hash`.
///
/// # Errors
///
/// Returns [`LedgerError::Serialization`](crate::LedgerError::Serialization)
/// if canonical encoding fails.
pub fn content_hash(event: &Event) -> LedgerResult<EventHash> {
    let canonical = canonical_event_bytes(event)?;
    Ok(EventHash::digest_parts(&[
        CHAIN_DOMAIN,
        &canonical,
        event.previous_hash.as_bytes(),
    ]))
}
