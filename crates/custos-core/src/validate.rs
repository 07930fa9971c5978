//! Draft validation at the ingestion boundary.
//!
//! Validation collects every problem in one pass instead of failing on the
//! first, so callers can fix a rejected draft in a single round trip.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::event::EventDraft;

/// How far into the future a draft timestamp may sit before it is rejected
/// as clock skew.
const MAX_FUTURE_SKEW_SECS: i64 = 300;

/// One field-level problem found in a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Dotted path of the offending field, e.g. `actor.id`.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl Violation {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_owned(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// A draft failed validation; holds every violation found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// All problems found, in field order.
    pub violations: Vec<Violation>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid event draft ({} violation(s)):", self.violations.len())?;
        for violation in &self.violations {
            write!(f, " [{violation}]")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

impl EventDraft {
    /// Check the draft against the ingestion rules.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] carrying every violation found: empty
    /// tenant id, source, actor id, action kind or resource id, or a
    /// timestamp more than five minutes in the future.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut violations = Vec::new();

        if self.metadata.tenant_id.is_empty() {
            violations.push(Violation::new("metadata.tenant_id", "must not be empty"));
        }
        if self.metadata.source.trim().is_empty() {
            violations.push(Violation::new("metadata.source", "must not be empty"));
        }
        if self.actor.id.trim().is_empty() {
            violations.push(Violation::new("actor.id", "must not be empty"));
        }
        if self.action.kind.trim().is_empty() {
            violations.push(Violation::new("action.kind", "must not be empty"));
        }
        if self.resource.id.trim().is_empty() {
            violations.push(Violation::new("resource.id", "must not be empty"));
        }

        if let Some(timestamp) = self.timestamp
            && let Some(horizon) = Utc::now().checked_add_signed(Duration::seconds(MAX_FUTURE_SKEW_SECS))
            && timestamp > horizon
        {
            violations.push(Violation::new(
                "timestamp",
                "lies too far in the future; check the emitting clock",
            ));
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { violations })
        }
    }
}
