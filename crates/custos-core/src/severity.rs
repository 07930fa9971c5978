//! Alert severity scale.

use serde::{Deserialize, Serialize};

/// How urgent a rule match is.
///
/// Ordered so subscribers can filter with a plain comparison
/// (`severity >= Severity::High`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational; routine review.
    Low,
    /// Worth a look during the next triage pass.
    Medium,
    /// Needs prompt attention.
    High,
    /// Active incident; page someone.
    Critical,
}

impl Severity {
    /// Stable lowercase label, matching the serde encoding.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
