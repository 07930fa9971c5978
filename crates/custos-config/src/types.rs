//! Configuration struct definitions.
//!
//! These types are self-contained: nothing here depends on the other
//! custos crates. Conversion into domain types (retry policies, engine
//! knobs, logging setup) happens at the integration boundary. Every
//! struct implements [`Default`] with production values, so a bare
//! `[section]` header in TOML yields a working configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root Custos configuration.
///
/// Loaded by [`Config::load`](crate::Config::load) from the embedded
/// defaults plus an optional overlay file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chain append behaviour and signing.
    pub ledger: LedgerSection,
    /// Detection queue and rule evaluation knobs.
    pub detection: DetectionSection,
    /// Alert delivery retry policy.
    pub notify: NotifySection,
    /// Logging level and format.
    pub telemetry: TelemetrySection,
}

/// Ledger append settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSection {
    /// Lost chain-head races tolerated before an append gives up.
    pub max_append_attempts: u32,
    /// Path to the Ed25519 signing key. Unset means events are committed
    /// unsigned; the file is created on first use if it does not exist.
    pub signing_key_path: Option<PathBuf>,
}

impl Default for LedgerSection {
    fn default() -> Self {
        Self {
            max_append_attempts: 5,
            signing_key_path: None,
        }
    }
}

/// Detection pipeline and rule engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSection {
    /// Bound of the commit queue between ingestion and detection.
    pub queue_capacity: usize,
    /// Budget for one history lookup during windowed rule evaluation.
    pub history_timeout_ms: u64,
    /// Fallback dedup cooldown for rules that set neither a cooldown nor
    /// a window, in seconds.
    pub dedup_cooldown_secs: u64,
    /// Most event ids a single trigger may carry.
    pub max_trigger_events: usize,
    /// Most event ids an alert accumulates across folded triggers.
    pub max_alert_events: usize,
}

impl DetectionSection {
    /// The history lookup budget as a [`Duration`].
    #[must_use]
    pub fn history_timeout(&self) -> Duration {
        Duration::from_millis(self.history_timeout_ms)
    }
}

impl Default for DetectionSection {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            history_timeout_ms: 2_000,
            dedup_cooldown_secs: 300,
            max_trigger_events: 100,
            max_alert_events: 100,
        }
    }
}

/// Alert delivery retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifySection {
    /// Delivery attempts per sink before a notification is marked failed.
    pub max_attempts: u32,
    /// First retry delay; doubles per attempt.
    pub base_delay_ms: u64,
    /// Ceiling on the per-attempt retry delay.
    pub max_delay_ms: u64,
    /// Budget for a single delivery attempt.
    pub attempt_timeout_ms: u64,
}

impl NotifySection {
    /// The base retry delay as a [`Duration`].
    #[must_use]
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// The retry delay ceiling as a [`Duration`].
    #[must_use]
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// The per-attempt budget as a [`Duration`].
    #[must_use]
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }
}

impl Default for NotifySection {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1_000,
            max_delay_ms: 60_000,
            attempt_timeout_ms: 10_000,
        }
    }
}

/// Logging settings.
///
/// Kept as plain strings here; `custos-telemetry` turns them into its
/// own types when logging is initialised.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySection {
    /// Log level filter, e.g. `"info"` or `"debug"`.
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, or `"json"`.
    pub format: String,
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "pretty".to_owned(),
        }
    }
}
