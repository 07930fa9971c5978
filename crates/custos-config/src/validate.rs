//! Configuration validation.
//!
//! Checks run after the layers merge and report the first offending
//! field. Messages carry the dotted field path so an operator can fix
//! the overlay directly.

use crate::error::{ConfigError, ConfigResult};
use crate::types::{Config, DetectionSection, LedgerSection, NotifySection, TelemetrySection};

/// Most chain-head races an append may be configured to tolerate.
const MAX_APPEND_ATTEMPTS_LIMIT: u32 = 100;

/// Upper bound on the commit queue between ingestion and detection.
const MAX_QUEUE_CAPACITY: usize = 65_536;

/// Log levels accepted by `telemetry.level`.
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Log formats accepted by `telemetry.format`.
const LOG_FORMATS: [&str; 3] = ["pretty", "compact", "json"];

/// Validates a merged configuration, reporting the first bad field.
pub(crate) fn config(config: &Config) -> ConfigResult<()> {
    ledger(&config.ledger)?;
    detection(&config.detection)?;
    notify(&config.notify)?;
    telemetry(&config.telemetry)?;
    Ok(())
}

fn ledger(section: &LedgerSection) -> ConfigResult<()> {
    if !(1..=MAX_APPEND_ATTEMPTS_LIMIT).contains(&section.max_append_attempts) {
        return Err(invalid(
            "ledger.max_append_attempts",
            format!("must be between 1 and {MAX_APPEND_ATTEMPTS_LIMIT}"),
        ));
    }
    Ok(())
}

fn detection(section: &DetectionSection) -> ConfigResult<()> {
    if !(1..=MAX_QUEUE_CAPACITY).contains(&section.queue_capacity) {
        return Err(invalid(
            "detection.queue_capacity",
            format!("must be between 1 and {MAX_QUEUE_CAPACITY}"),
        ));
    }
    if section.history_timeout_ms == 0 {
        return Err(invalid("detection.history_timeout_ms", "must be at least 1"));
    }
    if section.max_trigger_events == 0 {
        return Err(invalid("detection.max_trigger_events", "must be at least 1"));
    }
    if section.max_alert_events == 0 {
        return Err(invalid("detection.max_alert_events", "must be at least 1"));
    }
    Ok(())
}

fn notify(section: &NotifySection) -> ConfigResult<()> {
    if section.max_attempts == 0 {
        return Err(invalid("notify.max_attempts", "must be at least 1"));
    }
    if section.max_delay_ms < section.base_delay_ms {
        return Err(invalid(
            "notify.max_delay_ms",
            format!("must be at least base_delay_ms ({})", section.base_delay_ms),
        ));
    }
    if section.attempt_timeout_ms == 0 {
        return Err(invalid("notify.attempt_timeout_ms", "must be at least 1"));
    }
    Ok(())
}

fn telemetry(section: &TelemetrySection) -> ConfigResult<()> {
    if !LOG_LEVELS.contains(&section.level.as_str()) {
        return Err(invalid(
            "telemetry.level",
            format!(
                "unsupported log level '{}'; expected one of: {}",
                section.level,
                LOG_LEVELS.join(", ")
            ),
        ));
    }
    if !LOG_FORMATS.contains(&section.format.as_str()) {
        return Err(invalid(
            "telemetry.format",
            format!(
                "unsupported log format '{}'; expected one of: {}",
                section.format,
                LOG_FORMATS.join(", ")
            ),
        ));
    }
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.to_owned(),
        message: message.into(),
    }
}
