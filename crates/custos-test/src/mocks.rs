//! Mock sinks for exercising delivery paths.
//!
//! All three sinks record what reached them behind a `std::sync::Mutex`,
//! so assertions work from any test without a runtime handle.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use custos_notify::{AlertNotification, AlertSink, SinkError};

/// Sink that records every notification and always acks.
#[derive(Debug)]
pub struct CapturingSink {
    name: String,
    seen: Mutex<Vec<AlertNotification>>,
}

impl CapturingSink {
    /// Create a capturing sink named `capture`.
    #[must_use]
    pub fn new() -> Self {
        Self::named("capture")
    }

    /// Create a capturing sink with a specific name, for tests that
    /// register several and tell their delivery records apart.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Everything delivered so far, in arrival order.
    #[must_use]
    pub fn notifications(&self) -> Vec<AlertNotification> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }
}

impl Default for CapturingSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AlertSink for CapturingSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, notification: &AlertNotification) -> Result<(), SinkError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(notification.clone());
        }
        Ok(())
    }
}

/// Sink that fails its first deliveries, then behaves like
/// [`CapturingSink`]. Exercises the retry path without a real outage.
#[derive(Debug)]
pub struct FlakySink {
    name: String,
    remaining_failures: AtomicU32,
    attempts: AtomicU32,
    seen: Mutex<Vec<AlertNotification>>,
}

impl FlakySink {
    /// Create a sink whose first `times` deliveries fail with a
    /// transport error.
    #[must_use]
    pub fn failing(times: u32) -> Self {
        Self {
            name: "flaky".to_string(),
            remaining_failures: AtomicU32::new(times),
            attempts: AtomicU32::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Total delivery attempts, failed ones included.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Notifications that made it through.
    #[must_use]
    pub fn notifications(&self) -> Vec<AlertNotification> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AlertSink for FlakySink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, notification: &AlertNotification) -> Result<(), SinkError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(SinkError::Transport("synthetic transport failure".into()));
        }
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(notification.clone());
        }
        Ok(())
    }
}

/// Sink that rejects every delivery, for retry-exhaustion tests.
#[derive(Debug, Default)]
pub struct RejectingSink {
    attempts: AtomicU32,
}

impl RejectingSink {
    /// Create the sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How many deliveries were attempted against it.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AlertSink for RejectingSink {
    fn name(&self) -> &str {
        "rejecting"
    }

    async fn deliver(&self, _notification: &AlertNotification) -> Result<(), SinkError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(SinkError::Rejected("synthetic rejection".into()))
    }
}
