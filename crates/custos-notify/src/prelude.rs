//! Convenience re-exports for consumers of the notification layer.
//!
//! ```
//! use custos_notify::prelude::*;
//! ```

pub use crate::dispatcher::{
    DEFAULT_MAX_ATTEMPTS, DeliveryRecord, DeliveryState, DeliveryStore, Dispatcher,
    MemoryDeliveryStore, RetryPolicy,
};
pub use crate::error::{NotifyError, NotifyResult, SinkError};
pub use crate::sink::{AlertNotification, AlertSink, TracingSink};
pub use crate::webhook::{ALERT_HEADER, DELIVERY_HEADER, SIGNATURE_HEADER, WebhookSink};
