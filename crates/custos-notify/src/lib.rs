//! Custos Notify — alert delivery to external sinks.
//!
//! The [`Dispatcher`] fans each alert out to the sinks registered for its
//! tenant, one spawned task per sink, so deliveries proceed independently:
//! a broken webhook backs off and retries on its own schedule while every
//! other sink is long done. Delivery is at-least-once; the notification's
//! idempotency key (the alert id) is constant across attempts so receivers
//! can deduplicate.
//!
//! Per-sink attempts are bounded by a [`RetryPolicy`] (doubling, capped
//! backoff plus a per-attempt deadline). Exhausting the budget parks the
//! delivery in the terminal `Failed` state in the [`DeliveryStore`] for an
//! operator to find — never a silent drop.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use custos_notify::{Dispatcher, MemoryDeliveryStore, RetryPolicy, TracingSink};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut dispatcher = Dispatcher::new(Arc::new(MemoryDeliveryStore::new()))
//!     .with_policy(RetryPolicy::default().with_max_attempts(3));
//! dispatcher.register_global(Arc::new(TracingSink::new()));
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod dispatcher;
pub mod error;
pub mod prelude;
pub mod sink;
pub mod webhook;

pub use dispatcher::{
    DEFAULT_MAX_ATTEMPTS, DeliveryRecord, DeliveryState, DeliveryStore, Dispatcher,
    MemoryDeliveryStore, RetryPolicy,
};
pub use error::{NotifyError, NotifyResult, SinkError};
pub use sink::{AlertNotification, AlertSink, TracingSink};
pub use webhook::WebhookSink;
