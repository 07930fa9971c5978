//! Custos Telemetry — logging setup for Custos services.
//!
//! A thin layer over `tracing-subscriber`: a [`LogConfig`] names the
//! level, format, and directive overrides, and [`setup_logging`]
//! installs the matching stderr subscriber. The format strings accepted
//! here are the same ones `custos-config` validates, so a loaded config
//! section converts with [`str::parse`].
//!
//! ```rust,no_run
//! use custos_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), custos_telemetry::TelemetryError> {
//! let config = LogConfig::new("debug")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("custos_ledger=trace");
//!
//! setup_logging(&config)?;
//! tracing::info!(component = "ingest", "logging ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod logging;
pub mod prelude;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, setup_default_logging, setup_logging};
