//! Convenient imports for setting up Custos logging.

pub use crate::error::{TelemetryError, TelemetryResult};
pub use crate::logging::{LogConfig, LogFormat, setup_default_logging, setup_logging};
