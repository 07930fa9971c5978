//! Convenient imports for working with Custos configuration.

pub use crate::error::{ConfigError, ConfigResult};
pub use crate::types::{Config, DetectionSection, LedgerSection, NotifySection, TelemetrySection};
