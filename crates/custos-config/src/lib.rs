//! Custos Config — layered TOML configuration.
//!
//! Defaults ship embedded in the binary; an optional overlay file
//! merges on top, table by table, so deployments only write the keys
//! they change. The merged result is validated before use, which means
//! a [`Config`] in hand is always within bounds.
//!
//! ```
//! use custos_config::Config;
//!
//! # fn main() -> Result<(), custos_config::ConfigError> {
//! // No overlay: the embedded production defaults.
//! let config = Config::load(None)?;
//! assert_eq!(config.detection.queue_capacity, 1024);
//! assert_eq!(config.telemetry.level, "info");
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
mod loader;
pub mod prelude;
pub mod types;
mod validate;

pub use error::{ConfigError, ConfigResult};
pub use types::{Config, DetectionSection, LedgerSection, NotifySection, TelemetrySection};

use std::path::Path;

impl Config {
    /// Loads configuration from the embedded defaults plus an optional
    /// overlay file. A missing overlay is skipped with a debug log.
    ///
    /// # Errors
    ///
    /// Returns an error when the overlay exists but cannot be read or
    /// parsed, or when the merged result fails validation.
    pub fn load(overlay: Option<&Path>) -> ConfigResult<Self> {
        loader::load(overlay)
    }

    /// Loads configuration from the embedded defaults plus a required
    /// overlay file.
    ///
    /// # Errors
    ///
    /// Returns an error when the file is missing or unreadable, fails
    /// to parse, or when the merged result fails validation.
    pub fn load_file(path: &Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
